//! Retrieval: rewrite, vector search, optional cross-encoder reranking

use std::sync::Arc;

use super::rewriter::{QueryRewriter, Rewrite};
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, Reranker, VectorSearchResult, VectorStoreProvider};

/// Passages retrieved for a question
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Passages formatted for the prompt
    pub context: String,
    /// Passages, best first (scores are rerank scores when reranking ran)
    pub passages: Vec<VectorSearchResult>,
    /// Query the search ran with
    pub query: Rewrite,
}

/// Retrieves and ranks passages from the vector store
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    reranker: Arc<dyn Reranker>,
    rewriter: QueryRewriter,
    /// Candidates fetched per requested passage when reranking
    candidate_factor: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
        reranker: Arc<dyn Reranker>,
        rewriter: QueryRewriter,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            reranker,
            rewriter,
            candidate_factor: 3,
        }
    }

    /// Set how many candidates per passage are fetched before reranking
    pub fn with_candidate_factor(mut self, factor: usize) -> Self {
        self.candidate_factor = factor.max(1);
        self
    }

    /// Retrieve the `k` most relevant passages for `query`
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        use_reranking: bool,
    ) -> Result<RetrievedContext> {
        if !self.vector_store.collection_exists().await? {
            return Err(Error::CollectionNotFound(self.vector_store.collection().to_string()));
        }

        let rewrite = self.rewriter.rewrite(query).await;

        let initial_k = if use_reranking { k * self.candidate_factor } else { k };
        let query_embedding = self.embedder.embed(&rewrite.text).await?;
        let mut passages = self.vector_store.search(&query_embedding, initial_k).await?;

        if use_reranking && !passages.is_empty() {
            passages = self.rerank(&rewrite.text, passages, k).await?;
            tracing::info!("Reranked top {} documents from {} candidates", k, initial_k);
        }

        Ok(RetrievedContext {
            context: format_context(&passages),
            passages,
            query: rewrite,
        })
    }

    /// Score candidates with the cross-encoder, keep the best `k`
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<VectorSearchResult>,
        k: usize,
    ) -> Result<Vec<VectorSearchResult>> {
        let texts: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let scores = self.reranker.score(query, &texts).await?;

        if scores.len() != candidates.len() {
            return Err(Error::reranker(format!(
                "Expected {} scores, got {}",
                candidates.len(),
                scores.len()
            )));
        }

        Ok(rank_by_scores(candidates, scores, k))
    }
}

/// Sort by score descending, ties keep search order; keep the first `k`
fn rank_by_scores(
    candidates: Vec<VectorSearchResult>,
    scores: Vec<f32>,
    k: usize,
) -> Vec<VectorSearchResult> {
    let mut scored: Vec<(VectorSearchResult, f32)> = candidates.into_iter().zip(scores).collect();
    // NaN scores rank last
    let key = |score: f32| if score.is_nan() { f32::NEG_INFINITY } else { score };
    scored.sort_by(|a, b| key(b.1).total_cmp(&key(a.1)));

    scored
        .into_iter()
        .take(k)
        .map(|(mut passage, score)| {
            passage.score = score;
            passage
        })
        .collect()
}

/// Format passages as numbered documents for the answer prompt
pub fn format_context(passages: &[VectorSearchResult]) -> String {
    let mut output = String::new();
    for (i, passage) in passages.iter().enumerate() {
        output.push_str(&format!("\n--- Document {} ---", i + 1));
        output.push_str(&format!(
            "\nSource: {}",
            passage.source.as_deref().unwrap_or("Unknown")
        ));
        output.push_str(&format!("\nContent: {}", passage.content));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{passage, FakeEmbedder, FakeLlm, FakeReranker, FakeVectorStore};

    fn retriever(
        store: Arc<FakeVectorStore>,
        reranker: Arc<FakeReranker>,
        llm: Arc<FakeLlm>,
    ) -> Retriever {
        Retriever::new(
            Arc::new(FakeEmbedder::default()),
            store,
            reranker,
            QueryRewriter::new(llm, "rewrite-model"),
        )
    }

    #[test]
    fn test_format_context() {
        let passages = vec![
            passage("Fever is common.", Some("data_sources/flu.txt")),
            passage("Rest helps.", None),
        ];
        assert_eq!(
            format_context(&passages),
            "\n--- Document 1 ---\nSource: data_sources/flu.txt\nContent: Fever is common.\
             \n--- Document 2 ---\nSource: Unknown\nContent: Rest helps."
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_rank_by_scores_is_stable_and_truncates() {
        let candidates = vec![
            passage("a", None),
            passage("b", None),
            passage("c", None),
            passage("d", None),
        ];
        let ranked = rank_by_scores(candidates, vec![0.5, 2.0, 0.5, -1.0], 3);

        let order: Vec<&str> = ranked.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert_eq!(ranked[0].score, 2.0);
    }

    #[test]
    fn test_rank_by_scores_puts_nan_last() {
        let candidates = vec![passage("a", None), passage("b", None), passage("c", None)];
        let ranked = rank_by_scores(candidates, vec![f32::NAN, -3.0, 1.0], 3);

        let order: Vec<&str> = ranked.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let retriever = retriever(
            Arc::new(FakeVectorStore::default()),
            Arc::new(FakeReranker::default()),
            Arc::new(FakeLlm::with_replies(["q"])),
        );

        let result = retriever.retrieve("flu?", 5, true).await;
        assert!(matches!(result, Err(Error::CollectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_reranking_fetches_more_candidates() {
        let store = Arc::new(FakeVectorStore::with_passages(vec![
            passage("short", Some("a.txt")),
            passage("the longest passage here", Some("b.txt")),
            passage("medium one", Some("c.txt")),
        ]));
        let reranker = Arc::new(FakeReranker::default());
        let llm = Arc::new(FakeLlm::with_replies(["flu symptoms"]));
        let retriever = retriever(store.clone(), reranker.clone(), llm);

        let retrieved = retriever.retrieve("what are flu symptoms?", 2, true).await.unwrap();

        assert_eq!(store.last_limit(), Some(6));
        assert_eq!(reranker.last_query().as_deref(), Some("flu symptoms"));
        assert_eq!(retrieved.passages.len(), 2);
        // Fake reranker scores by length
        assert_eq!(retrieved.passages[0].content, "the longest passage here");
        assert_eq!(retrieved.passages[1].content, "medium one");
        assert!(retrieved.query.rewritten);
        assert!(retrieved.context.starts_with("\n--- Document 1 ---\nSource: b.txt"));
    }

    #[tokio::test]
    async fn test_without_reranking_keeps_search_order() {
        let store = Arc::new(FakeVectorStore::with_passages(vec![
            passage("short", None),
            passage("the longest passage here", None),
        ]));
        let reranker = Arc::new(FakeReranker::default());
        let retriever = retriever(store.clone(), reranker.clone(), Arc::new(FakeLlm::failing()));

        let retrieved = retriever.retrieve("flu?", 15, false).await.unwrap();

        assert_eq!(store.last_limit(), Some(15));
        assert!(reranker.last_query().is_none());
        assert_eq!(retrieved.passages[0].content, "short");
        assert_eq!(retrieved.query.text, "flu?");
        assert!(!retrieved.query.rewritten);
    }

    #[tokio::test]
    async fn test_empty_collection_skips_reranker() {
        let store = Arc::new(FakeVectorStore::with_passages(Vec::new()));
        let reranker = Arc::new(FakeReranker::default());
        let retriever = retriever(store, reranker.clone(), Arc::new(FakeLlm::with_replies(["q"])));

        let retrieved = retriever.retrieve("flu?", 5, true).await.unwrap();
        assert!(retrieved.passages.is_empty());
        assert_eq!(retrieved.context, "");
        assert!(reranker.last_query().is_none());
    }

    #[tokio::test]
    async fn test_reranker_failure_propagates() {
        let store = Arc::new(FakeVectorStore::with_passages(vec![passage("x", None)]));
        let retriever = retriever(
            store,
            Arc::new(FakeReranker::failing()),
            Arc::new(FakeLlm::with_replies(["q"])),
        );

        let result = retriever.retrieve("flu?", 5, true).await;
        assert!(matches!(result, Err(Error::Reranker(_))));
    }
}
