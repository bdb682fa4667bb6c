//! Query rewriting and passage retrieval

mod rewriter;
mod search;

pub use rewriter::{rewrite_prompt, QueryRewriter, Rewrite};
pub use search::{format_context, RetrievedContext, Retriever};
