//! Prompt templates for answer generation

/// System instruction for the answering model
pub const SYSTEM_PROMPT: &str = "You are NanoBook, a world-class intellectual research assistant.
Your goal is to help users synthesize information from their uploaded documents.

Guidelines:
1. Be precise, analytical, and objective.
2. Prioritize information found in the provided CONTEXT.
3. If information is not in the context, clearly state \"Based on the provided documents, I couldn't find information on this, however...\" and then provide general knowledge if relevant.
4. Use markdown for structural clarity (headers, bullet points, bold text).
5. Maintain a scholarly but accessible tone.";

/// Prompt builder for RAG answers
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the final user turn: retrieved context, then the question
    pub fn build_user_turn(context: &str, question: &str) -> String {
        format!(
            r#"
=== RETRIEVED CONTEXT ===
The following context has been retrieved and ranked by relevance to answer the user's question.
Use this information as the primary source for your response.

{context}

=== END CONTEXT ===

User Question: {question}

Instructions:
- Answer based primarily on the context above
- If the context doesn't fully address the question, acknowledge this
- Maintain conversation continuity with the chat history
"#
        )
    }
}
