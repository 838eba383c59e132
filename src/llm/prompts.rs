//! Prompt fragments for answer generation and comparative analysis.

/// Collection of prompts used by the answer pipeline and the analysis step.
pub struct Prompts;

impl Prompts {
    /// Persona and task framing shared by both answer modes.
    pub fn legal_assistant() -> &'static str {
        r#"You are a legal assistant. You help users understand the law.
Answer questions clearly and precisely. If you cite specific articles or laws, be precise.
Always answer in the same language as the user's question."#
    }

    /// Instruction block for augmented answers. `{context}` is replaced with the passages.
    pub fn context_instruction() -> &'static str {
        r#"Use the following excerpts from legal documents to inform your answer.
If the answer is not clearly supported by the provided context, acknowledge that limitation.

Context:
{context}"#
    }

    /// Placeholder context when retrieval succeeded but matched nothing.
    pub fn empty_context() -> &'static str {
        "(no relevant passages found)"
    }

    /// Rubric prepended to the cross-question analysis prompt.
    pub fn analysis_rubric() -> &'static str {
        r#"Analyze the following comparison between RAG-augmented and vanilla LLM responses for legal questions.

For each question, evaluate:
1. Which response is more accurate and complete?
2. Does RAG provide specific article references that vanilla doesn't?
3. Are there any hallucinations in either response?

Provide a concise summary of findings.

Results:
"#
    }

    /// Closing line of the analysis prompt.
    pub fn analysis_request() -> &'static str {
        "\nProvide your analysis:"
    }
}
