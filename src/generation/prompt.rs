//! Prompt templates for grounded answer generation

use crate::retrieval::SearchHit;
use crate::types::response::Citation;
use crate::types::ChunkSource;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from search hits
    pub fn build_context(hits: &[SearchHit]) -> String {
        let mut context = String::new();

        for (i, hit) in hits.iter().enumerate() {
            let source_ref = Self::format_source_ref(&hit.chunk.source);

            context.push_str(&format!(
                "[{}] {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                source_ref,
                hit.chunk.content
            ));
        }

        context
    }

    /// Format source reference for context
    fn format_source_ref(source: &ChunkSource) -> String {
        let mut parts = vec![source.filename.clone()];

        if let Some(page) = source.page_number {
            parts.push(format!("Page {}", page));
        }

        if let Some(subject) = &source.email_subject {
            parts.push(format!("Subject: {}", subject));
        }

        if let Some(section) = &source.section_title {
            parts.push(format!("Section: {}", section));
        }

        parts.join(", ")
    }

    /// Build the full RAG prompt with strict grounding
    pub fn build_rag_prompt(question: &str, context: &str, citations: &[Citation]) -> String {
        format!(
            r#"You are a document-grounded assistant that ONLY uses information from provided documents.

CRITICAL GROUNDING RULES - YOU MUST FOLLOW THESE EXACTLY:
1. ONLY use information that is EXPLICITLY stated in the CONTEXT below
2. If the answer is not in the context: respond with "This information is not available in the provided documents."
3. NEVER use external knowledge, general knowledge, or training data
4. NEVER make inferences, assumptions, or educated guesses beyond what is explicitly stated
5. Every fact, claim, or piece of information MUST have a citation in this format: [Source: filename, Page X]
6. If you're unsure whether something is in the context, it's NOT - do not include it
7. Do NOT paraphrase in ways that change meaning - stay close to the source text

RESPONSE STRUCTURE:
- Provide a clear, well-organized answer using ONLY information from the context
- Cite sources inline with each claim: [Source: filename, Page X] or [Source: filename, Subject: ...]
- If multiple sources support a point, cite all of them
- Structure with paragraphs for readability when covering multiple aspects

CONTEXT FROM DOCUMENTS:
{context}

AVAILABLE SOURCES:
{sources}

QUESTION: {question}

Provide a grounded answer using ONLY the document content above:"#,
            context = context,
            sources = Self::format_sources_list(citations),
            question = question
        )
    }

    /// Build the structured decision prompt for policy/claim queries
    ///
    /// Asks the model for a JSON object with decision, amount, justification,
    /// and supporting clauses, followed by a plain-language explanation.
    pub fn build_decision_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are an expert insurance policy analyst. Using ONLY the policy clauses and document excerpts below, evaluate the query and decide whether it would be approved or rejected.

POLICY CONTEXT:
{context}

QUERY: {question}

Respond with a JSON object FIRST, on its own lines, with exactly these fields:
{{
  "decision": "Approved" or "Rejected" or "Unknown",
  "amount": "the payout amount with currency symbol, or N/A",
  "justification": "one or two sentences referencing the specific clauses",
  "clauses": ["clause numbers or section headers that support the decision"]
}}

After the JSON, write a short plain-language explanation of the decision for the policyholder. Base everything strictly on the provided context; if the context does not determine an outcome, use "Unknown"."#,
            context = context,
            question = question
        )
    }

    /// Format sources list for the prompt
    fn format_sources_list(citations: &[Citation]) -> String {
        citations
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut source = format!("[{}] {}", i + 1, c.filename);
                if let Some(page) = c.page_number {
                    source.push_str(&format!(", Page {}", page));
                }
                if let Some(subject) = &c.email_subject {
                    source.push_str(&format!(", Subject: {}", subject));
                }
                source
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkSource, FileType};
    use uuid::Uuid;

    fn hit(content: &str, page: Option<u32>) -> SearchHit {
        let source = match page {
            Some(p) => ChunkSource::pdf("policy.pdf".into(), p, 10),
            None => ChunkSource::text("notes.txt".into(), FileType::Txt),
        };
        SearchHit {
            chunk: Chunk::new(Uuid::new_v4(), content.to_string(), source, 0, content.len(), 0),
            score: 0.9,
        }
    }

    #[test]
    fn context_numbers_sources() {
        let context = PromptBuilder::build_context(&[
            hit("Knee surgery is covered.", Some(3)),
            hit("Waiting period is 90 days.", None),
        ]);
        assert!(context.contains("[1] policy.pdf, Page 3"));
        assert!(context.contains("[2] notes.txt"));
        assert!(context.contains("Knee surgery is covered."));
    }

    #[test]
    fn rag_prompt_embeds_question_and_context() {
        let prompt = PromptBuilder::build_rag_prompt("Is knee surgery covered?", "CTX", &[]);
        assert!(prompt.contains("QUESTION: Is knee surgery covered?"));
        assert!(prompt.contains("CTX"));
        assert!(prompt.contains("ONLY"));
    }

    #[test]
    fn decision_prompt_requests_json_fields() {
        let prompt = PromptBuilder::build_decision_prompt("knee surgery claim", "CTX");
        assert!(prompt.contains("\"decision\""));
        assert!(prompt.contains("\"amount\""));
        assert!(prompt.contains("\"clauses\""));
    }
}
