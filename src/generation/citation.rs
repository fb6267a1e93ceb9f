//! Citation extraction and linking

use regex::Regex;

use crate::types::response::Citation;

/// Extract `[Source: ...]` markers from the LLM answer and link them to the
/// retrieved chunks
///
/// When the model cited nothing explicitly, the top chunks by similarity are
/// attached and an explicit sources list is appended to the answer.
pub fn extract_and_link_citations(
    answer: &str,
    available_citations: &mut Vec<Citation>,
) -> (String, Vec<Citation>) {
    // Matches [Source: filename], [Source: filename, Page X],
    // and [Source: filename, Subject: ...]
    let citation_pattern = match Regex::new(
        r"\[Source:\s*([^,\]]+)(?:,\s*(?:Page\s*(\d+)|Subject:\s*([^\]]+)))?\]",
    ) {
        Ok(re) => re,
        Err(_) => return (answer.to_string(), Vec::new()),
    };

    let mut linked_citations = Vec::new();
    let mut clean_answer = answer.to_string();

    for cap in citation_pattern.captures_iter(answer) {
        let filename = cap.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        let page: Option<u32> = cap.get(2).and_then(|m| m.as_str().parse().ok());
        let subject = cap.get(3).map(|m| m.as_str().trim());

        if let Some(citation) = find_matching_citation(available_citations, filename, page, subject)
        {
            if !linked_citations
                .iter()
                .any(|c: &Citation| c.chunk_id == citation.chunk_id)
            {
                linked_citations.push(citation);
            }
        }
    }

    if linked_citations.is_empty() && !available_citations.is_empty() {
        available_citations.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for citation in available_citations.iter().take(3) {
            linked_citations.push(citation.clone());
        }

        clean_answer.push_str("\n\nSources used:");
        for citation in &linked_citations {
            clean_answer.push_str(&format!("\n- {}", citation.format_inline()));
        }
    }

    (clean_answer, linked_citations)
}

/// Find a citation matching the cited filename plus page or email subject
fn find_matching_citation(
    citations: &[Citation],
    filename: &str,
    page: Option<u32>,
    subject: Option<&str>,
) -> Option<Citation> {
    for citation in citations {
        let filename_matches = citation.filename.contains(filename)
            || filename.contains(&citation.filename)
            || filename.eq_ignore_ascii_case(&citation.filename);

        if !filename_matches {
            continue;
        }

        match (page, subject) {
            (Some(p), _) => {
                if citation.page_number == Some(p) {
                    return Some(citation.clone());
                }
            }
            (None, Some(subj)) => {
                if citation
                    .email_subject
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(subj))
                {
                    return Some(citation.clone());
                }
            }
            (None, None) => return Some(citation.clone()),
        }
    }

    // Fall back to filename only when the cited page or subject does not line up
    citations
        .iter()
        .find(|c| c.filename.contains(filename) || filename.contains(&c.filename))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkSource, FileType};
    use uuid::Uuid;

    fn citation(filename: &str, page: Option<u32>, score: f32) -> Citation {
        let source = match page {
            Some(p) => ChunkSource::pdf(filename.into(), p, 10),
            None => ChunkSource::text(filename.into(), FileType::Txt),
        };
        let chunk = Chunk::new(Uuid::new_v4(), "snippet text".into(), source, 0, 12, 0);
        Citation::from_chunk(&chunk, score)
    }

    #[test]
    fn links_explicit_citations() {
        let mut available = vec![
            citation("policy.pdf", Some(3), 0.9),
            citation("other.txt", None, 0.5),
        ];
        let answer = "Knee surgery is covered [Source: policy.pdf, Page 3].";
        let (clean, linked) = extract_and_link_citations(answer, &mut available);

        assert_eq!(clean, answer);
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].filename, "policy.pdf");
    }

    #[test]
    fn uncited_answer_falls_back_to_top_hits() {
        let mut available = vec![
            citation("low.txt", None, 0.3),
            citation("high.txt", None, 0.9),
        ];
        let (clean, linked) = extract_and_link_citations("An answer with no markers.", &mut available);

        assert!(clean.contains("Sources used:"));
        assert_eq!(linked[0].filename, "high.txt");
    }

    #[test]
    fn subject_disambiguates_email_citations() {
        let make_eml = |subject: &str| {
            let source = ChunkSource::email(
                "claims.eml".into(),
                Some(subject.to_string()),
                Some("agent@example.com".into()),
            );
            let chunk = Chunk::new(Uuid::new_v4(), "email body".into(), source, 0, 10, 0);
            Citation::from_chunk(&chunk, 0.7)
        };

        let mut available = vec![make_eml("Renewal notice"), make_eml("Claim #42")];
        let answer = "Approved per the adjuster [Source: claims.eml, Subject: Claim #42].";
        let (_, linked) = extract_and_link_citations(answer, &mut available);

        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].email_subject.as_deref(), Some("Claim #42"));
    }

    #[test]
    fn duplicate_markers_link_once() {
        let mut available = vec![citation("policy.pdf", Some(3), 0.9)];
        let answer = "A [Source: policy.pdf, Page 3]. B [Source: policy.pdf, Page 3].";
        let (_, linked) = extract_and_link_citations(answer, &mut available);
        assert_eq!(linked.len(), 1);
    }
}
