//! Structured decision extraction from generated answers

use regex::Regex;

use crate::types::DecisionSummary;

/// Extract a decision summary from the model output
///
/// The decision prompt asks for a leading JSON object; when the model
/// complied, that object is parsed directly. Otherwise keyword and amount
/// heuristics over the free text are used as a fallback.
pub fn extract_decision_summary(answer: &str) -> Option<DecisionSummary> {
    if let Some(summary) = parse_json_block(answer) {
        return Some(summary);
    }

    let decision = extract_decision(answer);
    if decision == "Unknown" {
        return None;
    }

    Some(DecisionSummary {
        amount: extract_amount(answer).unwrap_or_else(|| "N/A".to_string()),
        decision,
        justification: first_sentence(answer),
        clauses: Vec::new(),
    })
}

/// Parse the first balanced `{...}` block in the text as a DecisionSummary
fn parse_json_block(text: &str) -> Option<DecisionSummary> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    let block = &text[start..start + i + 1];
                    return serde_json::from_str(block).ok();
                }
            }
            _ => {}
        }
    }

    None
}

/// Scan free text for an approve/reject outcome
///
/// An explicit "approved" wins over rejection wording elsewhere in the
/// answer; the weaker approval phrases are only consulted after the
/// rejection keywords so "not covered" and "not eligible" cannot read as
/// approvals.
pub fn extract_decision(text: &str) -> String {
    let lower = text.to_lowercase();

    if lower.contains("approved") {
        return "Approved".to_string();
    }
    if lower.contains("rejected")
        || lower.contains("denied")
        || lower.contains("not covered")
        || lower.contains("not eligible")
    {
        return "Rejected".to_string();
    }
    if lower.contains("is covered") || lower.contains("eligible") {
        return "Approved".to_string();
    }

    "Unknown".to_string()
}

/// Find the first monetary amount in the text (₹, $, or Rs. prefixed)
pub fn extract_amount(text: &str) -> Option<String> {
    let re = Regex::new(r"(?:₹|\$|Rs\.?)\s?\d+(?:,\d{3})*(?:\.\d+)?").ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

fn first_sentence(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.find(['.', '\n']) {
        Some(end) => trimmed[..=end.min(trimmed.len() - 1)].trim().to_string(),
        None => trimmed.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_json_block() {
        let answer = r#"{
  "decision": "Approved",
  "amount": "$5,000",
  "justification": "Clause 5.2 covers knee surgery.",
  "clauses": ["5.2"]
}

The claim is approved under clause 5.2."#;

        let summary = extract_decision_summary(answer).unwrap();
        assert_eq!(summary.decision, "Approved");
        assert_eq!(summary.amount, "$5,000");
        assert_eq!(summary.clauses, vec!["5.2"]);
    }

    #[test]
    fn falls_back_to_keyword_scan() {
        let answer = "The claim is rejected because cosmetic procedures are not covered.";
        let summary = extract_decision_summary(answer).unwrap();
        assert_eq!(summary.decision, "Rejected");
        assert_eq!(summary.amount, "N/A");
    }

    #[test]
    fn no_outcome_yields_none() {
        assert!(extract_decision_summary("The policy has a 90 day waiting period.").is_none());
    }

    #[test]
    fn amount_regex_handles_currencies() {
        assert_eq!(extract_amount("payout of ₹150,000 total"), Some("₹150,000".to_string()));
        assert_eq!(extract_amount("covered up to $5,000."), Some("$5,000".to_string()));
        assert_eq!(extract_amount("Rs. 2000 deductible"), Some("Rs. 2000".to_string()));
        assert_eq!(extract_amount("no amounts here"), None);
    }

    #[test]
    fn decision_keywords() {
        assert_eq!(extract_decision("Approved as per clause 3"), "Approved");
        assert_eq!(extract_decision("This is denied."), "Rejected");
        assert_eq!(extract_decision("See section 4."), "Unknown");
    }

    #[test]
    fn explicit_approval_wins_over_rejection_wording() {
        assert_eq!(
            extract_decision(
                "The claim is approved. Note that cosmetic add-ons are not covered."
            ),
            "Approved"
        );
    }

    #[test]
    fn negated_coverage_does_not_read_as_approval() {
        assert_eq!(extract_decision("Dental work is not covered."), "Rejected");
        assert_eq!(extract_decision("The applicant is not eligible."), "Rejected");
        assert_eq!(extract_decision("Knee surgery is covered."), "Approved");
    }
}
