//! Append-only JSONL audit log of answered queries

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::config::AuditConfig;
use crate::error::Result;
use crate::types::{DecisionSummary, QueryResponse};

/// One audit log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the query was answered
    pub timestamp: DateTime<Utc>,
    /// Who asked ("anonymous" when the request carried no username)
    pub username: String,
    /// The raw query text
    pub query: String,
    /// Filenames of the documents the answer drew from
    pub docs_considered: Vec<String>,
    /// Outcome of the query
    pub response: AuditResponse,
}

/// Response portion of an audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResponse {
    /// Decision outcome ("Approved"/"Rejected"/"Unknown")
    pub decision: String,
    /// Payout amount or "N/A"
    pub amount: String,
    /// Justification text (the answer when no structured decision exists)
    pub justification: String,
    /// Supporting clauses
    #[serde(default)]
    pub clauses: Vec<String>,
}

impl AuditEntry {
    /// Build an entry from a completed query
    pub fn from_response(
        username: Option<&str>,
        query: &str,
        response: &QueryResponse,
    ) -> Self {
        let mut docs: Vec<String> = response
            .citations
            .iter()
            .map(|c| c.filename.clone())
            .collect();
        docs.sort();
        docs.dedup();

        let audit_response = match &response.decision {
            Some(DecisionSummary {
                decision,
                amount,
                justification,
                clauses,
            }) => AuditResponse {
                decision: decision.clone(),
                amount: amount.clone(),
                justification: justification.clone(),
                clauses: clauses.clone(),
            },
            None => AuditResponse {
                decision: "Unknown".to_string(),
                amount: "N/A".to_string(),
                justification: response.answer.clone(),
                clauses: Vec::new(),
            },
        };

        Self {
            timestamp: Utc::now(),
            username: username.unwrap_or("anonymous").to_string(),
            query: query.to_string(),
            docs_considered: docs,
            response: audit_response,
        }
    }
}

/// Serializes audit entries to a JSONL file
///
/// Logging failures are reported via tracing and never fail the query.
pub struct AuditLogger {
    path: PathBuf,
    enabled: bool,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    /// Create a logger from configuration, creating the log directory
    pub fn new(config: &AuditConfig) -> Result<Self> {
        if config.enabled {
            if let Some(parent) = config.log_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        Ok(Self {
            path: config.log_path.clone(),
            enabled: config.enabled,
            write_lock: Mutex::new(()),
        })
    }

    /// Append an entry; errors are logged and swallowed
    pub fn record(&self, entry: &AuditEntry) {
        if !self.enabled {
            return;
        }

        if let Err(e) = self.append(entry) {
            tracing::error!("Failed to write audit log entry: {}", e);
        }
    }

    fn append(&self, entry: &AuditEntry) -> Result<()> {
        let line = serde_json::to_string(entry)?;

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger_at(path: PathBuf) -> AuditLogger {
        AuditLogger::new(&AuditConfig {
            enabled: true,
            log_path: path,
        })
        .unwrap()
    }

    #[test]
    fn writes_one_json_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit_log.jsonl");
        let logger = logger_at(path.clone());

        let response = QueryResponse::new("The claim is approved.".into(), Vec::new(), 12);
        logger.record(&AuditEntry::from_response(Some("alice"), "knee surgery", &response));
        logger.record(&AuditEntry::from_response(None, "dental", &response));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.username, "alice");
        assert_eq!(first.query, "knee surgery");

        let second: AuditEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.username, "anonymous");
    }

    #[test]
    fn entry_prefers_structured_decision() {
        let mut response = QueryResponse::new("Approved.".into(), Vec::new(), 5);
        response.decision = Some(DecisionSummary {
            decision: "Approved".into(),
            amount: "$5,000".into(),
            justification: "Clause 5.2".into(),
            clauses: vec!["5.2".into()],
        });

        let entry = AuditEntry::from_response(None, "claim", &response);
        assert_eq!(entry.response.decision, "Approved");
        assert_eq!(entry.response.amount, "$5,000");
    }

    #[test]
    fn disabled_logger_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit_log.jsonl");
        let logger = AuditLogger::new(&AuditConfig {
            enabled: false,
            log_path: path.clone(),
        })
        .unwrap();

        let response = QueryResponse::not_found(3);
        logger.record(&AuditEntry::from_response(None, "q", &response));
        assert!(!path.exists());
    }
}
