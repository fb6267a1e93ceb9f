//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Email message (.eml)
    Eml,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            "eml" => Self::Eml,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a filename
    pub fn from_filename(filename: &str) -> Self {
        let extension = filename.rsplit('.').next().unwrap_or("");
        Self::from_extension(extension)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Eml => "Email (.eml)",
            Self::Unknown => "Unknown",
        }
    }
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded by user
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Content hash for deduplication
    pub content_hash: String,
    /// Total number of pages (if applicable)
    pub total_pages: Option<u32>,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Create a new document
    pub fn new(filename: String, file_type: FileType, content_hash: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            file_type,
            content_hash,
            total_pages: None,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Original filename as uploaded (used in citations)
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Page number (1-indexed, for PDF/DOCX)
    pub page_number: Option<u32>,
    /// Total pages in document
    pub page_count: Option<u32>,
    /// Section or heading title
    pub section_title: Option<String>,
    /// Email subject (for EML)
    pub email_subject: Option<String>,
    /// Email sender (for EML)
    pub email_from: Option<String>,
}

impl ChunkSource {
    /// Create source info for a text-like file
    pub fn text(filename: String, file_type: FileType) -> Self {
        Self {
            filename,
            file_type,
            page_number: None,
            page_count: None,
            section_title: None,
            email_subject: None,
            email_from: None,
        }
    }

    /// Create source info for a PDF page
    pub fn pdf(filename: String, page: u32, total_pages: u32) -> Self {
        Self {
            filename,
            file_type: FileType::Pdf,
            page_number: Some(page),
            page_count: Some(total_pages),
            section_title: None,
            email_subject: None,
            email_from: None,
        }
    }

    /// Create source info for an email
    pub fn email(filename: String, subject: Option<String>, from: Option<String>) -> Self {
        Self {
            filename,
            file_type: FileType::Eml,
            page_number: None,
            page_count: None,
            section_title: None,
            email_subject: subject,
            email_from: from,
        }
    }

    /// Format source for display
    pub fn format_citation(&self) -> String {
        let mut parts = vec![self.filename.clone()];

        if let Some(page) = self.page_number {
            parts.push(format!("Page {}", page));
        }

        if let Some(subject) = &self.email_subject {
            parts.push(format!("Subject: {}", subject));
        }

        if let Some(section) = &self.section_title {
            parts.push(format!("Section: {}", section));
        }

        parts.join(", ")
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information for citations
    pub source: ChunkSource,
    /// Character position in original document
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            char_start,
            char_end,
            chunk_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_extensions() {
        assert_eq!(FileType::from_extension("pdf"), FileType::Pdf);
        assert_eq!(FileType::from_extension("DOCX"), FileType::Docx);
        assert_eq!(FileType::from_extension("txt"), FileType::Txt);
        assert_eq!(FileType::from_extension("eml"), FileType::Eml);
        assert_eq!(FileType::from_extension("md"), FileType::Markdown);
        assert_eq!(FileType::from_extension("xlsx"), FileType::Unknown);
    }

    #[test]
    fn detects_from_filename() {
        assert_eq!(FileType::from_filename("policy.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_filename("claim.eml"), FileType::Eml);
        assert!(!FileType::from_filename("archive.zip").is_supported());
    }

    #[test]
    fn citation_includes_page_and_subject() {
        let pdf = ChunkSource::pdf("policy.pdf".into(), 3, 12);
        assert_eq!(pdf.format_citation(), "policy.pdf, Page 3");

        let eml = ChunkSource::email(
            "claim.eml".into(),
            Some("Claim #42".into()),
            Some("agent@example.com".into()),
        );
        assert_eq!(eml.format_citation(), "claim.eml, Subject: Claim #42");
    }
}
