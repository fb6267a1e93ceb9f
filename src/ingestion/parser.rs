//! Multi-format file parser (PDF, DOCX, TXT/Markdown, EML)

use mailparse::MailHeaderMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Parsed document with extracted text and metadata
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content
    pub content: String,
    /// Content hash for deduplication
    pub content_hash: String,
    /// Total pages (if applicable)
    pub total_pages: Option<u32>,
    /// Page-level content (for PDFs)
    pub pages: Vec<PageContent>,
    /// Document metadata (email headers etc.)
    pub metadata: HashMap<String, String>,
}

/// Content from a single page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
    /// Character offset in full document
    pub char_offset: usize,
}

/// Normalize PDF text: typographic characters and ligatures to ASCII,
/// drop null bytes and blank lines.
fn normalize_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename);

        if !file_type.is_supported() {
            let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
            return Err(Error::UnsupportedFileType(extension));
        }

        match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Docx => Self::parse_docx(filename, data),
            FileType::Txt | FileType::Markdown => Self::parse_text(data, file_type),
            FileType::Eml => Self::parse_eml(filename, data),
            FileType::Unknown => unreachable!("rejected above"),
        }
    }

    /// Extract PDF text with a sync timeout to prevent hangs on problematic fonts
    fn extract_pdf_with_timeout(filename: &str, data: &[u8]) -> Result<String> {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(Duration::from_secs(60)) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("pdf-extract failed for {}: {}, trying fallback", filename, e);
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The extraction thread cannot be killed; leave it and fall back
                tracing::error!("PDF extraction timeout after 60s for {}", filename);
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread crashed for {}", filename);
                Self::extract_pdf_text_fallback(filename, data)
            }
        }
    }

    /// Parse PDF document
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let content = Self::extract_pdf_with_timeout(filename, data)?;
        let content = normalize_pdf_text(&content);

        if content.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF",
            ));
        }

        let total_pages = match lopdf::Document::load_mem(data) {
            Ok(doc) => Some(doc.get_pages().len() as u32),
            Err(_) => Some(1),
        };

        // pdf-extract does not preserve page boundaries, so the whole text is
        // attributed to page 1 and the page count kept separately
        let pages = vec![PageContent {
            page_number: 1,
            content: content.clone(),
            char_offset: 0,
        }];

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content_hash: hash_content(&content),
            content,
            total_pages,
            pages,
            metadata: HashMap::new(),
        })
    }

    /// Fallback PDF text extraction using lopdf content streams directly
    fn extract_pdf_text_fallback(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut all_text = String::new();

        for (page_num, page_id) in doc.get_pages() {
            match doc.get_page_content(page_id) {
                Ok(content) => {
                    let text = Self::extract_text_from_content(&content);
                    if !text.is_empty() {
                        all_text.push_str(&format!("\n--- Page {} ---\n", page_num));
                        all_text.push_str(&text);
                    }
                }
                Err(e) => {
                    tracing::debug!("Could not get content for page {}: {}", page_num, e);
                }
            }
        }

        if all_text.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(all_text)
    }

    /// Extract text from PDF content stream bytes (BT/ET blocks, Tj operators)
    fn extract_text_from_content(content: &[u8]) -> String {
        let content_str = String::from_utf8_lossy(content);
        let mut text = String::new();
        let mut in_text_block = false;
        let mut current_text = String::new();

        for line in content_str.lines() {
            let line = line.trim();

            if line == "BT" {
                in_text_block = true;
                continue;
            }

            if line == "ET" {
                in_text_block = false;
                if !current_text.is_empty() {
                    text.push_str(&current_text);
                    text.push(' ');
                    current_text.clear();
                }
                continue;
            }

            if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        let decoded = line[start + 1..end]
                            .replace("\\n", "\n")
                            .replace("\\r", "\r")
                            .replace("\\t", "\t")
                            .replace("\\(", "(")
                            .replace("\\)", ")")
                            .replace("\\\\", "\\");
                        current_text.push_str(&decoded);
                    }
                }
            }
        }

        text
    }

    /// Parse DOCX document
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();

        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                content.push_str(&t.text);
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        if content.trim().is_empty() {
            return Err(Error::file_parse(filename, "No text content in document"));
        }

        let pages = vec![PageContent {
            page_number: 1,
            content: content.clone(),
            char_offset: 0,
        }];

        Ok(ParsedDocument {
            file_type: FileType::Docx,
            content_hash: hash_content(&content),
            content,
            total_pages: None,
            pages,
            metadata: HashMap::new(),
        })
    }

    /// Parse plain text or markdown
    fn parse_text(data: &[u8], file_type: FileType) -> Result<ParsedDocument> {
        let content = String::from_utf8_lossy(data).to_string();

        let pages = vec![PageContent {
            page_number: 1,
            content: content.clone(),
            char_offset: 0,
        }];

        Ok(ParsedDocument {
            file_type,
            content_hash: hash_content(&content),
            content,
            total_pages: None,
            pages,
            metadata: HashMap::new(),
        })
    }

    /// Parse an email message (.eml)
    ///
    /// The Subject/From/Date headers are prepended to the body so the header
    /// context survives chunking, and also kept as metadata for citations.
    fn parse_eml(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let mail = mailparse::parse_mail(data)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let subject = mail.headers.get_first_value("Subject");
        let from = mail.headers.get_first_value("From");
        let to = mail.headers.get_first_value("To");
        let date = mail.headers.get_first_value("Date");

        let body = Self::extract_email_body(&mail)
            .ok_or_else(|| Error::file_parse(filename, "No readable body part in email"))?;

        let mut content = String::new();
        if let Some(subject) = &subject {
            content.push_str(&format!("Subject: {}\n", subject));
        }
        if let Some(from) = &from {
            content.push_str(&format!("From: {}\n", from));
        }
        if let Some(to) = &to {
            content.push_str(&format!("To: {}\n", to));
        }
        if let Some(date) = &date {
            content.push_str(&format!("Date: {}\n", date));
        }
        content.push('\n');
        content.push_str(body.trim());

        let mut metadata = HashMap::new();
        if let Some(subject) = subject {
            metadata.insert("email_subject".to_string(), subject);
        }
        if let Some(from) = from {
            metadata.insert("email_from".to_string(), from);
        }
        if let Some(date) = date {
            metadata.insert("email_date".to_string(), date);
        }

        let pages = vec![PageContent {
            page_number: 1,
            content: content.clone(),
            char_offset: 0,
        }];

        Ok(ParsedDocument {
            file_type: FileType::Eml,
            content_hash: hash_content(&content),
            content,
            total_pages: None,
            pages,
            metadata,
        })
    }

    /// Find the best readable body part: first text/plain part anywhere in
    /// the MIME tree, falling back to a tag-stripped text/html part.
    fn extract_email_body(mail: &mailparse::ParsedMail<'_>) -> Option<String> {
        if let Some(plain) = Self::find_body_part(mail, "text/plain") {
            return Some(plain);
        }
        Self::find_body_part(mail, "text/html").map(|html| Self::strip_html_tags(&html))
    }

    /// Depth-first search for a body part with the given mimetype
    fn find_body_part(mail: &mailparse::ParsedMail<'_>, mimetype: &str) -> Option<String> {
        if mail.subparts.is_empty() {
            if mail.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
                if let Ok(body) = mail.get_body() {
                    if !body.trim().is_empty() {
                        return Some(body);
                    }
                }
            }
            return None;
        }

        for part in &mail.subparts {
            if let Some(body) = Self::find_body_part(part, mimetype) {
                return Some(body);
            }
        }
        None
    }

    /// Minimal HTML tag stripper for HTML-only emails
    fn strip_html_tags(html: &str) -> String {
        let mut text = String::with_capacity(html.len());
        let mut in_tag = false;

        for c in html.chars() {
            match c {
                '<' => in_tag = true,
                '>' => {
                    in_tag = false;
                    text.push(' ');
                }
                _ if !in_tag => text.push(c),
                _ => {}
            }
        }

        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Hash content for deduplication
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text() {
        let parsed = FileParser::parse("notes.txt", b"hello world").unwrap();
        assert_eq!(parsed.file_type, FileType::Txt);
        assert_eq!(parsed.content, "hello world");
        assert_eq!(parsed.pages.len(), 1);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = FileParser::parse("archive.zip", b"PK").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn parses_simple_eml() {
        let raw = b"Subject: Claim update\r\n\
From: agent@example.com\r\n\
To: client@example.com\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Your claim has been approved for $5,000.\r\n";

        let parsed = FileParser::parse("claim.eml", raw).unwrap();
        assert_eq!(parsed.file_type, FileType::Eml);
        assert!(parsed.content.starts_with("Subject: Claim update"));
        assert!(parsed.content.contains("Your claim has been approved"));
        assert_eq!(
            parsed.metadata.get("email_subject").map(String::as_str),
            Some("Claim update")
        );
        assert_eq!(
            parsed.metadata.get("email_from").map(String::as_str),
            Some("agent@example.com")
        );
    }

    #[test]
    fn multipart_eml_prefers_text_plain() {
        let raw = b"Subject: Multi\r\n\
From: a@example.com\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"sep\"\r\n\
\r\n\
--sep\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
plain body\r\n\
--sep\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>html body</p>\r\n\
--sep--\r\n";

        let parsed = FileParser::parse("multi.eml", raw).unwrap();
        assert!(parsed.content.contains("plain body"));
        assert!(!parsed.content.contains("<p>"));
    }

    #[test]
    fn identical_content_hashes_identically() {
        let a = FileParser::parse("a.txt", b"same content").unwrap();
        let b = FileParser::parse("b.txt", b"same content").unwrap();
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn pdf_text_normalization() {
        let raw = "smart \u{2018}quotes\u{2019} and \u{FB01}gures\n\n  \nem\u{2014}dash";
        let normalized = normalize_pdf_text(raw);
        assert_eq!(normalized, "smart 'quotes' and figures\nem--dash");
    }
}
