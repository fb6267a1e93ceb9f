//! Text chunking with sentence-boundary awareness and overlap

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, ChunkSource};
use uuid::Uuid;

/// Splits document text into overlapping chunks on sentence boundaries
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    min_chunk_size: usize,
}

impl TextChunker {
    /// Create a chunker from configuration
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap.min(config.chunk_size / 2),
            min_chunk_size: config.min_chunk_size,
        }
    }

    /// Split text into chunks, attaching the given source to each
    ///
    /// Sentences are kept whole where possible; a sentence longer than the
    /// chunk size is split on word boundaries. Consecutive chunks overlap by
    /// roughly `chunk_overlap` characters of trailing sentences.
    pub fn chunk_text(
        &self,
        document_id: Uuid,
        text: &str,
        source: &ChunkSource,
        char_offset: usize,
    ) -> Vec<Chunk> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        if text.len() <= self.chunk_size {
            return vec![Chunk::new(
                document_id,
                text.to_string(),
                source.clone(),
                char_offset,
                char_offset + text.len(),
                0,
            )];
        }

        let sentences = self.split_sentences(text);
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_start = 0usize;
        let mut chunk_index = 0u32;

        for (sentence, sentence_start) in sentences {
            if !current.is_empty() && current.len() + sentence.len() + 1 > self.chunk_size {
                self.push_chunk(
                    &mut chunks,
                    document_id,
                    &current,
                    source,
                    char_offset + current_start,
                    &mut chunk_index,
                );

                // Carry trailing text forward as overlap
                let overlap = Self::tail(&current, self.chunk_overlap);
                current_start = sentence_start.saturating_sub(overlap.len());
                current = overlap;
            }

            if current.is_empty() {
                current_start = sentence_start;
            } else {
                current.push(' ');
            }
            current.push_str(&sentence);
        }

        if !current.trim().is_empty() {
            self.push_chunk(
                &mut chunks,
                document_id,
                &current,
                source,
                char_offset + current_start,
                &mut chunk_index,
            );
        }

        chunks
    }

    /// Split text into sentences with byte offsets, breaking over-long
    /// sentences on word boundaries
    fn split_sentences(&self, text: &str) -> Vec<(String, usize)> {
        let mut out = Vec::new();

        for (offset, sentence) in text.unicode_sentences().scan(0usize, |pos, s| {
            let start = text[*pos..].find(s).map(|i| *pos + i).unwrap_or(*pos);
            *pos = start + s.len();
            Some((start, s))
        }) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }

            if sentence.len() <= self.chunk_size {
                out.push((sentence.to_string(), offset));
                continue;
            }

            // Break a run-on sentence on word boundaries
            let mut piece = String::new();
            let mut piece_start = offset;
            let mut consumed = 0usize;
            for word in sentence.split_whitespace() {
                if !piece.is_empty() && piece.len() + word.len() + 1 > self.chunk_size {
                    out.push((piece.clone(), piece_start));
                    piece_start = offset + consumed;
                    piece.clear();
                }
                if !piece.is_empty() {
                    piece.push(' ');
                }
                piece.push_str(word);
                consumed += word.len() + 1;
            }
            if !piece.is_empty() {
                out.push((piece, piece_start));
            }
        }

        out
    }

    fn push_chunk(
        &self,
        chunks: &mut Vec<Chunk>,
        document_id: Uuid,
        content: &str,
        source: &ChunkSource,
        char_start: usize,
        chunk_index: &mut u32,
    ) {
        let content = content.trim();
        if content.len() < self.min_chunk_size {
            return;
        }
        chunks.push(Chunk::new(
            document_id,
            content.to_string(),
            source.clone(),
            char_start,
            char_start + content.len(),
            *chunk_index,
        ));
        *chunk_index += 1;
    }

    /// Last `max_len` bytes of `text`, snapped forward to a word boundary
    fn tail(text: &str, max_len: usize) -> String {
        if max_len == 0 || text.len() <= max_len {
            return if max_len == 0 { String::new() } else { text.to_string() };
        }

        let mut start = text.len() - max_len;
        while !text.is_char_boundary(start) {
            start += 1;
        }
        match text[start..].find(' ') {
            Some(space) => text[start + space..].trim().to_string(),
            None => text[start..].trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileType;

    fn chunker(size: usize, overlap: usize) -> TextChunker {
        TextChunker::new(&ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            min_chunk_size: 10,
        })
    }

    fn source() -> ChunkSource {
        ChunkSource::text("test.txt".into(), FileType::Txt)
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunker(1000, 100).chunk_text(
            Uuid::new_v4(),
            "This is a short document about insurance policies.",
            &source(),
            0,
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn long_text_splits_with_overlap() {
        let sentence = "Knee surgery is covered under clause five of the policy. ";
        let text = sentence.repeat(50);
        let chunks = chunker(300, 60).chunk_text(Uuid::new_v4(), &text, &source(), 0);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.content.len() <= 300 + sentence.len());
        }

        // Start positions advance through the document
        for pair in chunks.windows(2) {
            assert!(pair[0].char_start < pair[1].char_start);
        }

        // Consecutive chunks share overlapping text
        let first_tail: String = chunks[0].content.chars().rev().take(30).collect();
        let tail: String = first_tail.chars().rev().collect();
        assert!(chunks[1].content.contains(tail.split_whitespace().next().unwrap_or("")));
    }

    #[test]
    fn tiny_fragments_are_dropped() {
        let chunks = chunker(1000, 100).chunk_text(Uuid::new_v4(), "ok", &source(), 0);
        assert_eq!(chunks.len(), 1); // short-text path keeps it whole

        let c = chunker(50, 10);
        let text = "A full sentence that exceeds the chunk size limit here. no";
        let chunks = c.chunk_text(Uuid::new_v4(), text, &source(), 0);
        assert!(chunks.iter().all(|c| c.content.len() >= 10));
    }

    #[test]
    fn run_on_sentence_splits_on_words() {
        let text = "word ".repeat(200);
        let chunks = chunker(100, 20).chunk_text(Uuid::new_v4(), &text, &source(), 0);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| !c.content.contains("wo rd")));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunks = chunker(1000, 100).chunk_text(Uuid::new_v4(), "   \n  ", &source(), 0);
        assert!(chunks.is_empty());
    }
}
