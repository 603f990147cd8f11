use std::collections::VecDeque;
use std::path::Path;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Break points tried in order; the empty separator means a hard cut
/// between characters.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Unsupported file type: {0} (only PDF reports are accepted)")]
    UnsupportedType(String),
    #[error("PDF parse error: {0}")]
    Pdf(String),
    #[error("Invalid chunking: overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidChunking { chunk_size: usize, overlap: usize },
}

/// Reject anything that is not a `.pdf` by extension.
pub fn ensure_pdf(file_name: &str) -> Result<(), DocumentError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext == "pdf" {
        Ok(())
    } else {
        Err(DocumentError::UnsupportedType(format!(".{}", ext)))
    }
}

/// Extract the text of every page, in page order.
///
/// Pages that fail extraction are skipped. A document with no extractable
/// text yields an empty string rather than an error.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let doc = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(error = %e, "page loader rejected PDF, trying whole-document extraction");
            return pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| DocumentError::Pdf(e.to_string()));
        }
    };

    let mut text = String::new();
    let mut skipped = 0usize;
    for page_number in doc.get_pages().into_keys() {
        match doc.extract_text(&[page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => {
                skipped += 1;
                tracing::debug!(page_number, error = %e, "skipping page without extractable text");
            }
        }
    }
    if skipped > 0 {
        tracing::info!(skipped, "some report pages could not be read");
    }
    Ok(text)
}

/// Recursive character splitter producing overlapping windows.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, DocumentError> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(DocumentError::InvalidChunking {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Split text into trimmed chunks of at most `chunk_size` characters.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // Use the first separator that actually occurs; the rest are kept for
        // pieces that are still too long.
        let mut separator = separators[separators.len() - 1];
        let mut finer: &[&str] = &[];
        for (i, &sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                push_trimmed(&mut chunks, piece);
            } else {
                chunks.extend(self.split_with(piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Greedily pack small pieces into windows, carrying at most `overlap`
    /// characters of each emitted window into the next one.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if total > self.chunk_size {
                    tracing::warn!(total, chunk_size = self.chunk_size, "chunk longer than configured size");
                }
                push_trimmed(&mut chunks, &join(&window));
                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        push_trimmed(&mut chunks, &join(&window));
        chunks
    }
}

/// Split on `separator`, leaving each separator at the start of the piece
/// that follows it. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
            start = idx;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join(window: &VecDeque<(&str, usize)>) -> String {
    window.iter().map(|(piece, _)| *piece).collect()
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        chunks.push(text.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
