//! Word-window chunker
//!
//! Splits per-page extracted text into retrievable chunks. A page at or
//! under `MAX_WORDS` words becomes a single chunk; longer pages are cut
//! into consecutive non-overlapping windows of exactly `MAX_WORDS` words,
//! with the final window allowed to run short. Windows never overlap, so
//! context spanning a split boundary is lost; that is a known limitation,
//! not something this module tries to compensate for.
//!
//! Chunking is a pure function of its inputs. Output order (page order,
//! then window order within a page) is what downstream id assignment
//! depends on, so it must stay stable across rebuilds.

/// Maximum words per chunk window.
pub const MAX_WORDS: usize = 350;

/// Documented lower sizing bound. Short trailing windows are kept as-is;
/// nothing enforces this.
pub const MIN_WORDS: usize = 80;

/// A chunk produced from one page, before ingestion assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    /// 1-based page number the chunk came from.
    pub page: u32,
    /// Chunk text, whitespace-normalized (words joined by single spaces).
    pub text: String,
    /// Number of whitespace-separated words in `text`.
    pub word_count: usize,
}

/// Split one page's text into word-bounded windows.
///
/// Tokenization is a plain whitespace split, locale-agnostic, with no
/// stemming. Whitespace-only text yields no chunks (the corpus never
/// stores empty chunk text).
pub fn chunk_page(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if words.len() <= max_words {
        return vec![words.join(" ")];
    }

    words
        .chunks(max_words)
        .map(|window| window.join(" "))
        .collect()
}

/// Chunk an ordered sequence of (page_number, page_text) pairs for one
/// source, preserving page order and window order within each page.
pub fn chunk_pages(pages: &[(u32, String)], max_words: usize) -> Vec<PageChunk> {
    let mut chunks = Vec::new();
    for (page, text) in pages {
        for window in chunk_page(text, max_words) {
            let word_count = window.split_whitespace().count();
            chunks.push(PageChunk {
                page: *page,
                text: window,
                word_count,
            });
        }
    }
    chunks
}
