//! Recursive character text splitting with overlap and span tracking

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use super::parser::ParsedDocument;
use crate::types::{Chunk, ChunkSource, Document};

/// Separators tried in order: paragraphs, lines, words, then single characters
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// A piece of text cut from a larger string, with its character span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    /// The chunk text (whitespace-trimmed)
    pub content: String,
    /// Character offset of the first character
    pub char_start: usize,
    /// Character offset one past the last character
    pub char_end: usize,
}

/// Text chunker with configurable size and overlap
///
/// Sizes are measured in characters. Text is split on the coarsest separator that occurs
/// in it, pieces that are still too large are split again with the next separator, and
/// neighbouring pieces are merged back together up to `chunk_size`. Each new chunk starts
/// with up to `overlap` characters taken from the end of the previous one.
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Chunk a parsed document
    pub fn chunk_document(&self, doc: &Document, parsed: &ParsedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        // Page-aware documents are chunked page by page so chunks never straddle pages
        if parsed.pages.len() > 1 {
            for page in &parsed.pages {
                for span in self.split_text(&page.content) {
                    chunks.push(self.make_chunk(
                        doc,
                        span,
                        Some(page.page_number),
                        page.char_offset,
                        chunks.len() as u32,
                    ));
                }
            }
        } else {
            let page_number = parsed.pages.first().map(|p| p.page_number);
            for span in self.split_text(&parsed.content) {
                chunks.push(self.make_chunk(doc, span, page_number, 0, chunks.len() as u32));
            }
        }

        chunks
    }

    fn make_chunk(
        &self,
        doc: &Document,
        span: TextSpan,
        page_number: Option<u32>,
        base_offset: usize,
        chunk_index: u32,
    ) -> Chunk {
        let source = ChunkSource {
            filename: doc.filename.clone(),
            source_path: doc.source_path.clone(),
            file_type: doc.file_type,
            page_number,
        };

        Chunk::new(
            doc.id,
            span.content,
            source,
            base_offset + span.char_start,
            base_offset + span.char_end,
            chunk_index,
        )
    }

    /// Split text into overlapping chunks of at most `chunk_size` characters
    pub fn split_text(&self, text: &str) -> Vec<TextSpan> {
        let mut ranges = Vec::new();
        self.split_recursive(text, 0..text.len(), SEPARATORS, &mut ranges);

        // Byte offset of every char, for byte -> char conversion
        let char_starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let to_char = |byte: usize| char_starts.partition_point(|&b| b < byte);

        ranges
            .into_iter()
            .map(|range| TextSpan {
                content: text[range.clone()].to_string(),
                char_start: to_char(range.start),
                char_end: to_char(range.end),
            })
            .collect()
    }

    /// Split `segment` (a byte range of `text`) and push trimmed chunk ranges into `out`
    fn split_recursive(
        &self,
        text: &str,
        segment: Range<usize>,
        separators: &[&str],
        out: &mut Vec<Range<usize>>,
    ) {
        let segment_text = &text[segment.clone()];

        // Pick the first separator present in the segment
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                break;
            }
            if segment_text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let pieces = split_keep_separator(segment_text, separator, segment.start);

        let mut small: Vec<Range<usize>> = Vec::new();
        for piece in pieces {
            if char_len(text, &piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                self.merge_pieces(text, &small, out);
                small.clear();
            }

            if remaining.is_empty() {
                push_trimmed(text, piece, out);
            } else {
                self.split_recursive(text, piece, remaining, out);
            }
        }

        if !small.is_empty() {
            self.merge_pieces(text, &small, out);
        }
    }

    /// Merge consecutive small pieces into chunks, carrying overlap between them
    fn merge_pieces(&self, text: &str, pieces: &[Range<usize>], out: &mut Vec<Range<usize>>) {
        // Window of piece indices forming the current chunk, and its char length
        let mut window_start = 0usize;
        let mut window_len = 0usize;
        let lengths: Vec<usize> = pieces.iter().map(|p| char_len(text, p)).collect();

        for (i, &len) in lengths.iter().enumerate() {
            if window_len + len > self.chunk_size && window_start < i {
                push_trimmed(text, pieces[window_start].start..pieces[i - 1].end, out);

                // Drop pieces from the front until what is left fits the overlap
                // and leaves room for the incoming piece
                while window_start < i
                    && (window_len > self.overlap || window_len + len > self.chunk_size)
                {
                    window_len -= lengths[window_start];
                    window_start += 1;
                }
            }

            window_len += len;
        }

        if window_start < pieces.len() {
            push_trimmed(
                text,
                pieces[window_start].start..pieces[pieces.len() - 1].end,
                out,
            );
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(500, 100)
    }
}

/// Split `segment` on `separator`, keeping each separator at the start of the piece that
/// follows it. An empty separator splits into grapheme clusters. Returned ranges are
/// absolute (offset by `base`) and never empty.
fn split_keep_separator(segment: &str, separator: &str, base: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return segment
            .grapheme_indices(true)
            .map(|(i, g)| base + i..base + i + g.len())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (pos, _) in segment.match_indices(separator) {
        if pos > start {
            pieces.push(base + start..base + pos);
        }
        start = pos;
    }
    if start < segment.len() {
        pieces.push(base + start..base + segment.len());
    }
    pieces
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

/// Push the whitespace-trimmed version of `range`, skipping blank ranges
fn push_trimmed(text: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.start + slice.trim_end().len();
    if start < end {
        out.push(start..end);
    }
}
