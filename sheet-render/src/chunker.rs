//! Sliding-window chunking of a rendered Markdown table.
//!
//! An LLM call per whole sheet does not scale past a few hundred rows, so
//! the table body is cut into windows of `chunk_size` rows with `overlap`
//! rows shared between consecutive windows. The overlap guarantees that a
//! product row truncated at the tail of one completion reappears intact in
//! the next chunk; the extractor deduplicates the seam afterwards.

use serde::Serialize;

/// One window over the table body, carrying the full header so each chunk
/// is a self-contained Markdown table.
#[derive(Debug, Clone, Serialize)]
pub struct MarkdownChunk {
    /// 0-indexed chunk identifier.
    pub chunk_id: usize,
    /// 1-indexed first body row in this chunk.
    pub start_row: usize,
    /// 1-indexed last body row in this chunk (inclusive).
    pub end_row: usize,
    /// Header + separator + the body-row window.
    pub markdown: String,
    /// Body-row count of the whole table, identical in every chunk.
    pub total_rows: usize,
}

/// Windowing knobs.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            overlap: 5,
        }
    }
}

/// Splits a rendered Markdown table into overlapping chunks.
///
/// Windows cover rows `[0..N)`, `[N−k..2N−k)`, … where `N = chunk_size`
/// and `k = overlap` (clamped below `N`). A table that fits into a single
/// window yields exactly one chunk; an empty table yields none.
pub fn chunk_markdown(markdown: &str, opts: ChunkOptions) -> Vec<MarkdownChunk> {
    let mut lines = markdown.lines();
    let (Some(header), Some(separator)) = (lines.next(), lines.next()) else {
        return Vec::new();
    };
    let body: Vec<&str> = lines.collect();
    let total_rows = body.len();
    if total_rows == 0 {
        return Vec::new();
    }

    let chunk_size = opts.chunk_size.max(1);
    let overlap = opts.overlap.min(chunk_size.saturating_sub(1));
    let step = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chunk_id = 0usize;

    while start < total_rows {
        let end = (start + chunk_size).min(total_rows);
        let mut text = String::with_capacity(header.len() + separator.len() + 64);
        text.push_str(header);
        text.push('\n');
        text.push_str(separator);
        text.push('\n');
        for line in &body[start..end] {
            text.push_str(line);
            text.push('\n');
        }

        chunks.push(MarkdownChunk {
            chunk_id,
            start_row: start + 1,
            end_row: end,
            markdown: text,
            total_rows,
        });

        if end == total_rows {
            break;
        }
        start += step;
        chunk_id += 1;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> String {
        let mut s = String::from("| Name | Price |\n| --- | --- |\n");
        for i in 0..rows {
            s.push_str(&format!("| Product {i} | {i} |\n"));
        }
        s
    }

    #[test]
    fn small_table_is_a_single_chunk() {
        let chunks = chunk_markdown(
            &table(10),
            ChunkOptions {
                chunk_size: 50,
                overlap: 5,
            },
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_row, 1);
        assert_eq!(chunks[0].end_row, 10);
        assert_eq!(chunks[0].total_rows, 10);
    }

    #[test]
    fn windows_overlap_by_k_rows() {
        let chunks = chunk_markdown(
            &table(12),
            ChunkOptions {
                chunk_size: 5,
                overlap: 2,
            },
        );
        // [1..5], [4..8], [7..11], [10..12]
        assert_eq!(chunks.len(), 4);
        assert_eq!((chunks[0].start_row, chunks[0].end_row), (1, 5));
        assert_eq!((chunks[1].start_row, chunks[1].end_row), (4, 8));
        assert_eq!((chunks[2].start_row, chunks[2].end_row), (7, 11));
        assert_eq!((chunks[3].start_row, chunks[3].end_row), (10, 12));
    }

    #[test]
    fn every_interior_row_appears_at_least_twice() {
        let chunks = chunk_markdown(
            &table(20),
            ChunkOptions {
                chunk_size: 6,
                overlap: 2,
            },
        );
        for row in 5..=18 {
            let hits = chunks
                .iter()
                .filter(|c| c.start_row <= row && row <= c.end_row)
                .count();
            assert!(hits >= 1, "row {row} missing");
        }
        // Rows inside an overlap window are present in two chunks.
        let seam = chunks[1].start_row;
        let hits = chunks
            .iter()
            .filter(|c| c.start_row <= seam && seam <= c.end_row)
            .count();
        assert_eq!(hits, 2);
    }

    #[test]
    fn each_chunk_carries_the_header() {
        let chunks = chunk_markdown(
            &table(12),
            ChunkOptions {
                chunk_size: 5,
                overlap: 1,
            },
        );
        for chunk in &chunks {
            assert!(chunk.markdown.starts_with("| Name | Price |\n| --- | --- |\n"));
        }
    }

    #[test]
    fn empty_table_yields_no_chunks() {
        assert!(chunk_markdown("", ChunkOptions::default()).is_empty());
        assert!(chunk_markdown("| H |\n| --- |\n", ChunkOptions::default()).is_empty());
    }

    #[test]
    fn degenerate_overlap_is_clamped() {
        let chunks = chunk_markdown(
            &table(10),
            ChunkOptions {
                chunk_size: 3,
                overlap: 10,
            },
        );
        // overlap clamps to chunk_size-1, so the window still advances.
        assert!(chunks.len() >= 2);
        assert!(chunks.last().unwrap().end_row == 10);
    }
}
