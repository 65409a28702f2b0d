use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Rows per chunk when nothing else is configured.
pub const DEFAULT_ROWS_PER_CHUNK: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pages,
    Links,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pages => "pages",
            FileType::Links => "links",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A header-prefixed slice of a CSV file's data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub file_type: FileType,
    pub index: usize,
    pub total_chunks: usize,
    pub is_first: bool,
    pub is_last: bool,
    pub row_count: usize,
    pub payload: String,
}

impl Chunk {
    /// Name of the multipart file part, e.g. `pages_chunk_0.csv`.
    pub fn file_name(&self) -> String {
        format!("{}_chunk_{}.csv", self.file_type, self.index)
    }
}

/// Splits CSV text into chunks of at most `rows_per_chunk` data rows, each
/// carrying the original header line.
///
/// Blank lines are dropped. A file without data rows yields no chunks.
pub fn encode(file_type: FileType, content: &str, rows_per_chunk: NonZeroUsize) -> Vec<Chunk> {
    let mut lines = content.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    let rows: Vec<&str> = lines.filter(|line| !line.trim().is_empty()).collect();
    let total_chunks = rows.len().div_ceil(rows_per_chunk.get());

    rows.chunks(rows_per_chunk.get())
        .enumerate()
        .map(|(index, group)| {
            let mut payload = String::with_capacity(
                header.len() + 1 + group.iter().map(|row| row.len() + 1).sum::<usize>(),
            );
            payload.push_str(header);
            payload.push('\n');
            payload.push_str(&group.join("\n"));

            Chunk {
                file_type,
                index,
                total_chunks,
                is_first: index == 0,
                is_last: index + 1 == total_chunks,
                row_count: group.len(),
                payload,
            }
        })
        .collect()
}
