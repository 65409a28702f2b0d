pub mod chunker;
pub mod orchestrator;

pub use chunker::{encode, Chunk, FileType, DEFAULT_ROWS_PER_CHUNK};
pub use orchestrator::{
    ChunkProgress, SelectedFiles, UploadFile, UploadReport, UploadSummary, Uploader,
};
