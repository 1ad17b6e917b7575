pub mod auth;
pub mod combine;
pub mod error;
pub mod markdown;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod services;
pub mod traits;

pub use combine::{combine_chunks, join_window_markdown, strip_markdown_fence};
pub use error::{ConvertError, ServiceError};
pub use markdown::document_to_markdown;
pub use models::{
    CorpusInfo, DocumentFormat, ImportOptions, LayoutOptions, PageWindow, ProcessorInfo,
    RagFileInfo, RetrievalOptions, RetrievedChunk, SourceFingerprint, DEFAULT_PARSING_PROMPT,
};
pub use pagination::{page_count, plan_windows, split_pdf, SplitPlan};
pub use pipeline::{
    convert_file, digest_file, discover_documents, output_path, retrieve_markdown, Conversion,
};
pub use services::{GcsClient, LayoutClient, RagClient, ONLINE_REQUEST_LIMIT_BYTES};
pub use traits::{ChunkRetriever, LayoutProcessor};
