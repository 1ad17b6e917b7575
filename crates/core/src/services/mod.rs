mod gcs;
mod layout;
mod rag;

pub use gcs::GcsClient;
pub use layout::{LayoutClient, ONLINE_REQUEST_LIMIT_BYTES};
pub use rag::RagClient;
