use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Pptx,
    Xlsx,
    Xlsm,
    Html,
    Png,
    Jpeg,
    Tiff,
    Gif,
    Other,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "pptx" => Self::Pptx,
            "xlsx" => Self::Xlsx,
            "xlsm" => Self::Xlsm,
            "html" => Self::Html,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "tiff" => Self::Tiff,
            "gif" => Self::Gif,
            _ => Self::Other,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xlsm => "application/vnd.ms-excel.sheet.macroenabled.12",
            Self::Html => "text/html",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
            Self::Gif => "image/gif",
            Self::Other => "application/octet-stream",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// One fragment of parsed document text returned by the retrieval interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub index: usize,
    pub source_uri: String,
    pub text: String,
    pub distance: Option<f64>,
}

/// A contiguous 1-based inclusive page range submitted as one sub-request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageWindow {
    pub index: usize,
    pub start: u32,
    pub end: u32,
}

impl PageWindow {
    pub fn page_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFingerprint {
    pub source_path: String,
    pub file_name: String,
    pub checksum: String,
    pub byte_size: u64,
    pub converted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    /// Pages per online request once a document is split.
    pub max_pages_per_request: u32,
    /// Page count above which a PDF is split before submission.
    pub split_threshold: u32,
    pub request_timeout_secs: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            max_pages_per_request: 25,
            split_threshold: 30,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub model_id: String,
    pub custom_parsing_prompt: String,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub max_parsing_requests_per_min: u32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            model_id: "gemini-2.0-flash".to_string(),
            custom_parsing_prompt: DEFAULT_PARSING_PROMPT.to_string(),
            // Largest accepted chunk size; overlap stays minimal because the
            // chunks are recombined into one document afterwards.
            chunk_size: 4096,
            chunk_overlap: 100,
            max_parsing_requests_per_min: 60,
        }
    }
}

pub const DEFAULT_PARSING_PROMPT: &str = "Convert this document to well-structured markdown.
Preserve all:
- Headings and hierarchy
- Tables (use markdown table format)
- Lists and bullet points
- Code blocks
- Important formatting

Output clean, readable markdown only.";

#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub query: String,
    pub top_k: usize,
    pub vector_distance_threshold: f64,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            // A single space acts as a broad match so retrieval returns the
            // whole corpus rather than a semantic neighborhood.
            query: " ".to_string(),
            top_k: 50,
            vector_distance_threshold: 10.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessorInfo {
    pub name: String,
    pub processor_id: String,
    pub display_name: String,
    pub processor_type: String,
    pub state: String,
}

#[derive(Debug, Clone)]
pub struct CorpusInfo {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct RagFileInfo {
    pub name: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_detected_from_extension_case_insensitively() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.PDF")), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path(Path::new("b.Docx")), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_path(Path::new("c.jpeg")), DocumentFormat::Jpeg);
        assert_eq!(DocumentFormat::from_path(Path::new("d.jpg")), DocumentFormat::Jpeg);
        assert_eq!(DocumentFormat::from_path(Path::new("noext")), DocumentFormat::Other);
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        let format = DocumentFormat::from_path(Path::new("archive.zip"));
        assert_eq!(format.mime_type(), "application/octet-stream");
        assert!(!format.is_supported());
    }

    #[test]
    fn window_page_count_is_inclusive() {
        let window = PageWindow { index: 0, start: 1, end: 25 };
        assert_eq!(window.page_count(), 25);
    }
}
