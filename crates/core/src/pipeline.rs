use crate::combine::{combine_chunks, join_window_markdown};
use crate::error::ConvertError;
use crate::markdown::document_to_markdown;
use crate::models::{DocumentFormat, LayoutOptions, RetrievalOptions, SourceFingerprint};
use crate::pagination::split_pdf;
use crate::traits::{ChunkRetriever, LayoutProcessor};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct Conversion {
    pub markdown: String,
    pub fingerprint: SourceFingerprint,
    pub window_count: usize,
}

/// Converts one local document to Markdown. PDFs above the split threshold
/// are paginated into fixed page windows submitted one at a time; everything
/// else goes through a single online request.
pub async fn convert_file(
    path: &Path,
    processor: &impl LayoutProcessor,
    options: &LayoutOptions,
) -> Result<Conversion, ConvertError> {
    let format = DocumentFormat::from_path(path);
    if !format.is_supported() {
        return Err(ConvertError::InvalidArgument(format!(
            "unsupported document format: {}",
            path.display()
        )));
    }

    let fingerprint = build_fingerprint(path)?;

    if format == DocumentFormat::Pdf {
        let plan = split_pdf(path, options)?;
        if plan.was_split() {
            let mut parts = Vec::with_capacity(plan.windows.len());
            for (_window, part_path) in plan.parts() {
                let content = fs::read(part_path)?;
                let response = processor.process(&content, format.mime_type()).await?;
                parts.push(document_to_markdown(&response));
            }

            return Ok(Conversion {
                markdown: join_window_markdown(&parts),
                fingerprint,
                window_count: parts.len(),
            });
        }
    }

    let content = fs::read(path)?;
    let response = processor.process(&content, format.mime_type()).await?;

    Ok(Conversion {
        markdown: document_to_markdown(&response),
        fingerprint,
        window_count: 1,
    })
}

/// Pulls every retrievable chunk out of a corpus and reassembles them into
/// one deduplicated Markdown document.
pub async fn retrieve_markdown(
    retriever: &impl ChunkRetriever,
    options: &RetrievalOptions,
) -> Result<String, ConvertError> {
    let chunks = retriever.retrieve(options).await?;
    combine_chunks(&chunks)
}

pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if DocumentFormat::from_path(entry.path()).is_supported() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn output_path(source: &Path) -> PathBuf {
    source.with_extension("md")
}

pub fn digest_file(path: &Path) -> Result<String, ConvertError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn build_fingerprint(path: &Path) -> Result<SourceFingerprint, ConvertError> {
    let checksum = digest_file(path)?;
    let byte_size = fs::metadata(path)?.len();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ConvertError::MissingFileName(format!("path missing filename: {}", path.display()))
        })?;

    Ok(SourceFingerprint {
        source_path: path.to_string_lossy().to_string(),
        file_name: file_name.to_string(),
        checksum,
        byte_size,
        converted_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::models::RetrievedChunk;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    struct FakeProcessor {
        response: Value,
    }

    #[async_trait]
    impl LayoutProcessor for FakeProcessor {
        async fn process(&self, _content: &[u8], _mime: &str) -> Result<Value, ServiceError> {
            Ok(self.response.clone())
        }
    }

    struct FakeRetriever {
        chunks: Vec<RetrievedChunk>,
    }

    #[async_trait]
    impl ChunkRetriever for FakeRetriever {
        async fn retrieve(
            &self,
            _options: &RetrievalOptions,
        ) -> Result<Vec<RetrievedChunk>, ServiceError> {
            Ok(self.chunks.clone())
        }
    }

    #[tokio::test]
    async fn non_pdf_documents_are_converted_in_one_request() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "<h1>hello</h1>").unwrap();

        let processor = FakeProcessor {
            response: json!({
                "document": {
                    "documentLayout": {
                        "blocks": [
                            {"textBlock": {"text": "hello", "type": "heading-1"}}
                        ]
                    }
                }
            }),
        };

        let conversion = convert_file(&path, &processor, &LayoutOptions::default())
            .await
            .expect("conversion should succeed");

        assert_eq!(conversion.markdown, "# hello");
        assert_eq!(conversion.window_count, 1);
        assert_eq!(conversion.fingerprint.file_name, "page.html");
        assert!(!conversion.fingerprint.checksum.is_empty());
    }

    #[tokio::test]
    async fn unsupported_format_is_rejected_before_any_request() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, b"binary").unwrap();

        let processor = FakeProcessor { response: json!({}) };
        let result = convert_file(&path, &processor, &LayoutOptions::default()).await;
        assert!(matches!(result, Err(ConvertError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn retrieval_markdown_is_deduplicated() {
        let retriever = FakeRetriever {
            chunks: vec![
                RetrievedChunk {
                    index: 1,
                    source_uri: "gs://b/a.pdf".to_string(),
                    text: "# Doc\nshared".to_string(),
                    distance: None,
                },
                RetrievedChunk {
                    index: 2,
                    source_uri: "gs://b/a.pdf".to_string(),
                    text: "shared\ntail".to_string(),
                    distance: None,
                },
            ],
        };

        let markdown = retrieve_markdown(&retriever, &RetrievalOptions::default())
            .await
            .unwrap();
        assert_eq!(markdown, "# Doc\nshared\ntail");
    }

    #[test]
    fn discovery_is_recursive_and_skips_unsupported_files() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();

        File::create(dir.path().join("a.pdf"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))
            .unwrap();
        File::create(nested.join("b.docx"))
            .and_then(|mut file| file.write_all(b"fake"))
            .unwrap();
        File::create(nested.join("notes.bin"))
            .and_then(|mut file| file.write_all(b"fake"))
            .unwrap();

        let files = discover_documents(dir.path());
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn output_path_swaps_extension_for_md() {
        assert_eq!(
            output_path(Path::new("/tmp/report.xlsx")),
            PathBuf::from("/tmp/report.md")
        );
    }

    #[test]
    fn checksum_is_reproducible() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"abc").unwrap();

        assert_eq!(digest_file(&path).unwrap(), digest_file(&path).unwrap());
    }
}
