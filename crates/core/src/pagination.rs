use crate::error::ConvertError;
use crate::models::{LayoutOptions, PageWindow};
use lopdf::Document;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// Outcome of splitting a PDF. When no split was needed the plan holds the
/// original path and a single window; otherwise `temp_dir` owns the written
/// sub-PDFs and must stay alive while they are in use.
pub struct SplitPlan {
    pub windows: Vec<PageWindow>,
    pub paths: Vec<PathBuf>,
    temp_dir: Option<TempDir>,
}

impl SplitPlan {
    pub fn was_split(&self) -> bool {
        self.temp_dir.is_some()
    }

    pub fn parts(&self) -> impl Iterator<Item = (&PageWindow, &PathBuf)> {
        self.windows.iter().zip(self.paths.iter())
    }
}

pub fn page_count(path: &Path) -> Result<u32, ConvertError> {
    let document =
        Document::load(path).map_err(|error| ConvertError::PdfParse(error.to_string()))?;
    Ok(document.get_pages().len() as u32)
}

/// Plans contiguous fixed-size page windows over `1..=total_pages`. The last
/// window may be short; every page lands in exactly one window.
pub fn plan_windows(total_pages: u32, max_pages: u32) -> Result<Vec<PageWindow>, ConvertError> {
    if max_pages == 0 {
        return Err(ConvertError::InvalidWindowConfig(
            "max pages per window must be at least 1".to_string(),
        ));
    }

    let mut windows = Vec::new();
    let mut start = 1u32;
    while start <= total_pages {
        let end = (start + max_pages - 1).min(total_pages);
        windows.push(PageWindow {
            index: windows.len(),
            start,
            end,
        });
        start = end + 1;
    }

    Ok(windows)
}

/// Splits a PDF into page-window sub-documents when it exceeds the split
/// threshold. The source file is never touched.
pub fn split_pdf(path: &Path, options: &LayoutOptions) -> Result<SplitPlan, ConvertError> {
    let document =
        Document::load(path).map_err(|error| ConvertError::PdfParse(error.to_string()))?;
    let total_pages = document.get_pages().len() as u32;

    if total_pages <= options.split_threshold {
        return Ok(SplitPlan {
            windows: vec![PageWindow {
                index: 0,
                start: 1,
                end: total_pages.max(1),
            }],
            paths: vec![path.to_path_buf()],
            temp_dir: None,
        });
    }

    let windows = plan_windows(total_pages, options.max_pages_per_request)?;
    let temp_dir = TempDir::new()?;
    let mut paths = Vec::with_capacity(windows.len());

    for window in &windows {
        let mut part = document.clone();
        let delete: Vec<u32> = (1..=total_pages)
            .filter(|page| *page < window.start || *page > window.end)
            .collect();
        part.delete_pages(&delete);
        part.prune_objects();

        let part_path = temp_dir
            .path()
            .join(format!("window-{}-{}.pdf", window.index, Uuid::new_v4()));
        part.save(&part_path)
            .map_err(|error| ConvertError::PdfParse(error.to_string()))?;
        paths.push(part_path);
    }

    Ok(SplitPlan {
        windows,
        paths,
        temp_dir: Some(temp_dir),
    })
}
