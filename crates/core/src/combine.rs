use crate::error::ConvertError;
use crate::models::RetrievedChunk;
use regex::Regex;
use std::collections::HashSet;

/// Removes a wrapping code fence when the parser returned the Markdown
/// inside one (the LLM parser sometimes emits ```markdown ... ```).
pub fn strip_markdown_fence(text: &str) -> Result<String, ConvertError> {
    let opening = Regex::new(r"^```[A-Za-z]*\s*")?;

    let trimmed = text.trim();
    let mut stripped = opening.replace(trimmed, "").to_string();
    if let Some(without_close) = stripped.strip_suffix("```") {
        stripped = without_close.to_string();
    }

    Ok(stripped.trim().to_string())
}

/// Combines retrieved chunks into one document, dropping lines already seen
/// in an earlier chunk. Chunk overlap makes neighbouring chunks repeat each
/// other's boundary lines; comparison is on the trimmed line so indentation
/// differences do not defeat the match. Blank lines are kept as-is.
pub fn combine_chunks(chunks: &[RetrievedChunk]) -> Result<String, ConvertError> {
    let mut all_lines: Vec<String> = Vec::new();
    let mut seen_lines: HashSet<String> = HashSet::new();

    for chunk in chunks {
        let text = strip_markdown_fence(&chunk.text)?;
        if text.is_empty() {
            continue;
        }

        for line in text.split('\n') {
            let normalized = line.trim();
            if normalized.is_empty() {
                all_lines.push(line.to_string());
                continue;
            }
            if seen_lines.contains(normalized) {
                continue;
            }
            seen_lines.insert(normalized.to_string());
            all_lines.push(line.to_string());
        }
    }

    Ok(all_lines.join("\n"))
}

/// Joins per-window Markdown for a split PDF, marking each window with an
/// HTML comment so page provenance survives in the combined output.
pub fn join_window_markdown(parts: &[String]) -> String {
    parts
        .iter()
        .enumerate()
        .map(|(position, markdown)| format!("<!-- Page chunk {} -->\n{}", position + 1, markdown))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            index,
            source_uri: "gs://bucket/doc.pdf".to_string(),
            text: text.to_string(),
            distance: None,
        }
    }

    #[test]
    fn overlapping_lines_appear_once() {
        let chunks = vec![
            chunk(1, "# Title\nshared boundary line\nonly in first"),
            chunk(2, "shared boundary line\nonly in second"),
        ];

        let combined = combine_chunks(&chunks).unwrap();
        assert_eq!(
            combined,
            "# Title\nshared boundary line\nonly in first\nonly in second"
        );
    }

    #[test]
    fn blank_lines_are_preserved_and_never_deduplicated() {
        let chunks = vec![chunk(1, "a\n\nb\n\nc")];
        assert_eq!(combine_chunks(&chunks).unwrap(), "a\n\nb\n\nc");
    }

    #[test]
    fn dedup_compares_trimmed_lines_but_keeps_original_indentation() {
        let chunks = vec![chunk(1, "  indented line"), chunk(2, "indented line")];
        assert_eq!(combine_chunks(&chunks).unwrap(), "  indented line");
    }

    #[test]
    fn markdown_fences_are_stripped_before_combining() {
        let chunks = vec![chunk(1, "```markdown\n# Heading\ntext\n```")];
        assert_eq!(combine_chunks(&chunks).unwrap(), "# Heading\ntext");
    }

    #[test]
    fn bare_fence_is_also_stripped() {
        assert_eq!(strip_markdown_fence("```\nbody\n```").unwrap(), "body");
    }

    #[test]
    fn fence_only_chunk_contributes_nothing() {
        let chunks = vec![chunk(1, "```markdown\n```"), chunk(2, "real content")];
        assert_eq!(combine_chunks(&chunks).unwrap(), "real content");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(combine_chunks(&[]).unwrap(), "");
    }

    #[test]
    fn window_parts_are_marked_and_separated() {
        let parts = vec!["first".to_string(), "second".to_string()];
        assert_eq!(
            join_window_markdown(&parts),
            "<!-- Page chunk 1 -->\nfirst\n\n---\n\n<!-- Page chunk 2 -->\nsecond"
        );
    }
}
