use serde_json::Value;

/// Renders a Document AI layout response into Markdown. Falls back to the
/// raw document text when no structured blocks produced output.
pub fn document_to_markdown(response: &Value) -> String {
    let blocks = response
        .pointer("/document/documentLayout/blocks")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut parts = Vec::new();
    for block in &blocks {
        let rendered = render_block(block);
        if !rendered.is_empty() {
            parts.push(rendered);
        }
    }

    if parts.is_empty() {
        if let Some(text) = response
            .pointer("/document/text")
            .and_then(Value::as_str)
        {
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }

    parts.join("\n\n")
}

fn render_block(block: &Value) -> String {
    if let Some(text_block) = block.get("textBlock") {
        return render_text_block(text_block);
    }
    if let Some(table) = block.get("tableBlock") {
        return render_table_block(table);
    }
    if let Some(list) = block.get("listBlock") {
        return render_list_block(list);
    }
    String::new()
}

fn render_text_block(text_block: &Value) -> String {
    let text = text_block
        .pointer("/text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let block_type = text_block
        .pointer("/type")
        .and_then(Value::as_str)
        .unwrap_or("paragraph");

    let mut parts = Vec::new();
    let heading = match block_type {
        "heading-1" => Some("#"),
        "heading-2" => Some("##"),
        "heading-3" => Some("###"),
        _ => None,
    };

    match heading {
        Some(marker) => parts.push(format!("{marker} {text}")),
        None => parts.push(text.to_string()),
    }

    if let Some(children) = text_block.pointer("/blocks").and_then(Value::as_array) {
        for child in children {
            let rendered = render_block(child);
            if !rendered.is_empty() {
                parts.push(rendered);
            }
        }
    }

    parts.join("\n\n")
}

fn render_table_block(table: &Value) -> String {
    let mut rows = Vec::new();

    let header_rows = table
        .pointer("/headerRows")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for row in &header_rows {
        rows.push(render_table_row(row));
    }

    if let Some(first_header) = header_rows.first() {
        let columns = first_header
            .pointer("/cells")
            .and_then(Value::as_array)
            .map(|cells| cells.len())
            .unwrap_or(0);
        rows.push(format!("| {} |", vec!["---"; columns].join(" | ")));
    }

    if let Some(body_rows) = table.pointer("/bodyRows").and_then(Value::as_array) {
        for row in body_rows {
            rows.push(render_table_row(row));
        }
    }

    rows.join("\n")
}

fn render_table_row(row: &Value) -> String {
    let cells = row
        .pointer("/cells")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let rendered: Vec<String> = cells.iter().map(cell_text).collect();
    format!("| {} |", rendered.join(" | "))
}

fn cell_text(cell: &Value) -> String {
    let mut text = String::new();
    if let Some(blocks) = cell.pointer("/blocks").and_then(Value::as_array) {
        for block in blocks {
            if let Some(value) = block.pointer("/textBlock/text").and_then(Value::as_str) {
                text.push_str(value);
            }
        }
    }
    text
}

fn render_list_block(list: &Value) -> String {
    let list_type = list
        .pointer("/type")
        .and_then(Value::as_str)
        .unwrap_or("unordered");

    let entries = list
        .pointer("/listEntries")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut items = Vec::new();
    for (position, entry) in entries.iter().enumerate() {
        let mut text = String::new();
        if let Some(blocks) = entry.pointer("/blocks").and_then(Value::as_array) {
            for block in blocks {
                if let Some(value) = block.pointer("/textBlock/text").and_then(Value::as_str) {
                    text.push_str(value);
                }
            }
        }

        if list_type == "ordered" {
            items.push(format!("{}. {}", position + 1, text));
        } else {
            items.push(format!("- {text}"));
        }
    }

    items.join("\n")
}

#[cfg(test)]
mod tests {
    use super::document_to_markdown;
    use serde_json::json;

    #[test]
    fn headings_map_to_markdown_levels() {
        let response = json!({
            "document": {
                "documentLayout": {
                    "blocks": [
                        {"textBlock": {"text": "Title", "type": "heading-1"}},
                        {"textBlock": {"text": "Section", "type": "heading-2"}},
                        {"textBlock": {"text": "Sub", "type": "heading-3"}},
                        {"textBlock": {"text": "Body text.", "type": "paragraph"}}
                    ]
                }
            }
        });

        let markdown = document_to_markdown(&response);
        assert_eq!(markdown, "# Title\n\n## Section\n\n### Sub\n\nBody text.");
    }

    #[test]
    fn nested_blocks_are_rendered_after_their_parent() {
        let response = json!({
            "document": {
                "documentLayout": {
                    "blocks": [
                        {"textBlock": {
                            "text": "Outer",
                            "type": "heading-1",
                            "blocks": [
                                {"textBlock": {"text": "Inner", "type": "paragraph"}}
                            ]
                        }}
                    ]
                }
            }
        });

        let markdown = document_to_markdown(&response);
        assert_eq!(markdown, "# Outer\n\nInner");
    }

    #[test]
    fn tables_render_with_separator_from_header_width() {
        let response = json!({
            "document": {
                "documentLayout": {
                    "blocks": [
                        {"tableBlock": {
                            "headerRows": [
                                {"cells": [
                                    {"blocks": [{"textBlock": {"text": "Name"}}]},
                                    {"blocks": [{"textBlock": {"text": "Value"}}]}
                                ]}
                            ],
                            "bodyRows": [
                                {"cells": [
                                    {"blocks": [{"textBlock": {"text": "a"}}]},
                                    {"blocks": [{"textBlock": {"text": "1"}}]}
                                ]}
                            ]
                        }}
                    ]
                }
            }
        });

        let markdown = document_to_markdown(&response);
        assert_eq!(
            markdown,
            "| Name | Value |\n| --- | --- |\n| a | 1 |"
        );
    }

    #[test]
    fn ordered_lists_number_entries_by_position() {
        let response = json!({
            "document": {
                "documentLayout": {
                    "blocks": [
                        {"listBlock": {
                            "type": "ordered",
                            "listEntries": [
                                {"blocks": [{"textBlock": {"text": "first"}}]},
                                {"blocks": [{"textBlock": {"text": "second"}}]}
                            ]
                        }}
                    ]
                }
            }
        });

        assert_eq!(document_to_markdown(&response), "1. first\n2. second");
    }

    #[test]
    fn unordered_lists_use_dashes() {
        let response = json!({
            "document": {
                "documentLayout": {
                    "blocks": [
                        {"listBlock": {
                            "listEntries": [
                                {"blocks": [{"textBlock": {"text": "one"}}]}
                            ]
                        }}
                    ]
                }
            }
        });

        assert_eq!(document_to_markdown(&response), "- one");
    }

    #[test]
    fn falls_back_to_raw_text_without_layout_blocks() {
        let response = json!({
            "document": {"text": "plain extracted text"}
        });

        assert_eq!(document_to_markdown(&response), "plain extracted text");
    }

    #[test]
    fn empty_response_produces_empty_string() {
        let response = json!({});
        assert_eq!(document_to_markdown(&response), "");
    }
}
