//! Cell preview pane rendering.
//!
//! Given a raw cell value and a requested format, produce the text the side
//! panel shows plus a language tag for styling. Auto-detection priority:
//! NULL > binary > JSON (valid parse) > XML (balanced root tag) > plain.

use crate::resultset::CellValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewFormat {
    Auto,
    Json,
    Xml,
    Plain,
}

impl PreviewFormat {
    pub fn label(&self) -> &'static str {
        match self {
            PreviewFormat::Auto => "auto",
            PreviewFormat::Json => "json",
            PreviewFormat::Xml => "xml",
            PreviewFormat::Plain => "plain",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            PreviewFormat::Auto => PreviewFormat::Json,
            PreviewFormat::Json => PreviewFormat::Xml,
            PreviewFormat::Xml => PreviewFormat::Plain,
            PreviewFormat::Plain => PreviewFormat::Auto,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preview {
    pub content: String,
    pub language: &'static str,
    pub error: Option<String>,
}

impl Preview {
    fn plain(content: String) -> Self {
        Self { content, language: "plain", error: None }
    }
}

pub fn render_preview(value: &CellValue, format: PreviewFormat) -> Preview {
    match value {
        CellValue::Null => Preview::plain("NULL".to_string()),
        CellValue::Bytes(bytes) => Preview {
            content: hex_dump(bytes),
            language: "hex",
            error: None,
        },
        CellValue::Bool(_) | CellValue::Number(_) => Preview::plain(value.plain_text()),
        CellValue::Text(text) => match format {
            PreviewFormat::Auto => auto_preview(text),
            PreviewFormat::Json => json_preview(text),
            PreviewFormat::Xml => xml_preview(text),
            PreviewFormat::Plain => Preview::plain(text.clone()),
        },
    }
}

fn auto_preview(text: &str) -> Preview {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(text) {
        // scalars parse as JSON too; only promote containers
        if parsed.is_object() || parsed.is_array() {
            return Preview {
                content: serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| text.to_string()),
                language: "json",
                error: None,
            };
        }
    }
    if has_balanced_root_tag(text) {
        return Preview { content: text.to_string(), language: "xml", error: None };
    }
    Preview::plain(text.to_string())
}

fn json_preview(text: &str) -> Preview {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(parsed) => Preview {
            content: serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| text.to_string()),
            language: "json",
            error: None,
        },
        Err(e) => Preview {
            content: text.to_string(),
            language: "plain",
            error: Some(format!("not valid JSON: {}", e)),
        },
    }
}

fn xml_preview(text: &str) -> Preview {
    if has_balanced_root_tag(text) {
        Preview { content: text.to_string(), language: "xml", error: None }
    } else {
        Preview {
            content: text.to_string(),
            language: "plain",
            error: Some("no balanced root tag".to_string()),
        }
    }
}

/// Cheap structural check: `<root ...> ... </root>` (or a self-closing
/// root). Not a validator; just enough for format auto-detection.
fn has_balanced_root_tag(text: &str) -> bool {
    let trimmed = text.trim();
    if !trimmed.starts_with('<') || !trimmed.ends_with('>') {
        return false;
    }
    // skip an XML declaration if present
    let body = if trimmed.starts_with("<?") {
        match trimmed.find("?>") {
            Some(end) => trimmed[end + 2..].trim_start(),
            None => return false,
        }
    } else {
        trimmed
    };
    if !body.starts_with('<') {
        return false;
    }
    let name: String = body[1..]
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':' || *c == '-')
        .collect();
    if name.is_empty() {
        return false;
    }
    if body.ends_with("/>") && !body[1..].contains('<') {
        return true;
    }
    body.trim_end().ends_with(&format!("</{}>", name))
}

fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<47}  {}\n", i * 16, hex.join(" "), ascii));
    }
    out
}
