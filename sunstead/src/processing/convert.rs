//! Mime-specific conversion of fetched document bytes to plain text.

use pulldown_cmark::{Event, Parser};

use crate::error::{Result, SunsteadError};
use crate::models::SourceMime;

/// Convert raw document bytes to plain text per mime kind.
///
/// Google Docs arrive already exported as plain text by the source client,
/// so they pass through with the plain-text path.
pub fn convert_to_text(mime: SourceMime, raw: &[u8]) -> Result<String> {
    match mime {
        SourceMime::PlainText | SourceMime::GoogleDoc => decode_utf8(raw),
        SourceMime::Markdown => {
            let source = decode_utf8(raw)?;
            Ok(markdown_to_text(&source))
        }
        SourceMime::Html => {
            let source = decode_utf8(raw)?;
            html2text::from_read(source.as_bytes(), 100)
                .map_err(|e| SunsteadError::Sync(format!("HTML conversion failed: {e}")))
        }
        SourceMime::Pdf => pdf_extract::extract_text_from_mem(raw)
            .map_err(|e| SunsteadError::Sync(format!("PDF extraction failed: {e}"))),
    }
}

fn decode_utf8(raw: &[u8]) -> Result<String> {
    Ok(String::from_utf8_lossy(raw).into_owned())
}

/// Flatten markdown to readable text, keeping the prose and dropping the
/// markup.
fn markdown_to_text(source: &str) -> String {
    let mut out = String::with_capacity(source.len());

    for event in Parser::new(source) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(_) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }

    out.trim().to_string()
}
