// Plain-text extraction for uploaded documents


use lopdf::Document;
use pulldown_cmark::{Parser, html};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::database::FileType;
use crate::{RagError, Result};

/// Converts raw upload bytes into plain text
pub trait TextExtractor {
    fn extract(&self, file_type: FileType, bytes: &[u8]) -> Result<String>;
}

/// Markdown via pulldown-cmark, HTML via scraper, PDF via lopdf
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl TextExtractor for DefaultExtractor {
    #[inline]
    fn extract(&self, file_type: FileType, bytes: &[u8]) -> Result<String> {
        let text = match file_type {
            FileType::Pdf => extract_pdf(bytes)?,
            FileType::Md => extract_markdown(&decode(bytes, "Markdown")?),
            FileType::Html | FileType::Htm => extract_html(&decode(bytes, "HTML")?),
        };

        debug!(
            "Extracted {} characters from {} input",
            text.chars().count(),
            file_type
        );
        Ok(text)
    }
}

fn decode(bytes: &[u8], kind: &str) -> Result<String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| RagError::Extraction(format!("Error extracting {kind} text: {e}")))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

/// Render Markdown to HTML and keep only its text nodes
#[inline]
pub fn extract_markdown(markdown: &str) -> String {
    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, Parser::new(markdown));

    let fragment = Html::parse_fragment(&rendered);
    fragment.root_element().text().collect()
}

/// Visible text of an HTML page with whitespace collapsed.
///
/// Script and style contents are dropped. Each line is trimmed and split on
/// runs of two spaces; the surviving phrases are joined with single spaces.
#[inline]
pub fn extract_html(source: &str) -> String {
    let mut document = Html::parse_document(source);
    remove_elements(&mut document, "script, style");

    let text: String = document.root_element().text().collect();

    text.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn remove_elements(document: &mut Html, selectors: &str) {
    let Ok(selector) = Selector::parse(selectors) else {
        return;
    };

    let node_ids: Vec<_> = document.select(&selector).map(|e| e.id()).collect();
    for node_id in node_ids {
        if let Some(mut node) = document.tree.get_mut(node_id) {
            node.detach();
        }
    }
}

/// Text of every page in order, each followed by a blank line
#[inline]
pub fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let document = Document::load_mem(bytes)
        .map_err(|e| RagError::Extraction(format!("Error extracting PDF text: {e}")))?;

    let pages = document.get_pages();
    let mut text = String::new();

    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => warn!("Skipping unreadable PDF page {}: {}", page_number, e),
        }
        text.push_str("\n\n");
    }

    debug!("Read {} PDF pages", pages.len());
    Ok(text)
}
