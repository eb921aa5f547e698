//! Pure extraction stages over rendered HTML.
//!
//! Each stage is a standalone function `&RenderedPage -> ExtractionResult`
//! so it can be unit-tested without a renderer. The chain in the parent
//! module decides which stage's output stands.

use crate::models::ExtractionResult;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::RenderedPage;

/// A stage result below this many characters sends the chain to the next
/// stage.
pub const MIN_BODY_CHARS: usize = 100;

/// Paragraphs and sub-headings at or under this length are noise
/// (bylines, share buttons, timestamps) and are dropped.
const MIN_BLOCK_CHARS: usize = 20;

/// Class names that mark a content area on the sites we crawl.
static CONTENT_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("entry-content|post-content|article-content").unwrap());

/// Readability pass: the whole-page content extraction that handles the
/// common case. Yields both a body and the page metadata title.
pub fn readability_pass(page: &RenderedPage) -> ExtractionResult {
    match readability::extractor::extract(&mut page.html.as_bytes(), &page.url) {
        Ok(product) => ExtractionResult {
            title: product.title.trim().to_string(),
            body: product.text.trim().to_string(),
        },
        Err(_) => ExtractionResult::default(),
    }
}

/// Structural pass: find an `article` landmark or a content-area element by
/// class, drop non-content subtrees, and join the substantial paragraphs
/// and sub-headings.
pub fn structural_pass(page: &RenderedPage) -> ExtractionResult {
    let document = Html::parse_document(&page.html);
    let Some(container) = find_content_container(&document) else {
        return ExtractionResult::default();
    };

    let blocks = Selector::parse("p, h2, h3").unwrap();
    let kept: Vec<String> = container
        .select(&blocks)
        .filter(|el| !in_skipped_subtree(el, &container))
        .map(|el| element_text(&el))
        .filter(|t| t.chars().count() > MIN_BLOCK_CHARS)
        .collect();

    ExtractionResult {
        title: String::new(),
        body: kept.join("\n\n"),
    }
}

/// Last-resort pass: every paragraph on the page, same length floor.
pub fn all_paragraphs_pass(page: &RenderedPage) -> ExtractionResult {
    let document = Html::parse_document(&page.html);
    let paragraphs = Selector::parse("p").unwrap();
    let kept: Vec<String> = document
        .select(&paragraphs)
        .map(|el| element_text(&el))
        .filter(|t| t.chars().count() > MIN_BLOCK_CHARS)
        .collect();

    ExtractionResult {
        title: String::new(),
        body: kept.join("\n\n"),
    }
}

/// The page's `<title>` element text, used when no stage produced a title.
pub fn html_title(page: &RenderedPage) -> Option<String> {
    let document = Html::parse_document(&page.html);
    let title = Selector::parse("title").unwrap();
    document
        .select(&title)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

/// First `article` element, else the first element whose class list matches
/// the content-area pattern.
fn find_content_container(document: &Html) -> Option<ElementRef<'_>> {
    let article = Selector::parse("article").unwrap();
    if let Some(el) = document.select(&article).next() {
        return Some(el);
    }

    let classed = Selector::parse("[class]").unwrap();
    document.select(&classed).find(|el| {
        el.value()
            .attr("class")
            .is_some_and(|c| CONTENT_CLASS_RE.is_match(c))
    })
}

/// True when the element sits under a non-content subtree within the
/// container (navigation, chrome, embedded scripts).
fn in_skipped_subtree(el: &ElementRef, container: &ElementRef) -> bool {
    el.ancestors()
        .take_while(|node| node.id() != container.id())
        .filter_map(ElementRef::wrap)
        .any(|a| {
            matches!(
                a.value().name(),
                "script" | "style" | "nav" | "aside" | "header" | "footer"
            )
        })
}

/// Element text with whitespace collapsed.
fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}
