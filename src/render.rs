//! Minimal HTML page writer.
//!
//! Only as much rendering as the index needs: classified text, declaration
//! anchors, highlight classes, and links. `position` reports the byte offset
//! the next range will be written at, which the declaration redirect stores.

use std::path::Path;

use crate::error::Error;
use crate::escape::{escape_html, escape_html_text};
use crate::identity;
use crate::resolver;
use crate::types::{ClassifiedRange, Link};

/// Generated page of one document.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    /// Page text so far.
    buffer: String,
}

impl HtmlPage {
    /// Start a page titled with the document path. The body carries the
    /// path id the search server keys documents by.
    pub fn begin(assembly: &str, path: &str) -> Self {
        let title = escape_html_text(&format!("{assembly}/{path}"));
        let document = identity::path_id(path);
        let buffer = format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body data-document=\"{document}\"><pre id=\"code\">"
        );
        return Self { buffer };
    }

    /// Byte offset at which the next range starts.
    pub fn position(&self) -> u64 {
        return u64::try_from(self.buffer.len()).unwrap_or(u64::MAX);
    }

    /// Append one range, wrapped according to its classification and link.
    pub fn write_range(&mut self, range: &ClassifiedRange, link: Option<&Link>) {
        let text = escape_html_text(&range.text);
        let class = range.classification.as_ref().map(|classification| return classification.css_class());
        match link {
            Some(Link::Declaration { glyph, href, id }) => {
                self.buffer.push_str(&format!("<a id=\"{id}\" href=\"{}\"", escape_html(href)));
                if let Some(glyph) = glyph {
                    self.buffer.push_str(&format!(" data-glyph=\"{},{}\"", glyph.glyph, glyph.depth));
                }
                self.push_class(class);
                self.buffer.push_str(&format!(">{text}</a>"));
            },
            Some(Link::Highlight { is_definition, sequence }) => {
                let role = if *is_definition { " rd" } else { "" };
                let base = class.unwrap_or("i");
                self.buffer.push_str(&format!("<span class=\"{base} r{sequence}{role}\">{text}</span>"));
            },
            Some(Link::Reference { href, title }) => {
                self.buffer.push_str(&format!("<a href=\"{}\"", escape_html(href)));
                if let Some(title) = title {
                    self.buffer.push_str(&format!(" title=\"{}\"", escape_html(title)));
                }
                self.push_class(class);
                self.buffer.push_str(&format!(">{text}</a>"));
            },
            None => match class {
                Some(class) => self.buffer.push_str(&format!("<span class=\"{class}\">{text}</span>")),
                None => self.buffer.push_str(&text),
            },
        }
    }

    fn push_class(&mut self, class: Option<&str>) {
        if let Some(class) = class {
            self.buffer.push_str(&format!(" class=\"{class}\""));
        }
    }

    /// Close the page and return its text.
    pub fn finish(mut self) -> String {
        self.buffer.push_str("</pre></body></html>\n");
        return self.buffer;
    }
}

/// Page for a document whose frontend failed: the raw text, unlinked.
pub fn plain_page(assembly: &str, path: &str, text: &str) -> String {
    let mut page = HtmlPage::begin(assembly, path);
    page.buffer.push_str(&escape_html_text(text));
    return page.finish();
}

/// Write a page to `<root>/<assembly>/<path>.html`.
///
/// # Errors
///
/// Returns `Error::Io` if the page or its folders cannot be written.
pub fn write_page(root: &Path, assembly: &str, path: &str, content: &str) -> Result<(), Error> {
    let target = root.join(resolver::page_url(assembly, path));
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, content)?;
    return Ok(());
}
