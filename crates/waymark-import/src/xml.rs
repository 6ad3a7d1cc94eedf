//! Owned element tree over `roxmltree`.
//!
//! The importer walks documents in slices across many calls, so it cannot
//! hold a borrowed `roxmltree::Document`. Parsing copies the element
//! structure into [`Element`] values: tag name, attributes in document
//! order and the 1-based source line. Text and comments are dropped.

use roxmltree::{Document as XmlDocument, Node, ParsingOptions};

use crate::errors::{ImportError, Result};

/// One XML element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Tag name without namespace prefix.
    pub name: String,
    /// Attributes in document order, names as written.
    pub attributes: Vec<(String, String)>,
    /// 1-based line of the start tag.
    pub line: u32,
    /// Child elements.
    pub children: Vec<Element>,
}

impl Element {
    /// Case-insensitive attribute lookup.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Child elements whose tag matches `name`, case-insensitively.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children
            .iter()
            .filter(move |c| c.name.eq_ignore_ascii_case(name))
    }

    /// Whether the tag matches `name`, case-insensitively.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A parsed document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// Path of the document inside the archive.
    pub name: String,
    /// Root element.
    pub root: Element,
}

fn convert(doc: &XmlDocument<'_>, node: Node<'_, '_>) -> Element {
    Element {
        name: node.tag_name().name().to_owned(),
        attributes: node
            .attributes()
            .map(|a| (a.name().to_owned(), a.value().to_owned()))
            .collect(),
        line: doc.text_pos_at(node.range().start).row,
        children: node
            .children()
            .filter(Node::is_element)
            .map(|c| convert(doc, c))
            .collect(),
    }
}

/// Parse a document. A UTF-8 BOM is skipped and invalid UTF-8 is replaced.
pub fn parse_document(name: &str, bytes: &[u8]) -> Result<Document> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = XmlDocument::parse_with_options(&text, options).map_err(|e| ImportError::Xml {
        document: name.to_owned(),
        message: e.to_string(),
    })?;
    Ok(Document {
        name: name.to_owned(),
        root: convert(&doc, doc.root_element()),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
