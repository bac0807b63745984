//! Minimal namespace-aware element tree built on `quick-xml`.
//!
//! Bulletins are small, so the whole document is materialized once and
//! then walked recursively. Only what flattening needs is kept: resolved
//! namespace, local name, attributes in document order, the text before
//! the first child, and child elements.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::BulletinError;

/// An XML element with its namespace resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Resolved namespace URI, if the element is bound to one.
    pub namespace: Option<String>,
    /// Local (unprefixed) tag name.
    pub name: String,
    /// Attributes as written, excluding `xmlns` declarations.
    pub attributes: Vec<(String, String)>,
    /// Text content before the first child element. `None` when empty.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<Self>,
}

impl Element {
    /// Value of the attribute `name`, if present.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether this element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// All descendants (not including `self`) in document order.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut stack: Vec<&Self> = self.children.iter().rev().collect();

        while let Some(element) = stack.pop() {
            out.push(element);
            stack.extend(element.children.iter().rev());
        }

        out
    }

    /// Descendants matching a namespace and local name, in document order.
    #[must_use]
    pub fn find_all(&self, namespace: &str, name: &str) -> Vec<&Self> {
        self.descendants()
            .into_iter()
            .filter(|e| e.is(namespace, name))
            .collect()
    }
}

/// Parses an XML document into its root [`Element`].
///
/// # Errors
///
/// Returns [`BulletinError::Xml`] for syntax errors (including mismatched
/// end tags) and [`BulletinError::Malformed`] if the document has no root
/// element or leaves elements unclosed.
pub fn parse_document(xml: &str) -> Result<Element, BulletinError> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (namespace, event) = {
            let (resolved, event) = reader.read_resolved_event()?;
            (namespace_uri(&resolved), event)
        };

        match event {
            Event::Start(start) => stack.push(open(namespace, &start)?),
            Event::Empty(start) => {
                let element = open(namespace, &start)?;
                close(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or(BulletinError::Malformed("unexpected end tag"))?;
                close(element, &mut stack, &mut root);
            }
            Event::Text(text) => append_text(&mut stack, &text.unescape()?),
            Event::CData(data) => append_text(&mut stack, &String::from_utf8_lossy(&data)),
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(BulletinError::Malformed("unclosed element at end of document"));
    }

    root.ok_or(BulletinError::Malformed("document has no root element"))
}

fn namespace_uri(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

fn open(namespace: Option<String>, start: &BytesStart<'_>) -> Result<Element, BulletinError> {
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        namespace,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attributes,
        text: None,
        children: Vec::new(),
    })
}

fn close(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Text only counts while the open element has no children yet; text after
/// a child belongs to that child's tail and is dropped.
fn append_text(stack: &mut [Element], text: &str) {
    let Some(current) = stack.last_mut() else {
        return;
    };
    if current.children.is_empty() && !text.is_empty() {
        current.text.get_or_insert_with(String::new).push_str(text);
    }
}
