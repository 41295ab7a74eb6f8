//! A small element tree keyed by local names.
//!
//! Namespace prefixes and URIs are discarded while parsing, so
//! `<nfe:det>`, `<det xmlns="...">` and a bare `<det>` all become an
//! element named `det`. Paths use the `.//a/b` form: `.//a` matches every
//! descendant named `a` (the element itself excluded), each further step
//! matches direct children.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Nesting beyond this depth is rejected as malformed.
const MAX_DEPTH: usize = 512;

/// The bytes are not a well-formed XML document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed XML: {0}")]
pub struct MalformedXml(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn from_start(e: &BytesStart) -> Self {
        Element {
            name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Local name, without any namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Character data before the first child element, untrimmed. Text
    /// following a child is not part of it.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Every element below this one, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: self.children.iter().rev().collect() }
    }

    /// All elements matching `path`, in document order.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let (deep, steps) = match path.strip_prefix(".//") {
            Some(rest) => (true, rest),
            None => (false, path.strip_prefix("./").unwrap_or(path)),
        };
        let mut steps = steps.split('/').filter(|s| !s.is_empty());
        let Some(first) = steps.next() else {
            return Vec::new();
        };

        let mut matches: Vec<&Element> = if deep {
            self.descendants().filter(|e| e.name == first).collect()
        } else {
            self.children.iter().filter(|e| e.name == first).collect()
        };
        for step in steps {
            matches = matches
                .into_iter()
                .flat_map(|e| e.children.iter().filter(move |c| c.name == step))
                .collect();
        }
        matches
    }

    /// First element matching `path`.
    pub fn find(&self, path: &str) -> Option<&Element> {
        self.find_all(path).into_iter().next()
    }

    /// Trimmed text of the first element matching `path`; `None` when there
    /// is no match or its text is empty.
    pub fn find_text(&self, path: &str) -> Option<&str> {
        let text = self.find(path)?.text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Pre-order iterator over the descendants of an [`Element`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Parse a document into its root element. A leading UTF-8 BOM is skipped.
pub fn parse(bytes: &[u8]) -> Result<Element, MalformedXml> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if root.is_some() {
                    return Err(MalformedXml("content after the root element".into()));
                }
                if stack.len() >= MAX_DEPTH {
                    return Err(MalformedXml(format!("nesting deeper than {} levels", MAX_DEPTH)));
                }
                stack.push(Element::from_start(&e));
            }
            Ok(Event::Empty(e)) => {
                let element = Element::from_start(&e);
                close(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| MalformedXml("unexpected closing tag".into()))?;
                close(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| MalformedXml(format!("bad character data: {}", e)))?;
                match stack.last_mut() {
                    Some(current) if current.children.is_empty() => current.text.push_str(&text),
                    Some(_) => {}
                    None if text.trim().is_empty() => {}
                    None => return Err(MalformedXml("text outside the root element".into())),
                }
            }
            Ok(Event::CData(c)) => {
                let Some(current) = stack.last_mut() else {
                    return Err(MalformedXml("CDATA outside the root element".into()));
                };
                if current.children.is_empty() {
                    current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MalformedXml(format!(
                    "error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(MalformedXml(format!("unclosed element <{}>", stack[stack.len() - 1].name)));
    }
    root.ok_or_else(|| MalformedXml("no root element".into()))
}

fn close(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), MalformedXml> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(MalformedXml("more than one root element".into())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nfe:NFe xmlns:nfe="http://www.portalfiscal.inf.br/nfe">
  <nfe:infNFe>
    <nfe:ide><nfe:nNF> 123 </nfe:nNF></nfe:ide>
    <nfe:det nItem="1"><nfe:prod><nfe:xProd>Caneta &amp; papel</nfe:xProd></nfe:prod></nfe:det>
    <nfe:det nItem="2"><nfe:prod><nfe:xProd><![CDATA[Lápis]]></nfe:xProd></nfe:prod></nfe:det>
  </nfe:infNFe>
</nfe:NFe>"#;

    #[test]
    fn names_lose_their_prefix() {
        let root = parse(DOC.as_bytes()).unwrap();
        assert_eq!(root.name(), "NFe");
        assert_eq!(root.find_text(".//infNFe/ide/nNF"), Some("123"));
        assert_eq!(root.find_all(".//det").len(), 2);
        assert_eq!(root.find_all("infNFe/det").len(), 2);
    }

    #[test]
    fn text_is_unescaped_and_cdata_kept() {
        let root = parse(DOC.as_bytes()).unwrap();
        let products: Vec<&str> = root
            .find_all(".//prod/xProd")
            .into_iter()
            .map(|e| e.text())
            .collect();
        assert_eq!(products, vec!["Caneta & papel", "Lápis"]);
    }

    #[test]
    fn text_stops_at_the_first_child() {
        let root = parse(b"<xProd>A<b>inner</b>B<![CDATA[C]]></xProd>").unwrap();
        assert_eq!(root.text(), "A");
        assert_eq!(root.find_text("b"), Some("inner"));

        let root = parse(b"<xProd>Caneta &amp; <![CDATA[papel]]></xProd>").unwrap();
        assert_eq!(root.text(), "Caneta & papel");
    }

    #[test]
    fn deep_search_excludes_the_element_itself() {
        let root = parse(b"<det><det><x>1</x></det></det>").unwrap();
        assert_eq!(root.find_all(".//det").len(), 1);
        assert_eq!(root.find_text(".//det/x"), Some("1"));
    }

    #[test]
    fn empty_text_is_none() {
        let root = parse(b"<a><b>  </b><c/></a>").unwrap();
        assert_eq!(root.find_text("b"), None);
        assert_eq!(root.find_text("c"), None);
        assert_eq!(root.find_text(".//missing"), None);
    }

    #[test]
    fn bom_is_skipped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"<a/>");
        assert_eq!(parse(&bytes).unwrap().name(), "a");
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(parse(b"<a><b></a>").is_err());
        assert!(parse(b"<a>").is_err());
        assert!(parse(b"<a/><b/>").is_err());
        assert!(parse(b"").is_err());
        assert!(parse(b"not xml").is_err());
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        let doc = "<a>".repeat(MAX_DEPTH + 1);
        assert!(parse(doc.as_bytes()).is_err());
    }
}
