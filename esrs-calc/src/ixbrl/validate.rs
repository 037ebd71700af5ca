//! Structural checks on an exported document
//!
//! Parses the XHTML as XML and verifies that:
//! - the document is well formed,
//! - context and unit ids are unique,
//! - every `contextRef`/`unitRef` points at a declared id,
//! - every declaration is used,
//! - numeric facts carry a unit and text facts do not,
//! - no fact appears before the `ix:resources` block closes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeSet;

use super::ExportError;

/// Ids and counts collected while checking a document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentCheck {
    pub declared_contexts: BTreeSet<String>,
    pub declared_units: BTreeSet<String>,
    pub referenced_contexts: BTreeSet<String>,
    pub referenced_units: BTreeSet<String>,
    pub fact_count: usize,
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ExportError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| ExportError::Xml(e.to_string()))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| ExportError::Xml(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Check a document, returning the collected ids when it is sound
pub fn check_document(xhtml: &str) -> Result<DocumentCheck, ExportError> {
    let mut reader = Reader::from_str(xhtml);
    let mut check = DocumentCheck::default();
    let mut problems: Vec<String> = Vec::new();
    let mut saw_resources = false;
    let mut resources_closed = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                match element.name().as_ref() {
                    b"ix:resources" => saw_resources = true,
                    b"xbrli:context" => match attribute(&element, b"id")? {
                        Some(id) => {
                            if !check.declared_contexts.insert(id.clone()) {
                                problems.push(format!("duplicate context id {}", id));
                            }
                        }
                        None => problems.push("context without id".to_string()),
                    },
                    b"xbrli:unit" => match attribute(&element, b"id")? {
                        Some(id) => {
                            if !check.declared_units.insert(id.clone()) {
                                problems.push(format!("duplicate unit id {}", id));
                            }
                        }
                        None => problems.push("unit without id".to_string()),
                    },
                    b"ix:nonFraction" => {
                        check.fact_count += 1;
                        let name = attribute(&element, b"name")?.unwrap_or_default();
                        if !resources_closed {
                            problems.push(format!("fact {} precedes declarations", name));
                        }
                        match attribute(&element, b"contextRef")? {
                            Some(id) => {
                                check.referenced_contexts.insert(id);
                            }
                            None => problems.push(format!("fact {} has no contextRef", name)),
                        }
                        match attribute(&element, b"unitRef")? {
                            Some(id) => {
                                check.referenced_units.insert(id);
                            }
                            None => problems.push(format!("numeric fact {} has no unitRef", name)),
                        }
                    }
                    b"ix:nonNumeric" => {
                        check.fact_count += 1;
                        let name = attribute(&element, b"name")?.unwrap_or_default();
                        if !resources_closed {
                            problems.push(format!("fact {} precedes declarations", name));
                        }
                        match attribute(&element, b"contextRef")? {
                            Some(id) => {
                                check.referenced_contexts.insert(id);
                            }
                            None => problems.push(format!("fact {} has no contextRef", name)),
                        }
                        if attribute(&element, b"unitRef")?.is_some() {
                            problems.push(format!("text fact {} has a unitRef", name));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(element)) => {
                if element.name().as_ref() == b"ix:resources" {
                    resources_closed = true;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExportError::Xml(format!(
                    "malformed document at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !saw_resources {
        problems.push("document has no ix:resources block".to_string());
    }
    for id in check.referenced_contexts.difference(&check.declared_contexts) {
        problems.push(format!("undeclared context {}", id));
    }
    for id in check.referenced_units.difference(&check.declared_units) {
        problems.push(format!("undeclared unit {}", id));
    }
    for id in check.declared_contexts.difference(&check.referenced_contexts) {
        problems.push(format!("unused context {}", id));
    }
    for id in check.declared_units.difference(&check.referenced_units) {
        problems.push(format!("unused unit {}", id));
    }
    for id in check.declared_contexts.intersection(&check.declared_units) {
        problems.push(format!("id {} used by both a context and a unit", id));
    }

    if problems.is_empty() {
        Ok(check)
    } else {
        Err(ExportError::Validation(problems))
    }
}
