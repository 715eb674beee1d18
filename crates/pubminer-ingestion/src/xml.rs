//! XML → generic structured value.
//!
//! Detail documents arrive as XML but are normalised with the same tools as the
//! JSON endpoints, so they are first turned into a `serde_json::Value`:
//!
//! - the root element is dropped; its content is the returned value
//! - attributes live in an object under `"@"`
//! - an element's text content (descendant text included, whitespace collapsed)
//!   lives under `"#"`; text of directly adjacent child elements is separated by
//!   a space, text running into inline markup is not
//! - repeated child elements become an array, in document order
//! - an element with neither attributes nor children is a plain string
//!   (`""` when empty)

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

pub const ATTRIBUTES_KEY: &str = "@";
pub const TEXT_KEY: &str = "#";

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(String),

    #[error("document ended inside <{0}>")]
    Unclosed(String),

    #[error("document has no root element")]
    Empty,
}

/// An element whose end tag has not been seen yet.
struct Frame {
    name: String,
    attrs: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
    /// The last content seen was a closed child element, not text.
    after_child: bool,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let mut attrs = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::Syntax(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            attrs.insert(key, Value::String(value));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attrs,
            children: Map::new(),
            text: String::new(),
            after_child: false,
        })
    }

    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
        self.after_child = false;
    }

    /// Appends a closed child's text; adjacent child elements are kept apart by a space.
    fn push_child_text(&mut self, text: &str) {
        if self.after_child && !text.is_empty() && !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
        self.after_child = true;
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn finish(self) -> Value {
        let text = collapse_whitespace(&self.text);
        if self.attrs.is_empty() && self.children.is_empty() {
            return Value::String(text);
        }

        let mut obj = self.children;
        if !self.attrs.is_empty() {
            obj.insert(ATTRIBUTES_KEY.to_string(), Value::Object(self.attrs));
        }
        if !text.is_empty() {
            obj.insert(TEXT_KEY.to_string(), Value::String(text));
        }
        Value::Object(obj)
    }
}

/// Convert an XML document into a generic structured value.
pub fn parse_xml(input: &[u8]) -> Result<Value, XmlError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| XmlError::Syntax(format!("{} (near byte {})", e, reader.buffer_position())))?;

        match event {
            Event::Start(ref e) => stack.push(Frame::open(e)?),
            Event::Empty(ref e) => {
                let frame = Frame::open(e)?;
                close(frame, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // quick-xml has already matched the end tag against its start
                if let Some(frame) = stack.pop() {
                    close(frame, &mut stack, &mut root)?;
                }
            }
            Event::Text(ref e) => {
                if let Some(top) = stack.last_mut() {
                    top.push_text(&decode_text(e));
                }
            }
            Event::CData(ref e) => {
                if let Some(top) = stack.last_mut() {
                    top.push_text(&String::from_utf8_lossy(e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Unclosed(open.name.clone()));
    }
    root.ok_or(XmlError::Empty)
}

fn close(frame: Frame, stack: &mut [Frame], root: &mut Option<Value>) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_child_text(&frame.text);
            let name = frame.name.clone();
            parent.add_child(name, frame.finish());
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(frame.finish());
            Ok(())
        }
        None => Err(XmlError::Syntax(format!("second root element <{}>", frame.name))),
    }
}

// Unknown entities (PMC uses a few HTML ones) are kept verbatim instead of failing.
fn decode_text(e: &BytesText<'_>) -> String {
    match e.unescape() {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(e).into_owned(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
