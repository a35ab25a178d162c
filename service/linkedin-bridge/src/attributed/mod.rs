//! Rich text as LinkedIn stores it: a plain string plus formatting spans.
//!
//! Span offsets count UTF-16 code units, not bytes or chars.

mod parse;
mod render;

pub use parse::parse_html;
pub use render::render_html;

use crate::urn::Urn;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedText {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl AttributedText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: Vec::new(),
        }
    }

    pub fn utf16_len(&self) -> usize {
        self.text.encode_utf16().count()
    }

    /// True when no span carries formatting worth rendering.
    pub fn is_plain(&self) -> bool {
        self.attributes
            .iter()
            .all(|attr| attr.kind == AttributeKind::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub start: usize,
    pub length: usize,
    #[serde(rename = "attributeKindUnion")]
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn new(start: usize, length: usize, kind: AttributeKind) -> Self {
        Self {
            start,
            length,
            kind,
        }
    }

    /// One past the last unit covered. Saturates on offsets no text can have.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    /// True when the span lies inside a text of `len` UTF-16 units.
    pub fn fits(&self, len: usize) -> bool {
        self.start
            .checked_add(self.length)
            .is_some_and(|end| end <= len)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Bold,
    Italic,
    Underline,
    LineBreak,
    List { ordered: bool },
    ListItem,
    Paragraph,
    Subscript,
    Superscript,
    Hyperlink { url: String },
    Entity { urn: Urn },
    /// A kind this client does not understand. Dropped when rendering.
    Unknown,
}

impl Serialize for AttributeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let value = match self {
            AttributeKind::Bold => json!({ "bold": {} }),
            AttributeKind::Italic => json!({ "italic": {} }),
            AttributeKind::Underline => json!({ "underline": {} }),
            AttributeKind::LineBreak => json!({ "lineBreak": {} }),
            AttributeKind::List { ordered } => json!({ "list": { "ordered": ordered } }),
            AttributeKind::ListItem => json!({ "listItem": {} }),
            AttributeKind::Paragraph => json!({ "paragraph": {} }),
            AttributeKind::Subscript => json!({ "subscript": {} }),
            AttributeKind::Superscript => json!({ "superscript": {} }),
            AttributeKind::Hyperlink { url } => json!({ "hyperlink": { "url": url } }),
            AttributeKind::Entity { urn } => json!({ "entity": { "urn": urn } }),
            AttributeKind::Unknown => json!({}),
        };
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let union = Map::<String, Value>::deserialize(deserializer)?;
        for (key, value) in &union {
            if value.is_null() {
                continue;
            }
            let kind = match key.as_str() {
                "bold" => AttributeKind::Bold,
                "italic" => AttributeKind::Italic,
                "underline" => AttributeKind::Underline,
                "lineBreak" => AttributeKind::LineBreak,
                "list" => AttributeKind::List {
                    ordered: value
                        .get("ordered")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                },
                "listItem" => AttributeKind::ListItem,
                "paragraph" => AttributeKind::Paragraph,
                "subscript" => AttributeKind::Subscript,
                "superscript" => AttributeKind::Superscript,
                "hyperlink" => match value.get("url").and_then(Value::as_str) {
                    Some(url) => AttributeKind::Hyperlink {
                        url: url.to_string(),
                    },
                    None => continue,
                },
                "entity" => match value
                    .get("urn")
                    .and_then(Value::as_str)
                    .and_then(|raw| Urn::parse(raw).ok())
                {
                    Some(urn) => AttributeKind::Entity { urn },
                    None => continue,
                },
                _ => continue,
            };
            return Ok(kind);
        }
        Ok(AttributeKind::Unknown)
    }
}

/// Converts between host HTML and LinkedIn attributed text.
pub trait HtmlConverter: Send + Sync {
    fn to_attributed(&self, html: &str) -> AttributedText;
    fn to_html(&self, text: &AttributedText) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHtmlConverter;

impl HtmlConverter for DefaultHtmlConverter {
    fn to_attributed(&self, html: &str) -> AttributedText {
        parse_html(html)
    }

    fn to_html(&self, text: &AttributedText) -> String {
        render_html(text)
    }
}

/// Sort order shared by the renderer and the parser: outer spans first.
pub(crate) fn sort_attributes(attributes: &mut [Attribute]) {
    attributes.sort_by(|a, b| a.start.cmp(&b.start).then(b.length.cmp(&a.length)));
}
