use super::{sort_attributes, Attribute, AttributeKind, AttributedText};
use crate::urn::Urn;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
        .expect("attribute regex is valid")
});

struct OpenTag {
    name: String,
    /// Index into the output attributes, `None` for tags that carry no span.
    slot: Option<usize>,
}

/// Parse the small HTML subset a chat client produces into attributed text.
///
/// Recognised tags are `b`/`strong`, `i`/`em`, `u`, `br`, `ul`, `ol`, `li`,
/// `p`, `sub`, `sup` and `a` (a mention when it carries
/// `data-mention-urn`). Other tags are skipped but their text is kept.
pub fn parse_html(html: &str) -> AttributedText {
    let mut text = String::with_capacity(html.len());
    let mut utf16_len = 0usize;
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut open: Vec<OpenTag> = Vec::new();

    let mut rest = html;
    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            push_text(&mut text, &mut utf16_len, rest);
            break;
        };
        push_text(&mut text, &mut utf16_len, &rest[..lt]);
        let after = &rest[lt..];
        let Some(gt) = after.find('>') else {
            push_text(&mut text, &mut utf16_len, after);
            break;
        };
        let tag = &after[1..gt];
        rest = &after[gt + 1..];

        if tag.starts_with('!') || tag.starts_with('?') {
            continue;
        }
        if let Some(name) = tag.strip_prefix('/') {
            close_tag(&tag_name(name), utf16_len, &mut open, &mut attributes);
            continue;
        }

        let name = tag_name(tag);
        if name == "br" {
            attributes.push(Attribute::new(utf16_len, 1, AttributeKind::LineBreak));
            text.push('\n');
            utf16_len += 1;
            continue;
        }
        let slot = open_kind(&name, tag).map(|kind| {
            attributes.push(Attribute::new(utf16_len, 0, kind));
            attributes.len() - 1
        });
        if !tag.trim_end().ends_with('/') {
            open.push(OpenTag { name, slot });
        }
    }

    while let Some(unclosed) = open.pop() {
        finish(unclosed.slot, utf16_len, &mut attributes);
    }
    attributes.retain(|attr| attr.length > 0);
    sort_attributes(&mut attributes);

    AttributedText { text, attributes }
}

fn open_kind(name: &str, tag: &str) -> Option<AttributeKind> {
    let kind = match name {
        "b" | "strong" => AttributeKind::Bold,
        "i" | "em" => AttributeKind::Italic,
        "u" | "ins" => AttributeKind::Underline,
        "ul" => AttributeKind::List { ordered: false },
        "ol" => AttributeKind::List { ordered: true },
        "li" => AttributeKind::ListItem,
        "p" => AttributeKind::Paragraph,
        "sub" => AttributeKind::Subscript,
        "sup" => AttributeKind::Superscript,
        "a" => {
            let mut href = None;
            let mut mention = None;
            for caps in TAG_ATTRIBUTE.captures_iter(tag) {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| decode_entities(m.as_str()));
                match caps.get(1).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
                    Some("href") => href = value,
                    Some("data-mention-urn") => mention = value,
                    _ => {}
                }
            }
            match (mention.and_then(|raw| Urn::parse(&raw).ok()), href) {
                (Some(urn), _) => AttributeKind::Entity { urn },
                (None, Some(url)) => AttributeKind::Hyperlink { url },
                (None, None) => return None,
            }
        }
        _ => return None,
    };
    Some(kind)
}

fn close_tag(
    name: &str,
    position: usize,
    open: &mut Vec<OpenTag>,
    attributes: &mut [Attribute],
) {
    let Some(idx) = open.iter().rposition(|tag| tag.name == name) else {
        return;
    };
    for tag in open.drain(idx..).rev() {
        finish(tag.slot, position, attributes);
    }
}

fn finish(slot: Option<usize>, position: usize, attributes: &mut [Attribute]) {
    if let Some(attr) = slot.and_then(|idx| attributes.get_mut(idx)) {
        attr.length = position - attr.start;
    }
}

fn tag_name(tag: &str) -> String {
    tag.trim_start()
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn push_text(text: &mut String, utf16_len: &mut usize, raw: &str) {
    let decoded = decode_entities(raw);
    *utf16_len += decoded.encode_utf16().count();
    text.push_str(&decoded);
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_entity(&candidate[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}
