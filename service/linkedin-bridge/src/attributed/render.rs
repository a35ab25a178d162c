use super::{sort_attributes, Attribute, AttributeKind, AttributedText};

const PROFILE_URL_PREFIX: &str = "https://www.linkedin.com/in/";

struct Span {
    attribute: Attribute,
    children: Vec<Span>,
}

/// Render attributed text as HTML.
///
/// Spans are nested into a tree ordered by start (longest first on ties)
/// and emitted depth first. Spans that overrun their parent are clipped to
/// it; spans outside the text and unknown kinds are dropped.
pub fn render_html(text: &AttributedText) -> String {
    let units: Vec<u16> = text.text.encode_utf16().collect();
    let mut attributes: Vec<Attribute> = text
        .attributes
        .iter()
        .filter(|attr| attr.kind != AttributeKind::Unknown && attr.fits(units.len()))
        .cloned()
        .collect();
    sort_attributes(&mut attributes);

    let roots = build_tree(attributes);
    let mut out = String::with_capacity(text.text.len() * 2);
    render_range(&units, 0, units.len(), &roots, &mut out);
    out
}

fn build_tree(attributes: Vec<Attribute>) -> Vec<Span> {
    let mut roots: Vec<Span> = Vec::new();
    // Path from a root to the innermost open span, as child indexes.
    let mut path: Vec<usize> = Vec::new();

    for mut attribute in attributes {
        loop {
            match span_at(&roots, &path) {
                Some(open) if attribute.start >= open.attribute.end() => {
                    path.pop();
                }
                _ => break,
            }
        }
        if let Some(open) = span_at(&roots, &path) {
            let limit = open.attribute.end();
            if attribute.end() > limit {
                attribute.length = limit - attribute.start;
            }
        }

        let span = Span {
            attribute,
            children: Vec::new(),
        };
        let slot = match span_at_mut(&mut roots, &path) {
            Some(parent) => {
                parent.children.push(span);
                parent.children.len() - 1
            }
            None => {
                roots.push(span);
                roots.len() - 1
            }
        };
        path.push(slot);
    }
    roots
}

fn span_at<'a>(roots: &'a [Span], path: &[usize]) -> Option<&'a Span> {
    let (first, rest) = path.split_first()?;
    let mut span = roots.get(*first)?;
    for idx in rest {
        span = span.children.get(*idx)?;
    }
    Some(span)
}

fn span_at_mut<'a>(roots: &'a mut [Span], path: &[usize]) -> Option<&'a mut Span> {
    let (first, rest) = path.split_first()?;
    let mut span = roots.get_mut(*first)?;
    for idx in rest {
        span = span.children.get_mut(*idx)?;
    }
    Some(span)
}

fn render_range(units: &[u16], start: usize, end: usize, spans: &[Span], out: &mut String) {
    let mut cursor = start;
    for span in spans {
        let attr = &span.attribute;
        push_escaped(out, &units[cursor..attr.start]);
        render_span(units, span, out);
        cursor = attr.end();
    }
    push_escaped(out, &units[cursor..end]);
}

fn render_span(units: &[u16], span: &Span, out: &mut String) {
    let attr = &span.attribute;
    if attr.kind == AttributeKind::LineBreak {
        out.push_str("<br>");
        return;
    }

    let (open, close) = tags(&attr.kind);
    out.push_str(&open);
    render_range(units, attr.start, attr.end(), &span.children, out);
    out.push_str(close);
}

fn tags(kind: &AttributeKind) -> (String, &'static str) {
    match kind {
        AttributeKind::Bold => ("<b>".into(), "</b>"),
        AttributeKind::Italic => ("<i>".into(), "</i>"),
        AttributeKind::Underline => ("<u>".into(), "</u>"),
        AttributeKind::List { ordered: true } => ("<ol>".into(), "</ol>"),
        AttributeKind::List { ordered: false } => ("<ul>".into(), "</ul>"),
        AttributeKind::ListItem => ("<li>".into(), "</li>"),
        AttributeKind::Paragraph => ("<p>".into(), "</p>"),
        AttributeKind::Subscript => ("<sub>".into(), "</sub>"),
        AttributeKind::Superscript => ("<sup>".into(), "</sup>"),
        AttributeKind::Hyperlink { url } => {
            (format!("<a href=\"{}\">", escape_attr(url)), "</a>")
        }
        AttributeKind::Entity { urn } => {
            let id = urn.id().unwrap_or(urn.as_str());
            (
                format!(
                    "<a href=\"{PROFILE_URL_PREFIX}{}\" data-mention-urn=\"{}\">",
                    escape_attr(id),
                    escape_attr(urn.as_str())
                ),
                "</a>",
            )
        }
        AttributeKind::LineBreak | AttributeKind::Unknown => (String::new(), ""),
    }
}

fn push_escaped(out: &mut String, units: &[u16]) {
    for ch in char::decode_utf16(units.iter().copied()) {
        match ch.unwrap_or(char::REPLACEMENT_CHARACTER) {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributed::parse_html;
    use crate::urn::Urn;
    use pretty_assertions::assert_eq;

    fn text(text: &str, attributes: Vec<Attribute>) -> AttributedText {
        AttributedText {
            text: text.into(),
            attributes,
        }
    }

    #[test]
    fn renders_nested_spans() {
        let body = text(
            "bold and italic",
            vec![
                Attribute::new(9, 6, AttributeKind::Italic),
                Attribute::new(0, 15, AttributeKind::Bold),
            ],
        );
        assert_eq!(render_html(&body), "<b>bold and <i>italic</i></b>");
    }

    #[test]
    fn offsets_count_utf16_units() {
        // The emoji is two UTF-16 units.
        let body = text("😀 hi there", vec![Attribute::new(3, 2, AttributeKind::Bold)]);
        assert_eq!(render_html(&body), "😀 <b>hi</b> there");
    }

    #[test]
    fn escapes_text_and_drops_unknown_spans() {
        let body = text(
            "a<b & c",
            vec![
                Attribute::new(0, 1, AttributeKind::Unknown),
                Attribute::new(0, 99, AttributeKind::Bold),
            ],
        );
        assert_eq!(render_html(&body), "a&lt;b &amp; c");
    }

    #[test]
    fn renders_mentions_and_links() {
        let body = text(
            "hi Ada see docs",
            vec![
                Attribute::new(
                    3,
                    3,
                    AttributeKind::Entity {
                        urn: Urn::fsd_profile("ACoAAB"),
                    },
                ),
                Attribute::new(
                    11,
                    4,
                    AttributeKind::Hyperlink {
                        url: "https://x.test/?a=1&b=2".into(),
                    },
                ),
            ],
        );
        assert_eq!(
            render_html(&body),
            "hi <a href=\"https://www.linkedin.com/in/ACoAAB\" data-mention-urn=\"urn:li:fsd_profile:ACoAAB\">Ada</a> see <a href=\"https://x.test/?a=1&amp;b=2\">docs</a>"
        );
    }

    #[test]
    fn drops_spans_with_out_of_range_offsets() {
        let body = text(
            "hello",
            vec![
                Attribute::new(usize::MAX, 2, AttributeKind::Bold),
                Attribute::new(2, usize::MAX, AttributeKind::Italic),
                Attribute::new(9, 0, AttributeKind::Underline),
                Attribute::new(1, 2, AttributeKind::Bold),
            ],
        );
        assert_eq!(render_html(&body), "h<b>el</b>lo");
    }

    #[test]
    fn decoded_overflowing_attribute_renders_plain_text() {
        let body: AttributedText = serde_json::from_str(
            r#"{"text":"hi","attributes":[{"start":18446744073709551615,"length":2,"attributeKindUnion":{"bold":{}}}]}"#,
        )
        .unwrap();
        assert_eq!(render_html(&body), "hi");
    }

    #[test]
    fn clips_overlapping_spans_to_parent() {
        let body = text(
            "abcdef",
            vec![
                Attribute::new(0, 4, AttributeKind::Bold),
                Attribute::new(2, 4, AttributeKind::Italic),
            ],
        );
        assert_eq!(render_html(&body), "<b>ab<i>cd</i></b>ef");
    }

    #[test]
    fn render_then_parse_preserves_offsets() {
        let body = text(
            "Ünïcode 😀 list\none two",
            vec![
                Attribute::new(0, 7, AttributeKind::Bold),
                Attribute::new(8, 2, AttributeKind::Italic),
                Attribute::new(15, 1, AttributeKind::LineBreak),
                Attribute::new(16, 7, AttributeKind::List { ordered: false }),
                Attribute::new(16, 3, AttributeKind::ListItem),
                Attribute::new(20, 3, AttributeKind::ListItem),
                Attribute::new(
                    20,
                    3,
                    AttributeKind::Entity {
                        urn: Urn::fsd_profile("ACoAAB"),
                    },
                ),
            ],
        );
        let html = render_html(&body);
        let parsed = parse_html(&html);
        assert_eq!(parsed, body);
    }
}
