//! Values scraped once from the messaging landing page and replayed as
//! request headers (`x-li-page-instance`, `x-li-track`, `x-li-lang`).

use crate::config::TrackProfile;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

pub const MESSAGING_PAGE_PATH: &str = "/messaging/";
pub const PAGE_INSTANCE_PREFIX: &str = "urn:li:page:messaging_index;";
pub const DEFAULT_LOCALE: &str = "en_US";

static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta tag regex is valid"));

static TAG_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
        .expect("attribute regex is valid")
});

#[derive(Debug, Clone, PartialEq)]
pub struct PageMeta {
    pub client_page_instance_id: String,
    pub service_version: String,
    pub i18n_locale: String,
    pub x_li_track: String,
}

impl PageMeta {
    pub fn page_instance(&self) -> String {
        format!("{PAGE_INSTANCE_PREFIX}{}", self.client_page_instance_id)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackHeader<'a> {
    client_version: &'a str,
    mp_version: &'a str,
    os_name: &'static str,
    timezone_offset: i32,
    timezone: &'a str,
    device_form_factor: &'static str,
    mp_name: &'static str,
    display_density: f64,
    display_width: u32,
    display_height: u32,
}

pub fn build_track_header(service_version: &str, profile: &TrackProfile) -> String {
    let header = TrackHeader {
        client_version: service_version,
        mp_version: service_version,
        os_name: "web",
        timezone_offset: profile.timezone_offset,
        timezone: &profile.timezone,
        device_form_factor: "DESKTOP",
        mp_name: "voyager-web",
        display_density: profile.display_density,
        display_width: profile.display_width,
        display_height: profile.display_height,
    };
    // Serializing a struct of plain fields cannot fail.
    serde_json::to_string(&header).unwrap_or_default()
}

/// Collect `<meta name=... content=...>` pairs from an HTML document.
pub fn extract_meta_tags(html: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for tag in META_TAG.find_iter(html) {
        let mut name = None;
        let mut content = None;
        for caps in TAG_ATTRIBUTE.captures_iter(tag.as_str()) {
            let key = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()));
            match key.as_deref() {
                Some("name") => name = value,
                Some("content") => content = value,
                _ => {}
            }
        }
        if let (Some(name), Some(content)) = (name, content) {
            tags.entry(name).or_insert(content);
        }
    }
    tags
}

pub fn parse_page_meta(html: &str, profile: &TrackProfile) -> PageMeta {
    let tags = extract_meta_tags(html);
    let client_page_instance_id = tags
        .get("clientPageInstanceId")
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let service_version = tags.get("serviceVersion").cloned().unwrap_or_default();
    let i18n_locale = tags
        .get("i18nLocale")
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
    let x_li_track = build_track_header(&service_version, profile);

    PageMeta {
        client_page_instance_id,
        service_version,
        i18n_locale,
        x_li_track,
    }
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<!DOCTYPE html><html><head>
        <meta name="clientPageInstanceId" content="d6b0c5a2-1111-2222-3333-444455556666">
        <meta content="1.13.8142" name="serviceVersion"/>
        <meta name=i18nLocale content=de_DE>
        <meta property="og:title" content="LinkedIn">
        </head><body></body></html>"#;

    #[test]
    fn extracts_known_meta_tags_in_any_attribute_order() {
        let meta = parse_page_meta(PAGE, &TrackProfile::default());
        assert_eq!(meta.client_page_instance_id, "d6b0c5a2-1111-2222-3333-444455556666");
        assert_eq!(meta.service_version, "1.13.8142");
        assert_eq!(meta.i18n_locale, "de_DE");
        assert_eq!(
            meta.page_instance(),
            "urn:li:page:messaging_index;d6b0c5a2-1111-2222-3333-444455556666"
        );
    }

    #[test]
    fn track_header_has_stable_field_order() {
        let track = build_track_header("1.2.3", &TrackProfile::default());
        assert_eq!(
            track,
            r#"{"clientVersion":"1.2.3","mpVersion":"1.2.3","osName":"web","timezoneOffset":1,"timezone":"Europe/Berlin","deviceFormFactor":"DESKTOP","mpName":"voyager-web","displayDensity":1.0,"displayWidth":1920,"displayHeight":1080}"#
        );
    }

    #[test]
    fn missing_tags_fall_back() {
        let meta = parse_page_meta("<html></html>", &TrackProfile::default());
        assert_eq!(meta.i18n_locale, DEFAULT_LOCALE);
        assert_eq!(meta.service_version, "");
        assert!(Uuid::parse_str(&meta.client_page_instance_id).is_ok());
    }
}
