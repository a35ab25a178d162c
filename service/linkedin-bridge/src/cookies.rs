//! Cookie jar holding the browser session a login was created from.
//!
//! The jar is deliberately small: LinkedIn only needs the cookies the user
//! pasted (plus the ones it refreshes through `Set-Cookie`), and the whole jar
//! is persisted as a single `Cookie:` header string.

use crate::error::{LinkedInError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const JSESSIONID: &str = "JSESSIONID";
pub const LI_AT: &str = "li_at";

/// Value LinkedIn writes into `li_at` when it destroys a session.
pub const DELETED_COOKIE_VALUE: &str = "delete me";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Whether the value was wrapped in double quotes on the wire.
    pub quoted: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            quoted: false,
        }
    }

    fn header_value(&self) -> String {
        let sanitized: String = self.value.chars().filter(|c| valid_value_char(*c)).collect();
        if self.quoted || sanitized.contains(' ') || sanitized.contains(',') {
            format!("\"{sanitized}\"")
        } else {
            sanitized
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `Cookie:` request header (`a=b; c="d"`).
    pub fn parse_header(header: &str) -> Result<Self> {
        let mut jar = CookieJar::new();
        for pair in header.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| LinkedInError::InvalidCookie(format!("missing `=` in `{pair}`")))?;
            let name = name.trim();
            if name.is_empty() || !name.chars().all(valid_name_char) {
                return Err(LinkedInError::InvalidCookie(format!(
                    "invalid cookie name `{name}`"
                )));
            }
            let (value, quoted) = unquote(value.trim());
            if let Some(bad) = value.chars().find(|c| !valid_value_char(*c)) {
                return Err(LinkedInError::InvalidCookie(format!(
                    "invalid character {bad:?} in value of `{name}`"
                )));
            }
            jar.set(Cookie {
                name: name.to_string(),
                value: value.to_string(),
                quoted: quoted || value.contains(' ') || value.contains(','),
            });
        }
        Ok(jar)
    }

    /// The value of `name`, or an empty string when absent.
    pub fn get(&self, name: &str) -> &str {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
            .unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cookies.iter().any(|c| c.name == name)
    }

    pub fn set(&mut self, cookie: Cookie) {
        match self.cookies.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }

    pub fn set_all(&mut self, cookies: impl IntoIterator<Item = Cookie>) {
        for cookie in cookies {
            self.set(cookie);
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.cookies.retain(|c| c.name != name);
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.iter()
    }

    pub fn to_header_string(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.header_value()))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Apply one `Set-Cookie` response header. Only the leading `name=value`
    /// pair is considered; attributes are ignored. Returns `true` when the
    /// header deleted the cookie.
    pub fn apply_set_cookie(&mut self, header: &str) -> bool {
        let first = header.split(';').next().unwrap_or("").trim();
        let Some((name, value)) = first.split_once('=') else {
            return false;
        };
        let name = name.trim();
        if name.is_empty() || !name.chars().all(valid_name_char) {
            return false;
        }
        let (value, quoted) = unquote(value.trim());
        if value == DELETED_COOKIE_VALUE || value.is_empty() {
            self.remove(name);
            return true;
        }
        self.set(Cookie {
            name: name.to_string(),
            value: value.chars().filter(|c| valid_value_char(*c)).collect(),
            quoted,
        });
        false
    }
}

impl fmt::Display for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_string())
    }
}

impl Serialize for CookieJar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_header_string())
    }
}

impl<'de> Deserialize<'de> for CookieJar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let header = String::deserialize(deserializer)?;
        CookieJar::parse_header(&header).map_err(serde::de::Error::custom)
    }
}

fn unquote(value: &str) -> (&str, bool) {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        (&value[1..value.len() - 1], true)
    } else {
        (value, false)
    }
}

fn valid_value_char(c: char) -> bool {
    (' '..='~').contains(&c) && c != '"' && c != ';' && c != '\\'
}

fn valid_name_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_quoted_jsessionid() {
        let jar = CookieJar::parse_header("JSESSIONID=\"ajax:123\"; li_at=xyz").unwrap();
        assert_eq!(jar.get(JSESSIONID), "ajax:123");
        assert_eq!(jar.get(LI_AT), "xyz");
        assert_eq!(jar.get("missing"), "");
        assert_eq!(jar.to_header_string(), "JSESSIONID=\"ajax:123\"; li_at=xyz");
    }

    #[test]
    fn header_round_trip_is_stable() {
        let headers = [
            "JSESSIONID=\"abc\"; li_at=xyz",
            "a=1; b=two words; c=x,y",
            "bcookie=\"v=2&abc\"; lang=v=2&lang=en-us",
        ];
        for header in headers {
            let jar = CookieJar::parse_header(header).unwrap();
            let again = CookieJar::parse_header(&jar.to_header_string()).unwrap();
            assert_eq!(again, jar);
        }
    }

    #[test]
    fn quotes_values_with_spaces_and_commas() {
        let mut jar = CookieJar::new();
        jar.set(Cookie::new("a", "two words"));
        jar.set(Cookie::new("b", "x,y"));
        assert_eq!(jar.to_header_string(), "a=\"two words\"; b=\"x,y\"");
    }

    #[test]
    fn set_all_replaces_by_name() {
        let mut jar = CookieJar::parse_header("a=1; b=2").unwrap();
        jar.set_all([Cookie::new("b", "3"), Cookie::new("c", "4")]);
        assert_eq!(jar.to_header_string(), "a=1; b=3; c=4");
        jar.clear();
        assert!(jar.is_empty());
        assert_eq!(jar.to_header_string(), "");
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(CookieJar::parse_header("novalue").is_err());
        assert!(CookieJar::parse_header("=value").is_err());
        assert!(CookieJar::parse_header("a=b\\c").is_err());
    }

    #[test]
    fn set_cookie_refreshes_and_deletes() {
        let mut jar = CookieJar::parse_header("JSESSIONID=\"abc\"; li_at=xyz").unwrap();
        assert!(!jar.apply_set_cookie("li_at=fresh; Path=/; Secure"));
        assert_eq!(jar.get(LI_AT), "fresh");
        assert!(jar.apply_set_cookie("li_at=\"delete me\"; Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(!jar.contains(LI_AT));
    }

    #[test]
    fn serializes_as_header_string() {
        let jar = CookieJar::parse_header("JSESSIONID=\"abc\"; li_at=xyz").unwrap();
        let json = serde_json::to_string(&jar).unwrap();
        assert_eq!(json, r#""JSESSIONID=\"abc\"; li_at=xyz""#);
        let back: CookieJar = serde_json::from_str(&json).unwrap();
        assert_eq!(back, jar);
    }
}
