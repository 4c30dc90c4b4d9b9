//! Page-level meta attributes and CSRF cookie parsing.
//!
//! `PageMeta` stands in for the `<meta>` tags of the page the admin app was
//! served from. The server mirrors the current anti-forgery token into the
//! `csrf-token` tag; the token sources read it back from here.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

fn meta_tag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta tag pattern is valid"))
}

fn meta_attribute() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\b(name|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("meta attribute pattern is valid")
    })
}

/// Named meta attributes of the hosting page.
#[derive(Debug, Default)]
pub struct PageMeta {
    tags: RwLock<HashMap<String, String>>,
}

impl PageMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the HTML of the initial page load, reading every
    /// `<meta name=".." content="..">` tag.
    pub fn from_html(html: &str) -> Self {
        let meta = Self::new();
        for tag in meta_tag().find_iter(html) {
            let mut name = None;
            let mut content = None;
            for attribute in meta_attribute().captures_iter(tag.as_str()) {
                let value = attribute
                    .get(2)
                    .or_else(|| attribute.get(3))
                    .map(|m| m.as_str().to_string());
                match attribute[1].to_ascii_lowercase().as_str() {
                    "name" => name = value,
                    _ => content = value,
                }
            }
            if let (Some(name), Some(content)) = (name, content) {
                meta.set(&name, content);
            }
        }
        meta
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.tags
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .filter(|content| !content.is_empty())
            .cloned()
    }

    pub fn set(&self, name: &str, content: impl Into<String>) {
        self.tags
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), content.into());
    }
}

/// Extract and percent-decode cookie `name` from one `Set-Cookie` value.
pub fn cookie_value(set_cookie: &str, name: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    let (key, raw) = pair.split_once('=')?;
    if key.trim() != name {
        return None;
    }
    let raw = raw.trim().trim_matches('"');
    if raw.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(raw).ok()?;
    Some(decoded.into_owned())
}
