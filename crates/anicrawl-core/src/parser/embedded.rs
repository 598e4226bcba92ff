//! Decoder for the episode map embedded in detail page scripts
//!
//! AnimeVost detail pages carry their playlist as an inline script:
//!
//! ```text
//! var data = {"1 серия":"2147407045","2 серия":"2147407046"};
//! ```
//!
//! Decoding is two-stage: a regex isolates the object literal, then
//! `serde_json` parses it. Any failure yields an empty map.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex_lite::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::SourceProfile;
use crate::types::EpisodeEntry;

use super::text::first_number;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bdata\s*=\s*\{").unwrap());
static LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\bdata\s*=\s*(\{.*?\})\s*;").unwrap());
static TRAILING_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*\}").unwrap());

/// Result of decoding the embedded data block
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// Block found and parsed
    Decoded(BTreeMap<u32, EpisodeEntry>),
    /// No script assigns an object literal to `data`
    NoDataBlock,
    /// A block was found but could not be isolated or parsed
    Malformed(String),
}

impl DecodeOutcome {
    /// Episode map, empty unless decoding succeeded
    pub fn into_map(self) -> BTreeMap<u32, EpisodeEntry> {
        match self {
            DecodeOutcome::Decoded(map) => map,
            DecodeOutcome::NoDataBlock | DecodeOutcome::Malformed(_) => BTreeMap::new(),
        }
    }
}

/// Find the episode map in any inline script of the document.
///
/// Never fails; malformed data is logged at debug level and yields an
/// empty map.
pub fn extract_episode_map(document: &Html, profile: &SourceProfile) -> BTreeMap<u32, EpisodeEntry> {
    let Ok(selector) = Selector::parse("script") else {
        return BTreeMap::new();
    };

    let script = document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .find(|body| MARKER_RE.is_match(body));

    let outcome = match script {
        Some(body) => decode_script(&body, profile),
        None => DecodeOutcome::NoDataBlock,
    };

    match &outcome {
        DecodeOutcome::Decoded(map) => debug!(episodes = map.len(), "Decoded embedded episode map"),
        DecodeOutcome::NoDataBlock => debug!("No embedded episode map"),
        DecodeOutcome::Malformed(reason) => debug!(reason = %reason, "Malformed embedded episode map"),
    }

    outcome.into_map()
}

/// Decode the `data = {...};` assignment inside one script body.
///
/// # Examples
/// ```
/// use anicrawl_core::config::SourceProfile;
/// use anicrawl_core::parser::embedded::{decode_script, DecodeOutcome};
///
/// let profile = SourceProfile::animevost();
/// let outcome = decode_script(r#"var data = {"1 серия": "abc123"};"#, &profile);
/// let DecodeOutcome::Decoded(map) = outcome else { panic!("not decoded") };
/// assert_eq!(map[&1].label, "1 серия");
/// ```
pub fn decode_script(script: &str, profile: &SourceProfile) -> DecodeOutcome {
    let Some(literal) = LITERAL_RE.captures(script).and_then(|caps| caps.get(1)) else {
        if script.contains("data") {
            return DecodeOutcome::Malformed("unterminated object literal".to_string());
        }
        return DecodeOutcome::NoDataBlock;
    };

    match parse_object(literal.as_str()) {
        Ok(object) => DecodeOutcome::Decoded(build_episode_map(object, profile)),
        Err(reason) => DecodeOutcome::Malformed(reason),
    }
}

/// Parse an object literal as JSON, retrying once with lenient fixes.
fn parse_object(literal: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Map<String, Value>>(literal) {
        Ok(object) => Ok(object),
        Err(strict_err) => {
            let relaxed = relax_literal(literal);
            serde_json::from_str::<Map<String, Value>>(&relaxed).map_err(|_| strict_err.to_string())
        }
    }
}

/// Turn a JavaScript object literal into JSON: single quotes become double
/// quotes and trailing commas are dropped.
fn relax_literal(literal: &str) -> String {
    let quoted = literal.replace('\'', "\"");
    TRAILING_COMMA_RE.replace_all(&quoted, "}").into_owned()
}

/// Build one entry per key that carries an episode number.
///
/// Keys without digits are skipped. When two keys map to the same number,
/// the first in key order wins.
fn build_episode_map(object: Map<String, Value>, profile: &SourceProfile) -> BTreeMap<u32, EpisodeEntry> {
    let mut episodes = BTreeMap::new();

    for (key, value) in object {
        let Some(number) = first_number(&key).and_then(|n| u32::try_from(n).ok()) else {
            continue;
        };
        if episodes.contains_key(&number) {
            continue;
        }

        let media_id = match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        };

        let mut entry = EpisodeEntry::new(number, key);
        if let Some(id) = media_id.as_deref() {
            entry.preview_url = fill_template(profile.preview_template.as_deref(), id);
            entry.stream_url = fill_template(profile.stream_template.as_deref(), id);
        }

        episodes.insert(number, entry);
    }

    episodes
}

fn fill_template(template: Option<&str>, id: &str) -> Option<String> {
    template.map(|t| t.replace("{id}", id))
}
