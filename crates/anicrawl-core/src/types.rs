//! Data types for the anime catalog crawler
//!
//! All records serialize with camelCase keys. Optional fields are always
//! written (as `null`) and list fields default to empty arrays, so every
//! emitted record carries the full key set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh unique identifier for records and episodes.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lightweight entry collected while paginating a catalog listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    /// Display title as shown on the listing card
    pub title: String,
    /// Absolute URL of the detail page
    pub link: String,
    /// Absolute poster URL
    pub poster: Option<String>,
    /// Catalog section the entry was listed under, if the source has sections
    pub section: Option<String>,
}

/// Titles of a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Titles {
    pub primary: String,
    pub english: Option<String>,
    pub alternative: Option<String>,
}

/// First/last episode numbers and the string they were read from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRange {
    pub first: Option<u32>,
    pub last: Option<u32>,
    pub display_string: Option<String>,
}

impl EpisodeRange {
    /// Whether nothing is known about the range
    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.last.is_none() && self.display_string.is_none()
    }
}

/// Interval in seconds, used for opening/ending skip markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start: f64,
    pub stop: f64,
}

/// Opening and ending skip markers of an episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipMarkers {
    pub opening: Vec<Interval>,
    pub ending: Vec<Interval>,
}

/// One playable episode decoded from an embedded data block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeEntry {
    pub episode_number: u32,
    /// Key as written by the source (e.g. "1 серия")
    pub label: String,
    pub id: String,
    pub created_timestamp: Option<i64>,
    pub preview_url: Option<String>,
    pub skip_markers: SkipMarkers,
    pub stream_url: Option<String>,
}

impl EpisodeEntry {
    /// Create an entry with every optional field defaulted
    pub fn new(episode_number: u32, label: impl Into<String>) -> Self {
        Self {
            episode_number,
            label: label.into(),
            id: new_id(),
            created_timestamp: None,
            preview_url: None,
            skip_markers: SkipMarkers::default(),
            stream_url: None,
        }
    }
}

/// Voice/translation team credits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub voice: Vec<String>,
    pub translator: Vec<String>,
    pub editing: Vec<String>,
    pub decor: Vec<String>,
    pub timing: Vec<String>,
}

/// Playback links found on the detail page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// `iframe` sources, `None` when the page has none
    pub alternative_player_urls: Option<Vec<String>>,
    /// `video > source` sources, `None` when the page has none
    pub source_urls: Option<Vec<String>>,
    /// Host of the first iframe URL
    pub host: Option<String>,
    pub is_rutube: bool,
}

/// A downloadable torrent or magnet link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentDescriptor {
    pub label: String,
    pub url: String,
    /// Resolution such as "720p", when present in the label
    pub quality: Option<String>,
    /// Size such as "1.4 GB", when present in the label
    pub size: Option<String>,
}

/// Torrent section of a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Torrents {
    pub episode_range: EpisodeRange,
    pub list: Vec<TorrentDescriptor>,
}

/// Related title in the same franchise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Franchise {
    pub name: String,
    pub link: String,
}

/// Normalized anime record shared by all sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeRecord {
    /// Generated unique identifier
    pub id: String,
    /// Name of the source profile the record came from
    pub source: String,
    /// Item id used by the source site, if it could be read from the link
    pub source_id: Option<u64>,
    /// Absolute URL of the detail page
    pub link: String,

    pub titles: Titles,
    pub poster: Option<String>,
    pub description: Option<String>,

    pub year: Option<u16>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "typeCode")]
    pub kind_code: Option<String>,
    pub status: Option<String>,
    pub status_text: Option<String>,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,

    pub episode_count: Option<u32>,
    pub episode_range: EpisodeRange,
    pub episode_map: BTreeMap<u32, EpisodeEntry>,

    pub team: Team,
    pub directors: Vec<String>,

    pub player: Player,
    pub torrents: Torrents,
    pub franchises: Vec<Franchise>,

    pub release_date_text: Option<String>,
    pub view_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub uploader: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnimeRecord {
    /// Create a record where everything except identity is unknown
    pub fn empty(source: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            source: source.into(),
            source_id: None,
            link: link.into(),
            titles: Titles::default(),
            poster: None,
            description: None,
            year: None,
            kind: None,
            kind_code: None,
            status: None,
            status_text: None,
            genres: Vec::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            episode_count: None,
            episode_range: EpisodeRange::default(),
            episode_map: BTreeMap::new(),
            team: Team::default(),
            directors: Vec::new(),
            player: Player::default(),
            torrents: Torrents::default(),
            franchises: Vec::new(),
            release_date_text: None,
            view_count: None,
            comment_count: None,
            uploader: None,
            created_at: Utc::now(),
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// Items on the current page
    pub items: Vec<T>,
    /// Current page number (1-based)
    pub current_page: u32,
    /// Whether the page links to a next page
    pub has_next_page: bool,
}

impl<T> PaginatedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, current_page: u32, has_next_page: bool) -> Self {
        Self {
            items,
            current_page,
            has_next_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD_KEYS: &[&str] = &[
        "id",
        "source",
        "sourceId",
        "link",
        "titles",
        "poster",
        "description",
        "year",
        "type",
        "typeCode",
        "status",
        "statusText",
        "genres",
        "tags",
        "categories",
        "episodeCount",
        "episodeRange",
        "episodeMap",
        "team",
        "directors",
        "player",
        "torrents",
        "franchises",
        "releaseDateText",
        "viewCount",
        "commentCount",
        "uploader",
        "createdAt",
    ];

    #[test]
    fn test_empty_record_has_every_key() {
        let record = AnimeRecord::empty("animevost", "https://animevost.org/tip/tv/1-a.html");
        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();

        for key in RECORD_KEYS {
            assert!(object.contains_key(*key), "missing key {}", key);
        }
        assert_eq!(object.len(), RECORD_KEYS.len());

        assert!(json["poster"].is_null());
        assert!(json["year"].is_null());
        assert_eq!(json["genres"], serde_json::json!([]));
        assert!(json["titles"]["english"].is_null());
        assert!(json["episodeRange"]["displayString"].is_null());
        assert!(json["player"]["alternativePlayerUrls"].is_null());
        assert_eq!(json["player"]["isRutube"], serde_json::json!(false));
        assert_eq!(json["team"]["voice"], serde_json::json!([]));
        assert_eq!(json["torrents"]["list"], serde_json::json!([]));
    }

    #[test]
    fn test_episode_entry_defaults() {
        let entry = EpisodeEntry::new(3, "3 серия");
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["episodeNumber"], 3);
        assert_eq!(json["label"], "3 серия");
        assert!(json["createdTimestamp"].is_null());
        assert!(json["previewUrl"].is_null());
        assert!(json["streamUrl"].is_null());
        assert_eq!(json["skipMarkers"]["opening"], serde_json::json!([]));
        assert_eq!(json["skipMarkers"]["ending"], serde_json::json!([]));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = EpisodeEntry::new(1, "1");
        let b = EpisodeEntry::new(1, "1");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_episode_map_keys_serialize_in_order() {
        let mut record = AnimeRecord::empty("animevost", "https://a.test/1-a.html");
        record.episode_map.insert(10, EpisodeEntry::new(10, "10 серия"));
        record.episode_map.insert(2, EpisodeEntry::new(2, "2 серия"));

        let json = serde_json::to_string(&record.episode_map).unwrap();
        let two = json.find("\"2\"").unwrap();
        let ten = json.find("\"10\"").unwrap();
        assert!(two < ten);
    }

    #[test]
    fn test_listing_entry_serialization() {
        let entry = ListingEntry {
            title: "Наруто".to_string(),
            link: "https://animevost.org/tip/tv/1-naruto.html".to_string(),
            poster: None,
            section: None,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: ListingEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, entry);
        assert!(json.contains("\"poster\":null"));
    }

}
