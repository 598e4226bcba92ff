//! HTML parsers for catalog pages
//!
//! This module contains parsers for extracting data from catalog HTML pages:
//! - `listing`: Parse one page of a catalog index
//! - `detail`: Parse a detail page into an `AnimeRecord`
//! - `fields`: Per-field extraction chains used by `detail`
//! - `embedded`: Decode the episode map embedded in page scripts
//! - `text`: Shared text and label helpers

pub mod detail;
pub mod embedded;
pub mod fields;
pub mod listing;
pub mod text;

// Re-export main parsing functions
pub use detail::parse_detail;
pub use embedded::{decode_script, extract_episode_map, DecodeOutcome};
pub use fields::{parse_episode_range, parse_title, parse_year, strip_bracket_suffix};
pub use listing::parse_listing;
pub use text::{block_text, label_value};
