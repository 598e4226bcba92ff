//! Anime Catalog Crawler Core Library
//!
//! This crate provides the crawling and extraction functionality for the
//! AnimeVost and AniDub anime catalogs.
//!
//! # Features
//! - Paginate catalog listings until they run out
//! - Extract titles, posters, episode maps and playback links from detail pages
//! - Normalize both sources into one `AnimeRecord` schema
//! - Rate-limited HTTP client with retries for transient errors
//! - Selectors and labels as per-source configuration

pub mod client;
pub mod config;
pub mod crawler;
pub mod error;
pub mod links;
pub mod parser;
pub mod sink;
pub mod types;

// Re-export main types for convenience
pub use client::{ClientConfig, CrawlClient, RateLimiter};
pub use config::{CrawlConfig, CrawlSettings, SourceProfile};
pub use crawler::{CrawlSummary, Crawler, StopReason};
pub use error::{CrawlError, Result};
pub use sink::{JsonFileSink, MemorySink, RecordSink};
pub use types::{AnimeRecord, EpisodeEntry, ListingEntry, PaginatedResult};
