//! Crawl orchestration for one source
//!
//! This module combines the HTTP client with the parsers: it paginates the
//! listing of every section until the listing runs out, then resolves each
//! listed item into a full record and hands it to a [`RecordSink`].
//! Fetches are strictly sequential.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{wait, ClientConfig, CrawlClient};
use crate::config::{CrawlSettings, SourceProfile};
use crate::error::Result;
use crate::parser::{parse_detail, parse_listing};
use crate::sink::RecordSink;
use crate::types::{AnimeRecord, ListingEntry, PaginatedResult};

/// Why pagination of a listing stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page parsed to zero entries, the natural end of a listing
    EmptyPage,
    /// A page could not be fetched or parsed
    Error,
    /// The configured page cap was reached
    PageCap,
    /// A page listed exactly the entries of the page before it
    RepeatedPage,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::EmptyPage => "empty page",
            StopReason::Error => "error",
            StopReason::PageCap => "page cap",
            StopReason::RepeatedPage => "repeated page",
        };
        f.write_str(text)
    }
}

/// Counters for one crawled source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub source: String,
    /// Entries collected from the listing
    pub listed: usize,
    /// Records written to the sink
    pub resolved: usize,
    /// Items skipped because their detail page failed
    pub failed: usize,
}

/// Crawler for a single source profile
///
/// # Example
/// ```no_run
/// use anicrawl_core::{CrawlSettings, Crawler, JsonFileSink, SourceProfile};
///
/// # async fn example() -> anicrawl_core::Result<()> {
/// let crawler = Crawler::new(SourceProfile::animevost(), CrawlSettings::default())?;
/// let mut sink = JsonFileSink::new("data")?;
/// let summary = crawler.run(&mut sink).await?;
/// println!("{} records", summary.resolved);
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    client: CrawlClient,
    profile: SourceProfile,
    base: Url,
    settings: CrawlSettings,
}

impl Crawler {
    /// Create a crawler with the default client configuration.
    ///
    /// # Errors
    /// Returns an error if the profile's base URL is invalid or the HTTP
    /// client cannot be created.
    pub fn new(profile: SourceProfile, settings: CrawlSettings) -> Result<Self> {
        Self::with_config(profile, settings, &ClientConfig::default())
    }

    /// Create a crawler with a custom client configuration.
    pub fn with_config(
        profile: SourceProfile,
        settings: CrawlSettings,
        client_config: &ClientConfig,
    ) -> Result<Self> {
        let client = CrawlClient::with_config(client_config)?;
        Self::with_client(client, profile, settings)
    }

    /// Create a crawler around a pre-configured client.
    ///
    /// # Arguments
    /// * `client` - Client shared by listing and detail fetches
    /// * `profile` - Source to crawl
    /// * `settings` - Delays and limits
    pub fn with_client(client: CrawlClient, profile: SourceProfile, settings: CrawlSettings) -> Result<Self> {
        let base = profile.base()?;
        Ok(Self {
            client,
            profile,
            base,
            settings,
        })
    }

    pub fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    /// Fetch and parse one listing page.
    ///
    /// # Arguments
    /// * `root` - Listing root of the section (page 1)
    /// * `section` - Section name copied into the entries
    /// * `page` - Page number (1-based)
    pub async fn fetch_listing_page(
        &self,
        root: &Url,
        section: Option<&str>,
        page: u32,
    ) -> Result<PaginatedResult<ListingEntry>> {
        let url = self.profile.page_url(root, page)?;
        let html = self.client.fetch(&url).await?;
        parse_listing(&html, &self.profile, &self.base, section, page)
    }

    /// Paginate one listing root until a stop condition holds.
    ///
    /// Entries collected before the stop are always returned.
    pub async fn crawl_section(&self, section: Option<&str>, root: &Url) -> (Vec<ListingEntry>, StopReason) {
        let mut entries = Vec::new();
        let mut previous_links: Option<Vec<String>> = None;
        let mut page: u32 = 1;

        let reason = loop {
            if self.settings.max_pages.is_some_and(|cap| page > cap) {
                break StopReason::PageCap;
            }

            let result = match self.fetch_listing_page(root, section, page).await {
                Ok(result) => result,
                Err(error) => {
                    warn!(
                        source = %self.profile.name,
                        page,
                        url = error.url().unwrap_or_default(),
                        error = %error,
                        "Listing page failed"
                    );
                    break StopReason::Error;
                }
            };

            if result.items.is_empty() {
                break StopReason::EmptyPage;
            }

            let links: Vec<String> = result.items.iter().map(|e| e.link.clone()).collect();
            if previous_links.as_ref() == Some(&links) {
                break StopReason::RepeatedPage;
            }

            debug!(
                source = %self.profile.name,
                page,
                items = result.items.len(),
                has_next_page = result.has_next_page,
                "Parsed listing page"
            );

            entries.extend(result.items);
            previous_links = Some(links);
            page += 1;

            wait(self.settings.page_delay()).await;
        };

        info!(
            source = %self.profile.name,
            section = section.unwrap_or("/"),
            pages = page - 1,
            entries = entries.len(),
            reason = %reason,
            "Listing finished"
        );

        (entries, reason)
    }

    /// Collect the listing of every section of the source.
    ///
    /// # Errors
    /// Only configuration errors (bad section paths) are returned; fetch
    /// errors end the affected section early.
    pub async fn crawl_listing(&self) -> Result<Vec<ListingEntry>> {
        let mut entries = Vec::new();

        for (section, root) in self.profile.listing_roots()? {
            let (found, _) = self.crawl_section(section.as_deref(), &root).await;
            entries.extend(found);
        }

        Ok(entries)
    }

    /// Fetch a detail page and build its record.
    ///
    /// # Returns
    /// * `Ok(AnimeRecord)` with every field present
    /// * `Err(CrawlError)` only if the page could not be fetched
    pub async fn resolve(&self, link: &str) -> Result<AnimeRecord> {
        let html = self.client.fetch(link).await?;
        Ok(parse_detail(&html, &self.profile, &self.base, link))
    }

    /// Resolve listing entries and write each record as soon as it is built.
    ///
    /// Items whose detail page fails are logged and skipped. At most
    /// `item_limit` entries are processed.
    ///
    /// # Errors
    /// Returns the first sink error; nothing after it is written.
    pub async fn resolve_all<S: RecordSink + ?Sized>(
        &self,
        entries: &[ListingEntry],
        sink: &mut S,
    ) -> Result<(usize, usize)> {
        let limit = self.settings.item_limit.unwrap_or(usize::MAX);
        let mut resolved = 0;
        let mut failed = 0;

        for entry in entries.iter().take(limit) {
            match self.resolve(&entry.link).await {
                Ok(record) => {
                    sink.write_record(&record)?;
                    resolved += 1;
                }
                Err(error) => {
                    warn!(url = %entry.link, error = %error, "Skipping item");
                    failed += 1;
                }
            }

            wait(self.settings.item_delay()).await;
        }

        Ok((resolved, failed))
    }

    /// Crawl the whole source: listing, then every detail page.
    pub async fn run<S: RecordSink + ?Sized>(&self, sink: &mut S) -> Result<CrawlSummary> {
        let name = self.profile.name.clone();
        info!(source = %name, base = %self.base, "Crawl started");

        let entries = self.crawl_listing().await?;
        sink.write_listing(&name, &entries)?;

        let (resolved, failed) = self.resolve_all(&entries, sink).await?;

        let summary = CrawlSummary {
            source: name,
            listed: entries.len(),
            resolved,
            failed,
        };
        info!(
            source = %summary.source,
            listed = summary.listed,
            resolved = summary.resolved,
            failed = summary.failed,
            "Crawl finished"
        );

        Ok(summary)
    }
}
