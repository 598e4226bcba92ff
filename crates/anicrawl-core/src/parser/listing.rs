//! Listing page parser
//!
//! Turns one page of a catalog index into [`ListingEntry`] values.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::{ListingSelectors, SourceProfile};
use crate::error::{CrawlError, Result};
use crate::links::absolutize;
use crate::types::{ListingEntry, PaginatedResult};

use super::text::{element_text, first_attr, first_text, IMAGE_ATTRS};

/// Parse one listing page.
///
/// # Arguments
/// * `html` - Raw HTML of the listing page
/// * `profile` - Source profile providing the selectors
/// * `base` - Origin used to absolutize links and posters
/// * `section` - Catalog section the page belongs to, copied to each entry
/// * `page` - Page number, stored in the result
///
/// # Returns
/// * `Ok(PaginatedResult<ListingEntry>)`, possibly with no items
/// * `Err(CrawlError::ParseError)` if the card selector is invalid
pub fn parse_listing(
    html: &str,
    profile: &SourceProfile,
    base: &Url,
    section: Option<&str>,
    page: u32,
) -> Result<PaginatedResult<ListingEntry>> {
    let document = Html::parse_document(html);
    let selectors = &profile.listing;

    let item_selector = Selector::parse(&selectors.item)
        .map_err(|e| CrawlError::ParseError(format!("Invalid selector {:?}: {:?}", selectors.item, e)))?;

    let items = document
        .select(&item_selector)
        .filter_map(|card| parse_listing_item(&card, selectors, base, section))
        .collect();

    let has_next_page = detect_next_page(&document, &selectors.next_page);

    Ok(PaginatedResult::new(items, page, has_next_page))
}

/// Parse a single catalog card.
///
/// Cards without a usable title or without a link produce no entry.
fn parse_listing_item(
    card: &ElementRef,
    selectors: &ListingSelectors,
    base: &Url,
    section: Option<&str>,
) -> Option<ListingEntry> {
    let link_selector = Selector::parse(&selectors.link).ok()?;
    let anchor = card.select(&link_selector).next();

    let link = anchor
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| absolutize(base, href))?;

    let poster_el = find_poster(card, &selectors.poster);

    let title = first_text(card, &selectors.title)
        .or_else(|| anchor.map(|a| element_text(&a)).filter(|t| !t.is_empty()))
        .or_else(|| {
            poster_el
                .and_then(|img| img.value().attr("alt"))
                .map(|alt| alt.trim().to_string())
                .filter(|alt| !alt.is_empty())
        })?;

    let poster = poster_el
        .and_then(|img| first_attr(&img, IMAGE_ATTRS))
        .and_then(|src| absolutize(base, src));

    Some(ListingEntry {
        title,
        link,
        poster,
        section: section.map(str::to_string),
    })
}

/// First poster image inside a card.
fn find_poster<'a>(card: &ElementRef<'a>, selectors: &[String]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| card.select(&selector).next())
}

/// Whether the page links to a next page.
fn detect_next_page(document: &Html, selectors: &[String]) -> bool {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .any(|selector| document.select(&selector).next().is_some())
}
