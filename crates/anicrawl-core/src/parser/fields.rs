//! Field extractors for detail pages
//!
//! Every field is read by a short chain of strategies; the first one that
//! yields a non-empty value wins. Extractors never fail: a field that cannot
//! be found is `None` or an empty list.

use std::sync::LazyLock;

use regex_lite::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::config::SourceProfile;
use crate::links::{absolutize, host_of};
use crate::types::{EpisodeRange, Franchise, Player, Team, TorrentDescriptor};

use super::text::{
    all_texts, block_text, is_block_tag, element_text, first_attr, first_number, first_text, label_value,
    parse_count, split_list, strip_label, IMAGE_ATTRS,
};

/// Links always treated as torrents, on top of the profile selectors
const TORRENT_SELECTORS: &[&str] = &["a[href$='.torrent']", "a[href^='magnet:']"];

static BRACKET_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)(?:\s*[-–]\s*(\d+))?").unwrap());
static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"из\s*(\d+)").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());
static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(\d{3,4}p)\b").unwrap());
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?\s*(?:GB|MB|KB|ГБ|МБ|КБ|Гб|Мб|Кб))").unwrap()
});

/// A parsed detail document together with the source it came from.
///
/// The text of the profile's info blocks is rendered once up front; the
/// page body is appended after them so label lookups still work on pages
/// whose layout does not match any info block selector.
pub struct DetailPage<'a> {
    document: &'a Html,
    profile: &'a SourceProfile,
    base: &'a Url,
    info: String,
}

impl<'a> DetailPage<'a> {
    pub fn new(document: &'a Html, profile: &'a SourceProfile, base: &'a Url) -> Self {
        let root = document.root_element();
        let mut blocks = Vec::new();

        for selector_str in &profile.detail.info_blocks {
            if let Ok(selector) = Selector::parse(selector_str) {
                blocks.extend(root.select(&selector).map(|el| block_text(&el)));
            }
        }
        if let Ok(selector) = Selector::parse("body") {
            blocks.extend(root.select(&selector).map(|el| block_text(&el)));
        }

        Self {
            document,
            profile,
            base,
            info: blocks.join("\n"),
        }
    }

    fn root(&self) -> ElementRef<'a> {
        self.document.root_element()
    }

    fn label(&self, labels: &[String]) -> Option<String> {
        label_value(&self.info, labels)
    }

    fn absolutize(&self, raw: &str) -> Option<String> {
        absolutize(self.base, raw)
    }

    fn meta(&self, property: &str) -> Option<String> {
        let selector = Selector::parse(&format!("meta[property='{}']", property)).ok()?;
        self.document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string)
    }
}

/// Title heading split into its parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTitle {
    /// Main (usually Russian) title without the bracketed suffix
    pub primary: String,
    /// Title after the first " / ", usually the romanized/English one
    pub english: Option<String>,
    /// Further " / " separated names
    pub alternative: Option<String>,
    /// Content of the first `[...]`, e.g. "1-12 из 12"
    pub bracket: Option<String>,
}

/// Cut a title at its first `[`.
///
/// # Examples
/// ```
/// use anicrawl_core::parser::fields::strip_bracket_suffix;
///
/// assert_eq!(strip_bracket_suffix("Show Name [HD, 12 eps]"), "Show Name");
/// ```
pub fn strip_bracket_suffix(raw: &str) -> String {
    raw.split('[').next().unwrap_or_default().trim().to_string()
}

/// Split a raw heading like `Наруто / Naruto [1-220 из 220]`.
pub fn parse_title(raw: &str) -> ParsedTitle {
    let raw = raw.trim();

    let bracket = raw
        .find('[')
        .map(|idx| &raw[idx + 1..])
        .and_then(|rest| rest.split(']').next())
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string);

    let mut names = strip_bracket_suffix(raw);
    if names.is_empty() {
        // Title starts with a bracket, drop bracketed groups instead
        names = BRACKET_GROUP_RE.replace_all(raw, " ").trim().to_string();
    }

    let mut parts = names
        .split(" / ")
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let primary = parts.next().unwrap_or_default().to_string();
    let english = parts.next().map(str::to_string);
    let rest: Vec<&str> = parts.collect();
    let alternative = (!rest.is_empty()).then(|| rest.join(" / "));

    ParsedTitle {
        primary,
        english,
        alternative,
        bracket,
    }
}

/// Read the title heading, falling back to `og:title` and `<title>`.
pub fn extract_title(page: &DetailPage) -> ParsedTitle {
    let raw = first_text(&page.root(), &page.profile.detail.title)
        .or_else(|| page.meta("og:title"))
        .or_else(|| first_text(&page.root(), &["title".to_string()]));

    raw.map(|r| parse_title(&r)).unwrap_or_default()
}

/// Alternative title from its label, then from extra " / " parts.
pub fn extract_alternative_title(page: &DetailPage, title: &ParsedTitle) -> Option<String> {
    page.label(&page.profile.labels.alternative_title)
        .or_else(|| title.alternative.clone())
}

/// Episode range from a title bracket such as "1-12 из 12".
///
/// # Examples
/// ```
/// use anicrawl_core::parser::fields::parse_episode_range;
///
/// let range = parse_episode_range("1-12 из 24");
/// assert_eq!(range.first, Some(1));
/// assert_eq!(range.last, Some(12));
/// assert_eq!(range.display_string.as_deref(), Some("1-12 из 24"));
/// ```
pub fn parse_episode_range(bracket: &str) -> EpisodeRange {
    let Some(caps) = RANGE_RE.captures(bracket) else {
        return EpisodeRange::default();
    };

    let first = caps.get(1).and_then(|m| m.as_str().parse().ok());
    let last = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .or(first);

    EpisodeRange {
        first,
        last,
        display_string: Some(bracket.trim().to_string()),
    }
}

/// Announced total from a bracket such as "1-12 из 24".
pub fn bracket_total(bracket: &str) -> Option<u32> {
    TOTAL_RE.captures(bracket)?.get(1)?.as_str().parse().ok()
}

/// Poster image, then `og:image`, absolutized.
pub fn extract_poster(page: &DetailPage) -> Option<String> {
    let root = page.root();

    page.profile
        .detail
        .poster
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .flat_map(|selector| root.select(&selector).collect::<Vec<_>>())
        .filter_map(|img| first_attr(&img, IMAGE_ATTRS))
        .find_map(|src| page.absolutize(src))
        .or_else(|| page.meta("og:image").and_then(|src| page.absolutize(&src)))
}

/// Description from its labelled block, then from description blocks.
///
/// The labelled block keeps every line after the label, so text broken up
/// by `<br>` stays whole.
pub fn extract_description(page: &DetailPage) -> Option<String> {
    let labels = &page.profile.labels.description;
    let stop_labels: Vec<&str> = page
        .profile
        .labels
        .all()
        .filter(|label| !labels.contains(*label))
        .map(String::as_str)
        .collect();

    labelled_block(&page.root(), labels, &stop_labels)
        .or_else(|| page.label(labels))
        .or_else(|| {
            first_text(&page.root(), &page.profile.detail.description)
                .map(|text| strip_label(&text, labels))
                .filter(|text| !text.is_empty())
        })
}

/// Text after a label up to the end of the block holding the label.
///
/// The block is the nearest block-level ancestor of the text node carrying
/// the label. Lines are kept until one starts with a label in `stop_labels`.
pub fn labelled_block<S: AsRef<str>>(
    scope: &ElementRef,
    labels: &[S],
    stop_labels: &[&str],
) -> Option<String> {
    labels.iter().find_map(|label| {
        let label = label.as_ref();

        scope
            .descendants()
            .filter(|node| matches!(node.value(), Node::Text(text) if text.contains(label)))
            .filter_map(|node| {
                node.ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|el| is_block_tag(el.value().name()))
            })
            .find_map(|block| {
                let text = block_text(&block);
                let idx = text.find(label)?;

                let mut lines = text[idx + label.len()..].lines().map(str::trim);
                let mut kept: Vec<&str> = lines.next().into_iter().collect();
                kept.extend(
                    lines.take_while(|line| !stop_labels.iter().any(|stop| line.starts_with(stop))),
                );

                let value = kept
                    .into_iter()
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                (!value.is_empty()).then_some(value)
            })
    })
}

/// Year following one of `labels` in `text`.
///
/// # Examples
/// ```
/// use anicrawl_core::parser::fields::parse_year;
///
/// assert_eq!(parse_year("Год выхода: 2019", &["Год выхода:"]), Some(2019));
/// assert_eq!(parse_year("Жанр: драма", &["Год выхода:"]), None);
/// ```
pub fn parse_year<S: AsRef<str>>(text: &str, labels: &[S]) -> Option<u16> {
    let value = label_value(text, labels)?;
    YEAR_RE.find(&value)?.as_str().parse().ok()
}

pub fn extract_year(page: &DetailPage) -> Option<u16> {
    parse_year(&page.info, &page.profile.labels.year)
}

/// Genres from their label; no label means no genres.
pub fn extract_genres(page: &DetailPage) -> Vec<String> {
    page.label(&page.profile.labels.genres)
        .map(|value| split_list(&value))
        .unwrap_or_default()
}

pub fn extract_directors(page: &DetailPage) -> Vec<String> {
    page.label(&page.profile.labels.directors)
        .map(|value| split_list(&value))
        .unwrap_or_default()
}

/// Tags from their label, then from tag links.
pub fn extract_tags(page: &DetailPage) -> Vec<String> {
    page.label(&page.profile.labels.tags)
        .map(|value| split_list(&value))
        .filter(|tags| !tags.is_empty())
        .unwrap_or_else(|| all_texts(&page.root(), &page.profile.detail.tags))
}

pub fn extract_categories(page: &DetailPage) -> Vec<String> {
    all_texts(&page.root(), &page.profile.detail.categories)
}

/// Type as written on the page, e.g. "ТВ (12 эп.)"
pub fn extract_kind(page: &DetailPage) -> Option<String> {
    page.label(&page.profile.labels.kind)
}

/// Normalized type code for a type value.
///
/// Specials are checked first so "ТВ-спешл" maps to SPECIAL, not TV.
///
/// # Examples
/// ```
/// use anicrawl_core::parser::fields::kind_code;
///
/// assert_eq!(kind_code("ТВ (12 эп.)"), Some("TV"));
/// assert_eq!(kind_code("ТВ-спешл"), Some("SPECIAL"));
/// assert_eq!(kind_code("клип"), None);
/// ```
pub fn kind_code(kind: &str) -> Option<&'static str> {
    const CODES: &[(&str, &[&str])] = &[
        ("SPECIAL", &["спешл", "спэшл", "special", "sp"]),
        ("OVA", &["ova", "ова"]),
        ("ONA", &["ona", "она"]),
        ("MOVIE", &["фильм", "полнометражный", "movie"]),
        ("TV", &["тв", "tv", "сериал"]),
    ];

    let lower = kind.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    CODES
        .iter()
        .find(|(_, keys)| words.iter().any(|w| keys.contains(w)))
        .map(|(code, _)| *code)
}

/// Raw status value, e.g. "онгоинг"
pub fn extract_status_text(page: &DetailPage) -> Option<String> {
    page.label(&page.profile.labels.status)
}

/// Normalized status code for a status value.
pub fn status_code(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();

    if ["онгоинг", "выходит", "ongoing"].iter().any(|k| lower.contains(k)) {
        Some("ONGOING")
    } else if ["заверш", "вышел", "finished", "completed"].iter().any(|k| lower.contains(k)) {
        Some("FINISHED")
    } else if ["анонс", "announce"].iter().any(|k| lower.contains(k)) {
        Some("ANNOUNCED")
    } else {
        None
    }
}

/// Status from the status label, then from released vs. announced episodes.
pub fn derive_status(
    status_text: Option<&str>,
    range: &EpisodeRange,
    episode_count: Option<u32>,
) -> Option<String> {
    status_text
        .and_then(status_code)
        .or_else(|| match (range.last, episode_count) {
            (Some(last), Some(total)) if last < total => Some("ONGOING"),
            (Some(_), Some(_)) => Some("FINISHED"),
            _ => None,
        })
        .map(str::to_string)
}

/// Episode count from its label, then from the "из N" title bracket.
pub fn extract_episode_count(page: &DetailPage, title: &ParsedTitle) -> Option<u32> {
    page.label(&page.profile.labels.episode_count)
        .and_then(|value| first_number(&value))
        .and_then(|n| u32::try_from(n).ok())
        .or_else(|| title.bracket.as_deref().and_then(bracket_total))
}

pub fn extract_team(page: &DetailPage) -> Team {
    let labels = &page.profile.labels;
    let list = |role: &[String]| {
        page.label(role)
            .map(|value| split_list(&value))
            .unwrap_or_default()
    };

    Team {
        voice: list(&labels.voice),
        translator: list(&labels.translator),
        editing: list(&labels.editing),
        decor: list(&labels.decor),
        timing: list(&labels.timing),
    }
}

/// Links inside the franchise spoiler block.
pub fn extract_franchises(page: &DetailPage) -> Vec<Franchise> {
    let root = page.root();
    let mut franchises: Vec<Franchise> = Vec::new();

    for selector_str in &page.profile.detail.franchises {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };

        for anchor in root.select(&selector) {
            let name = element_text(&anchor);
            let link = anchor
                .value()
                .attr("href")
                .and_then(|href| page.absolutize(href));

            if let Some(link) = link {
                if !name.is_empty() && !franchises.iter().any(|f| f.link == link) {
                    franchises.push(Franchise { name, link });
                }
            }
        }

        if !franchises.is_empty() {
            break;
        }
    }

    franchises
}

/// Every iframe and `<video>` source on the page.
pub fn extract_player(page: &DetailPage) -> Player {
    let iframes = collect_urls(page, "iframe", &["src", "data-src"]);
    let sources = collect_urls(page, "video source, video[src]", &["src", "data-src"]);

    let host = iframes.first().and_then(|url| host_of(url));
    let is_rutube = iframes
        .iter()
        .chain(sources.iter())
        .filter_map(|url| host_of(url))
        .any(|h| h.contains("rutube"));

    Player {
        alternative_player_urls: (!iframes.is_empty()).then_some(iframes),
        source_urls: (!sources.is_empty()).then_some(sources),
        host,
        is_rutube,
    }
}

fn collect_urls(page: &DetailPage, selector: &str, attrs: &[&str]) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    for el in page.document.select(&selector) {
        if let Some(url) = first_attr(&el, attrs).and_then(|src| page.absolutize(src)) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

/// Torrent and magnet links with quality and size read from their labels.
pub fn extract_torrents(page: &DetailPage) -> Vec<TorrentDescriptor> {
    let selectors = page
        .profile
        .detail
        .torrents
        .iter()
        .map(String::as_str)
        .chain(TORRENT_SELECTORS.iter().copied());

    let mut torrents: Vec<TorrentDescriptor> = Vec::new();

    for selector_str in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };

        for anchor in page.document.select(&selector) {
            let Some(url) = anchor.value().attr("href").and_then(|href| {
                let href = href.trim();
                if href.starts_with("magnet:") {
                    Some(href.to_string())
                } else {
                    page.absolutize(href)
                }
            }) else {
                continue;
            };
            if torrents.iter().any(|t| t.url == url) {
                continue;
            }

            let mut label = element_text(&anchor);
            if label.is_empty() {
                label = anchor.value().attr("title").unwrap_or_default().trim().to_string();
            }

            torrents.push(TorrentDescriptor {
                quality: torrent_quality(&label),
                size: torrent_size(&label),
                label,
                url,
            });
        }
    }

    torrents
}

fn torrent_quality(label: &str) -> Option<String> {
    Some(QUALITY_RE.captures(label)?.get(1)?.as_str().to_lowercase())
}

fn torrent_size(label: &str) -> Option<String> {
    Some(SIZE_RE.captures(label)?.get(1)?.as_str().to_string())
}

/// Release date as text: `datetime` attribute, element text, then label.
pub fn extract_release_date(page: &DetailPage) -> Option<String> {
    let root = page.root();

    page.profile
        .detail
        .release_date
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .flat_map(|selector| root.select(&selector).collect::<Vec<_>>())
        .find_map(|el| {
            el.value()
                .attr("datetime")
                .map(|d| d.trim().to_string())
                .or_else(|| Some(element_text(&el)))
                .filter(|d| !d.is_empty())
        })
        .or_else(|| page.label(&page.profile.labels.release_date))
}

pub fn extract_view_count(page: &DetailPage) -> Option<u64> {
    first_text(&page.root(), &page.profile.detail.view_count)
        .and_then(|text| parse_count(&text))
        .or_else(|| {
            page.label(&page.profile.labels.views)
                .and_then(|value| parse_count(&value))
        })
}

pub fn extract_comment_count(page: &DetailPage) -> Option<u64> {
    first_text(&page.root(), &page.profile.detail.comment_count)
        .and_then(|text| parse_count(&text))
        .or_else(|| {
            page.label(&page.profile.labels.comments)
                .and_then(|value| parse_count(&value))
        })
}

pub fn extract_uploader(page: &DetailPage) -> Option<String> {
    first_text(&page.root(), &page.profile.detail.uploader)
        .or_else(|| page.label(&page.profile.labels.uploader))
}
