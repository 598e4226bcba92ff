//! Crawl configuration and per-source selector profiles
//!
//! Catalog markup changes over time, so selectors and field labels are data,
//! not code. A [`SourceProfile`] describes one source in one markup version;
//! the two built-in profiles cover AnimeVost and AniDub. Profiles can be
//! overridden from a TOML file.

use std::path::Path;
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::ClientConfig;
use crate::error::{CrawlError, Result};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Selectors for listing pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// One element per catalog card
    pub item: String,
    /// Anchor inside the card carrying the detail link
    pub link: String,
    /// Title elements inside the card, tried before the anchor text
    pub title: Vec<String>,
    /// Poster images inside the card
    pub poster: Vec<String>,
    /// Links that only exist when there is a next page
    pub next_page: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item: ".shortstory".to_string(),
            link: ".shortstoryHead h2 a".to_string(),
            title: Vec::new(),
            poster: strings(&[".short-img img", ".shortstoryContent img"]),
            next_page: strings(&["a[rel='next']", ".pagination a.next"]),
        }
    }
}

/// Selectors for detail pages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectors {
    pub title: Vec<String>,
    pub poster: Vec<String>,
    pub description: Vec<String>,
    /// Blocks holding "Label: value" lines
    pub info_blocks: Vec<String>,
    /// Franchise links inside the spoiler block
    pub franchises: Vec<String>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub uploader: Vec<String>,
    pub view_count: Vec<String>,
    pub comment_count: Vec<String>,
    pub release_date: Vec<String>,
    /// Torrent links, in addition to any `.torrent` / `magnet:` link
    pub torrents: Vec<String>,
}

/// Russian-language labels that precede values in info blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLabels {
    pub year: Vec<String>,
    pub genres: Vec<String>,
    pub kind: Vec<String>,
    pub status: Vec<String>,
    pub episode_count: Vec<String>,
    pub directors: Vec<String>,
    pub tags: Vec<String>,
    pub description: Vec<String>,
    pub alternative_title: Vec<String>,
    pub release_date: Vec<String>,
    pub views: Vec<String>,
    pub comments: Vec<String>,
    pub uploader: Vec<String>,
    pub voice: Vec<String>,
    pub translator: Vec<String>,
    pub editing: Vec<String>,
    pub decor: Vec<String>,
    pub timing: Vec<String>,
}

impl Default for FieldLabels {
    fn default() -> Self {
        Self {
            year: strings(&["Год выхода:", "Год выпуска:", "Год:"]),
            genres: strings(&["Жанр:", "Жанры:"]),
            kind: strings(&["Тип:"]),
            status: strings(&["Состояние:", "Статус:"]),
            episode_count: strings(&["Количество серий:", "Серии:", "Эпизоды:"]),
            directors: strings(&["Режиссёр:", "Режиссер:"]),
            tags: strings(&["Теги:"]),
            description: strings(&["Описание:"]),
            alternative_title: strings(&["Альтернативное название:", "Другие названия:"]),
            release_date: strings(&["Дата выхода:", "Дата выпуска:", "Дата премьеры:"]),
            views: strings(&["Просмотров:"]),
            comments: strings(&["Комментариев:"]),
            uploader: strings(&["Автор:", "Добавил:"]),
            voice: strings(&["Озвучивание:", "Озвучка:", "Озвучили:"]),
            translator: strings(&["Перевод:", "Переводчик:"]),
            editing: strings(&["Редактирование:", "Монтаж:"]),
            decor: strings(&["Оформление:"]),
            timing: strings(&["Тайминг:", "Работа над звуком:"]),
        }
    }
}

impl FieldLabels {
    /// Every label of every field
    pub fn all(&self) -> impl Iterator<Item = &String> {
        [
            &self.year,
            &self.genres,
            &self.kind,
            &self.status,
            &self.episode_count,
            &self.directors,
            &self.tags,
            &self.description,
            &self.alternative_title,
            &self.release_date,
            &self.views,
            &self.comments,
            &self.uploader,
            &self.voice,
            &self.translator,
            &self.editing,
            &self.decor,
            &self.timing,
        ]
        .into_iter()
        .flatten()
    }
}

/// Everything needed to crawl one source in one markup version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Short name, also used for output file names
    pub name: String,
    /// Site origin, e.g. `https://animevost.org`
    pub base_url: String,
    /// Catalog sections crawled one after another; empty means the site root
    #[serde(default)]
    pub sections: Vec<String>,
    /// Path of page `n > 1` relative to the section root; `{page}` is replaced
    #[serde(default = "default_page_path")]
    pub page_path: String,
    #[serde(default)]
    pub listing: ListingSelectors,
    #[serde(default)]
    pub detail: DetailSelectors,
    #[serde(default)]
    pub labels: FieldLabels,
    /// Episode preview URL, `{id}` is replaced by the embedded episode value
    #[serde(default)]
    pub preview_template: Option<String>,
    /// Episode stream URL, `{id}` is replaced by the embedded episode value
    #[serde(default)]
    pub stream_template: Option<String>,
}

fn default_page_path() -> String {
    "page/{page}/".to_string()
}

impl SourceProfile {
    /// AnimeVost (`animevost.org`), DLE template with `.shortstory` cards
    pub fn animevost() -> Self {
        Self {
            name: "animevost".to_string(),
            base_url: "https://animevost.org".to_string(),
            sections: Vec::new(),
            page_path: default_page_path(),
            listing: ListingSelectors::default(),
            detail: DetailSelectors {
                title: strings(&[".shortstoryHead h1", "h1", ".title"]),
                poster: strings(&["img.imgRadius", ".short-img img", ".shortstoryContent img"]),
                description: strings(&[".shortstoryContent p:last-child", ".short-story"]),
                info_blocks: strings(&[".shortstoryContent", ".short-info"]),
                franchises: strings(&[".text_spoiler ol li a", ".text_spoiler a"]),
                tags: strings(&[".tags a"]),
                categories: strings(&[".shortstoryFuter a[href*='/zhanr/']", ".shortstoryFuter a[href*='/tip/']"]),
                uploader: strings(&[".shortstoryFuter a[href*='/user/']"]),
                view_count: strings(&[".shortstoryFuter .views"]),
                comment_count: strings(&[".shortstoryFuter .comments", ".shortstoryFuter a[href*='#comment']"]),
                release_date: Vec::new(),
                torrents: strings(&["a[href*='/engine/download.php']"]),
            },
            labels: FieldLabels::default(),
            preview_template: Some("https://media.aniland.org/img/{id}.jpg".to_string()),
            stream_template: None,
        }
    }

    /// AniDub (`anidub.biz`), newer `.th-item` card layout
    pub fn anidub() -> Self {
        Self {
            name: "anidub".to_string(),
            base_url: "https://anidub.biz".to_string(),
            sections: strings(&[
                "anime_tv",
                "anime_movie",
                "anime_ova",
                "anime_ona",
                "anime_ongoing",
                "full",
            ]),
            page_path: default_page_path(),
            listing: ListingSelectors {
                item: ".th-item".to_string(),
                link: "a.th-in".to_string(),
                title: strings(&[".th-title"]),
                poster: strings(&[".th-img img"]),
                next_page: strings(&[".navigation a.next", ".pnext a", "a[rel='next']"]),
            },
            detail: DetailSelectors {
                title: strings(&[".fright h1", ".content-title", "h1", ".title"]),
                poster: strings(&[".fposter img", ".poster img", ".fullimg img"]),
                description: strings(&[".fdesc", ".full-text", ".full-story"]),
                info_blocks: strings(&[".flist", ".fright", ".full-story"]),
                franchises: strings(&[".spoiler ol li a", ".franchise a", ".text_spoiler ol li a"]),
                tags: strings(&[".ftags a", ".tags a"]),
                categories: strings(&[".speedbar a[href*='/anime']", ".fright .fmeta a"]),
                uploader: strings(&[".fauthor a", ".fmeta a[href*='/user/']"]),
                view_count: strings(&[".fviews", ".fmeta .views"]),
                comment_count: strings(&[".fcomms", ".fmeta .comments"]),
                release_date: strings(&[".fdate", "time[datetime]"]),
                torrents: strings(&[".torrent a", "a[href*='/engine/download.php']"]),
            },
            labels: FieldLabels::default(),
            preview_template: None,
            stream_template: None,
        }
    }

    /// Parsed site origin
    ///
    /// # Errors
    /// Returns `CrawlError::InvalidUrl` if `base_url` is not an absolute URL
    pub fn base(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(CrawlError::InvalidUrl(self.base_url.clone()));
        }
        Ok(url)
    }

    /// Root URL of every listing to paginate, paired with its section name
    pub fn listing_roots(&self) -> Result<Vec<(Option<String>, Url)>> {
        let base = self.base()?;

        if self.sections.is_empty() {
            return Ok(vec![(None, base)]);
        }

        self.sections
            .iter()
            .map(|section| {
                let path = format!("{}/", section.trim_matches('/'));
                base.join(&path)
                    .map(|url| (Some(section.clone()), url))
                    .map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", path, e)))
            })
            .collect()
    }

    /// URL of listing page `page` under `root`.
    ///
    /// Page 1 is the root itself, never `page/1/`.
    pub fn page_url(&self, root: &Url, page: u32) -> Result<String> {
        if page <= 1 {
            return Ok(root.to_string());
        }

        let path = self.page_path.replace("{page}", &page.to_string());
        root.join(&path)
            .map(|u| u.to_string())
            .map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Check the base URL and every selector of the profile
    ///
    /// # Errors
    /// Returns `CrawlError::Config` naming the first broken setting
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CrawlError::Config("source name is empty".to_string()));
        }
        self.base()
            .map_err(|e| CrawlError::Config(format!("{}: {}", self.name, e)))?;
        if !self.page_path.contains("{page}") {
            return Err(CrawlError::Config(format!(
                "{}: page_path must contain {{page}}",
                self.name
            )));
        }

        let listing = &self.listing;
        let detail = &self.detail;
        let singles = [&listing.item, &listing.link];
        let lists = [
            &listing.title,
            &listing.poster,
            &listing.next_page,
            &detail.title,
            &detail.poster,
            &detail.description,
            &detail.info_blocks,
            &detail.franchises,
            &detail.tags,
            &detail.categories,
            &detail.uploader,
            &detail.view_count,
            &detail.comment_count,
            &detail.release_date,
            &detail.torrents,
        ];

        for selector in singles.into_iter().chain(lists.into_iter().flatten()) {
            if Selector::parse(selector).is_err() {
                return Err(CrawlError::Config(format!(
                    "{}: invalid selector {:?}",
                    self.name, selector
                )));
            }
        }

        Ok(())
    }
}

/// Pacing and limits for one crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Delay after each non-empty listing page (default: 1000)
    pub page_delay_ms: u64,
    /// Delay after each detail page (default: 20)
    pub item_delay_ms: u64,
    /// Safety cap on listing pages per section; `None` disables it
    pub max_pages: Option<u32>,
    /// Resolve at most this many listing entries per source
    pub item_limit: Option<usize>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            page_delay_ms: 1000,
            item_delay_ms: 20,
            max_pages: Some(500),
            item_limit: None,
        }
    }
}

impl CrawlSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub client: ClientConfig,
    pub crawl: CrawlSettings,
    pub sources: Vec<SourceProfile>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            crawl: CrawlSettings::default(),
            sources: vec![SourceProfile::animevost(), SourceProfile::anidub()],
        }
    }
}

impl CrawlConfig {
    /// Parse configuration from TOML text; missing keys take defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CrawlError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CrawlError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Look up a source profile by name
    pub fn source(&self, name: &str) -> Option<&SourceProfile> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Validate every source profile
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(CrawlError::Config("no sources configured".to_string()));
        }
        self.sources.iter().try_for_each(SourceProfile::validate)
    }
}
