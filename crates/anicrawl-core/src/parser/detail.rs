//! Detail page parser
//!
//! Builds one complete [`AnimeRecord`] from a detail page. Parsing never
//! fails; fields that cannot be found stay `null` or empty.

use scraper::Html;
use url::Url;

use crate::config::SourceProfile;
use crate::links::extract_item_id;
use crate::types::{AnimeRecord, EpisodeRange, Titles, Torrents};

use super::embedded::extract_episode_map;
use super::fields::{self, DetailPage};

/// Parse a detail page into a record.
///
/// # Arguments
/// * `html` - Raw HTML of the detail page
/// * `profile` - Source profile providing selectors, labels and templates
/// * `base` - Origin used to absolutize links
/// * `link` - Absolute URL the page was fetched from
pub fn parse_detail(html: &str, profile: &SourceProfile, base: &Url, link: &str) -> AnimeRecord {
    let document = Html::parse_document(html);
    let page = DetailPage::new(&document, profile, base);

    let mut record = AnimeRecord::empty(profile.name.as_str(), link);
    record.source_id = extract_item_id(link);

    let title = fields::extract_title(&page);
    record.titles = Titles {
        primary: title.primary.clone(),
        english: title.english.clone(),
        alternative: fields::extract_alternative_title(&page, &title),
    };

    record.poster = fields::extract_poster(&page);
    record.description = fields::extract_description(&page);
    record.year = fields::extract_year(&page);

    record.kind = fields::extract_kind(&page);
    record.kind_code = record
        .kind
        .as_deref()
        .and_then(fields::kind_code)
        .map(str::to_string);

    record.genres = fields::extract_genres(&page);
    record.tags = fields::extract_tags(&page);
    record.categories = fields::extract_categories(&page);
    record.directors = fields::extract_directors(&page);
    record.team = fields::extract_team(&page);

    record.episode_map = extract_episode_map(&document, profile);
    record.episode_count = fields::extract_episode_count(&page, &title);
    record.episode_range = title
        .bracket
        .as_deref()
        .map(fields::parse_episode_range)
        .filter(|range| range.first.is_some())
        .unwrap_or_else(|| range_from_map(&record));

    record.status_text = fields::extract_status_text(&page);
    record.status = fields::derive_status(
        record.status_text.as_deref(),
        &record.episode_range,
        record.episode_count,
    );

    record.player = fields::extract_player(&page);
    record.torrents = Torrents {
        episode_range: record.episode_range.clone(),
        list: fields::extract_torrents(&page),
    };
    record.franchises = fields::extract_franchises(&page);

    record.release_date_text = fields::extract_release_date(&page);
    record.view_count = fields::extract_view_count(&page);
    record.comment_count = fields::extract_comment_count(&page);
    record.uploader = fields::extract_uploader(&page);

    record
}

/// Range spanning the decoded episodes, empty when there are none
fn range_from_map(record: &AnimeRecord) -> EpisodeRange {
    let first = record.episode_map.keys().next().copied();
    let last = record.episode_map.keys().next_back().copied();

    let display_string = match (first, last) {
        (Some(f), Some(l)) if f == l => Some(f.to_string()),
        (Some(f), Some(l)) => Some(format!("{}-{}", f, l)),
        _ => None,
    };

    EpisodeRange {
        first,
        last,
        display_string,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://animevost.org/tip/tv/2830-kimetsu-no-yaiba.html";

    fn vost_detail(info: &str, script: &str) -> String {
        format!(
            r#"<html><head><title>Клинок, рассекающий демонов</title></head><body>
            <div class="shortstory">
              <div class="shortstoryHead"><h1>Клинок, рассекающий демонов / Kimetsu no Yaiba [1-26 из 26]</h1></div>
              <div class="shortstoryContent">
                <img class="imgRadius" src="/uploads/posts/kny.jpg">
                {info}
              </div>
            </div>
            <script>{script}</script>
            </body></html>"#
        )
    }

    fn parse(html: &str) -> AnimeRecord {
        let profile = SourceProfile::animevost();
        let base = profile.base().unwrap();
        parse_detail(html, &profile, &base, LINK)
    }

    #[test]
    fn test_parse_full_record() {
        let html = vost_detail(
            "<p><strong>Год выхода: </strong>2019</p>\
             <p><strong>Жанр: </strong>приключения, сёнэн</p>\
             <p><strong>Тип: </strong>ТВ</p>\
             <p><strong>Состояние: </strong>завершён</p>\
             <p><strong>Количество серий: </strong>26</p>",
            r#"var data = {"1 серия":"100","2 серия":"101"};"#,
        );
        let record = parse(&html);

        assert_eq!(record.source, "animevost");
        assert_eq!(record.source_id, Some(2830));
        assert_eq!(record.link, LINK);
        assert_eq!(record.titles.primary, "Клинок, рассекающий демонов");
        assert_eq!(record.titles.english.as_deref(), Some("Kimetsu no Yaiba"));
        assert_eq!(
            record.poster.as_deref(),
            Some("https://animevost.org/uploads/posts/kny.jpg")
        );
        assert_eq!(record.year, Some(2019));
        assert_eq!(record.genres, vec!["приключения", "сёнэн"]);
        assert_eq!(record.kind.as_deref(), Some("ТВ"));
        assert_eq!(record.kind_code.as_deref(), Some("TV"));
        assert_eq!(record.status.as_deref(), Some("FINISHED"));
        assert_eq!(record.status_text.as_deref(), Some("завершён"));
        assert_eq!(record.episode_count, Some(26));
        assert_eq!(record.episode_range.first, Some(1));
        assert_eq!(record.episode_range.last, Some(26));
        assert_eq!(record.episode_range.display_string.as_deref(), Some("1-26 из 26"));
        assert_eq!(record.torrents.episode_range, record.episode_range);
        assert_eq!(record.episode_map.len(), 2);
        assert_eq!(record.episode_map[&2].label, "2 серия");
    }

    #[test]
    fn test_missing_genre_label_gives_empty_genres() {
        let html = vost_detail("<p><strong>Год выхода: </strong>2019</p>", "");
        let record = parse(&html);

        assert!(record.genres.is_empty());
        assert_eq!(record.year, Some(2019));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["genres"], serde_json::json!([]));
    }

    #[test]
    fn test_missing_year_label_gives_null() {
        let record = parse(&vost_detail("<p>Тип: ТВ</p>", ""));
        assert_eq!(record.year, None);
        assert!(serde_json::to_value(&record).unwrap()["year"].is_null());
    }

    #[test]
    fn test_range_falls_back_to_episode_map() {
        let html = r#"<html><body><h1>Без скобок</h1>
            <script>var data = {"3 серия":"a","7 серия":"b","5 серия":"c"};</script>
            </body></html>"#;
        let record = parse(html);

        assert_eq!(record.titles.primary, "Без скобок");
        assert_eq!(record.episode_range.first, Some(3));
        assert_eq!(record.episode_range.last, Some(7));
        assert_eq!(record.episode_range.display_string.as_deref(), Some("3-7"));
    }

    #[test]
    fn test_title_falls_back_to_document_title() {
        let profile = SourceProfile::anidub();
        let base = profile.base().unwrap();
        let html = "<html><head><title>Ван Пис / One Piece</title></head><body></body></html>";
        let record = parse_detail(html, &profile, &base, "https://anidub.biz/anime_tv/5-x.html");

        assert_eq!(record.titles.primary, "Ван Пис");
        assert_eq!(record.source, "anidub");
        assert_eq!(record.source_id, Some(5));
    }

    #[test]
    fn test_empty_page_still_yields_record() {
        let record = parse("");

        assert_eq!(record.titles.primary, "");
        assert!(record.episode_range.is_empty());
        assert!(record.episode_map.is_empty());
        assert_eq!(record.status, None);
        assert!(record.torrents.list.is_empty());
        assert!(!record.id.is_empty());
    }
}
