//! URL helpers shared by the listing and detail parsers
//!
//! Catalog markup mixes absolute, root-relative and protocol-relative URLs.
//! Everything the crawler emits goes through [`absolutize`] first.

use url::Url;

/// Convert a URL found in markup into an absolute URL.
///
/// Absolute `http`/`https` URLs pass through unchanged. Protocol-relative,
/// root-relative and path-relative URLs are resolved against `base`.
///
/// # Returns
/// * `Some(url)` for a usable URL
/// * `None` if the input is blank, cannot be resolved, or resolves to a
///   scheme other than `http`/`https` (`javascript:`, `about:blank`, ...)
///
/// # Examples
/// ```
/// use url::Url;
/// use anicrawl_core::links::absolutize;
///
/// let base = Url::parse("https://animevost.org").unwrap();
/// assert_eq!(
///     absolutize(&base, "/uploads/poster.jpg"),
///     Some("https://animevost.org/uploads/poster.jpg".to_string())
/// );
/// assert_eq!(
///     absolutize(&base, "http://cdn.test/a.jpg"),
///     Some("http://cdn.test/a.jpg".to_string())
/// );
/// ```
pub fn absolutize(base: &Url, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if is_absolute(trimmed) {
        return Some(trimmed.to_string());
    }

    base.join(trimmed)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(|u| u.to_string())
}

/// Whether `raw` already carries an http(s) scheme.
fn is_absolute(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Host name of an absolute URL.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

/// Extract the numeric item id from a detail link.
///
/// Both catalogs use DLE-style links: `/tip/tv/2712-some-slug.html` or
/// `/anime_tv/11057-some-slug.html`. The id is the number in front of the
/// first dash of the last path segment.
///
/// # Examples
/// ```
/// use anicrawl_core::links::extract_item_id;
///
/// assert_eq!(extract_item_id("https://animevost.org/tip/tv/2712-naruto.html"), Some(2712));
/// assert_eq!(extract_item_id("https://animevost.org/"), None);
/// ```
pub fn extract_item_id(link: &str) -> Option<u64> {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link.to_string(),
    };

    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    if !segment.ends_with(".html") {
        return None;
    }

    let id_str = segment.split('-').next()?;
    let id: u64 = id_str.trim_end_matches(".html").parse().ok()?;

    if id > 0 {
        Some(id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> Url {
        Url::parse("https://animevost.org").unwrap()
    }

    #[test]
    fn test_absolutize_root_relative() {
        assert_eq!(
            absolutize(&base(), "/img/poster.jpg"),
            Some("https://animevost.org/img/poster.jpg".to_string())
        );
    }

    #[test]
    fn test_absolutize_protocol_relative() {
        assert_eq!(
            absolutize(&base(), "//cdn.animevost.org/x.jpg"),
            Some("https://cdn.animevost.org/x.jpg".to_string())
        );
    }

    #[test]
    fn test_absolutize_absolute_passthrough() {
        assert_eq!(
            absolutize(&base(), "http://example.com/a b.jpg"),
            Some("http://example.com/a b.jpg".to_string())
        );
        assert_eq!(
            absolutize(&base(), "HTTPS://Example.com"),
            Some("HTTPS://Example.com".to_string())
        );
    }

    #[test]
    fn test_absolutize_blank() {
        assert_eq!(absolutize(&base(), ""), None);
        assert_eq!(absolutize(&base(), "   "), None);
    }

    #[test]
    fn test_absolutize_rejects_non_web_schemes() {
        assert_eq!(absolutize(&base(), "javascript:void(0)"), None);
        assert_eq!(absolutize(&base(), "about:blank"), None);
        assert_eq!(absolutize(&base(), "mailto:admin@animevost.org"), None);
        assert_eq!(absolutize(&base(), "data:image/gif;base64,R0l"), None);
    }

    #[test]
    fn test_absolutize_trims() {
        assert_eq!(
            absolutize(&base(), "  /a.jpg\n"),
            Some("https://animevost.org/a.jpg".to_string())
        );
    }

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://video.sibnet.ru/shell.php?videoid=1"),
            Some("video.sibnet.ru".to_string())
        );
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn test_extract_item_id() {
        assert_eq!(extract_item_id("https://animevost.org/tip/tv/2712-naruto.html"), Some(2712));
        assert_eq!(extract_item_id("/anime_tv/11057-one-piece.html"), Some(11057));
        assert_eq!(extract_item_id("https://anidub.biz/anime_tv/"), None);
        assert_eq!(extract_item_id("/tip/tv/0-zero.html"), None);
        assert_eq!(extract_item_id("/tip/tv/abc-slug.html"), None);
        assert_eq!(extract_item_id(""), None);
    }

    proptest! {
        #[test]
        fn absolutize_is_idempotent(path in "/?[a-z0-9_]{0,8}(/[a-z0-9_.]{1,8}){0,3}") {
            let b = base();
            if let Some(once) = absolutize(&b, &path) {
                prop_assert_eq!(absolutize(&b, &once), Some(once.clone()));
                prop_assert!(once.starts_with("https://"));
            }
        }

        #[test]
        fn absolute_urls_pass_through(host in "[a-z]{1,10}", path in "[a-z0-9/]{0,12}") {
            let url = format!("http://{}.test/{}", host, path);
            prop_assert_eq!(absolutize(&base(), &url), Some(url.clone()));
        }
    }
}
