//! Ads-library search URLs and profile-link extraction.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use promptkit_shared::{PromptKitError, Result};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

static FACEBOOK_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href*='facebook.com']").expect("facebook link selector")
});

/// Build the ads-library search URL for one keyword.
///
/// All ads (active and inactive, every ad type) in `country` are searched.
pub fn ads_search_url(library_url: &str, keyword: &str, country: &str) -> Result<Url> {
    let mut url = Url::parse(library_url)
        .map_err(|e| PromptKitError::config(format!("invalid ads library url {library_url}: {e}")))?;

    url.query_pairs_mut()
        .append_pair("active_status", "all")
        .append_pair("ad_type", "all")
        .append_pair("country", country)
        .append_pair("q", keyword);

    Ok(url)
}

/// Collect the distinct Facebook profile links on an ads-library page.
///
/// Outbound redirect links (`l.php?u=...`) are unwrapped to their target.
/// Links back into the ads library itself are dropped.
pub fn extract_profile_links(html: &str) -> BTreeSet<String> {
    let doc = Html::parse_document(html);
    let mut links = BTreeSet::new();

    for el in doc.select(&FACEBOOK_LINK) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };

        let target = unwrap_redirect(href).unwrap_or_else(|| href.to_string());
        if target.contains("facebook.com") && !target.contains("/ads/library") {
            debug!(link = %target, "profile link");
            links.insert(target);
        }
    }

    links
}

/// Target of a `l.php?u=<encoded>` redirect, if `href` is one.
fn unwrap_redirect(href: &str) -> Option<String> {
    if !href.contains("l.php?u=") {
        return None;
    }
    let url = Url::parse(href).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "u")
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_carries_all_filters() {
        let url = ads_search_url("https://www.facebook.com/ads/library/", "home fitness", "US").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("q".into(), "home fitness".into())));
        assert!(pairs.contains(&("country".into(), "US".into())));
        assert!(pairs.contains(&("active_status".into(), "all".into())));
        assert!(pairs.contains(&("ad_type".into(), "all".into())));
        assert_eq!(url.path(), "/ads/library/");
    }

    #[test]
    fn invalid_library_url_is_config_error() {
        let err = ads_search_url("not a url", "yoga", "US").unwrap_err();
        assert!(matches!(err, PromptKitError::Config { .. }));
    }

    #[test]
    fn extracts_and_unwraps_profile_links() {
        let html = r#"<html><body>
            <a href="https://www.facebook.com/brewbar">Brew Bar</a>
            <a href="https://www.facebook.com/brewbar">Brew Bar again</a>
            <a href="https://l.facebook.com/l.php?u=https%3A%2F%2Fwww.facebook.com%2Fyogastudio&h=AT0">Yoga</a>
            <a href="https://www.facebook.com/ads/library/?id=123">See ad details</a>
            <a href="https://example.com/shop">Shop</a>
        </body></html>"#;

        let links = extract_profile_links(html);
        let links: Vec<&str> = links.iter().map(String::as_str).collect();
        assert_eq!(
            links,
            vec![
                "https://www.facebook.com/brewbar",
                "https://www.facebook.com/yogastudio",
            ]
        );
    }

    #[test]
    fn page_without_links_yields_nothing() {
        assert!(extract_profile_links("<html><body><p>No results</p></body></html>").is_empty());
    }
}
