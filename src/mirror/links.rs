//! Reference extraction from HTML pages.

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Elements and attributes the crawler follows.
const REFERENCE_SELECTORS: [(&str, &str); 3] = [
    ("a[href]", "href"),
    ("link[href]", "href"),
    ("img[src]", "src"),
];

/// Returns the absolute HTTP(S) URLs referenced by `html`, resolved against
/// `page_url`, in document order per selector. Fragment-only links and
/// non-fetchable schemes are skipped.
#[must_use]
pub fn extract_links(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for (css, attr) in REFERENCE_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            debug!(selector = css, "skipping unparsable selector");
            continue;
        };
        for element in document.select(&selector) {
            if let Some(url) = element
                .value()
                .attr(attr)
                .and_then(|href| resolve_link(page_url, href))
            {
                links.push(url);
            }
        }
    }

    links
}

fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("javascript:")
        || href.starts_with("data:")
    {
        return None;
    }

    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
