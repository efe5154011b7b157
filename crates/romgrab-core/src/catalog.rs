//! Catalog enumeration: listing pages → item page URLs.
//!
//! Starts at the category root (with its sort parameter), follows pagination
//! links breadth-first, and streams each new item URL to the scheduler as soon
//! as it is seen. A page that fails to load contributes nothing; its siblings
//! are unaffected.

use anyhow::Result;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use tokio::sync::mpsc;
use url::Url;

use crate::config::{HttpConfig, SiteConfig};
use crate::error::PipelineError;
use crate::headers;
use crate::http::{self, TransferLimits};

/// Links found on one listing page, in document order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub pages: Vec<String>,
    pub items: Vec<String>,
}

/// Outcome of a full walk.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub pages_visited: usize,
    pub items_found: usize,
    pub failures: Vec<PipelineError>,
}

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow::anyhow!("invalid selector {:?}: {}", s, e))
}

/// Parses listings for one category of one site.
pub struct CatalogParser {
    base: Url,
    category_path: String,
    pagination: Selector,
    item: Selector,
}

impl CatalogParser {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let base = Url::parse(&site.base_url)
            .map_err(|e| anyhow::anyhow!("invalid base_url {:?}: {}", site.base_url, e))?;
        Ok(Self {
            base,
            category_path: site.category_path.clone(),
            pagination: parse_selector(&site.pagination_selector)?,
            item: parse_selector(&site.item_selector)?,
        })
    }

    /// Resolves `href` against the site and keeps it only if it stays on the
    /// site's host and under the category prefix.
    fn in_category(&self, href: &str) -> Option<Url> {
        let mut abs = self.base.join(href.trim()).ok()?;
        abs.set_fragment(None);
        if abs.host_str() != self.base.host_str() || abs.port() != self.base.port() {
            return None;
        }
        let prefix = self.category_path.trim_end_matches('/');
        let path = abs.path();
        if path == prefix || path.starts_with(&format!("{}/", prefix)) {
            Some(abs)
        } else {
            None
        }
    }

    fn is_category_root(&self, url: &Url) -> bool {
        url.path().trim_end_matches('/') == self.category_path.trim_end_matches('/')
    }

    /// Extracts pagination and item links from the listing at `page_url`.
    ///
    /// The category root itself (the self-link) is never returned as a page or an
    /// item; pagination variants of it (`?page=2`) are pages.
    pub fn parse(&self, html: &str, page_url: &str) -> ListingPage {
        let doc = Html::parse_document(html);
        let current = Url::parse(page_url).ok();
        let mut out = ListingPage::default();

        let mut seen_pages = HashSet::new();
        for a in doc.select(&self.pagination) {
            let Some(abs) = a.value().attr("href").and_then(|h| self.in_category(h)) else {
                continue;
            };
            let is_self = current.as_ref() == Some(&abs)
                || (self.is_category_root(&abs) && abs.query().is_none());
            if is_self {
                continue;
            }
            let s = abs.to_string();
            if seen_pages.insert(s.clone()) {
                out.pages.push(s);
            }
        }

        let mut seen_items = HashSet::new();
        for a in doc.select(&self.item) {
            let Some(abs) = a.value().attr("href").and_then(|h| self.in_category(h)) else {
                continue;
            };
            if self.is_category_root(&abs) {
                continue;
            }
            let s = abs.to_string();
            if seen_items.insert(s.clone()) {
                out.items.push(s);
            }
        }
        out
    }
}

/// Walks every listing page of a category.
pub struct CatalogWalker {
    site: SiteConfig,
    http: HttpConfig,
    parser: CatalogParser,
}

impl CatalogWalker {
    pub fn new(site: &SiteConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            http: http.clone(),
            parser: CatalogParser::new(site)?,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
        let referer = format!("{}/", self.site.base_url.trim_end_matches('/'));
        http::fetch_text(
            url.to_string(),
            headers::navigation(&self.http, Some(&referer)),
            TransferLimits::for_requests(&self.http),
        )
        .await
        .map_err(|source| PipelineError::CatalogFetch {
            url: url.to_string(),
            source,
        })
    }

    /// Walks the category, sending each distinct item URL on `items_tx` in
    /// discovery order. Stops early if the receiver is dropped.
    pub async fn walk(&self, items_tx: mpsc::Sender<String>) -> WalkReport {
        let mut report = WalkReport::default();
        let mut queue = VecDeque::from([self.site.catalog_url()]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_items: HashSet<String> = HashSet::new();

        while let Some(page_url) = queue.pop_front() {
            if !visited.insert(page_url.clone()) {
                continue;
            }
            let html = match self.fetch(&page_url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(page = %page_url, "catalog page failed: {}", e);
                    report.failures.push(e);
                    continue;
                }
            };
            report.pages_visited += 1;
            let listing = self.parser.parse(&html, &page_url);
            tracing::debug!(
                page = %page_url,
                pages = listing.pages.len(),
                items = listing.items.len(),
                "parsed listing"
            );
            queue.extend(listing.pages.into_iter().filter(|p| !visited.contains(p)));
            for item in listing.items {
                if !seen_items.insert(item.clone()) {
                    continue;
                }
                report.items_found += 1;
                if items_tx.send(item).await.is_err() {
                    tracing::debug!("item receiver closed; stopping catalog walk");
                    return report;
                }
            }
        }
        tracing::info!(
            pages = report.pages_visited,
            items = report.items_found,
            failed_pages = report.failures.len(),
            "catalog walk finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <a href="/roms/nintendo-ds/">Nintendo DS</a>
        <div class="grid gap-6 lg:gap-8 grid-cols-2 md:grid-cols-3 lg:grid-cols-4 text-center">
            <a href="/roms/nintendo-ds/pokemon-black/">Pokemon Black</a>
            <a href="/roms/nintendo-ds/mario-kart-ds/">Mario Kart DS</a>
            <a href="/roms/nintendo-ds/pokemon-black/#reviews">Pokemon Black</a>
            <a href="/roms/gameboy/tetris/">Tetris</a>
            <a href="https://elsewhere.example/roms/nintendo-ds/fake/">Fake</a>
            <a href="/roms/nintendo-ds/">All</a>
        </div>
        <nav aria-label="Page Navigation">
            <a href="/roms/nintendo-ds/?sort=popularity">1</a>
            <a href="/roms/nintendo-ds/?page=2&sort=popularity">2</a>
            <a href="/roms/nintendo-ds/?page=3&sort=popularity">3</a>
            <a href="/roms/nintendo-ds/?page=2&sort=popularity">Next</a>
            <a href="/roms/nintendo-ds/">First</a>
        </nav>
        </body></html>
    "#;

    fn site() -> SiteConfig {
        SiteConfig {
            base_url: "https://site.example".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn items_are_in_document_order_without_duplicates() {
        let parser = CatalogParser::new(&site()).unwrap();
        let page = parser.parse(LISTING, "https://site.example/roms/nintendo-ds/?sort=popularity");
        assert_eq!(
            page.items,
            vec![
                "https://site.example/roms/nintendo-ds/pokemon-black/",
                "https://site.example/roms/nintendo-ds/mario-kart-ds/",
            ]
        );
    }

    #[test]
    fn pagination_excludes_self_link() {
        let parser = CatalogParser::new(&site()).unwrap();
        let page = parser.parse(LISTING, "https://site.example/roms/nintendo-ds/?sort=popularity");
        assert_eq!(
            page.pages,
            vec![
                "https://site.example/roms/nintendo-ds/?page=2&sort=popularity",
                "https://site.example/roms/nintendo-ds/?page=3&sort=popularity",
            ]
        );
    }

    #[test]
    fn empty_document_yields_nothing() {
        let parser = CatalogParser::new(&site()).unwrap();
        let page = parser.parse("<html></html>", "https://site.example/roms/nintendo-ds/");
        assert_eq!(page, ListingPage::default());
    }

    #[test]
    fn invalid_selector_is_rejected() {
        let mut s = site();
        s.item_selector = "div[".to_string();
        assert!(CatalogParser::new(&s).is_err());
    }
}
