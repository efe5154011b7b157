//! Item page → media identifier.

use anyhow::Result;
use scraper::{Html, Selector};

use crate::catalog::parse_selector;
use crate::config::{HttpConfig, SiteConfig};
use crate::error::PipelineError;
use crate::headers;
use crate::http::{self, TransferLimits};
use crate::types::{DownloadIntent, MediaId};

/// Finds the media id in item page markup: the first element matching
/// `selector` that carries a non-blank `attribute`.
pub fn extract_media_id(html: &str, selector: &Selector, attribute: &str) -> Option<MediaId> {
    let doc = Html::parse_document(html);
    doc.select(selector)
        .filter_map(|el| el.value().attr(attribute))
        .find_map(MediaId::new)
}

pub struct ItemPageFetcher {
    http: HttpConfig,
    referer: String,
    selector: Selector,
    attribute: String,
}

impl ItemPageFetcher {
    pub fn new(site: &SiteConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            http: http.clone(),
            referer: format!("{}{}", site.base_url.trim_end_matches('/'), site.category_path),
            selector: parse_selector(&site.media_selector)?,
            attribute: site.media_attribute.clone(),
        })
    }

    /// Fetches `item_url` and returns the intent to resolve it.
    pub async fn fetch(&self, item_url: &str) -> Result<DownloadIntent, PipelineError> {
        let html = http::fetch_text(
            item_url.to_string(),
            headers::navigation(&self.http, Some(&self.referer)),
            TransferLimits::for_requests(&self.http),
        )
        .await
        .map_err(|source| PipelineError::ItemFetch {
            url: item_url.to_string(),
            source,
        })?;

        let media_id = extract_media_id(&html, &self.selector, &self.attribute).ok_or_else(|| {
            PipelineError::MissingMediaId {
                url: item_url.to_string(),
            }
        })?;
        tracing::debug!(item = item_url, media_id = %media_id, "media id found");
        Ok(DownloadIntent {
            media_id,
            item_url: item_url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> Selector {
        parse_selector("button[data-media-id]").unwrap()
    }

    #[test]
    fn finds_media_id_on_download_button() {
        let html = r#"<div><button class="btn" data-media-id="52168">Download</button></div>"#;
        let id = extract_media_id(html, &selector(), "data-media-id").unwrap();
        assert_eq!(id.as_str(), "52168");
    }

    #[test]
    fn skips_blank_values() {
        let html = r#"
            <button data-media-id="">Share</button>
            <button data-media-id="777">Download</button>
        "#;
        let id = extract_media_id(html, &selector(), "data-media-id").unwrap();
        assert_eq!(id.as_str(), "777");
    }

    #[test]
    fn absent_control_is_none() {
        let html = r#"<button>Download</button><a data-media-id="1">x</a>"#;
        assert!(extract_media_id(html, &selector(), "data-media-id").is_none());
    }
}
