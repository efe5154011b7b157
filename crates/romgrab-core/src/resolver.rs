//! Media resolver: exchanges a media id for a short-lived download URL.
//!
//! Mimics the in-page "download" button: a same-origin XHR form POST to
//! `<item>?download` that answers with `{ downloadUrl, downloadName }`.

use serde::Deserialize;

use crate::config::{HttpConfig, SiteConfig};
use crate::error::{PipelineError, ResolveFailure};
use crate::headers;
use crate::http::{self, TransferLimits};
use crate::types::{DownloadIntent, MediaId, ResolvedDownload};

/// Body of a successful resolve call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub download_url: String,
    pub download_name: String,
}

fn append_query(url: &str, query: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, sep, query)
}

/// Endpoint that resolves media for `item_url`.
pub fn resolve_endpoint(item_url: &str) -> String {
    append_query(item_url, "download")
}

/// Percent-encodes `s` the way browsers' `encodeURIComponent` does: RFC 3986
/// unreserved characters and `!'()*` pass through.
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut buf = [0u8; 4];
    for c in s.chars() {
        if matches!(c, '!' | '\'' | '(' | ')' | '*') {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}

/// Final fetch URL: `<download_url>?mediaId=<id>&attach=<encoded name>`.
pub fn build_download_url(download_url: &str, media_id: &MediaId, download_name: &str) -> String {
    append_query(
        download_url,
        &format!(
            "mediaId={}&attach={}",
            encode_component(media_id.as_str()),
            encode_component(download_name)
        ),
    )
}

/// Accepts the service's name as-is when it is usable as a single path component.
/// Names are never rewritten, so completed files keep their canonical names.
pub fn check_filename(name: &str) -> Result<&str, ResolveFailure> {
    let bad_char = |c: char| c == '\0' || c == '/' || c == '\\' || c.is_control();
    if name.trim().is_empty() || name == "." || name == ".." || name.chars().any(bad_char) {
        return Err(ResolveFailure::Filename(name.to_string()));
    }
    Ok(name)
}

/// Turns a raw resolve response body into a download for `intent`.
pub fn parse_response(body: &[u8], intent: &DownloadIntent) -> Result<ResolvedDownload, ResolveFailure> {
    let resp: ResolveResponse = serde_json::from_slice(body)?;
    let filename = check_filename(&resp.download_name)?.to_string();
    Ok(ResolvedDownload {
        url: build_download_url(&resp.download_url, &intent.media_id, &resp.download_name),
        filename,
        item_url: intent.item_url.clone(),
    })
}

pub struct MediaResolver {
    http: HttpConfig,
    origin: String,
}

impl MediaResolver {
    pub fn new(site: &SiteConfig, http: &HttpConfig) -> Self {
        Self {
            http: http.clone(),
            origin: site.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn resolve(&self, intent: &DownloadIntent) -> Result<ResolvedDownload, PipelineError> {
        let fail = |source: ResolveFailure| PipelineError::Resolve {
            url: intent.item_url.clone(),
            source,
        };
        let body = http::submit_form(
            resolve_endpoint(&intent.item_url),
            headers::resolve_xhr(&self.http, &self.origin, &intent.item_url),
            format!("mediaId={}", urlencoding::encode(intent.media_id.as_str())),
            TransferLimits::for_requests(&self.http),
        )
        .await
        .map_err(|e| fail(ResolveFailure::Http(e)))?;

        let resolved = parse_response(&body, intent).map_err(fail)?;
        tracing::debug!(item = %intent.item_url, file = %resolved.filename, "media resolved");
        Ok(resolved)
    }
}
