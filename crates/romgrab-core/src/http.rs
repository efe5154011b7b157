//! Blocking libcurl transfers: page GET, form POST, and streaming GET to a file.
//!
//! Every function here runs in the current thread; the async wrappers at the
//! bottom move them onto tokio's blocking pool.

use crate::config::HttpConfig;
use crate::error::HttpError;
use std::io::Write;
use std::time::Duration;

/// Ordered request headers (`name`, `value`). Order is preserved on the wire.
pub type Headers = Vec<(String, String)>;

/// Timeouts applied to one transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferLimits {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Abort when below `bytes/sec` for the given duration.
    pub low_speed: Option<(u32, Duration)>,
}

impl TransferLimits {
    /// Limits for HTML pages and resolve calls.
    pub fn for_requests(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.request_timeout_secs),
            low_speed: None,
        }
    }

    /// Limits for file downloads.
    pub fn for_downloads(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.download_timeout_secs),
            low_speed: Some((
                cfg.low_speed_limit_bytes,
                Duration::from_secs(cfg.low_speed_time_secs),
            )),
        }
    }
}

fn new_easy(url: &str, headers: &Headers, limits: TransferLimits) -> Result<curl::easy::Easy, HttpError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.accept_encoding("")?;
    easy.connect_timeout(limits.connect_timeout)?;
    easy.timeout(limits.timeout)?;
    if let Some((bytes, time)) = limits.low_speed {
        easy.low_speed_limit(bytes)?;
        easy.low_speed_time(time)?;
    }

    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !headers.is_empty() {
        easy.http_headers(list)?;
    }
    Ok(easy)
}

fn check_status(easy: &mut curl::easy::Easy) -> Result<(), HttpError> {
    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(HttpError::Status(code));
    }
    Ok(())
}

/// Performs a transfer on `easy`, collecting the whole body in memory.
fn perform_collect(easy: &mut curl::easy::Easy) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    check_status(easy)?;
    Ok(body)
}

/// GET `url` and return the body as text (lossy UTF-8).
pub fn get_text(url: &str, headers: &Headers, limits: TransferLimits) -> Result<String, HttpError> {
    let mut easy = new_easy(url, headers, limits)?;
    let body = perform_collect(&mut easy)?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// POST `body` (already form-encoded) to `url` and return the raw response body.
pub fn post_form(
    url: &str,
    headers: &Headers,
    body: &str,
    limits: TransferLimits,
) -> Result<Vec<u8>, HttpError> {
    let mut easy = new_easy(url, headers, limits)?;
    easy.post(true)?;
    easy.post_fields_copy(body.as_bytes())?;
    perform_collect(&mut easy)
}

/// Streams the body of `url` into `sink`. Returns the number of bytes written.
///
/// A failed write aborts the transfer and is reported as `HttpError::Io`.
pub fn stream_to<W: Write>(
    url: &str,
    headers: &Headers,
    sink: &mut W,
    limits: TransferLimits,
) -> Result<u64, HttpError> {
    let mut easy = new_easy(url, headers, limits)?;
    let mut written = 0u64;
    let mut write_err: Option<std::io::Error> = None;
    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match sink.write_all(data) {
            Ok(()) => {
                written += data.len() as u64;
                Ok(data.len())
            }
            Err(e) => {
                tracing::warn!("download write failed: {}", e);
                write_err = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        transfer.perform()
    };
    if let Some(e) = write_err {
        return Err(HttpError::Io(e));
    }
    performed?;
    check_status(&mut easy)?;
    sink.flush()?;
    Ok(written)
}

/// Async wrapper for [`get_text`].
pub async fn fetch_text(url: String, headers: Headers, limits: TransferLimits) -> Result<String, HttpError> {
    tokio::task::spawn_blocking(move || get_text(&url, &headers, limits)).await?
}

/// Async wrapper for [`post_form`].
pub async fn submit_form(
    url: String,
    headers: Headers,
    body: String,
    limits: TransferLimits,
) -> Result<Vec<u8>, HttpError> {
    tokio::task::spawn_blocking(move || post_form(&url, &headers, &body, limits)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_follow_config() {
        let cfg = HttpConfig::default();
        let req = TransferLimits::for_requests(&cfg);
        assert_eq!(req.timeout, Duration::from_secs(60));
        assert!(req.low_speed.is_none());
        let dl = TransferLimits::for_downloads(&cfg);
        assert_eq!(dl.timeout, Duration::from_secs(3600));
        assert_eq!(dl.low_speed, Some((1024, Duration::from_secs(60))));
    }

    #[test]
    fn unreachable_host_is_curl_error() {
        let limits = TransferLimits {
            connect_timeout: Duration::from_secs(2),
            timeout: Duration::from_secs(2),
            low_speed: None,
        };
        // Port 9 on loopback is discard; nothing listens there in test environments.
        let err = get_text("http://127.0.0.1:9/", &Vec::new(), limits).unwrap_err();
        assert!(matches!(err, HttpError::Curl(_)));
    }
}
