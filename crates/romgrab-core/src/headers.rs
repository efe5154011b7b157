//! Browser-like header sets. The resolve endpoint only answers requests that look
//! like an in-page "download" click, so these mirror what a browser sends.

use crate::config::HttpConfig;
use crate::http::Headers;

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

fn h(name: &str, value: impl Into<String>) -> (String, String) {
    (name.to_string(), value.into())
}

/// Chromium client hints matching the configured user agent.
fn client_hints(http: &HttpConfig) -> [(String, String); 3] {
    [
        h("sec-ch-ua", http.sec_ch_ua.as_str()),
        h("sec-ch-ua-mobile", "?0"),
        h("sec-ch-ua-platform", http.sec_ch_ua_platform.as_str()),
    ]
}

/// Headers for a top-level page navigation (catalog, item page, file download).
pub fn navigation(http: &HttpConfig, referer: Option<&str>) -> Headers {
    let mut headers = vec![
        h("Accept", HTML_ACCEPT),
        h("Accept-Language", http.accept_language.as_str()),
        h("Cache-Control", "no-cache"),
        h("Pragma", "no-cache"),
        h("Sec-Fetch-Dest", "document"),
        h("Sec-Fetch-Mode", "navigate"),
        h("Sec-Fetch-Site", if referer.is_some() { "same-site" } else { "none" }),
        h("Upgrade-Insecure-Requests", "1"),
        h("User-Agent", http.user_agent.as_str()),
    ];
    headers.extend(client_hints(http));
    if let Some(r) = referer {
        headers.push(h("Referer", r));
    }
    headers
}

/// Headers for the same-origin XHR that resolves a media id.
pub fn resolve_xhr(http: &HttpConfig, origin: &str, referer: &str) -> Headers {
    let mut headers = vec![
        h("Accept", "application/json"),
        h("Accept-Language", http.accept_language.as_str()),
        h("Cache-Control", "no-cache"),
        h("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8"),
        h("Origin", origin),
        h("Pragma", "no-cache"),
        h("Priority", "u=1, i"),
        h("Referer", referer),
        h("Sec-Fetch-Dest", "empty"),
        h("Sec-Fetch-Mode", "cors"),
        h("Sec-Fetch-Site", "same-origin"),
        h("User-Agent", http.user_agent.as_str()),
        h("X-Requested-With", "XMLHttpRequest"),
    ];
    headers.extend(client_hints(http));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn resolve_headers_mark_same_origin_xhr() {
        let http = HttpConfig::default();
        let headers = resolve_xhr(&http, "https://site.example", "https://site.example/roms/x/");
        assert_eq!(get(&headers, "X-Requested-With"), Some("XMLHttpRequest"));
        assert_eq!(get(&headers, "Referer"), Some("https://site.example/roms/x/"));
        assert_eq!(get(&headers, "Origin"), Some("https://site.example"));
        assert_eq!(get(&headers, "Accept"), Some("application/json"));
        assert_eq!(get(&headers, "User-Agent"), Some(http.user_agent.as_str()));
        assert_eq!(get(&headers, "Priority"), Some("u=1, i"));
    }

    #[test]
    fn client_hints_follow_config() {
        let mut http = HttpConfig::default();
        http.sec_ch_ua_platform = r#""Windows""#.to_string();
        for headers in [
            navigation(&http, None),
            resolve_xhr(&http, "https://site.example", "https://site.example/roms/x/"),
        ] {
            assert_eq!(get(&headers, "sec-ch-ua"), Some(http.sec_ch_ua.as_str()));
            assert_eq!(get(&headers, "sec-ch-ua-mobile"), Some("?0"));
            assert_eq!(get(&headers, "sec-ch-ua-platform"), Some(r#""Windows""#));
        }
        assert!(get(&navigation(&http, None), "Priority").is_none());
    }

    #[test]
    fn navigation_referer_is_optional() {
        let http = HttpConfig::default();
        assert!(get(&navigation(&http, None), "Referer").is_none());
        let with = navigation(&http, Some("https://site.example/"));
        assert_eq!(get(&with, "Referer"), Some("https://site.example/"));
        assert_eq!(get(&with, "Sec-Fetch-Site"), Some("same-site"));
    }
}
