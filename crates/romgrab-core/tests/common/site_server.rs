//! Minimal HTTP/1.1 server that plays the catalog site and its CDN in integration tests.
//!
//! Routes match on method + request target (path and query) exactly; anything
//! else is a 404. Every request is recorded so tests can assert on what the
//! pipeline actually sent. One request per connection (`Connection: close`).

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub method: &'static str,
    pub target: String,
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Advertised Content-Length when it should differ from the body (truncated transfer).
    pub claimed_len: Option<usize>,
}

impl Route {
    pub fn html(target: &str, body: &str) -> Self {
        Self {
            method: "GET",
            target: target.to_string(),
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.as_bytes().to_vec(),
            claimed_len: None,
        }
    }

    pub fn json_post(target: &str, body: &str) -> Self {
        Self {
            method: "POST",
            target: target.to_string(),
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
            claimed_len: None,
        }
    }

    pub fn bytes(target: &str, body: &[u8]) -> Self {
        Self {
            method: "GET",
            target: target.to_string(),
            status: 200,
            content_type: "application/octet-stream",
            body: body.to_vec(),
            claimed_len: None,
        }
    }

    pub fn status(method: &'static str, target: &str, status: u16) -> Self {
        Self {
            method,
            target: target.to_string(),
            status,
            content_type: "text/plain",
            body: b"error".to_vec(),
            claimed_len: None,
        }
    }

    /// Sends `body` but advertises `claimed_len` bytes, then closes the connection.
    pub fn truncated(target: &str, body: &[u8], claimed_len: usize) -> Self {
        Self {
            claimed_len: Some(claimed_len),
            ..Self::bytes(target, body)
        }
    }
}

#[derive(Clone)]
pub struct SiteServer {
    pub base_url: String,
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl SiteServer {
    pub fn url(&self, target: &str) -> String {
        format!("{}{}", self.base_url, target)
    }

    /// Adds a route, replacing any existing one with the same method and target.
    pub fn set_route(&self, route: Route) {
        let mut routes = self.routes.lock().unwrap();
        routes.retain(|r| !(r.method == route.method && r.target == route.target));
        routes.push(route);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, target: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.target == target)
            .collect()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(routes: Vec<Route>) -> SiteServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = SiteServer {
        base_url: format!("http://127.0.0.1:{}", port),
        routes: Arc::new(Mutex::new(Vec::new())),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    for r in routes {
        server.set_route(r);
    }
    let shared = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let s = shared.clone();
            thread::spawn(move || handle(stream, &s));
        }
    });
    server
}

fn handle(mut stream: TcpStream, server: &SiteServer) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    server.requests.lock().unwrap().push(req.clone());

    let route = server
        .routes
        .lock()
        .unwrap()
        .iter()
        .find(|r| r.method.eq_ignore_ascii_case(&req.method) && r.target == req.target)
        .cloned();
    let route = route.unwrap_or_else(|| Route::status("GET", &req.target, 404));

    let reason = match route.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        reason,
        route.content_type,
        route.claimed_len.unwrap_or(route.body.len())
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
}

/// Reads one request: head up to the blank line, then `Content-Length` bytes of body.
fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(Recorded {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
