//! Minimal canned-response HTTP server for exercising the sync transports
//! against a real socket. One thread per connection; routes are matched on
//! method + path and may serve a different response on each hit.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// One canned response.
#[derive(Debug, Clone)]
pub enum Canned {
    /// 200 with an `application/json` body.
    Json(String),
    /// Arbitrary status code with a plain body.
    Status(u16, String),
    /// 200 `text/event-stream`: each frame is sent as one `data:` block,
    /// then the connection closes (which drives the client's reconnect).
    Sse(Vec<String>),
}

#[derive(Debug, Clone)]
struct Route {
    /// Responses served in order; the last one repeats.
    responses: Vec<Canned>,
    hits: usize,
}

/// A recorded request: method, path, body (empty for GET), and the moment
/// the request line was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub body: String,
    pub at: Instant,
}

pub struct TestServer {
    base_url: String,
    routes: Arc<Mutex<HashMap<(String, String), Route>>>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
    shutdown: Arc<AtomicBool>,
}

impl TestServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        let routes: Arc<Mutex<HashMap<(String, String), Route>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let accept_routes = Arc::clone(&routes);
        let accept_requests = Arc::clone(&requests);
        let accept_shutdown = Arc::clone(&shutdown);
        thread::spawn(move || {
            for stream in listener.incoming() {
                if accept_shutdown.load(Ordering::Relaxed) {
                    break;
                }
                let Ok(stream) = stream else { continue };
                let routes = Arc::clone(&accept_routes);
                let requests = Arc::clone(&accept_requests);
                thread::spawn(move || handle_connection(stream, &routes, &requests));
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            routes,
            requests,
            shutdown,
        }
    }

    /// Register a route serving the same response on every hit.
    pub fn route(&self, method: &str, path: &str, response: Canned) -> &Self {
        self.route_seq(method, path, vec![response])
    }

    /// Register a route serving `responses` in order; the last one repeats.
    pub fn route_seq(&self, method: &str, path: &str, responses: Vec<Canned>) -> &Self {
        assert!(!responses.is_empty(), "route needs at least one response");
        self.routes.lock().expect("routes lock").insert(
            (method.to_string(), path.to_string()),
            Route { responses, hits: 0 },
        );
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Number of requests for one path, any method.
    pub fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// Arrival instants of every request for one path, in order.
    pub fn hit_times(&self, path: &str) -> Vec<Instant> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|r| r.path == path)
            .map(|r| r.at)
            .collect()
    }

    /// Block until `path` has been requested at least `count` times.
    pub fn wait_for_hits(&self, path: &str, count: usize, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if self.hits(path) >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Wake the accept loop so it can observe the flag.
        let addr = self.base_url.trim_start_matches("http://");
        let _ = TcpStream::connect(addr);
    }
}

fn handle_connection(
    stream: TcpStream,
    routes: &Arc<Mutex<HashMap<(String, String), Route>>>,
    requests: &Arc<Mutex<Vec<SeenRequest>>>,
) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() || request_line.trim().is_empty() {
        return;
    }
    let seen_at = Instant::now();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).is_err() {
            return;
        }
        let header = header.trim();
        if header.is_empty() {
            break;
        }
        let lower = header.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if content_length > 0 && reader.read_exact(&mut body).is_err() {
        return;
    }

    requests.lock().expect("requests lock").push(SeenRequest {
        method: method.clone(),
        path: path.clone(),
        body: String::from_utf8_lossy(&body).to_string(),
        at: seen_at,
    });

    let canned = {
        let mut routes = routes.lock().expect("routes lock");
        routes.get_mut(&(method, path)).map(|route| {
            let index = route.hits.min(route.responses.len() - 1);
            route.hits += 1;
            route.responses[index].clone()
        })
    };

    let mut stream = stream;
    match canned {
        Some(Canned::Json(json)) => write_response(&mut stream, 200, "application/json", &json),
        Some(Canned::Status(status, body)) => {
            write_response(&mut stream, status, "text/plain", &body);
        }
        Some(Canned::Sse(frames)) => {
            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n";
            if stream.write_all(head.as_bytes()).is_err() {
                return;
            }
            for frame in frames {
                let block = format!("data: {frame}\n\n");
                if stream.write_all(block.as_bytes()).is_err() {
                    return;
                }
                let _ = stream.flush();
            }
            // Connection drops here; the client treats it as a disconnect.
        }
        None => write_response(&mut stream, 404, "text/plain", "not found"),
    }
}

fn write_response(stream: &mut TcpStream, status: u16, content_type: &str, body: &str) {
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}
