//! Minimal in-process HTTP responder
//!
//! Serves canned responses by path and records every request so tests can
//! check headers, bodies and call counts.

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Debug, Clone)]
struct Route {
    path: String,
    status: u16,
    content_type: String,
    body: String,
}

pub struct HttpStub {
    /// Base URL, e.g. `http://127.0.0.1:40123`
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl HttpStub {
    /// Start serving `(path, status, json body)` routes; unknown paths get 404
    pub async fn start(routes: &[(&str, u16, &str)]) -> Self {
        let routes = routes
            .iter()
            .map(|(path, status, body)| Route {
                path: path.to_string(),
                status: *status,
                content_type: "application/json".to_string(),
                body: body.to_string(),
            })
            .collect();
        Self::serve(routes).await
    }

    /// Serve a single HTML page at `path`
    pub async fn html(path: &str, status: u16, body: &str) -> Self {
        Self::serve(vec![Route {
            path: path.to_string(),
            status,
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.to_string(),
        }])
        .await
    }

    async fn serve(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);

                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
                        return;
                    }
                    let mut parts = request_line.split_whitespace();
                    let method = parts.next().unwrap_or_default().to_string();
                    let path = parts.next().unwrap_or_default().to_string();

                    let mut headers = Vec::new();
                    let mut content_length = 0;
                    loop {
                        let mut line = String::new();
                        reader.read_line(&mut line).await.unwrap();
                        let line = line.trim_end();
                        if line.is_empty() {
                            break;
                        }
                        if let Some((name, value)) = line.split_once(':') {
                            let value = value.trim().to_string();
                            if name.eq_ignore_ascii_case("content-length") {
                                content_length = value.parse().unwrap_or(0);
                            }
                            headers.push((name.to_string(), value));
                        }
                    }

                    let mut body = vec![0u8; content_length];
                    reader.read_exact(&mut body).await.unwrap();
                    recorded.lock().unwrap().push(RecordedRequest {
                        method,
                        path: path.clone(),
                        headers,
                        body: String::from_utf8_lossy(&body).to_string(),
                    });

                    let route_path = path.split('?').next().unwrap_or_default();
                    let (status, content_type, body) =
                        match routes.iter().find(|r| r.path == route_path) {
                            Some(route) => {
                                (route.status, route.content_type.clone(), route.body.clone())
                            }
                            None => (404, "text/plain".to_string(), "not found".to_string()),
                        };
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason(status),
                        content_type,
                        body.len(),
                        body
                    );
                    let _ = write.write_all(response.as_bytes()).await;
                    let _ = write.shutdown().await;
                });
            }
        });

        Self { url, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
