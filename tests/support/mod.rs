#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub auth_header: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json_body(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("json request body")
    }
}

/// Reads one HTTP/1.1 request; header names are lowercased.
fn read_request(stream: &TcpStream) -> RecordedRequest {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .expect("read request line");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("GET").to_string();
    let path = parts.next().unwrap_or("/").to_string();

    let mut headers = BTreeMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header");
        let Some((name, value)) = line.trim_end().split_once(':') else {
            break;
        };
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0_u8; content_length];
    reader.read_exact(&mut body).expect("read body");

    RecordedRequest {
        method,
        path,
        auth_header: headers.remove("authorization").unwrap_or_default(),
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

fn write_json(mut stream: &TcpStream, body: &str) {
    write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .expect("write response");
}

/// Fake Slack Web API that answers a fixed number of requests, then stops.
pub struct MockSlackServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockSlackServer {
    /// `responder` gets the path (with query string) and the raw body.
    pub fn start<F>(expected_requests: usize, responder: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            for stream in listener.incoming().take(expected_requests) {
                let stream = stream.expect("accept");
                let request = read_request(&stream);
                let reply = responder(&request.path, &request.body);
                recorded.lock().expect("lock requests").push(request);
                write_json(&stream, &reply);
            }
        });

        Self {
            base_url,
            requests,
            handle: Some(handle),
        }
    }

    pub fn api_base(&self) -> String {
        format!("{}/api", self.base_url)
    }

    /// Waits for every expected request, then returns them in arrival order.
    pub fn finish(mut self) -> Vec<RecordedRequest> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("join mock server");
        }
        std::mem::take(&mut *self.requests.lock().expect("lock requests"))
    }
}

pub fn user_json(id: &str, name: &str, is_bot: bool, email: Option<&str>) -> String {
    serde_json::json!({
        "ok": true,
        "user": {
            "id": id,
            "name": name,
            "is_bot": is_bot,
            "profile": { "email": email },
        }
    })
    .to_string()
}

pub fn members_json(ids: &[&str], next_cursor: &str) -> String {
    serde_json::json!({
        "ok": true,
        "members": ids,
        "response_metadata": { "next_cursor": next_cursor },
    })
    .to_string()
}

pub fn ok_json() -> String {
    r#"{"ok":true}"#.to_string()
}

pub fn error_json(code: &str) -> String {
    serde_json::json!({ "ok": false, "error": code }).to_string()
}

/// Path without the `/api/` prefix or query string, e.g. `conversations.kick`.
pub fn api_method(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    path.trim_start_matches("/api/")
}
