use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

#[allow(dead_code)]
pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[allow(dead_code)]
pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_learnhubd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn learnhubd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

#[allow(dead_code)]
pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

#[allow(dead_code)]
pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "expected ok for {}: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

#[allow(dead_code)]
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "expected error for {}: {}",
        method,
        value
    );
    value.get("error").cloned().unwrap_or(serde_json::Value::Null)
}

#[allow(dead_code)]
pub struct Route {
    pub method: &'static str,
    pub path: &'static str,
    pub status: u16,
    pub body: serde_json::Value,
}

#[derive(Clone, Debug)]
#[allow(dead_code)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub body: serde_json::Value,
    pub authorization: Option<String>,
}

/// Canned HTTP backend standing in for the LearnHub REST service. Answers
/// routes by exact method + path (query string ignored for matching,
/// preserved in the record) and remembers every request in arrival order.
#[allow(dead_code)]
pub struct StubServer {
    pub base_url: String,
    records: Arc<Mutex<Vec<Recorded>>>,
}

#[allow(dead_code)]
impl StubServer {
    pub fn start(routes: Vec<Route>) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("stub addr");
        let records: Arc<Mutex<Vec<Recorded>>> = Arc::new(Mutex::new(Vec::new()));
        let thread_records = Arc::clone(&records);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                handle_connection(stream, &routes, &thread_records);
            }
        });
        StubServer {
            base_url: format!("http://{}", addr),
            records,
        }
    }

    pub fn records(&self) -> Vec<Recorded> {
        self.records.lock().expect("records lock").clone()
    }

    pub fn calls(&self, method: &str, path: &str) -> usize {
        self.records()
            .iter()
            .filter(|r| r.method == method && strip_query(&r.target) == path)
            .count()
    }
}

fn strip_query(target: &str) -> &str {
    target.split('?').next().unwrap_or(target)
}

fn handle_connection(mut stream: TcpStream, routes: &[Route], records: &Arc<Mutex<Vec<Recorded>>>) {
    let Some((method, target, headers, body)) = read_request(&mut stream) else {
        return;
    };
    let body_json: serde_json::Value =
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    records.lock().expect("records lock").push(Recorded {
        method: method.clone(),
        target: target.clone(),
        body: body_json,
        authorization: headers.get("authorization").cloned(),
    });

    let path = strip_query(&target);
    let (status, payload) = match routes.iter().find(|r| r.method == method && r.path == path) {
        Some(r) => (r.status, r.body.clone()),
        None => (404, json!({ "success": false, "message": "not found" })),
    };
    let body = payload.to_string();
    let reason = if (200..300).contains(&status) { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn read_request(stream: &mut TcpStream) -> Option<(String, String, HashMap<String, String>, Vec<u8>)> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).ok()?;
    }
    Some((method, target, headers, body))
}

/// Canned login route plus the matching helper; most scenarios start by
/// authenticating against it.
#[allow(dead_code)]
pub fn login_route() -> Route {
    Route {
        method: "POST",
        path: "/auth/login",
        status: 200,
        body: json!({
            "success": true,
            "token": "tok-123",
            "user": {
                "id": "user-1",
                "name": "Test Student",
                "email": "student@example.com",
                "role": "student",
                "points": 0,
                "level": 1
            }
        }),
    }
}

#[allow(dead_code)]
pub fn connect_and_login(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &std::path::Path,
    base_url: &str,
) {
    let _ = request_ok(
        stdin,
        reader,
        "setup-1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "setup-2",
        "backend.connect",
        json!({ "baseUrl": base_url }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "setup-3",
        "auth.login",
        json!({ "email": "student@example.com", "password": "secret123" }),
    );
}
