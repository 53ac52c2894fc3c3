#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct StubResponse {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl StubResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn xml(body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: "application/xml",
            body: body.to_vec(),
        }
    }

    pub fn started(scan_id: &str) -> Self {
        Self::json(200, &format!(r#"{{"data":{{"scanId":"{scan_id}"}}}}"#))
    }

    pub fn status(code: i64) -> Self {
        Self::json(
            200,
            &format!(r#"{{"data":{{"status":{{"status_code":{code}}}}}}}"#),
        )
    }
}

/// Serves the scripted responses in order, one per connection, and records
/// `METHOD /path` for every request it sees.
pub struct StubServer {
    pub endpoint: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub fn start(responses: Vec<StubResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        std::thread::spawn(move || {
            let mut queue: VecDeque<StubResponse> = responses.into();
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else {
                    continue;
                };
                let Some(request_line) = read_request(&mut stream) else {
                    continue;
                };
                seen.lock().expect("lock").push(request_line);
                let resp = queue.pop_front().unwrap_or_else(|| {
                    StubResponse::json(500, r#"{"message":"unexpected request"}"#)
                });
                write_response(&mut stream, &resp);
            }
        });

        Self {
            endpoint: format!("http://{addr}/webhook"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock").clone()
    }
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;

    let mut parts = request_line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    Some(format!("{method} {path}"))
}

fn write_response(stream: &mut TcpStream, resp: &StubResponse) {
    let head = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        resp.status,
        resp.content_type,
        resp.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&resp.body);
    let _ = stream.flush();
}

pub fn crashtest_cmd(work_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crashtest"));
    cmd.current_dir(work_dir);
    for key in [
        "CRASHTEST_CONFIG",
        "CRASHTEST_WEBHOOK",
        "CRASHTEST_PULL_REPORT",
        "CRASHTEST_API_ENDPOINT",
        "CRASHTEST_REQUEST_TIMEOUT_SECS",
        "CRASHTEST_POLL_INTERVAL_SECS",
        "CRASHTEST_MAX_WAIT_SECS",
        "CRASHTEST_REPORT_PATH",
        "CRASHTEST_PRIVACY_MASK_WEBHOOK",
        "CRASHTEST_LOG_DIR",
        "INPUT_CRASHTEST-WEBHOOK",
        "INPUT_PULL-REPORT",
        "GITHUB_ACTIONS",
        "HTTP_PROXY",
        "HTTPS_PROXY",
        "ALL_PROXY",
        "http_proxy",
        "https_proxy",
        "all_proxy",
    ] {
        cmd.env_remove(key);
    }
    cmd.env("NO_PROXY", "127.0.0.1,localhost");
    cmd.env("CRASHTEST_POLL_INTERVAL_SECS", "0");
    cmd.env("CRASHTEST_REQUEST_TIMEOUT_SECS", "10");
    cmd
}

pub fn run(work_dir: &Path, args: &[&str]) -> Output {
    crashtest_cmd(work_dir)
        .args(args)
        .output()
        .expect("run crashtest")
}

pub fn make_temp_dir(label: &str) -> PathBuf {
    static DIR_SEQ: AtomicU64 = AtomicU64::new(0);

    let seq = DIR_SEQ.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "crashtest-{label}-test-{}-{seq}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn stderr_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

pub fn stdout_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}
