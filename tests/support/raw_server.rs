//! Minimal HTTP/1.1 file server over raw TCP.
//!
//! wiremock sends a body in one piece, which makes "stop at byte 5000" racy.
//! This server can hold the GET body at a fixed offset until the test opens
//! a gate, and can advertise lengths that disagree with the body.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::socket_guard::should_skip_socket_bound_test;

/// What the server serves under `/files/<name>`.
#[derive(Debug, Clone)]
pub struct RawRoute {
    pub name: String,
    pub body: Vec<u8>,
    /// Bytes sent before waiting on the gate. `None` sends everything at once.
    pub gate_after: Option<usize>,
    /// Length advertised by HEAD. `None` omits the header.
    pub head_length: Option<u64>,
    /// When false, GET has no `Content-Length` and the body ends at close.
    pub get_content_length: bool,
    /// Waits on the gate before sending the GET status line.
    pub hold_headers: bool,
}

impl RawRoute {
    pub fn new(name: &str, body: Vec<u8>) -> Self {
        let head_length = Some(body.len() as u64);
        Self {
            name: name.to_string(),
            body,
            gate_after: None,
            head_length,
            get_content_length: true,
            hold_headers: false,
        }
    }

    #[must_use]
    pub fn headers_gated(mut self) -> Self {
        self.hold_headers = true;
        self
    }

    #[must_use]
    pub fn gated_after(mut self, bytes: usize) -> Self {
        self.gate_after = Some(bytes);
        self
    }
}

pub struct RawFileServer {
    addr: SocketAddr,
    gate: watch::Sender<bool>,
    gets: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl RawFileServer {
    /// Starts the server, or returns `None` when localhost cannot be bound.
    pub async fn start_or_skip(route: RawRoute) -> Option<Self> {
        if should_skip_socket_bound_test() {
            return None;
        }
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind raw test server");
        let addr = listener.local_addr().expect("raw server addr");
        let (gate, gate_rx) = watch::channel(false);
        let gets = Arc::new(AtomicUsize::new(0));
        let route = Arc::new(route);

        let task_gets = Arc::clone(&gets);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let route = Arc::clone(&route);
                let gate_rx = gate_rx.clone();
                let gets = Arc::clone(&task_gets);
                tokio::spawn(async move {
                    let _ = serve(stream, &route, gate_rx, &gets).await;
                });
            }
        });

        Some(Self {
            addr,
            gate,
            gets,
            task,
        })
    }

    pub fn uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Lets gated GET responses send their headers or the rest of their body.
    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    /// Number of GET requests received so far.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl Drop for RawFileServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    route: &RawRoute,
    mut gate: watch::Receiver<bool>,
    gets: &AtomicUsize,
) -> std::io::Result<()> {
    let head = read_request_head(&mut stream).await?;
    let mut parts = head.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    if target != format!("/files/{}", route.name) {
        let response = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        stream.write_all(response.as_bytes()).await?;
        return stream.shutdown().await;
    }

    match method.as_str() {
        "HEAD" => {
            let mut response = String::from("HTTP/1.1 200 OK\r\nConnection: close\r\n");
            if let Some(length) = route.head_length {
                response.push_str(&format!("Content-Length: {length}\r\n"));
            }
            response.push_str("\r\n");
            stream.write_all(response.as_bytes()).await?;
        }
        "GET" => {
            gets.fetch_add(1, Ordering::SeqCst);
            if route.hold_headers {
                let _ = gate.wait_for(|open| *open).await;
            }
            let mut response = String::from(
                "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n",
            );
            if route.get_content_length {
                response.push_str(&format!("Content-Length: {}\r\n", route.body.len()));
            }
            response.push_str("\r\n");
            stream.write_all(response.as_bytes()).await?;

            let split = route.gate_after.unwrap_or(route.body.len()).min(route.body.len());
            stream.write_all(&route.body[..split]).await?;
            stream.flush().await?;
            if split < route.body.len() {
                let _ = gate.wait_for(|open| *open).await;
                stream.write_all(&route.body[split..]).await?;
            }
        }
        _ => {
            let response =
                "HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
            stream.write_all(response.as_bytes()).await?;
        }
    }
    stream.shutdown().await
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut byte = [0u8; 512];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") && buf.len() < 16 * 1024 {
        let n = stream.read(&mut byte).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&byte[..n]);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
