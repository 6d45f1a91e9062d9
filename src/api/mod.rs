//! HTTP/JSON transport for the inspection pipeline.
//!
//! Minimal single-threaded HTTP server: `POST /analyze` runs one inspection,
//! `GET /health` reports liveness. Client-input failures map to 400 with a
//! machine-readable error code; verdicts on unmeasurable photos are ordinary
//! 200 responses, never errors.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::{InspectError, Inspector};

/// Request bodies carry base64 images; cap them well above any sane photo.
const MAX_REQUEST_BYTES: usize = 24 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8460".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

/// One analyze request.
#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    image_base64: String,
    vehiculo_tipo: String,
}

pub struct ApiServer {
    cfg: ApiConfig,
    inspector: Arc<Inspector>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, inspector: Arc<Inspector>) -> Self {
        Self { cfg, inspector }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let inspector = self.inspector.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, inspector, shutdown_thread) {
                log::error!("analyze api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    inspector: Arc<Inspector>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, &inspector) {
                    log::warn!("analyze api request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, inspector: &Inspector) -> Result<()> {
    let request = read_request(&mut stream)?;
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => {
            write_json_response(&mut stream, 200, r#"{"status":"ok"}"#)?;
            Ok(())
        }
        ("POST", "/analyze") => handle_analyze(&mut stream, inspector, &request.body),
        (_, "/health") | (_, "/analyze") => {
            write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#)?;
            Ok(())
        }
        _ => {
            write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#)?;
            Ok(())
        }
    }
}

fn handle_analyze(stream: &mut TcpStream, inspector: &Inspector, body: &[u8]) -> Result<()> {
    let request: AnalyzeRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(err) => {
            write_json_response(stream, 400, r#"{"error":"invalid_request"}"#)?;
            return Err(anyhow!("malformed analyze request: {}", err));
        }
    };

    match inspector.inspect_base64(&request.image_base64, &request.vehiculo_tipo) {
        Ok(verdict) => {
            let payload = serde_json::to_vec(&verdict.to_json())?;
            write_response(stream, 200, "application/json", &payload)?;
            Ok(())
        }
        Err(InspectError::InvalidImage(reason)) => {
            write_json_response(stream, 400, r#"{"error":"invalid_image"}"#)?;
            Err(anyhow!("invalid image payload: {}", reason))
        }
        Err(InspectError::UnknownVehicleType(vehicle_type)) => {
            write_json_response(stream, 400, r#"{"error":"unknown_vehicle_type"}"#)?;
            Err(anyhow!("unknown vehicle type '{}'", vehicle_type))
        }
        Err(InspectError::Internal(err)) => {
            write_json_response(stream, 500, r#"{"error":"internal"}"#)?;
            Err(err)
        }
    }
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    let mut buf = [0u8; 8192];
    let mut data = Vec::new();
    let header_end = loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break data
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .ok_or_else(|| anyhow!("connection closed before headers"))?;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| anyhow!("invalid content-length"))?
        .unwrap_or(0);
    if content_length > MAX_REQUEST_BYTES {
        return Err(anyhow!("request body too large"));
    }

    let body_start = header_end + 4;
    let mut body = data[body_start.min(data.len())..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before body was complete"));
        }
        body.extend_from_slice(&buf[..n]);
        if body.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request body too large"));
        }
    }
    body.truncate(content_length);

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        body,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}
