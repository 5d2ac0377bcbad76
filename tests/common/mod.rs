#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::net::SocketAddr;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use zip::write::SimpleFileOptions;

use bootstrapper_lib::core::state::BootstrapSettings;

pub const TEST_USER_AGENT: &str = "BootstrapperTests/1.0";

/// Build a zip archive in memory from `(name, body)` pairs.
pub fn zip_bytes(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(0o755);
    for (name, body) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A `/bin/sh` script padded to exactly `size` bytes.
pub fn shell_script(body: &str, size: usize) -> Vec<u8> {
    let mut script = format!("#!/bin/sh\n{body}\n").into_bytes();
    let header_len = script.len();
    while script.len() < size {
        script.extend_from_slice(b"#\n");
    }
    script.truncate(size.max(header_len));
    script
}

/// Serve `archive` at `/archive.zip`, an empty body at `/empty.zip`, a 404 at
/// `/missing.zip`, and `archive` at `/ua.zip` only for [`TEST_USER_AGENT`].
pub async fn start_server(archive: Vec<u8>) -> SocketAddr {
    let full = archive.clone();
    let guarded = archive;
    let app = Router::new()
        .route("/archive.zip", get(move || async move { full }))
        .route("/empty.zip", get(|| async { Vec::<u8>::new() }))
        .route("/missing.zip", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/ua.zip",
            get(move |headers: HeaderMap| async move {
                let agent = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                if agent == TEST_USER_AGENT {
                    guarded.into_response()
                } else {
                    StatusCode::FORBIDDEN.into_response()
                }
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Serve one response announcing `announced` bytes but sending only `body`,
/// then close the connection.
pub async fn start_truncating_server(body: Vec<u8>, announced: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {announced}\r\nConnection: close\r\n\r\n"
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        let _ = socket.shutdown().await;
    });
    addr
}

pub fn settings_for(url: String) -> BootstrapSettings {
    BootstrapSettings {
        archive_url: url,
        user_agent: TEST_USER_AGENT.to_string(),
        grace_period_ms: 500,
        exit_delay_ms: 0,
        connect_timeout_secs: 5,
        request_timeout_secs: 30,
        min_free_disk_mb: 0,
    }
}
