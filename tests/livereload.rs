// tests/livereload.rs

mod common;
use crate::common::{eventually, init_tracing, write_tree};

use std::net::SocketAddr;
use std::time::Duration;

use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use assetpipe::config::LiveReloadSettings;
use assetpipe::livereload;
use assetpipe_test_utils::with_timeout;

fn settings() -> LiveReloadSettings {
    LiveReloadSettings {
        enabled: true,
        port: 0,
        ..LiveReloadSettings::default()
    }
}

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

/// Open an event stream and return the connection once the response head
/// has arrived.
async fn subscribe(addr: SocketAddr) -> (TcpStream, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /livereload HTTP/1.1\r\nHost: {addr}\r\nAccept: text/event-stream\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut seen = String::new();
    read_until(&mut stream, &mut seen, "\r\n\r\n").await;
    (stream, seen)
}

async fn read_until(stream: &mut TcpStream, seen: &mut String, needle: &str) {
    let mut buf = [0u8; 1024];
    while !seen.contains(needle) {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before {needle:?}; got {seen:?}");
        seen.push_str(&String::from_utf8_lossy(&buf[..n]));
    }
}

#[tokio::test]
async fn serves_client_script_and_404s_elsewhere() {
    init_tracing();
    let dir = tempdir().unwrap();
    let handle = livereload::start(dir.path(), &settings()).await.unwrap();

    let script = with_timeout(get(handle.local_addr(), "/livereload.js")).await;
    assert!(script.starts_with("HTTP/1.1 200"), "{script}");
    assert!(script.contains("application/javascript"));
    assert!(script.contains("new EventSource(\"/livereload\")"));

    let missing = with_timeout(get(handle.local_addr(), "/index.html")).await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");
}

#[tokio::test]
async fn subscribers_receive_reload_events() {
    init_tracing();
    let dir = tempdir().unwrap();
    let handle = livereload::start(dir.path(), &settings()).await.unwrap();
    assert_eq!(handle.notify_change("nobody-listening.css"), 0);

    let (mut stream, mut seen) = with_timeout(subscribe(handle.local_addr())).await;
    assert!(seen.starts_with("HTTP/1.1 200"), "{seen}");
    assert!(seen.contains("text/event-stream"));

    assert!(eventually(|| handle.subscriber_count() == 1).await);
    assert_eq!(handle.notify_change("build/site.css"), 1);

    with_timeout(read_until(&mut stream, &mut seen, "data: build/site.css")).await;
    assert!(seen.contains("event: reload"));
}

#[tokio::test]
async fn changed_outputs_are_pushed_and_maps_are_excluded() {
    init_tracing();
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("build/.keep", "")]);
    let handle = livereload::start(dir.path(), &settings()).await.unwrap();

    let (mut stream, mut seen) = with_timeout(subscribe(handle.local_addr())).await;
    assert!(eventually(|| handle.subscriber_count() == 1).await);

    // Give the recursive watch a moment to settle before writing.
    tokio::time::sleep(Duration::from_millis(100)).await;
    write_tree(
        dir.path(),
        &[("build/bundle.js.map", "{}"), ("build/bundle.js", "var a;")],
    );

    with_timeout(read_until(&mut stream, &mut seen, "data: build/bundle.js\n")).await;
    assert!(!seen.contains("bundle.js.map"));
}

#[tokio::test]
async fn dropping_the_handle_stops_the_server() {
    let dir = tempdir().unwrap();
    let handle = livereload::start(dir.path(), &settings()).await.unwrap();
    let addr = handle.local_addr();
    drop(handle);

    let refused = async {
        for _ in 0..200 {
            if TcpStream::connect(addr).await.is_err() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    };
    assert!(with_timeout(refused).await);
}

#[tokio::test]
async fn reading_outputs_does_not_reload() {
    init_tracing();
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("build/index.html", "<h1>Docs</h1>")]);
    let handle = livereload::start(dir.path(), &settings()).await.unwrap();

    let (mut stream, mut seen) = with_timeout(subscribe(handle.local_addr())).await;
    assert!(eventually(|| handle.subscriber_count() == 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // What `markup` does for an unchanged destination.
    for _ in 0..3 {
        std::fs::read(dir.path().join("build/index.html")).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Events arrive in order, so a reload for the read would precede this one.
    write_tree(dir.path(), &[("build/site.css", "body{}")]);
    with_timeout(read_until(&mut stream, &mut seen, "data: build/site.css")).await;
    assert!(!seen.contains("index.html"), "{seen}");
}
