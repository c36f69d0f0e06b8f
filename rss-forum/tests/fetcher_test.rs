mod common;

use common::*;
use rss_forum::{FetchConfig, Fetcher, PipelineError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_test::{assert_err, assert_ok};

fn response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

fn chunked_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/rss+xml\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n{:x}\r\n{}\r\n0\r\n\r\n",
        body.len(),
        body
    )
}

async fn read_request(socket: &mut TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
}

/// Local HTTP server answering the n-th request with `responses[n]` (the last one repeats).
async fn serve(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let reply = responses
                .get(n)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or_default();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}/rss/algemeen.xml", addr), hits)
}

fn config(url: &str, max_retries: u32) -> FetchConfig {
    FetchConfig {
        feed_url: url.to_string(),
        max_retries,
        retry_delay_seconds: 0,
        timeout_seconds: 5,
        ..FetchConfig::default()
    }
}

#[tokio::test]
async fn server_error_is_retried_once_then_succeeds() {
    init_tracing();
    let body = numbered_feed(&[1]);
    let (url, hits) = serve(vec![
        response("500 Internal Server Error", "kapot"),
        response("200 OK", &body),
    ])
    .await;

    let fetcher = assert_ok!(Fetcher::new(config(&url, 1)));
    let content = assert_ok!(fetcher.fetch(&url).await);

    assert_eq!(content, body);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn persistent_failure_gives_up_after_the_retry_budget() {
    init_tracing();
    let (url, hits) = serve(vec![response("503 Service Unavailable", "")]).await;

    let fetcher = assert_ok!(Fetcher::new(config(&url, 2)));
    let err = assert_err!(fetcher.fetch(&url).await);

    match err {
        PipelineError::Fetch(message) => assert!(message.contains("503"), "{}", message),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn oversized_content_length_is_not_retried() {
    init_tracing();
    let oversized = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        12 * 1024 * 1024
    );
    let (url, hits) = serve(vec![oversized]).await;

    let fetcher = assert_ok!(Fetcher::new(config(&url, 2)));
    let err = assert_err!(fetcher.fetch(&url).await);

    assert!(matches!(err, PipelineError::FeedTooLarge { size_mb: 12 }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn oversized_body_without_length_header_is_rejected() {
    init_tracing();
    let body = "x".repeat(2 * 1024 * 1024 + 10);
    let (url, hits) = serve(vec![chunked_response(&body)]).await;

    let fetcher = assert_ok!(Fetcher::new(FetchConfig {
        max_feed_size_mb: 1,
        ..config(&url, 2)
    }));
    let err = assert_err!(fetcher.fetch(&url).await);

    assert!(matches!(err, PipelineError::FeedTooLarge { size_mb: 2 }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
