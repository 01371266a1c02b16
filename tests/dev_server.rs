use std::path::Path;

use assetpipe::config::ServerSettings;
use assetpipe::server::{serve_on, Reloader, RELOAD_PATH};
use assetpipe::types::TaskKind;
use assetpipe_test_utils::{init_tracing, with_timeout, ProjectFixture};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn start(root: &Path, directory_listing: bool) -> (std::net::SocketAddr, Reloader) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let settings = ServerSettings {
        port: addr.port(),
        directory_listing,
        root: root.to_path_buf(),
        open_path: "/".to_string(),
    };
    let reloader = Reloader::new();
    tokio::spawn(serve_on(listener, settings, reloader.clone()));
    (addr, reloader)
}

async fn get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn site() -> ProjectFixture {
    ProjectFixture::new()
        .file("dist/html/index.html", "<html><body><h1>hi</h1></body></html>")
        .file("dist/css/style.min.css", ".a{width:10px}")
        .file("dist/lib/a b.js", "var a;")
}

#[tokio::test]
async fn serves_files_with_reload_snippet_in_html() {
    init_tracing();
    let fx = site();
    let (addr, _) = start(&fx.path("dist"), true).await;

    let page = with_timeout(get(addr, "/html/index.html")).await;
    assert!(page.starts_with("HTTP/1.1 200"), "{page}");
    assert!(page.contains("<h1>hi</h1>"));
    let snippet = page.find(RELOAD_PATH).expect("snippet injected");
    assert!(snippet < page.find("</body>").unwrap());

    let css = with_timeout(get(addr, "/css/style.min.css")).await;
    assert!(css.starts_with("HTTP/1.1 200"));
    assert!(css.to_lowercase().contains("content-type: text/css"), "{css}");
    assert!(css.ends_with(".a{width:10px}"));
}

#[tokio::test]
async fn directories_redirect_index_or_list() {
    init_tracing();
    let fx = site();
    let (addr, _) = start(&fx.path("dist"), true).await;

    let redirect = with_timeout(get(addr, "/html")).await;
    assert!(redirect.starts_with("HTTP/1.1 308"), "{redirect}");
    assert!(redirect.to_lowercase().contains("location: /html/"));

    let index = with_timeout(get(addr, "/html/")).await;
    assert!(index.contains("<h1>hi</h1>"));

    let listing = with_timeout(get(addr, "/lib/")).await;
    assert!(listing.starts_with("HTTP/1.1 200"), "{listing}");
    assert!(listing.contains("href=\"a%20b.js\""), "{listing}");
    assert!(listing.contains(">a b.js<"));
}

#[tokio::test]
async fn listing_disabled_and_missing_paths_are_404() {
    init_tracing();
    let fx = site();
    let (addr, _) = start(&fx.path("dist"), false).await;

    assert!(with_timeout(get(addr, "/lib/")).await.starts_with("HTTP/1.1 404"));
    assert!(with_timeout(get(addr, "/nope.html")).await.starts_with("HTTP/1.1 404"));
}

#[tokio::test]
async fn parent_segments_are_rejected() {
    init_tracing();
    let fx = site().file("secret.txt", "top secret");
    let (addr, _) = start(&fx.path("dist"), true).await;

    let response = with_timeout(get(addr, "/css/%2e%2e/%2e%2e/secret.txt")).await;
    assert!(response.starts_with("HTTP/1.1 400"), "{response}");
    assert!(!response.contains("top secret"));
}

#[tokio::test]
async fn reload_events_reach_connected_pages() {
    init_tracing();
    let fx = site();
    let (addr, reloader) = start(&fx.path("dist"), true).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {RELOAD_PATH} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut seen = String::new();
    let mut buf = [0u8; 1024];
    with_timeout(async {
        while !seen.contains("\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            seen.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
    })
    .await;
    assert!(seen.to_lowercase().contains("text/event-stream"), "{seen}");

    assert_eq!(reloader.reload(TaskKind::Styles), 1);
    with_timeout(async {
        while !seen.contains("data: css") {
            let n = stream.read(&mut buf).await.unwrap();
            seen.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
    })
    .await;
    assert!(seen.contains("event: reload"));
}
