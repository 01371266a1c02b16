// src/server/mod.rs

//! Development server: serves the output tree over HTTP on localhost and
//! pushes reload notifications to open pages.
//!
//! Every HTML response gets a small script injected before `</body>` that
//! listens on [`RELOAD_PATH`] (server-sent events) and reloads the page, or
//! only its stylesheets after a styles rebuild.

pub mod reload;

use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info};

use crate::config::ServerSettings;

pub use reload::{ReloadKind, Reloader};

/// Server-sent events endpoint the injected script connects to.
pub const RELOAD_PATH: &str = "/__assetpipe/reload";

/// Characters escaped in listing links.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const RELOAD_SNIPPET: &str = r#"<script>(function () {
  var source = new EventSource("/__assetpipe/reload");
  source.addEventListener("reload", function (e) {
    if (e.data === "css") {
      document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
        link.href = link.href.split("?")[0] + "?v=" + Date.now();
      });
    } else {
      window.location.reload();
    }
  });
})();</script>
"#;

#[derive(Clone)]
struct ServerState {
    root: PathBuf,
    directory_listing: bool,
    reloader: Reloader,
}

/// Build the router serving `settings.root`.
pub fn router(settings: &ServerSettings, reloader: Reloader) -> Router {
    let state = ServerState {
        root: settings.root.clone(),
        directory_listing: settings.directory_listing,
        reloader,
    };

    Router::new()
        .route(RELOAD_PATH, get(reload_events))
        .fallback(serve_path)
        .with_state(state)
}

/// Serve on an already-bound listener until the process ends.
pub async fn serve_on(listener: TcpListener, settings: ServerSettings, reloader: Reloader) -> Result<()> {
    axum::serve(listener, router(&settings, reloader))
        .await
        .context("dev server stopped")
}

/// Bind `127.0.0.1:<port>` and serve in the background.
///
/// Binding failures are returned; errors after that are logged.
pub async fn spawn_server(settings: ServerSettings, reloader: Reloader) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, settings.port))
        .await
        .with_context(|| format!("binding dev server to 127.0.0.1:{}", settings.port))?;
    let addr = listener.local_addr()?;
    info!(
        root = ?settings.root,
        "dev server listening on http://{addr}{}",
        settings.open_path
    );

    let handle = tokio::spawn(async move {
        if let Err(err) = serve_on(listener, settings, reloader).await {
            error!(error = %format!("{err:#}"), "dev server failed");
        }
    });
    Ok((addr, handle))
}

async fn reload_events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("reload client connected");
    let stream = BroadcastStream::new(state.reloader.subscribe()).filter_map(|msg| {
        msg.ok()
            .map(|kind| Ok(Event::default().event("reload").data(kind.as_str())))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn serve_path(State(state): State<ServerState>, uri: Uri) -> Response {
    let raw_path = uri.path();
    let Some(rel) = sanitize_path(raw_path) else {
        return (StatusCode::BAD_REQUEST, "bad request path").into_response();
    };
    let fs_path = state.root.join(&rel);

    match tokio::fs::metadata(&fs_path).await {
        Ok(meta) if meta.is_dir() => {
            if !raw_path.ends_with('/') {
                return Redirect::permanent(&format!("{raw_path}/")).into_response();
            }
            let index = fs_path.join("index.html");
            if index.is_file() {
                return serve_file(&index).await;
            }
            if state.directory_listing {
                return match render_listing(&fs_path, raw_path).await {
                    Ok(page) => Html(inject_reload_snippet(&page)).into_response(),
                    Err(err) => {
                        error!(error = %err, dir = ?fs_path, "listing failed");
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    }
                };
            }
            not_found()
        }
        Ok(_) => serve_file(&fs_path).await,
        Err(_) => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

/// Decode a request path into a relative filesystem path. `None` when any
/// segment is `..`.
pub fn sanitize_path(path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let mut rel = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') => return None,
            s => rel.push(s),
        }
    }
    Some(rel)
}

async fn serve_file(path: &Path) -> Response {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(error = %err, path = ?path, "file vanished while serving");
            return not_found();
        }
    };

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.essence_str() == "text/html" {
        let html = String::from_utf8_lossy(&bytes);
        let headers = [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ];
        return (headers, inject_reload_snippet(&html)).into_response();
    }

    let headers = [
        (header::CONTENT_TYPE, mime.essence_str().to_string()),
        (header::CACHE_CONTROL, "no-cache".to_string()),
    ];
    (headers, bytes).into_response()
}

/// Insert the reload script before the last `</body>`, or append it.
pub fn inject_reload_snippet(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + RELOAD_SNIPPET.len());
            out.push_str(&html[..pos]);
            out.push_str(RELOAD_SNIPPET);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{RELOAD_SNIPPET}"),
    }
}

async fn render_listing(dir: &Path, url_path: &str) -> std::io::Result<String> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().await?.is_dir();
        entries.push((name, is_dir));
    }
    entries.sort();

    let title = html_escape(url_path);
    let mut page = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n<body>\n<h1>Index of {title}</h1>\n<ul>\n"
    );
    if url_path != "/" {
        page.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for (name, is_dir) in entries {
        let slash = if is_dir { "/" } else { "" };
        let href = utf8_percent_encode(&name, PATH_SEGMENT);
        page.push_str(&format!(
            "<li><a href=\"{href}{slash}\">{}{slash}</a></li>\n",
            html_escape(&name)
        ));
    }
    page.push_str("</ul>\n</body>\n</html>\n");
    Ok(page)
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
