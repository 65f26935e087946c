//! Preview server.
//!
//! A lightweight HTTP server built on `tiny_http`:
//!
//! - Static file serving from the output root, read from disk per request
//! - Automatic `index.html` resolution for directories
//! - Incremental rebuilds on change (via the `watch` module)
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Watcher Thread  │
//! │  (HTTP Server)  │     │  (File Monitor)  │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//!    Handle requests         dispatch(event)
//!    Read files              Write outputs
//! └─────────────────────────────────────────────┘
//!                    │
//!                    ▼
//!            config.build.output
//! ```

use crate::{build::Site, debug, log, watch::watch_for_changes_blocking};
use anyhow::{Context, Result, anyhow};
use parking_lot::Mutex;
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Serve the output root of an already built site until Ctrl+C.
///
/// With `serve.watch` enabled, a watcher thread applies source changes to
/// the site while requests are served; it is stopped and joined on shutdown.
pub fn serve_site(site: Site) -> Result<()> {
    let serve = site.config().serve.clone();
    let root = site.config().build.output.clone();
    let interface = serve.listen_ip()?;

    let (server, addr) = try_bind_port(interface, serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);
    let shutdown = Arc::new(AtomicBool::new(false));

    // Set up Ctrl+C handler for graceful shutdown
    {
        let server = Arc::clone(&server);
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            log!("serve"; "shutting down...");
            shutdown.store(true, Ordering::Relaxed);
            server.unblock();
        })
        .context("Failed to set Ctrl+C handler")?;
    }

    log!("serve"; "http://{}", addr);

    let watcher = serve.watch.then(|| {
        let site = Arc::new(Mutex::new(site));
        let shutdown = Arc::clone(&shutdown);
        std::thread::spawn(move || {
            if let Err(err) = watch_for_changes_blocking(site, shutdown) {
                log!("watch"; "{err}");
            }
        })
    });

    // Handle requests in main thread (blocks until Ctrl+C). tiny_http accepts
    // connections concurrently; responses are produced one at a time.
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &root) {
            log!("serve"; "request error: {e}");
        }
    }

    shutdown.store(true, Ordering::Relaxed);
    if let Some(handle) = watcher
        && handle.join().is_err()
    {
        log!("error"; "watcher thread panicked");
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_err = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                // Port 0 asks the OS for a free port
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_err.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

/// Handle a single HTTP request.
///
/// Request resolution order:
/// 1. Exact file match → serve file
/// 2. Directory with index.html → serve index.html
/// 3. Nothing found → 404
fn handle_request(request: Request, serve_root: &Path) -> Result<()> {
    debug!("http"; "{} {}", request.method(), request.url());

    match resolve(serve_root, request.url()) {
        Some(path) => serve_file(request, &path),
        None => serve_not_found(request),
    }
}

/// Map a request URL to a file under `serve_root`.
fn resolve(serve_root: &Path, url: &str) -> Option<PathBuf> {
    // Strip query string (e.g., ?t=123456) before resolving path
    let path = url.split(['?', '#']).next().unwrap_or(url);

    // Decode URL-encoded characters (e.g., %20 → space)
    let decoded = urlencoding::decode(path).ok()?;
    let request_path = Path::new(decoded.trim_matches('/'));

    if request_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let local_path = serve_root.join(request_path);
    if local_path.is_file() {
        return Some(local_path);
    }

    let index_path = local_path.join("index.html");
    index_path.is_file().then_some(index_path)
}

// ============================================================================
// Response Helpers
// ============================================================================

fn content_type_header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value).map_err(|()| anyhow!("invalid header value: {value}"))
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response = Response::from_data(content).with_header(content_type_header(guess_content_type(path))?);

    request.respond(response)?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::new(
        StatusCode(404),
        vec![content_type_header("text/plain")?],
        Cursor::new("404 Not Found"),
        Some(13),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",

        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{Read, Write},
        net::{Ipv4Addr, TcpListener, TcpStream},
    };
    use tempfile::TempDir;

    fn dist() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("blog/first")).unwrap();
        fs::write(dir.path().join("index.html"), "home").unwrap();
        fs::write(dir.path().join("blog/first/index.html"), "first").unwrap();
        fs::write(dir.path().join("my file.css"), "css").unwrap();
        dir
    }

    #[test]
    fn test_resolve_index_and_files() {
        let dir = dist();
        let root = dir.path();

        assert_eq!(resolve(root, "/"), Some(root.join("index.html")));
        assert_eq!(resolve(root, "/blog/first/"), Some(root.join("blog/first/index.html")));
        assert_eq!(resolve(root, "/blog/first"), Some(root.join("blog/first/index.html")));
        assert_eq!(resolve(root, "/my%20file.css?t=123"), Some(root.join("my file.css")));
        assert_eq!(resolve(root, "/missing"), None);
        assert_eq!(resolve(root, "/blog/"), None);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = dist();
        let root = dir.path().join("blog");

        assert_eq!(resolve(&root, "/../index.html"), None);
        assert_eq!(resolve(&root, "/%2e%2e/index.html"), None);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a/index.html")), "text/html; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("img/a.png")), "image/png");
        assert_eq!(guess_content_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn test_bind_retries_next_port() {
        let taken = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = taken.local_addr().unwrap().port();

        if let Ok((_server, addr)) = try_bind_port(IpAddr::V4(Ipv4Addr::LOCALHOST), port, 3) {
            assert_ne!(addr.port(), port);
        }
    }

    #[test]
    fn test_serves_files_over_http() {
        let dir = dist();
        let (server, addr) = try_bind_port(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, 1).unwrap();
        let root = dir.path().to_path_buf();

        let handle = std::thread::spawn(move || {
            for _ in 0..2 {
                let request = server.recv().unwrap();
                handle_request(request, &root).unwrap();
            }
        });

        let get = |path: &str| {
            let mut stream = TcpStream::connect(addr).unwrap();
            write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        };

        let found = get("/blog/first/");
        assert!(found.starts_with("HTTP/1.1 200"));
        assert!(found.ends_with("first"));

        let missing = get("/nope");
        assert!(missing.starts_with("HTTP/1.1 404"));

        handle.join().unwrap();
    }
}
