use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

/// Serves a small novel laid out like the supported reading template.
///
/// `/series/chapter-<n>/` for `n < chapters` returns a full page whose
/// chapter id is `1000 + n`. A few fixed paths cover the failure statuses.
pub struct NovelStub {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl NovelStub {
    pub fn spawn(chapters: usize) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start novel stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");
        let hits = Arc::new(Mutex::new(HashMap::new()));
        let hits_for_server = Arc::clone(&hits);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().split('?').next().unwrap_or("").to_string();
                *hits_for_server
                    .lock()
                    .unwrap()
                    .entry(path.clone())
                    .or_insert(0) += 1;

                let (status, body) = route(&path, chapters);
                let mut response = tiny_http::Response::from_string(body).with_status_code(status);
                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"text/html; charset=utf-8"[..],
                )
                .expect("content-type header");
                response.add_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            hits,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn chapter_url(&self, n: usize) -> String {
        self.url(&format!("/series/chapter-{n}/"))
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

impl Drop for NovelStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn route(path: &str, chapters: usize) -> (u16, String) {
    match path {
        "/series/locked/" => (403, "forbidden".to_string()),
        "/series/broken/" => (500, "internal error".to_string()),
        "/series/plain/" => (
            200,
            "<!doctype html><html><body><main><p>Maintenance.</p></main></body></html>"
                .to_string(),
        ),
        _ => match chapter_number(path) {
            Some(n) if n < chapters => (200, chapter_page(n)),
            _ => (404, "not found".to_string()),
        },
    }
}

fn chapter_number(path: &str) -> Option<usize> {
    path.strip_prefix("/series/chapter-")?
        .strip_suffix('/')?
        .parse()
        .ok()
}

fn chapter_page(n: usize) -> String {
    let paragraphs = (0..60)
        .map(|i| {
            format!(
                "<p>Paragraph {i} of chapter {n}: the caravan kept moving through the long grey pass.</p>"
            )
        })
        .collect::<String>();
    format!(
        r#"<!doctype html>
<html>
  <head><title>Series - Chapter {n}</title></head>
  <body>
    <div class="site-header"><a href="/">Home</a></div>
    <a href="javascript:void(0)" class="wp-manga-action-button" data-action="bookmark" data-chapter="{id}">Bookmark</a>
    <input type="hidden" id="wp-manga-current-chap" data-id="{id}">
    <h1 id="chapter-heading">Chapter {n}</h1>
    <div class="reading-content">
      <div class="text-left">{paragraphs}</div>
    </div>
  </body>
</html>
"#,
        id = 1000 + n
    )
}
