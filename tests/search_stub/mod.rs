use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

/// Google Custom Search stand-in that answers every lookup with the same page of results.
pub struct GoogleStub {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    urls: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl GoogleStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start search stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/customsearch/v1");

        let hits = Arc::new(AtomicUsize::new(0));
        let urls = Arc::new(Mutex::new(Vec::new()));
        let (counter, seen) = (Arc::clone(&hits), Arc::clone(&urls));
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

                let url = request.url().to_string();
                if request.method() != &tiny_http::Method::Get
                    || !url.starts_with("/customsearch/v1?")
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }
                counter.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().push(url);

                let body = serde_json::json!({
                    "items": [
                        {
                            "title": "Async Rust: the book",
                            "link": "https://example.com/async-book",
                            "snippet": "Futures, executors and async await explained step by step.",
                            "pagemap": { "metatags": [ { "og:description": "A guide to async Rust." } ] }
                        },
                        {
                            "title": "Tokio tutorial",
                            "link": "https://example.com/tokio",
                            "snippet": "Build network applications with the Tokio runtime."
                        }
                    ],
                    "searchInformation": { "totalResults": "1250" },
                    "queries": { "relatedSearches": [ { "title": "rust async traits" } ] }
                });
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let _ = request.respond(
                    tiny_http::Response::from_string(body.to_string())
                        .with_status_code(200)
                        .with_header(header),
                );
            }
        });

        Self {
            base_url,
            hits,
            urls,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Drop for GoogleStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
