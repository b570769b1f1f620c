//! In-memory fakes for the HTTP and sleep seams
//!
//! Built for unit tests and, through the `testing` feature, for the
//! integration tests. None of these touch the network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Value, json};

use crate::error::Result;
use crate::graph::{HttpResponse, HttpTransport, Sleeper};

/// Transport that replays queued responses per URL.
///
/// Requests to a URL with nothing queued get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for the next request to `url`
    pub fn respond(&self, url: impl Into<String>, response: HttpResponse) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(response);
    }

    /// Every request seen so far, as `"METHOD url"`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Bodies sent with POST, keyed by URL
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    fn next_response(&self, method: &str, url: &str) -> HttpResponse {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{} {}", method, url));

        self.routes
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| HttpResponse::new(404, format!("no scripted response for {}", url)))
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, url: &str, _bearer: &str) -> Result<HttpResponse> {
        Ok(self.next_response("GET", url))
    }

    fn post(
        &self,
        url: &str,
        _bearer: Option<&str>,
        _content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse> {
        self.uploads
            .lock()
            .unwrap()
            .push((url.to_string(), body.to_vec()));
        Ok(self.next_response("POST", url))
    }
}

/// Sleeper that records requested delays instead of blocking
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Render a Graph collection page
pub fn page_json(items: &[Value], next_link: Option<&str>) -> String {
    let mut page = json!({ "value": items });
    if let Some(link) = next_link {
        page["@odata.nextLink"] = json!(link);
    }
    page.to_string()
}
