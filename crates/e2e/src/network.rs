//! Network response capture for the opening-suggestion service

use std::fmt;
use std::sync::Arc;

use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventResponseReceived};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::E2eResult;
use crate::report::clip;
use crate::session::BrowserSession;

/// Loose URL predicate: the full URL contains a fixed substring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFilter {
    needle: String,
}

impl UrlFilter {
    pub fn contains(needle: impl Into<String>) -> Self {
        Self { needle: needle.into() }
    }

    pub fn matches(&self, url: &str) -> bool {
        url.contains(&self.needle)
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }
}

/// One observed response from the filtered host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub status: i64,
    pub url: String,
}

impl ResponseRecord {
    /// Characters of the URL shown in diagnostics
    pub const DISPLAY_LEN: usize = 80;

    pub fn display_url(&self) -> &str {
        clip(&self.url, Self::DISPLAY_LEN)
    }
}

impl fmt::Display for ResponseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.display_url())
    }
}

/// Append-only, bounded log of matching responses
#[derive(Debug)]
pub struct ResponseLog {
    filter: UrlFilter,
    capacity: usize,
    records: Vec<ResponseRecord>,
    dropped: usize,
}

impl ResponseLog {
    pub fn new(filter: UrlFilter, capacity: usize) -> Self {
        Self {
            filter,
            capacity,
            records: Vec::new(),
            dropped: 0,
        }
    }

    /// Record the response if its URL matches. Returns whether it was kept.
    pub fn observe(&mut self, status: i64, url: &str) -> bool {
        if !self.filter.matches(url) {
            return false;
        }
        if self.records.len() >= self.capacity {
            if self.dropped == 0 {
                warn!(capacity = self.capacity, "Response log full, dropping further matches");
            }
            self.dropped += 1;
            return false;
        }
        self.records.push(ResponseRecord {
            status,
            url: url.to_string(),
        });
        true
    }

    pub fn records(&self) -> &[ResponseRecord] {
        &self.records
    }

    /// Matching responses that arrived after the log was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Listens to the page's response stream for the session's lifetime
pub struct NetworkObserver {
    log: Arc<Mutex<ResponseLog>>,
    listener: JoinHandle<()>,
}

impl NetworkObserver {
    /// Subscribe to `Network.responseReceived` on the session's page
    pub async fn attach(session: &BrowserSession, filter: UrlFilter, capacity: usize) -> E2eResult<Self> {
        let page = session.page();
        page.execute(EnableParams::default()).await?;
        let mut events = page.event_listener::<EventResponseReceived>().await?;

        debug!(needle = filter.needle(), capacity, "Attaching response observer");

        let log = Arc::new(Mutex::new(ResponseLog::new(filter, capacity)));
        let sink = Arc::clone(&log);
        let listener = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let response = &event.response;
                if sink.lock().observe(response.status, &response.url) {
                    debug!(status = response.status, url = %response.url, "Recorded response");
                }
            }
        });

        Ok(Self { log, listener })
    }

    /// All records so far, in arrival order. Does not clear the log.
    pub fn drain(&self) -> Vec<ResponseRecord> {
        self.log.lock().records().to_vec()
    }

    pub fn dropped(&self) -> usize {
        self.log.lock().dropped()
    }
}

impl Drop for NetworkObserver {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
