//! Test doubles shared across module tests: a deterministic page session, an
//! in-memory artifact sink, and canned cameras.

use std::sync::Mutex;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::{PageError, SinkError};
use crate::page::{PageSession, ViewCamera};
use crate::settings::Settings;
use crate::sink::{ArtifactSink, WriteReceipt};

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}.html")).unwrap()
}

pub fn test_settings() -> Settings {
    Settings {
        output_root: "captures".into(),
        store_path: "data/capture.sqlite".into(),
        attach_url: None,
        retention_days: 14,
        poll_interval_ms: 1,
        max_poll_attempts: 5,
        settle_ms: 0,
    }
}

// ── FakePage ──

#[derive(Default)]
struct FakePageState {
    revealed: bool,
    countdown: u32,
    clicks: Vec<String>,
    escapes: u32,
}

/// Deterministic page session. It serves `base_html` until the configured
/// trigger is clicked, then switches to `revealed_html` after `render_delay`
/// selector probes, which models a modal that takes a few polls to render.
pub struct FakePage {
    url: String,
    base_html: String,
    revealed_html: Option<String>,
    trigger: Option<String>,
    render_delay: u32,
    fail_content: bool,
    state: Mutex<FakePageState>,
}

impl FakePage {
    pub fn new(base_html: &str) -> Self {
        FakePage {
            url: "https://www.linkedin.com/in/jordan-rivera/".into(),
            base_html: base_html.to_string(),
            revealed_html: None,
            trigger: None,
            render_delay: 0,
            fail_content: false,
            state: Mutex::new(FakePageState::default()),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_trigger(mut self, selector: &str) -> Self {
        self.trigger = Some(selector.to_string());
        self
    }

    pub fn with_revealed(mut self, html: &str) -> Self {
        self.revealed_html = Some(html.to_string());
        self
    }

    /// Number of selector probes the revealed layout stays invisible for.
    pub fn with_render_delay(mut self, probes: u32) -> Self {
        self.render_delay = probes;
        self
    }

    pub fn with_failing_content(mut self) -> Self {
        self.fail_content = true;
        self
    }

    /// Dismiss clicks plus escape presses, for asserting dismissal happens
    /// exactly once.
    pub fn dismiss_actions(&self) -> usize {
        let state = self.state.lock().unwrap();
        let clicks = state
            .clicks
            .iter()
            .filter(|c| c.contains("dismiss") || c.contains("modal-close"))
            .count();
        clicks + state.escapes as usize
    }
}

fn matches(html: &str, selector: &Selector) -> bool {
    Html::parse_document(html).select(selector).next().is_some()
}

#[async_trait]
impl PageSession for FakePage {
    async fn url(&self) -> Result<String, PageError> {
        Ok(self.url.clone())
    }

    async fn content(&self) -> Result<String, PageError> {
        if self.fail_content {
            return Err(PageError::Driver("render frame detached".into()));
        }
        let state = self.state.lock().unwrap();
        let html = if state.revealed && state.countdown == 0 {
            self.revealed_html.as_ref().unwrap_or(&self.base_html)
        } else {
            &self.base_html
        };
        Ok(html.clone())
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        let sel = Selector::parse(selector).map_err(|e| PageError::Driver(e.to_string()))?;
        let mut state = self.state.lock().unwrap();
        let in_base = matches(&self.base_html, &sel);
        let in_revealed = self
            .revealed_html
            .as_deref()
            .is_some_and(|h| matches(h, &sel));

        if state.revealed {
            if state.countdown > 0 {
                if in_revealed && !in_base {
                    state.countdown -= 1;
                    return Ok(false);
                }
                return Ok(in_base);
            }
            return Ok(in_revealed || in_base);
        }
        Ok(in_base)
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        let mut state = self.state.lock().unwrap();
        state.clicks.push(selector.to_string());
        if self.trigger.as_deref() == Some(selector) {
            state.revealed = true;
            state.countdown = self.render_delay;
        }
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), PageError> {
        self.state.lock().unwrap().escapes += 1;
        Ok(())
    }
}

// ── MemorySink ──

pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
    fail_suffixes: Vec<String>,
    fail_all: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink {
            files: Mutex::new(Vec::new()),
            fail_suffixes: Vec::new(),
            fail_all: false,
        }
    }

    /// Sink that rejects writes for paths ending in any given suffix.
    pub fn failing(suffixes: &[&str]) -> Self {
        MemorySink {
            fail_suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
            ..MemorySink::new()
        }
    }

    pub fn failing_all() -> Self {
        MemorySink {
            fail_all: true,
            ..MemorySink::new()
        }
    }

    /// Written paths in submission order.
    pub fn names(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Latest payload written under `rel`.
    pub fn get(&self, rel: &str) -> Vec<u8> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == rel)
            .map(|(_, payload)| payload.clone())
            .unwrap()
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn submit(&self, rel_path: &str, payload: &[u8]) -> Result<WriteReceipt, SinkError> {
        let denied = self.fail_all || self.fail_suffixes.iter().any(|s| rel_path.ends_with(s));
        if denied {
            return Err(SinkError::io(
                std::path::Path::new(rel_path),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "sink rejected write"),
            ));
        }
        self.files
            .lock()
            .unwrap()
            .push((rel_path.to_string(), payload.to_vec()));
        Ok(WriteReceipt {
            path: rel_path.to_string(),
        })
    }
}

// ── Cameras ──

pub struct StaticCamera(Vec<u8>);

impl StaticCamera {
    pub fn png() -> Self {
        StaticCamera(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
    }
}

#[async_trait]
impl ViewCamera for StaticCamera {
    async fn capture_png(&self) -> Result<Vec<u8>, PageError> {
        Ok(self.0.clone())
    }
}

pub struct FailingCamera;

#[async_trait]
impl ViewCamera for FailingCamera {
    async fn capture_png(&self) -> Result<Vec<u8>, PageError> {
        Err(PageError::Screenshot("tab not visible".into()))
    }
}
