//! Background text generation.
//!
//! The frame loop never waits on the network: `submit` hands the prompt to a
//! worker thread and returns at once; the loop calls `poll` each frame to pick
//! up the answer. Every request carries a generation number and only the
//! newest one is ever surfaced, so a slow reply to an old question cannot
//! overwrite the answer to a newer one.

use crate::config::AiConfig;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

pub const MISSING_KEY_WARNING: &str = "Warning: No API key found. AI features disabled.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryOutcome {
    Reply(String),
    Failed(String),
    /// No credential configured; nothing was sent.
    Disabled(String),
}

impl QueryOutcome {
    /// Text to show in the response panel.
    pub fn display_text(&self) -> String {
        match self {
            QueryOutcome::Reply(text) => text.clone(),
            QueryOutcome::Failed(err) => format!("API Error: {err}"),
            QueryOutcome::Disabled(msg) => msg.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, QueryOutcome::Reply(_))
    }
}

/// Anything that can turn a prompt into text. Called on a worker thread.
pub trait TextService: Send + Sync + 'static {
    fn generate(&self, prompt: &str) -> Result<String, String>;
}

/// Gemini `generateContent` over HTTPS.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(cfg: &AiConfig, api_key: &str) -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("airboard")
            .build()
            .map_err(|e| format!("HTTP client: {e}"))?;
        let url = format!("{}/{}:generateContent", cfg.endpoint.trim_end_matches('/'), cfg.model);
        Ok(Self { client, url, api_key: api_key.to_string() })
    }
}

impl TextService for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, String> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let resp = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        let payload: Value = resp.json().map_err(|e| format!("Decode response: {e}"))?;
        if !status.is_success() {
            let msg = payload["error"]["message"].as_str().unwrap_or("request failed");
            return Err(format!("{status}: {msg}"));
        }
        reply_text(&payload).ok_or_else(|| "Response had no text".to_string())
    }
}

/// Concatenated text parts of the first candidate.
fn reply_text(payload: &Value) -> Option<String> {
    let parts = payload["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    (!text.is_empty()).then_some(text)
}

pub struct QueryDispatcher {
    service: Option<Arc<dyn TextService>>,
    tx: Sender<(u64, QueryOutcome)>,
    rx: Receiver<(u64, QueryOutcome)>,
    generation: u64,
    delivered: u64,
}

impl QueryDispatcher {
    /// `None` service = no credential; every query answers with the warning.
    pub fn new(service: Option<Arc<dyn TextService>>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { service, tx, rx, generation: 0, delivered: 0 }
    }

    /// Build from config: a Gemini client when a key is present.
    pub fn from_config(cfg: &AiConfig) -> Self {
        let service = match cfg.credential() {
            Some(key) => match GeminiClient::new(cfg, key) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn TextService>),
                Err(e) => {
                    log::error!("AI client unavailable: {e}");
                    None
                }
            },
            None => {
                log::warn!("No API key configured; AI queries are disabled");
                None
            }
        };
        Self::new(service)
    }

    /// Start a query. Returns its generation number.
    pub fn submit(&mut self, prompt: &str) -> u64 {
        self.generation += 1;
        let generation = self.generation;

        let Some(service) = self.service.clone() else {
            // Answer synchronously; it is already queued when we return.
            let _ = self.tx.send((generation, QueryOutcome::Disabled(MISSING_KEY_WARNING.into())));
            return generation;
        };

        log::info!("AI query #{generation}: {prompt}");
        let tx = self.tx.clone();
        let prompt = prompt.to_string();
        thread::spawn(move || {
            let outcome = match service.generate(&prompt) {
                Ok(text) => QueryOutcome::Reply(text),
                Err(err) => QueryOutcome::Failed(err),
            };
            // The receiver only goes away when the app is shutting down.
            let _ = tx.send((generation, outcome));
        });
        generation
    }

    /// Drain finished queries; returns the newest query's outcome if it has
    /// arrived since the last call.
    pub fn poll(&mut self) -> Option<QueryOutcome> {
        let mut latest = None;
        while let Ok((generation, outcome)) = self.rx.try_recv() {
            if generation != self.generation {
                log::info!("Dropping stale AI reply #{generation} (current #{})", self.generation);
                continue;
            }
            match &outcome {
                QueryOutcome::Reply(text) => log::info!("AI reply #{generation}: {} chars", text.len()),
                other => log::warn!("AI query #{generation} failed: {}", other.display_text()),
            }
            self.delivered = generation;
            latest = Some(outcome);
        }
        latest
    }

    /// True while the newest query has not come back.
    pub fn is_busy(&self) -> bool {
        self.delivered < self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
