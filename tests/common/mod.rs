#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use vlm_relay::{HttpReply, Transport, TransportError};

pub const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n', 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
    b'R',
];
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// One request seen by the mock.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub url: String,
    pub body: serde_json::Value,
    pub timeout: Duration,
}

impl Recorded {
    pub fn model(&self) -> &str {
        self.body["model"].as_str().unwrap_or_default()
    }

    pub fn prompt(&self) -> &str {
        self.body["prompt"].as_str().unwrap_or_default()
    }

    pub fn has_image(&self) -> bool {
        self.body.get("images").is_some()
    }
}

/// Transport answering from a script, one entry per call, and recording
/// everything it is sent. Clones share the same script and log.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Result<HttpReply, TransportError>>>>,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_text(self, text: &str) -> Self {
        let body = serde_json::json!({ "model": "any", "response": text, "done": true });
        self.then(Ok(HttpReply::new(200, body.to_string())))
    }

    pub fn then_status(self, status: u16, body: &str) -> Self {
        self.then(Ok(HttpReply::new(status, body)))
    }

    pub fn then_fail(self, err: TransportError) -> Self {
        self.then(Err(err))
    }

    pub fn then(self, reply: Result<HttpReply, TransportError>) -> Self {
        self.script.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    fn next(
        &self,
        url: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        self.calls.lock().unwrap().push(Recorded {
            url: url.to_string(),
            body,
            timeout,
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into())))
    }
}

impl Transport for ScriptedTransport {
    fn post_json(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
        self.next(url, body, timeout)
    }

    fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, TransportError> {
        self.next(url, serde_json::Value::Null, timeout)
    }
}

/// Transport that always gives the same answer, regardless of call count.
#[derive(Clone)]
pub struct Fixed(pub String);

impl Transport for Fixed {
    fn post_json(
        &self,
        _url: &str,
        _body: String,
        _timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        Ok(HttpReply::new(
            200,
            serde_json::json!({ "response": self.0 }).to_string(),
        ))
    }

    fn get(&self, _url: &str, _timeout: Duration) -> Result<HttpReply, TransportError> {
        Ok(HttpReply::new(200, r#"{"models":[]}"#))
    }
}
