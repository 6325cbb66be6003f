//! In-process recognizers for integration tests.
//!
//! Behavior is keyed by segment file name, so tests can script failures for
//! specific segments without touching the filesystem.

#![allow(dead_code)]

use async_trait::async_trait;
use scribe_core::control::InterruptFlag;
use scribe_core::dispatch::{RecognitionProvider, Recognize};
use scribe_core::error::TransportError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Fails each named segment a fixed number of times, then returns
/// `"text of <name>"`. Optionally raises an interrupt flag when a given
/// segment is first seen.
#[derive(Default)]
pub struct ScriptedRecognizer {
    name: String,
    fail_first: HashMap<String, u32>,
    raise_on: Option<(String, InterruptFlag)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// `segment` fails its first `times` calls.
    pub fn failing(mut self, segment: &str, times: u32) -> Self {
        self.fail_first.insert(segment.to_string(), times);
        self
    }

    pub fn raising_on(mut self, segment: &str, flag: InterruptFlag) -> Self {
        self.raise_on = Some((segment.to_string(), flag));
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Segment names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, segment: &str) -> usize {
        self.calls().iter().filter(|c| *c == segment).count()
    }

    fn respond(&self, segment: &Path) -> Result<Option<String>, TransportError> {
        let name = segment
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(name.clone());
            calls.iter().filter(|c| **c == name).count() as u32
        };
        if let Some((trigger, flag)) = &self.raise_on {
            if *trigger == name {
                flag.raise();
            }
        }
        if call <= self.fail_first.get(&name).copied().unwrap_or(0) {
            return Err(TransportError::Provider(format!("{} unavailable", name)));
        }
        Ok(Some(format!("text of {}", name)))
    }
}

#[async_trait]
impl Recognize for ScriptedRecognizer {
    async fn recognize(&self, segment: &Path) -> Result<Option<String>, TransportError> {
        self.respond(segment)
    }
}

#[async_trait]
impl RecognitionProvider for ScriptedRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize(&self, segment: &Path) -> Result<Option<String>, TransportError> {
        self.respond(segment)
    }
}

/// `dir/seg_0.wav` .. `dir/seg_{n-1}.wav`.
pub fn segment_paths(dir: &Path, n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| dir.join(format!("seg_{}.wav", i))).collect()
}
