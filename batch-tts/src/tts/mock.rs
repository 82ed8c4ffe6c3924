//! Scripted synthesis backend for tests.
//!
//! Successful calls return a short mono WAV whose samples all equal the
//! 1-based call number, so merged output reveals which calls made it in.

use super::{SynthesisBackend, SynthesisError, SynthesisRequest};
use crate::audio::fixtures::wav_bytes;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const MOCK_SAMPLE_RATE: u32 = 8_000;

pub struct MockBackend {
    /// 1-based call numbers that fail
    failing_calls: HashSet<usize>,
    /// Fail every call
    always_fail: bool,
    /// Samples returned per successful call
    frames_per_call: usize,
    call_count: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn always_succeeds() -> Self {
        Self {
            failing_calls: HashSet::new(),
            always_fail: false,
            frames_per_call: 4,
            call_count: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn always_fails() -> Self {
        Self {
            always_fail: true,
            ..Self::always_succeeds()
        }
    }

    /// Fail only the listed calls (1-based).
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            failing_calls: calls.iter().copied().collect(),
            ..Self::always_succeeds()
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts received, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn frames_per_call(&self) -> usize {
        self.frames_per_call
    }
}

#[async_trait]
impl SynthesisBackend for MockBackend {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.texts.lock().unwrap().push(request.text.clone());

        if self.always_fail || self.failing_calls.contains(&call) {
            return Err(SynthesisError::Status {
                code: 500,
                body: format!("scripted failure on call {}", call),
            });
        }

        let samples = vec![call as i16; self.frames_per_call];
        Ok(wav_bytes(&samples, MOCK_SAMPLE_RATE))
    }

    fn endpoint(&self) -> &str {
        "mock://tts"
    }
}
