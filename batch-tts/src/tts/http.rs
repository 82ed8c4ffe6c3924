//! HTTP synthesis client for a TTS server accepting JSON POST requests.

use super::{SynthesisBackend, SynthesisError, SynthesisRequest, validate_audio};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Longest error body kept in a `SynthesisError::Status`.
const MAX_ERROR_BODY: usize = 200;

/// Client for a single TTS endpoint.
///
/// Requests are spaced by at least `pause` measured from the end of the
/// previous request, since the server handles one synthesis at a time.
/// Concurrent callers queue on `last_finished` and never overlap.
pub struct HttpSynthesisClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
    pause: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl HttpSynthesisClient {
    /// Create a client for `endpoint` with a per-request timeout.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        pause: Duration,
    ) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SynthesisError::Transport {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
            pause,
            last_finished: Mutex::new(None),
        })
    }

    /// Build the endpoint URL from its parts.
    pub fn endpoint_url(host: &str, port: u16, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://{}:{}/{}", host, port, path)
    }

    async fn wait_for_turn(&self, last_finished: Option<Instant>) {
        if let Some(finished) = last_finished {
            let ready_at = finished + self.pause;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
    }

    async fn send(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Status {
                code: status.as_u16(),
                body: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        validate_audio(&body)?;

        Ok(body.to_vec())
    }

    fn transport_error(&self, error: reqwest::Error) -> SynthesisError {
        if error.is_timeout() {
            SynthesisError::Timeout {
                after: self.timeout,
            }
        } else {
            SynthesisError::Transport {
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl SynthesisBackend for HttpSynthesisClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        // Held across the wait and the request so callers run one at a time.
        let mut last_finished = self.last_finished.lock().await;
        self.wait_for_turn(*last_finished).await;
        let result = self.send(request).await;
        *last_finished = Some(Instant::now());
        result
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fixtures::wav_bytes;
    use crate::tts::EmotionOptions;
    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use serde_json::Value;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest::new(
            text,
            &PathBuf::from("/voices/speaker.wav"),
            &EmotionOptions::default(),
        )
    }

    /// Serve `router` on an ephemeral port and return its endpoint URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        HttpSynthesisClient::endpoint_url("127.0.0.1", port, "/tts_url")
    }

    fn client(endpoint: &str) -> HttpSynthesisClient {
        HttpSynthesisClient::new(endpoint, Duration::from_secs(5), Duration::ZERO).unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            HttpSynthesisClient::endpoint_url("localhost", 6006, "/tts_url"),
            "http://localhost:6006/tts_url"
        );
        assert_eq!(
            HttpSynthesisClient::endpoint_url("10.0.0.2", 8080, "synth"),
            "http://10.0.0.2:8080/synth"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("你好世界", 2), "你好...");
    }

    #[tokio::test]
    async fn test_successful_synthesis_posts_json() {
        let seen: Arc<StdMutex<Vec<Value>>> = Arc::new(StdMutex::new(Vec::new()));
        let recorder = seen.clone();
        let router = Router::new().route(
            "/tts_url",
            post(move |Json(body): Json<Value>| {
                let recorder = recorder.clone();
                async move {
                    recorder.lock().unwrap().push(body);
                    wav_bytes(&[1, 2, 3, 4], 22_050)
                }
            }),
        );
        let endpoint = serve(router).await;

        let audio = client(&endpoint).synthesize(&request("你好。")).await.unwrap();
        assert_eq!(audio, wav_bytes(&[1, 2, 3, 4], 22_050));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["text"], "你好。");
        assert_eq!(seen[0]["spk_audio_path"], "/voices/speaker.wav");
        assert_eq!(seen[0]["max_text_tokens_per_sentence"], 120);
    }

    #[tokio::test]
    async fn test_error_status_is_failure() {
        let router = Router::new().route(
            "/tts_url",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
        );
        let endpoint = serve(router).await;

        let err = client(&endpoint).synthesize(&request("x")).await.unwrap_err();
        match err {
            SynthesisError::Status { code, body } => {
                assert_eq!(code, 500);
                assert_eq!(body, "model crashed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_failure() {
        let router = Router::new().route("/tts_url", post(|| async { Vec::<u8>::new() }));
        let endpoint = serve(router).await;

        let err = client(&endpoint).synthesize(&request("x")).await.unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyBody));
    }

    #[tokio::test]
    async fn test_non_audio_body_is_failure() {
        let router = Router::new().route("/tts_url", post(|| async { "not audio" }));
        let endpoint = serve(router).await;

        let err = client(&endpoint).synthesize(&request("x")).await.unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidAudio(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = HttpSynthesisClient::endpoint_url("127.0.0.1", port, "/tts_url");
        let err = client(&endpoint).synthesize(&request("x")).await.unwrap_err();
        assert!(matches!(err, SynthesisError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let router = Router::new().route(
            "/tts_url",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                wav_bytes(&[0], 16_000)
            }),
        );
        let endpoint = serve(router).await;

        let client =
            HttpSynthesisClient::new(&endpoint, Duration::from_millis(200), Duration::ZERO)
                .unwrap();
        let err = client.synthesize(&request("x")).await.unwrap_err();
        assert!(matches!(err, SynthesisError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_requests_are_spaced_by_pause() {
        let router = Router::new().route("/tts_url", post(|| async { wav_bytes(&[0], 16_000) }));
        let endpoint = serve(router).await;

        let pause = Duration::from_millis(150);
        let client = HttpSynthesisClient::new(&endpoint, Duration::from_secs(5), pause).unwrap();

        let started = std::time::Instant::now();
        client.synthesize(&request("one")).await.unwrap();
        client.synthesize(&request("two")).await.unwrap();
        client.synthesize(&request("three")).await.unwrap();

        assert!(started.elapsed() >= pause * 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_do_not_overlap() {
        let arrivals: Arc<StdMutex<Vec<std::time::Instant>>> = Arc::new(StdMutex::new(Vec::new()));
        let recorder = arrivals.clone();
        let router = Router::new().route(
            "/tts_url",
            post(move || {
                let recorder = recorder.clone();
                async move {
                    recorder.lock().unwrap().push(std::time::Instant::now());
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    wav_bytes(&[0], 16_000)
                }
            }),
        );
        let endpoint = serve(router).await;

        let pause = Duration::from_millis(150);
        let client = HttpSynthesisClient::new(&endpoint, Duration::from_secs(5), pause).unwrap();

        let request_one = request("one");
        let request_two = request("two");
        let (first, second) = tokio::join!(
            client.synthesize(&request_one),
            client.synthesize(&request_two)
        );
        assert!(first.is_ok());
        assert!(second.is_ok());

        let arrivals = arrivals.lock().unwrap();
        assert_eq!(arrivals.len(), 2);
        // The second request waits for the first response plus the pause.
        assert!(arrivals[1] - arrivals[0] >= pause + Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_synthesize_to_file_writes_only_on_success() {
        let router = Router::new()
            .route("/tts_url", post(|| async { wav_bytes(&[7, 7], 16_000) }))
            .route(
                "/broken",
                post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
            );
        let endpoint = serve(router).await;
        let broken = endpoint.replace("/tts_url", "/broken");
        let dir = tempfile::TempDir::new().unwrap();

        let ok_path = dir.path().join("parts").join("doc_part001.wav");
        let written = client(&endpoint)
            .synthesize_to_file(&request("a"), &ok_path)
            .await
            .unwrap();
        assert_eq!(written as u64, std::fs::metadata(&ok_path).unwrap().len());

        let failed_path = dir.path().join("parts").join("doc_part002.wav");
        let result = client(&broken)
            .synthesize_to_file(&request("b"), &failed_path)
            .await;
        assert!(result.is_err());
        assert!(!failed_path.exists());
    }
}
