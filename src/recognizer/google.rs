use super::proto::{self, StreamingRecognizeRequest, StreamingRecognizeResponse};
use super::stream::{AudioSink, RecognitionEvent, RecognitionStream};
use super::token::TokenSource;
use super::{RecognitionSettings, SpeechRecognizer};
use crate::config::SpeechConfig;
use crate::credentials::Credentials;
use crate::error::RecognizerError;
use futures::stream::{Stream, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, info, warn};

/// Upstream events buffered per session before the pump waits
const EVENT_BUFFER: usize = 32;

/// Google Cloud Speech-to-Text v1 streaming recognizer
pub struct GoogleRecognizer {
    /// Lazily connected, shared by every session
    channel: Channel,
    tokens: TokenSource,
}

impl GoogleRecognizer {
    pub fn new(config: &SpeechConfig, credentials: Credentials) -> Result<Self, RecognizerError> {
        let endpoint = Endpoint::from_shared(config.endpoint.clone()).map_err(|e| {
            RecognizerError::Endpoint {
                reason: e.to_string(),
            }
        })?;

        let host = endpoint
            .uri()
            .host()
            .ok_or_else(|| RecognizerError::Endpoint {
                reason: format!("no host in {}", config.endpoint),
            })?
            .to_string();

        let endpoint = endpoint.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
        let endpoint = if endpoint.uri().scheme_str() == Some("https") {
            endpoint
                .tls_config(
                    ClientTlsConfig::new()
                        .domain_name(host.clone())
                        .with_native_roots(),
                )
                .map_err(|e| RecognizerError::Endpoint {
                    reason: e.to_string(),
                })?
        } else {
            endpoint
        };

        info!(
            endpoint = %config.endpoint,
            project = credentials.project_id().unwrap_or("-"),
            client_email = %credentials.client_email(),
            connect_timeout_ms = config.connect_timeout_ms,
            "Google speech recognizer initialized"
        );

        Ok(Self {
            channel: endpoint.connect_lazy(),
            tokens: TokenSource::new(credentials, format!("https://{}/", host)),
        })
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for GoogleRecognizer {
    async fn open(
        &self,
        settings: &RecognitionSettings,
    ) -> Result<RecognitionStream, RecognizerError> {
        let token = self.tokens.bearer()?;
        let authorization = MetadataValue::try_from(format!("Bearer {}", token)).map_err(|e| {
            RecognizerError::Auth {
                reason: e.to_string(),
            }
        })?;

        let (audio_tx, audio_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        // Config first, then every audio chunk until the sink is ended
        let first = StreamingRecognizeRequest::config(settings.into());
        let requests = futures::stream::iter([first]).chain(futures::stream::unfold(
            audio_rx,
            |mut rx| async move {
                rx.recv()
                    .await
                    .map(|chunk| (StreamingRecognizeRequest::audio(chunk), rx))
            },
        ));

        let mut request = tonic::Request::new(requests);
        request.metadata_mut().insert("authorization", authorization);

        let grpc = tonic::client::Grpc::new(self.channel.clone());
        tokio::spawn(pump(grpc, request, event_tx));

        Ok(RecognitionStream::new(AudioSink::new(audio_tx), event_rx))
    }

    fn name(&self) -> &str {
        "google-speech-v1"
    }
}

/// Drive one `StreamingRecognize` call, translating responses into events.
/// Returning drops `events`, which the session sees as the upstream end.
async fn pump<S>(
    mut grpc: tonic::client::Grpc<Channel>,
    request: tonic::Request<S>,
    events: mpsc::Sender<RecognitionEvent>,
) where
    S: futures::Stream<Item = StreamingRecognizeRequest> + Send + 'static,
{
    if let Err(e) = grpc.ready().await {
        let err = RecognizerError::Transport {
            reason: e.to_string(),
        };
        let _ = events.send(RecognitionEvent::Error(err)).await;
        return;
    }

    let codec = ProstCodec::<StreamingRecognizeRequest, StreamingRecognizeResponse>::default();
    let path = PathAndQuery::from_static(proto::STREAMING_RECOGNIZE_PATH);

    let inbound = match grpc.streaming(request, path, codec).await {
        Ok(response) => response.into_inner(),
        Err(status) => {
            warn!("StreamingRecognize rejected: {}", status);
            let _ = events.send(RecognitionEvent::Error(status.into())).await;
            return;
        }
    };

    relay_responses(inbound, events).await;
}

/// Forward call responses as events until the call completes, fails or the
/// session drops its receiver.
async fn relay_responses<S>(mut inbound: S, events: mpsc::Sender<RecognitionEvent>)
where
    S: Stream<Item = Result<StreamingRecognizeResponse, tonic::Status>> + Unpin,
{
    loop {
        tokio::select! {
            _ = events.closed() => {
                debug!("Session dropped its recognition stream, cancelling call");
                break;
            }
            message = inbound.next() => match message {
                Some(Ok(response)) => {
                    for event in response_events(response) {
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Err(status)) => {
                    let _ = events.send(RecognitionEvent::Error(status.into())).await;
                    break;
                }
                None => {
                    debug!("StreamingRecognize completed");
                    break;
                }
            }
        }
    }
}

/// An in-band error status comes before the results of the same response
fn response_events(response: StreamingRecognizeResponse) -> Vec<RecognitionEvent> {
    let mut out = Vec::with_capacity(2);
    if let Some(status) = response.error.as_ref().filter(|s| s.code != 0) {
        out.push(RecognitionEvent::Error(RecognizerError::Status {
            code: status.code.to_string(),
            message: status.message.clone(),
        }));
    }
    out.push(RecognitionEvent::Response(response.into()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::proto::{
        RpcStatus, SpeechRecognitionAlternative, StreamingRecognitionResult,
    };

    fn final_response(text: &str) -> StreamingRecognizeResponse {
        StreamingRecognizeResponse {
            error: None,
            results: vec![StreamingRecognitionResult {
                alternatives: vec![SpeechRecognitionAlternative {
                    transcript: text.to_string(),
                    confidence: 0.9,
                }],
                is_final: true,
                stability: 0.0,
                channel_tag: 0,
                language_code: "en-us".to_string(),
            }],
            speech_event_type: 0,
        }
    }

    #[test]
    fn test_in_band_error_becomes_error_event() {
        let response = StreamingRecognizeResponse {
            error: Some(RpcStatus {
                code: 11,
                message: "Exceeded maximum allowed stream duration".to_string(),
            }),
            results: Vec::new(),
            speech_event_type: 0,
        };

        let events = response_events(response);
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecognitionEvent::Error(RecognizerError::Status { code, message }) => {
                assert_eq!(code, "11");
                assert!(message.contains("maximum allowed stream duration"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert!(matches!(events[1], RecognitionEvent::Response(_)));
    }

    #[test]
    fn test_ok_status_is_not_an_error() {
        let mut response = final_response("hello");
        response.error = Some(RpcStatus {
            code: 0,
            message: String::new(),
        });

        let events = response_events(response);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RecognitionEvent::Response(_)));
    }

    #[tokio::test]
    async fn test_completed_call_closes_event_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let inbound = futures::stream::iter(vec![Ok(final_response("hello there"))]);

        relay_responses(inbound, tx).await;

        match rx.recv().await {
            Some(RecognitionEvent::Response(response)) => {
                assert_eq!(response.results[0].alternatives[0].transcript, "hello there");
            }
            other => panic!("expected response, got {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_call_reports_status_then_closes() {
        let (tx, mut rx) = mpsc::channel(8);
        let inbound = futures::stream::iter(vec![
            Ok(final_response("first")),
            Err(tonic::Status::unavailable("connection reset")),
            Ok(final_response("never delivered")),
        ]);

        relay_responses(inbound, tx).await;

        assert!(matches!(rx.recv().await, Some(RecognitionEvent::Response(_))));
        assert!(matches!(
            rx.recv().await,
            Some(RecognitionEvent::Error(RecognizerError::Status { .. }))
        ));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_session_stops_relay() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let inbound =
            futures::stream::pending::<Result<StreamingRecognizeResponse, tonic::Status>>();
        tokio::time::timeout(Duration::from_secs(1), relay_responses(inbound, tx))
            .await
            .unwrap();
    }
}
