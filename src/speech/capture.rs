//! One-shot speech capture adapter.
//!
//! A capture delivers at most one final recognition result and always ends
//! with exactly one `Ended` event, after which its handle is dead. Events are
//! stamped with the controller generation that started the capture so late
//! callbacks from a torn-down conversation can be dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Errors returned when starting a capture.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("speech capture is not available in this environment")]
    Unavailable,

    #[error("a capture is already active")]
    AlreadyActive,
}

/// Why a capture produced no usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFailure {
    /// The user declined microphone access.
    PermissionDenied,
    /// No speech was recognized before the capture ended.
    NoSpeech,
    /// Transient recognition failure.
    Recognition,
}

impl std::fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureFailure::PermissionDenied => write!(f, "permission-denied"),
            CaptureFailure::NoSpeech => write!(f, "no-speech"),
            CaptureFailure::Recognition => write!(f, "recognition-error"),
        }
    }
}

/// Event delivered by an active capture.
#[derive(Debug, Clone)]
pub struct CaptureEvent {
    /// Controller generation that started this capture.
    pub generation: u64,
    pub kind: CaptureEventKind,
}

#[derive(Debug, Clone)]
pub enum CaptureEventKind {
    /// Final recognized utterance. At most one per capture.
    Result { text: String },
    /// Capture failed. `Ended` still follows.
    Error { reason: CaptureFailure },
    /// The capture is finished; the handle is no longer valid.
    Ended,
}

/// Handle to an active capture. Dropping it without `stop` lets the capture
/// run to completion.
pub struct CaptureHandle {
    stop_tx: Option<oneshot::Sender<()>>,
}

impl CaptureHandle {
    pub fn new(stop_tx: oneshot::Sender<()>) -> Self {
        Self {
            stop_tx: Some(stop_tx),
        }
    }

    /// Explicit user-initiated stop. No result will be delivered.
    pub fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Capture capability contract.
pub trait SpeechCapture: Send + Sync {
    /// Whether the host environment offers a capture facility.
    fn is_available(&self) -> bool;

    /// Begin a one-shot capture, delivering events to `events`.
    fn start(
        &self,
        generation: u64,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Result<CaptureHandle, CaptureError>;
}

/// Demo recognizer: replays a queue of scripted utterances, one per capture,
/// each delivered as a final result after a fixed recognition delay.
pub struct ScriptedCapture {
    utterances: Mutex<VecDeque<String>>,
    delay: Duration,
    deny_permission: bool,
    active: Arc<AtomicBool>,
}

impl ScriptedCapture {
    pub fn new(delay: Duration) -> Self {
        Self {
            utterances: Mutex::new(VecDeque::new()),
            delay,
            deny_permission: false,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_script<I, S>(delay: Duration, script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let capture = Self::new(delay);
        {
            let mut utterances = capture.utterances.lock().unwrap();
            utterances.extend(script.into_iter().map(Into::into));
        }
        capture
    }

    /// Variant that simulates the user declining microphone access.
    pub fn denying_permission(delay: Duration) -> Self {
        Self {
            deny_permission: true,
            ..Self::new(delay)
        }
    }
}

impl SpeechCapture for ScriptedCapture {
    fn is_available(&self) -> bool {
        true
    }

    fn start(
        &self,
        generation: u64,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Result<CaptureHandle, CaptureError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::AlreadyActive);
        }

        let next = if self.deny_permission {
            None
        } else {
            self.utterances.lock().unwrap().pop_front()
        };
        let deny = self.deny_permission;
        let delay = self.delay;
        let active = Arc::clone(&self.active);
        let (stop_tx, stop_rx) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if deny {
                        Some(CaptureEventKind::Error {
                            reason: CaptureFailure::PermissionDenied,
                        })
                    } else {
                        match next {
                            Some(text) => {
                                debug!(generation, "scripted capture recognized utterance");
                                Some(CaptureEventKind::Result { text })
                            }
                            None => Some(CaptureEventKind::Error {
                                reason: CaptureFailure::NoSpeech,
                            }),
                        }
                    }
                }
                _ = stop_rx => {
                    debug!(generation, "capture stopped before a result");
                    None
                }
            };

            if let Some(kind) = outcome {
                if events.send(CaptureEvent { generation, kind }).await.is_err() {
                    warn!("capture event receiver dropped");
                }
            }
            let _ = events
                .send(CaptureEvent {
                    generation,
                    kind: CaptureEventKind::Ended,
                })
                .await;
            active.store(false, Ordering::SeqCst);
        });

        Ok(CaptureHandle::new(stop_tx))
    }
}

/// Capability-absent variant: `start` always fails.
pub struct UnavailableCapture;

impl SpeechCapture for UnavailableCapture {
    fn is_available(&self) -> bool {
        false
    }

    fn start(
        &self,
        _generation: u64,
        _events: mpsc::Sender<CaptureEvent>,
    ) -> Result<CaptureHandle, CaptureError> {
        Err(CaptureError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    async fn drain(rx: &mut mpsc::Receiver<CaptureEvent>) -> Vec<CaptureEvent> {
        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            let ended = matches!(event.kind, CaptureEventKind::Ended);
            out.push(event);
            if ended {
                break;
            }
        }
        out
    }

    #[tokio::test]
    async fn test_result_then_ended() {
        let capture = ScriptedCapture::with_script(Duration::ZERO, ["I have a headache"]);
        let (tx, mut rx) = mpsc::channel(8);

        tokio_test::assert_ok!(capture.start(7, tx));
        let events = drain(&mut rx).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].generation, 7);
        assert!(
            matches!(&events[0].kind, CaptureEventKind::Result { text } if text == "I have a headache")
        );
        assert!(matches!(events[1].kind, CaptureEventKind::Ended));
    }

    #[tokio::test]
    async fn test_empty_script_reports_no_speech() {
        let capture = ScriptedCapture::new(Duration::ZERO);
        let (tx, mut rx) = mpsc::channel(8);

        capture.start(0, tx).unwrap();
        let events = drain(&mut rx).await;

        assert!(matches!(
            events[0].kind,
            CaptureEventKind::Error {
                reason: CaptureFailure::NoSpeech
            }
        ));
        assert!(matches!(events[1].kind, CaptureEventKind::Ended));
    }

    #[tokio::test]
    async fn test_second_start_while_active_is_rejected() {
        let capture = ScriptedCapture::with_script(Duration::from_secs(60), ["queued"]);
        let (tx, _rx) = mpsc::channel(8);

        let _handle = capture.start(0, tx.clone()).unwrap();
        assert!(matches!(
            capture.start(0, tx),
            Err(CaptureError::AlreadyActive)
        ));
    }

    #[tokio::test]
    async fn test_stop_suppresses_result_but_still_ends() {
        let capture = ScriptedCapture::with_script(Duration::from_secs(60), ["never delivered"]);
        let (tx, mut rx) = mpsc::channel(8);

        let handle = capture.start(1, tx).unwrap();
        handle.stop();
        let events = drain(&mut rx).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].kind, CaptureEventKind::Ended));
    }

    #[tokio::test]
    async fn test_capture_can_restart_after_end() {
        let capture = ScriptedCapture::with_script(Duration::ZERO, ["one", "two"]);

        let (tx, mut rx) = mpsc::channel(8);
        capture.start(0, tx).unwrap();
        drain(&mut rx).await;

        let (tx, mut rx) = mpsc::channel(8);
        capture.start(1, tx).unwrap();
        let events = drain(&mut rx).await;
        assert!(matches!(&events[0].kind, CaptureEventKind::Result { text } if text == "two"));
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let capture = ScriptedCapture::denying_permission(Duration::ZERO);
        let (tx, mut rx) = mpsc::channel(8);

        capture.start(0, tx).unwrap();
        let events = drain(&mut rx).await;

        assert!(matches!(
            events[0].kind,
            CaptureEventKind::Error {
                reason: CaptureFailure::PermissionDenied
            }
        ));
    }

    #[test]
    fn test_unavailable_capture() {
        let capture = UnavailableCapture;
        assert!(!capture.is_available());
        let (tx, _rx) = mpsc::channel(1);
        assert!(matches!(capture.start(0, tx), Err(CaptureError::Unavailable)));
    }
}
