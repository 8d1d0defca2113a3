//! Conversation controller.
//!
//! Owns the connection lifecycle, turn state, transcript, and mute flag for
//! one assistant panel, and orchestrates the capture, synthesis, and media
//! adapters. Inputs arrive over a channel and are processed one at a time,
//! so a capture result can never land out of order relative to the mic press
//! that started it.
//!
//! Deferred work (connection setup, the greeting timer, the reply timer,
//! capture callbacks) is stamped with a generation counter. Closing the
//! panel bumps the generation, so anything still in flight for the previous
//! session is dropped when it arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::{AssistantConfig, ConnectFailurePolicy};
use crate::events::ConversationEvent;
use crate::media::{MediaError, MediaSession, RoomInfo};
use crate::session::SessionStore;
use crate::speech::{
    CaptureEvent, CaptureEventKind, CaptureFailure, CaptureHandle, SpeakRequest, SpeechCapture,
    SpeechSynthesis,
};
use crate::triage;

use super::transcript::{Speaker, Transcript, TranscriptEntry};

/// The possible states of one conversation panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Panel closed, no conversation.
    Idle,
    /// Connection setup in progress.
    Connecting,
    /// Ready for a turn.
    Connected,
    /// Speech capture active.
    Listening,
    /// A user utterance is being turned into a reply.
    Processing,
    /// Connection setup failed (strict policy only).
    Error,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationState::Idle => write!(f, "Idle"),
            ConversationState::Connecting => write!(f, "Connecting"),
            ConversationState::Connected => write!(f, "Connected"),
            ConversationState::Listening => write!(f, "Listening"),
            ConversationState::Processing => write!(f, "Processing"),
            ConversationState::Error => write!(f, "Error"),
        }
    }
}

/// Inputs processed by the controller, one at a time.
#[derive(Debug)]
pub enum ConversationInput {
    /// The host made the panel visible.
    PanelOpened,
    /// The host hid the panel.
    PanelClosed,
    /// The user pressed the microphone button.
    MicPressed,
    /// The user toggled mute.
    MuteToggled,
    /// The user typed an utterance (text-only interaction).
    TextSubmitted { text: String },
    /// Connection setup finished.
    ConnectFinished {
        generation: u64,
        outcome: Result<RoomInfo, MediaError>,
    },
    /// The post-connect greeting timer fired.
    GreetingDue { generation: u64 },
    /// The reply think-timer fired.
    ReplyDue { generation: u64, reply: String },
    /// A capture adapter event.
    Capture(CaptureEvent),
}

/// The external collaborators the controller orchestrates.
pub struct Collaborators {
    pub session: Arc<SessionStore>,
    pub media: Arc<dyn MediaSession>,
    pub capture: Arc<dyn SpeechCapture>,
    pub synthesis: Arc<dyn SpeechSynthesis>,
}

pub struct Controller {
    state: ConversationState,
    transcript: Transcript,
    muted: bool,
    degraded: bool,
    generation: u64,
    opened_at: Option<Instant>,
    state_entered_at: Option<Instant>,
    capture_handle: Option<CaptureHandle>,
    config: AssistantConfig,
    collaborators: Collaborators,
    event_tx: broadcast::Sender<ConversationEvent>,
    /// Self-sender used by deferred tasks to post results back.
    input_tx: mpsc::Sender<ConversationInput>,
    /// Sender handed to the capture adapter on each start.
    capture_tx: mpsc::Sender<CaptureEvent>,
}

impl Controller {
    pub fn new(
        config: AssistantConfig,
        collaborators: Collaborators,
        event_tx: broadcast::Sender<ConversationEvent>,
        input_tx: mpsc::Sender<ConversationInput>,
        capture_tx: mpsc::Sender<CaptureEvent>,
    ) -> Self {
        Self {
            state: ConversationState::Idle,
            transcript: Transcript::new(),
            muted: false,
            degraded: false,
            generation: 0,
            opened_at: None,
            state_entered_at: None,
            capture_handle: None,
            config,
            collaborators,
            event_tx,
            input_tx,
            capture_tx,
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        self.transcript.entries()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Run the controller, processing inputs and capture events.
    pub async fn run(
        &mut self,
        mut input_rx: mpsc::Receiver<ConversationInput>,
        mut capture_rx: mpsc::Receiver<CaptureEvent>,
    ) {
        info!("conversation controller started in Idle state");

        loop {
            tokio::select! {
                input = input_rx.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => break,
                },
                event = capture_rx.recv() => match event {
                    Some(event) => self.handle_input(ConversationInput::Capture(event)),
                    None => break,
                },
            }
        }

        info!("conversation controller stopped");
    }

    /// Process a single input against the current state.
    pub fn handle_input(&mut self, input: ConversationInput) {
        match input {
            ConversationInput::PanelOpened => self.handle_panel_opened(),
            ConversationInput::PanelClosed => self.handle_panel_closed(),
            ConversationInput::MicPressed => self.handle_mic_pressed(),
            ConversationInput::MuteToggled => self.handle_mute_toggled(),
            ConversationInput::TextSubmitted { text } => self.handle_text_submitted(&text),
            ConversationInput::ConnectFinished {
                generation,
                outcome,
            } => self.handle_connect_finished(generation, outcome),
            ConversationInput::GreetingDue { generation } => self.handle_greeting_due(generation),
            ConversationInput::ReplyDue { generation, reply } => {
                self.handle_reply_due(generation, &reply)
            }
            ConversationInput::Capture(event) => self.handle_capture_event(event),
        }
    }

    fn handle_panel_opened(&mut self) {
        match self.state {
            ConversationState::Idle | ConversationState::Error => {}
            _ => {
                debug!(state = %self.state, "panel already open");
                return;
            }
        }

        if !self.collaborators.session.is_signed_in() {
            warn!("panel opened without a signed-in member");
            self.emit(ConversationEvent::SessionRequired);
            return;
        }

        self.opened_at = Some(Instant::now());
        self.transition_to(ConversationState::Connecting);
        self.emit(ConversationEvent::Connecting);

        let media = Arc::clone(&self.collaborators.media);
        let tx = self.input_tx.clone();
        let generation = self.generation;
        let timeout = self.config.connect_timeout;
        tokio::spawn(async move {
            let outcome = connect_with_timeout(media, timeout).await;
            let _ = tx
                .send(ConversationInput::ConnectFinished {
                    generation,
                    outcome,
                })
                .await;
        });
    }

    fn handle_connect_finished(
        &mut self,
        generation: u64,
        outcome: Result<RoomInfo, MediaError>,
    ) {
        if generation != self.generation {
            debug!("stale connection result dropped");
            return;
        }
        if self.state != ConversationState::Connecting {
            return;
        }

        match outcome {
            Ok(room) => {
                info!(
                    media = self.collaborators.media.id(),
                    participants = room.participants.len(),
                    "connected"
                );
                self.degraded = false;
                self.transition_to(ConversationState::Connected);
                self.emit(ConversationEvent::Connected { degraded: false });
                self.schedule_greeting();
            }
            Err(e) => match self.config.connect_failure_policy {
                ConnectFailurePolicy::Degrade => {
                    warn!(error = %e, "connection failed, falling back to text-only");
                    self.degraded = true;
                    self.emit(ConversationEvent::ConnectionFailed {
                        reason: e.to_string(),
                    });
                    self.transition_to(ConversationState::Connected);
                    self.emit(ConversationEvent::Connected { degraded: true });
                    self.append(Speaker::Assistant, triage::DEGRADED_GREETING);
                }
                ConnectFailurePolicy::Fail => {
                    warn!(error = %e, "connection failed");
                    self.transition_to(ConversationState::Error);
                    self.emit(ConversationEvent::ConnectionFailed {
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    fn schedule_greeting(&self) {
        let tx = self.input_tx.clone();
        let generation = self.generation;
        let delay = self.config.greeting_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ConversationInput::GreetingDue { generation }).await;
        });
    }

    fn handle_greeting_due(&mut self, generation: u64) {
        if generation != self.generation {
            debug!("stale greeting timer dropped");
            return;
        }
        match self.state {
            ConversationState::Connected
            | ConversationState::Listening
            | ConversationState::Processing => {}
            _ => return,
        }

        let seq = self.append(Speaker::Assistant, triage::GREETING);
        self.speak(triage::GREETING, seq);
    }

    fn handle_mic_pressed(&mut self) {
        match self.state {
            ConversationState::Connected => {
                if self.capture_handle.is_some() {
                    debug!("mic press ignored, capture still winding down");
                    return;
                }
                if !self.collaborators.capture.is_available() {
                    self.append(Speaker::Assistant, triage::CAPTURE_UNAVAILABLE_MESSAGE);
                    return;
                }
                match self
                    .collaborators
                    .capture
                    .start(self.generation, self.capture_tx.clone())
                {
                    Ok(handle) => {
                        self.capture_handle = Some(handle);
                        self.transition_to(ConversationState::Listening);
                        self.emit(ConversationEvent::ListeningStarted);
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to start capture");
                        self.append(Speaker::Assistant, triage::CAPTURE_TROUBLE_MESSAGE);
                    }
                }
            }
            ConversationState::Listening => {
                // Toggle: user-initiated stop.
                if let Some(handle) = self.capture_handle.take() {
                    handle.stop();
                }
                self.transition_to(ConversationState::Connected);
                self.emit(ConversationEvent::ListeningStopped);
            }
            ConversationState::Processing => {
                debug!("mic press ignored while processing");
            }
            _ => {
                debug!(state = %self.state, "mic press ignored");
            }
        }
    }

    fn handle_capture_event(&mut self, event: CaptureEvent) {
        if event.generation != self.generation {
            debug!("late capture event dropped");
            return;
        }

        match event.kind {
            CaptureEventKind::Result { text } => {
                if self.state != ConversationState::Listening {
                    debug!(state = %self.state, "capture result outside Listening dropped");
                    return;
                }
                self.append(Speaker::User, &text);
                self.transition_to(ConversationState::Processing);
                self.emit(ConversationEvent::ProcessingStarted);
                self.schedule_reply(triage::generate_reply(&text).to_string());
            }
            CaptureEventKind::Error { reason } => {
                warn!(%reason, "capture error");
                if self.state == ConversationState::Listening {
                    self.transition_to(ConversationState::Connected);
                    self.emit(ConversationEvent::ListeningStopped);
                }
                let message = match reason {
                    CaptureFailure::PermissionDenied => triage::PERMISSION_DENIED_MESSAGE,
                    CaptureFailure::NoSpeech | CaptureFailure::Recognition => {
                        triage::CAPTURE_TROUBLE_MESSAGE
                    }
                };
                self.append(Speaker::Assistant, message);
            }
            CaptureEventKind::Ended => {
                self.capture_handle = None;
                if self.state == ConversationState::Listening {
                    self.transition_to(ConversationState::Connected);
                    self.emit(ConversationEvent::ListeningStopped);
                }
            }
        }
    }

    fn handle_text_submitted(&mut self, text: &str) {
        if self.state != ConversationState::Connected {
            debug!(state = %self.state, "text submission ignored");
            return;
        }
        if text.trim().is_empty() {
            return;
        }

        self.append(Speaker::User, text);
        self.transition_to(ConversationState::Processing);
        self.emit(ConversationEvent::ProcessingStarted);
        self.schedule_reply(triage::generate_reply(text).to_string());
    }

    fn schedule_reply(&self, reply: String) {
        let tx = self.input_tx.clone();
        let generation = self.generation;
        let delay = self.config.processing_delay;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = tx
                .send(ConversationInput::ReplyDue { generation, reply })
                .await;
        });
    }

    fn handle_reply_due(&mut self, generation: u64, reply: &str) {
        if generation != self.generation {
            debug!("stale reply dropped");
            return;
        }
        if self.state != ConversationState::Processing {
            return;
        }

        // The transcript entry always lands before synthesis is asked to play it.
        let seq = self.append(Speaker::Assistant, reply);
        self.emit(ConversationEvent::ReplyReady { seq });
        self.speak(reply, seq);
        self.transition_to(ConversationState::Connected);
    }

    fn handle_mute_toggled(&mut self) {
        self.muted = !self.muted;
        info!(muted = self.muted, "mute toggled");
        self.emit(ConversationEvent::MuteChanged { muted: self.muted });
    }

    fn handle_panel_closed(&mut self) {
        if self.state == ConversationState::Idle {
            return;
        }

        let duration_ms = self
            .opened_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        if let Some(handle) = self.capture_handle.take() {
            handle.stop();
        }
        self.collaborators.synthesis.cancel_all();
        self.transcript.clear();

        // Invalidate everything still in flight for this session.
        self.generation += 1;
        self.opened_at = None;
        self.degraded = false;

        let media = Arc::clone(&self.collaborators.media);
        tokio::spawn(async move {
            media.disconnect().await;
        });

        self.transition_to(ConversationState::Idle);
        self.emit(ConversationEvent::Closed { duration_ms });
    }

    /// Append a transcript entry, emit it, and return its sequence index.
    fn append(&mut self, speaker: Speaker, text: &str) -> u64 {
        let seq = self.transcript.append(speaker, text);
        debug!(seq, %speaker, "transcript entry appended");
        self.emit(ConversationEvent::EntryAppended {
            seq,
            speaker,
            text: text.to_string(),
        });
        seq
    }

    /// Hand a reply to synthesis unless muted.
    fn speak(&self, text: &str, seq: u64) {
        if self.muted {
            debug!(seq, "muted, suppressing synthesis");
            return;
        }

        self.collaborators.synthesis.speak(SpeakRequest {
            text: text.to_string(),
            rate: self.config.speech.rate,
            pitch: self.config.speech.pitch,
            volume: self.config.speech.volume,
            voice_hint: self.config.speech.voice_hint.clone(),
        });
        self.emit(ConversationEvent::ReplySpoken { seq });
    }

    fn transition_to(&mut self, new_state: ConversationState) {
        if new_state == self.state {
            return;
        }
        let old_state = self.state;
        let duration_ms = self
            .state_entered_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = %old_state,
            to = %new_state,
            duration_ms = duration_ms,
            "state transition"
        );

        self.state = new_state;
        self.state_entered_at = Some(Instant::now());
    }

    fn emit(&self, event: ConversationEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}

/// Bound connection setup so a hung backend cannot wedge the panel.
async fn connect_with_timeout(
    media: Arc<dyn MediaSession>,
    timeout: Duration,
) -> Result<RoomInfo, MediaError> {
    match tokio::time::timeout(timeout, media.connect()).await {
        Ok(outcome) => outcome,
        Err(_) => Err(MediaError::Timeout),
    }
}
