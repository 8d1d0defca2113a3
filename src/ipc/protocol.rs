//! IPC message protocol definitions.
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationState, TranscriptEntry};
use crate::events::ConversationEvent;
use crate::triage;

/// Conversation phase as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Connecting,
    Connected,
    Listening,
    Processing,
    Error,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Idle
    }
}

impl From<ConversationState> for Phase {
    fn from(state: ConversationState) -> Self {
        match state {
            ConversationState::Idle => Phase::Idle,
            ConversationState::Connecting => Phase::Connecting,
            ConversationState::Connected => Phase::Connected,
            ConversationState::Listening => Phase::Listening,
            ConversationState::Processing => Phase::Processing,
            ConversationState::Error => Phase::Error,
        }
    }
}

/// Requests from the portal UI to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity.
    Ping,

    /// Request current daemon status.
    GetStatus,

    /// Request the current conversation transcript.
    GetTranscript,

    /// Subscribe to conversation event notifications.
    Subscribe,

    /// Sign a member in.
    SignIn { email: String, password: String },

    /// Sign the current member out.
    SignOut,

    /// The assistant panel became visible.
    OpenPanel,

    /// The assistant panel was closed.
    ClosePanel,

    /// The user pressed the microphone button.
    PressMic,

    /// The user toggled mute.
    ToggleMute,

    /// The user typed an utterance.
    SubmitText { text: String },
}

/// Responses from daemon to UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping.
    Pong,

    /// Current daemon status.
    Status(AssistantStatus),

    /// Current transcript snapshot.
    Transcript { entries: Vec<TranscriptEntry> },

    /// Subscription confirmed.
    Subscribed,

    /// Sign-in attempt result.
    SignInResult { ok: bool },

    /// Request accepted.
    Ack,

    /// Error response.
    Error { code: String, message: String },
}

/// Push notification for subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A conversation event occurred.
    Event { event: ConversationEvent },
}

/// Full daemon status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantStatus {
    /// Daemon version.
    pub version: String,

    /// Current conversation phase.
    pub phase: Phase,

    /// Whether synthesis is muted.
    pub muted: bool,

    /// Whether the conversation is in text-only fallback mode.
    pub degraded: bool,

    /// Whether a member is signed in.
    pub signed_in: bool,

    /// Display name of the signed-in member.
    pub member_name: Option<String>,

    /// Number of transcript entries in the open conversation.
    pub transcript_len: usize,

    /// Uptime in seconds.
    pub uptime_secs: u64,

    /// Notice for host UIs to display verbatim.
    pub emergency_notice: String,
}

impl Default for AssistantStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            phase: Phase::default(),
            muted: false,
            degraded: false,
            signed_in: false,
            member_name: None,
            transcript_len: 0,
            uptime_secs: 0,
            emergency_notice: triage::EMERGENCY_FOOTER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::SignIn {
            email: "patient@healthpartners.com".to_string(),
            password: "secret".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("sign_in"));
        assert!(json.contains("patient@healthpartners.com"));
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{"type":"press_mic"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(req, Request::PressMic));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(AssistantStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
        assert!(json.contains("911"));
    }

    #[test]
    fn test_notification_round_trip() {
        let notification = Notification::Event {
            event: ConversationEvent::MuteChanged { muted: true },
        };
        let json = serde_json::to_string(&notification).unwrap();
        let back: Notification = serde_json::from_str(&json).unwrap();
        let Notification::Event { event } = back;
        assert!(matches!(event, ConversationEvent::MuteChanged { muted: true }));
    }

    #[test]
    fn test_phase_conversion() {
        assert_eq!(Phase::from(ConversationState::Listening), Phase::Listening);
        assert_eq!(Phase::from(ConversationState::Idle), Phase::Idle);
    }
}
