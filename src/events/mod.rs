//! Events broadcast by the conversation controller.
//!
//! Subscribed IPC clients receive these as push notifications; the server
//! also mirrors them into its status snapshot.

use serde::{Deserialize, Serialize};

use crate::conversation::Speaker;

/// Events emitted by the conversation controller during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// Connection attempt started (panel opened).
    Connecting,

    /// Connection established; `degraded` means text-only fallback mode.
    Connected { degraded: bool },

    /// Connection attempt failed.
    ConnectionFailed { reason: String },

    /// Panel was opened without a signed-in member.
    SessionRequired,

    /// Speech capture started.
    ListeningStarted,

    /// Speech capture stopped without producing an utterance.
    ListeningStopped,

    /// A user utterance was accepted and a reply is being prepared.
    ProcessingStarted,

    /// An entry was appended to the transcript.
    EntryAppended {
        seq: u64,
        speaker: Speaker,
        text: String,
    },

    /// The assistant reply with this sequence index is complete.
    ReplyReady { seq: u64 },

    /// The assistant reply was handed to speech synthesis.
    ReplySpoken { seq: u64 },

    /// Mute was toggled.
    MuteChanged { muted: bool },

    /// The panel closed and the conversation was torn down.
    Closed {
        /// Duration in milliseconds the panel was open.
        duration_ms: u64,
    },
}

impl std::fmt::Display for ConversationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationEvent::Connecting => write!(f, "CONNECTING"),
            ConversationEvent::Connected { degraded } => {
                if *degraded {
                    write!(f, "CONNECTED (text-only)")
                } else {
                    write!(f, "CONNECTED")
                }
            }
            ConversationEvent::ConnectionFailed { reason } => {
                write!(f, "CONNECTION_FAILED ({reason})")
            }
            ConversationEvent::SessionRequired => write!(f, "SESSION_REQUIRED"),
            ConversationEvent::ListeningStarted => write!(f, "LISTENING_STARTED"),
            ConversationEvent::ListeningStopped => write!(f, "LISTENING_STOPPED"),
            ConversationEvent::ProcessingStarted => write!(f, "PROCESSING_STARTED"),
            ConversationEvent::EntryAppended { seq, speaker, .. } => {
                write!(f, "ENTRY_APPENDED (#{seq} {speaker})")
            }
            ConversationEvent::ReplyReady { seq } => write!(f, "REPLY_READY (#{seq})"),
            ConversationEvent::ReplySpoken { seq } => write!(f, "REPLY_SPOKEN (#{seq})"),
            ConversationEvent::MuteChanged { muted } => write!(f, "MUTE_CHANGED ({muted})"),
            ConversationEvent::Closed { duration_ms } => write!(f, "CLOSED ({duration_ms}ms)"),
        }
    }
}
