//! Media connection capability.
//!
//! One polymorphic interface covers both deployment shapes: a local-only
//! session with no transport, and a remote real-time room joined with a URL
//! and access token. The variant is selected by configuration.

mod local;
mod room;

use async_trait::async_trait;
use tokio::sync::broadcast;

pub use local::LocalSession;
pub use room::RemoteRoomSession;

/// Errors from the media layer.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("connection failed: {0}")]
    Connect(String),

    /// Token issuance belongs to an external backend; joining without one
    /// cannot succeed.
    #[error("room access token is missing")]
    MissingToken,

    #[error("connection timed out")]
    Timeout,

    #[error("not connected")]
    NotConnected,
}

/// Result of a successful connection.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub connected: bool,
    pub participants: Vec<String>,
}

/// A chunk of remote audio delivered by the session.
#[derive(Debug, Clone)]
pub struct RemoteAudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Media session contract. New transports only need to implement this trait.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Stable variant identifier (e.g. `local`, `room`).
    fn id(&self) -> &'static str;

    /// Establish the session.
    async fn connect(&self) -> Result<RoomInfo, MediaError>;

    /// Tear the session down. Safe to call when not connected.
    async fn disconnect(&self);

    /// Publish captured audio into the session.
    async fn publish_audio(&self, samples: &[f32]) -> Result<(), MediaError>;

    /// Subscribe to audio arriving from remote participants.
    fn subscribe_remote_audio(&self) -> broadcast::Receiver<RemoteAudioFrame>;
}
