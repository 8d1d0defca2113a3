//! Remote real-time room session (simulated join).
//!
//! Joining requires a connection URL and an access token. Token issuance is
//! handled by an external backend; this variant only validates presence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{MediaError, MediaSession, RemoteAudioFrame, RoomInfo};

pub struct RemoteRoomSession {
    url: String,
    token: Option<String>,
    join_delay: Duration,
    connected: AtomicBool,
    remote_tx: broadcast::Sender<RemoteAudioFrame>,
}

impl RemoteRoomSession {
    pub fn new(url: impl Into<String>, token: Option<String>, join_delay: Duration) -> Self {
        let (remote_tx, _) = broadcast::channel(16);
        Self {
            url: url.into(),
            token,
            join_delay,
            connected: AtomicBool::new(false),
            remote_tx,
        }
    }
}

#[async_trait]
impl MediaSession for RemoteRoomSession {
    fn id(&self) -> &'static str {
        "room"
    }

    async fn connect(&self) -> Result<RoomInfo, MediaError> {
        if self.token.is_none() {
            return Err(MediaError::MissingToken);
        }

        tokio::time::sleep(self.join_delay).await;

        self.connected.store(true, Ordering::SeqCst);
        info!(url = %self.url, "joined room (simulated)");
        Ok(RoomInfo {
            connected: true,
            participants: vec!["Clara".to_string(), "User".to_string()],
        })
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            debug!(url = %self.url, "left room");
        }
    }

    async fn publish_audio(&self, samples: &[f32]) -> Result<(), MediaError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(MediaError::NotConnected);
        }
        debug!(samples = samples.len(), "published audio to room");
        Ok(())
    }

    fn subscribe_remote_audio(&self) -> broadcast::Receiver<RemoteAudioFrame> {
        self.remote_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_with_token() {
        let session = RemoteRoomSession::new(
            "ws://127.0.0.1:7880",
            Some("demo-token".to_string()),
            Duration::ZERO,
        );
        let info = session.connect().await.unwrap();
        assert!(info.connected);
        assert_eq!(info.participants, vec!["Clara", "User"]);
    }

    #[tokio::test]
    async fn test_join_without_token_fails() {
        let session = RemoteRoomSession::new("ws://127.0.0.1:7880", None, Duration::ZERO);
        assert!(matches!(
            session.connect().await,
            Err(MediaError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_publish_after_join() {
        let session = RemoteRoomSession::new(
            "ws://127.0.0.1:7880",
            Some("demo-token".to_string()),
            Duration::ZERO,
        );
        session.connect().await.unwrap();
        session.publish_audio(&[0.1; 320]).await.unwrap();

        let _remote = session.subscribe_remote_audio();
        session.disconnect().await;
    }
}
