//! Local-only media session: no transport, no remote participants.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{MediaError, MediaSession, RemoteAudioFrame, RoomInfo};

/// Session for the browser-speech-only deployment. Connection setup is a
/// simulated delay; published audio stays on this machine.
pub struct LocalSession {
    connect_delay: Duration,
    fail_connect: bool,
    connected: AtomicBool,
    remote_tx: broadcast::Sender<RemoteAudioFrame>,
}

impl LocalSession {
    pub fn new(connect_delay: Duration) -> Self {
        let (remote_tx, _) = broadcast::channel(16);
        Self {
            connect_delay,
            fail_connect: false,
            connected: AtomicBool::new(false),
            remote_tx,
        }
    }

    /// Variant whose connection attempt always fails, for exercising the
    /// connect-failure policy.
    pub fn failing(connect_delay: Duration) -> Self {
        Self {
            fail_connect: true,
            ..Self::new(connect_delay)
        }
    }
}

#[async_trait]
impl MediaSession for LocalSession {
    fn id(&self) -> &'static str {
        "local"
    }

    async fn connect(&self) -> Result<RoomInfo, MediaError> {
        tokio::time::sleep(self.connect_delay).await;

        if self.fail_connect {
            return Err(MediaError::Connect("simulated connection failure".into()));
        }

        self.connected.store(true, Ordering::SeqCst);
        info!("local media session ready");
        Ok(RoomInfo {
            connected: true,
            participants: Vec::new(),
        })
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            debug!("local media session closed");
        }
    }

    async fn publish_audio(&self, samples: &[f32]) -> Result<(), MediaError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(MediaError::NotConnected);
        }
        debug!(samples = samples.len(), "published audio locally");
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
    async fn test_connect_and_publish() {
        let session = LocalSession::new(Duration::ZERO);
        let info = session.connect().await.unwrap();
        assert!(info.connected);
        assert!(info.participants.is_empty());

        session.publish_audio(&[0.0; 160]).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_requires_connection() {
        let session = LocalSession::new(Duration::ZERO);
        assert!(matches!(
            session.publish_audio(&[0.0; 160]).await,
            Err(MediaError::NotConnected)
        ));

        session.connect().await.unwrap();
        session.disconnect().await;
        assert!(matches!(
            session.publish_audio(&[0.0; 160]).await,
            Err(MediaError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_failing_variant() {
        let session = LocalSession::failing(Duration::ZERO);
        assert!(matches!(
            session.connect().await,
            Err(MediaError::Connect(_))
        ));
    }
}
