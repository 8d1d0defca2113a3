//! clara-daemon: Background daemon for the Clara healthcare voice assistant
//!
//! The daemon hosts the conversation core behind a Unix-socket IPC surface:
//! - Conversation state machine with capture/synthesis orchestration
//! - Keyword triage for assistant replies
//! - Member session persistence across restarts
//! - Pluggable media connection (local-only or remote room)
//!
//! The portal UI renders transcript and status; all conversation logic
//! lives here.

mod config;
mod conversation;
mod events;
mod ipc;
mod lifecycle;
mod media;
mod session;
mod speech;
mod triage;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{CaptureConfig, Config, MediaVariant, SynthesisConfig};
use crate::conversation::{Collaborators, Controller};
use crate::events::ConversationEvent;
use crate::ipc::Server;
use crate::media::{LocalSession, MediaSession, RemoteRoomSession};
use crate::session::SessionStore;
use crate::speech::{
    NullSynthesis, ScriptedCapture, SimulatedSynthesis, SpeechCapture, SpeechSynthesis,
    UnavailableCapture, VoiceCatalog,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "clara-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, "configuration loaded");

    // Restore the persisted member session (fails open to signed-out)
    let session = Arc::new(SessionStore::load(config.session_path.clone()));

    // Select adapters per configuration
    let media: Arc<dyn MediaSession> = match &config.media.variant {
        MediaVariant::Local => Arc::new(LocalSession::new(config.media.connect_delay)),
        MediaVariant::Room { url, token } => Arc::new(RemoteRoomSession::new(
            url.clone(),
            token.clone(),
            config.media.connect_delay,
        )),
    };
    let capture: Arc<dyn SpeechCapture> = match &config.capture {
        CaptureConfig::Scripted { script, delay } => {
            Arc::new(ScriptedCapture::with_script(*delay, script.clone()))
        }
        CaptureConfig::Off => Arc::new(UnavailableCapture),
    };
    let synthesis: Arc<dyn SpeechSynthesis> = match config.synthesis {
        SynthesisConfig::Simulated => {
            Arc::new(SimulatedSynthesis::new(VoiceCatalog::platform_default()))
        }
        SynthesisConfig::Off => Arc::new(NullSynthesis),
    };

    // Create channels for inter-component communication
    // IPC server and deferred tasks -> controller
    let (input_tx, input_rx) = mpsc::channel(32);
    // Capture adapter -> controller
    let (capture_tx, capture_rx) = mpsc::channel(8);
    // Controller -> IPC server (for broadcasting conversation events)
    let (event_tx, _event_rx) = broadcast::channel::<ConversationEvent>(64);

    // Create the conversation controller
    let mut controller = Controller::new(
        config.assistant.clone(),
        Collaborators {
            session: Arc::clone(&session),
            media,
            capture,
            synthesis,
        },
        event_tx.clone(),
        input_tx.clone(),
        capture_tx,
    );

    // Create IPC server wired to the session store and controller
    let server = Server::new(
        &config.socket_path,
        Arc::clone(&session),
        input_tx,
        event_tx.clone(),
    )?;

    // Mirror conversation events into the IPC status snapshot
    let mut ipc_event_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the conversation controller (processes panel inputs)
        _ = controller.run(input_rx, capture_rx) => {
            info!("conversation controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Handle conversation events for IPC synchronization
        _ = async {
            loop {
                match ipc_event_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "conversation event");
                        server_for_events.apply_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "conversation event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("conversation event handler exited");
        }

        // Wait for shutdown signal
        _ = lifecycle::wait_for_shutdown() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;

    info!("clara-daemon stopped");

    Ok(())
}
