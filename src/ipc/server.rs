//! Unix domain socket server for IPC.
//!
//! Serves request-response traffic from the portal UI, forwards panel
//! controls into the conversation controller, and pushes conversation
//! events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::conversation::{ConversationInput, TranscriptEntry};
use crate::events::ConversationEvent;
use crate::session::SessionStore;

use super::protocol::{AssistantStatus, Notification, Phase, Request, Response};

const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// IPC server handling client connections.
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
    session: Arc<SessionStore>,
    commands: mpsc::Sender<ConversationInput>,
    event_tx: broadcast::Sender<ConversationEvent>,
}

/// Shared server state, kept in sync from broadcast events.
struct ServerState {
    status: AssistantStatus,
    start_time: std::time::Instant,
    transcript: Vec<TranscriptEntry>,
}

impl Server {
    /// Create a new IPC server.
    pub fn new(
        socket_path: &Path,
        session: Arc<SessionStore>,
        commands: mpsc::Sender<ConversationInput>,
        event_tx: broadcast::Sender<ConversationEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: AssistantStatus::default(),
            start_time: std::time::Instant::now(),
            transcript: Vec::new(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            shutdown_tx,
            session,
            commands,
            event_tx,
        })
    }

    /// Fold a conversation event into the status snapshot.
    pub async fn apply_event(&self, event: &ConversationEvent) {
        let mut state = self.state.write().await;
        match event {
            ConversationEvent::Connecting => state.status.phase = Phase::Connecting,
            ConversationEvent::Connected { degraded } => {
                state.status.phase = Phase::Connected;
                state.status.degraded = *degraded;
            }
            ConversationEvent::ConnectionFailed { .. } => state.status.phase = Phase::Error,
            ConversationEvent::SessionRequired => {}
            ConversationEvent::ListeningStarted => state.status.phase = Phase::Listening,
            ConversationEvent::ListeningStopped => state.status.phase = Phase::Connected,
            ConversationEvent::ProcessingStarted => state.status.phase = Phase::Processing,
            ConversationEvent::EntryAppended { seq, speaker, text } => {
                state.transcript.push(TranscriptEntry {
                    seq: *seq,
                    speaker: *speaker,
                    text: text.clone(),
                });
                state.status.transcript_len = state.transcript.len();
            }
            ConversationEvent::ReplyReady { .. } => state.status.phase = Phase::Connected,
            ConversationEvent::ReplySpoken { .. } => {}
            ConversationEvent::MuteChanged { muted } => state.status.muted = *muted,
            ConversationEvent::Closed { .. } => {
                state.status.phase = Phase::Idle;
                state.status.degraded = false;
                state.transcript.clear();
                state.status.transcript_len = 0;
            }
        }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let session = Arc::clone(&self.session);
                    let commands = self.commands.clone();
                    let event_rx = self.event_tx.subscribe();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, session, commands, event_rx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection.
    async fn handle_client(
        stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        session: Arc<SessionStore>,
        commands: mpsc::Sender<ConversationInput>,
        mut event_rx: broadcast::Receiver<ConversationEvent>,
    ) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let mut is_subscribed = false;

        loop {
            tokio::select! {
                request = Self::read_request(&mut reader) => {
                    let Some(request) = request? else {
                        debug!("client disconnected");
                        return Ok(());
                    };
                    debug!(?request, "received request");

                    let (response, subscribe) =
                        Self::process_request(request, &state, &session, &commands).await;
                    if subscribe {
                        is_subscribed = true;
                        debug!("client subscribed to notifications");
                    }

                    Self::send_message(&mut writer, &response).await?;
                }
                event = event_rx.recv(), if is_subscribed => {
                    match event {
                        Ok(event) => {
                            let notification = Notification::Event { event };
                            Self::send_message(&mut writer, &notification).await?;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "notification receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return Ok(()),
                    }
                }
            }
        }
    }

    /// Read one length-prefixed request. `None` on clean disconnect.
    async fn read_request(reader: &mut OwnedReadHalf) -> Result<Option<Request>> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_BYTES {
            warn!(len, "message too large, disconnecting");
            return Ok(None);
        }

        let mut msg_buf = vec![0u8; len];
        reader.read_exact(&mut msg_buf).await?;

        let request = serde_json::from_slice(&msg_buf).context("failed to parse request")?;
        Ok(Some(request))
    }

    /// Send a length-prefixed JSON message.
    async fn send_message<T: serde::Serialize>(
        writer: &mut OwnedWriteHalf,
        msg: &T,
    ) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response.
    /// Returns (Response, should_subscribe)
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        session: &Arc<SessionStore>,
        commands: &mpsc::Sender<ConversationInput>,
    ) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let mut state = state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                let member = session.current();
                state.status.signed_in = member.is_some();
                state.status.member_name = member.map(|m| m.name);
                (Response::Status(state.status.clone()), false)
            }

            Request::GetTranscript => {
                let state = state.read().await;
                (
                    Response::Transcript {
                        entries: state.transcript.clone(),
                    },
                    false,
                )
            }

            Request::Subscribe => (Response::Subscribed, true),

            Request::SignIn { email, password } => {
                let ok = session.sign_in(&email, &password);
                (Response::SignInResult { ok }, false)
            }

            Request::SignOut => {
                session.sign_out();
                (Response::Ack, false)
            }

            Request::OpenPanel => Self::forward(commands, ConversationInput::PanelOpened).await,
            Request::ClosePanel => Self::forward(commands, ConversationInput::PanelClosed).await,
            Request::PressMic => Self::forward(commands, ConversationInput::MicPressed).await,
            Request::ToggleMute => Self::forward(commands, ConversationInput::MuteToggled).await,
            Request::SubmitText { text } => {
                Self::forward(commands, ConversationInput::TextSubmitted { text }).await
            }
        }
    }

    /// Forward a panel control into the conversation controller.
    async fn forward(
        commands: &mpsc::Sender<ConversationInput>,
        input: ConversationInput,
    ) -> (Response, bool) {
        match commands.send(input).await {
            Ok(()) => (Response::Ack, false),
            Err(e) => {
                error!(?e, "conversation controller unavailable");
                (
                    Response::Error {
                        code: "controller_unavailable".to_string(),
                        message: "conversation controller is not running".to_string(),
                    },
                    false,
                )
            }
        }
    }

    /// Gracefully shutdown the server.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}
