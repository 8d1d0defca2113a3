//! IPC module for daemon-UI communication.

mod protocol;
mod server;

pub use protocol::{AssistantStatus, Notification, Phase, Request, Response};
pub use server::Server;
