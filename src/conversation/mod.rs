//! The conversation core: state machine, transcript, and turn orchestration.
//!
//! One `Controller` exists per daemon; it is active while the assistant
//! panel is open and idle otherwise.

mod controller;
mod transcript;

pub use controller::{Collaborators, Controller, ConversationInput, ConversationState};
pub use transcript::{Speaker, Transcript, TranscriptEntry};
