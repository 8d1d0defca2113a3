//! Append-only conversation transcript.
//!
//! Entries carry a gapless, monotonically increasing sequence index and are
//! never mutated after append. Closing the panel discards the log.

use serde::{Deserialize, Serialize};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "You"),
            Speaker::Assistant => write!(f, "Clara"),
        }
    }
}

/// One utterance or reply in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub seq: u64,
    pub speaker: Speaker,
    pub text: String,
}

/// The ordered log for one conversation session.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_seq: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its sequence index.
    pub fn append(&mut self, speaker: Speaker, text: &str) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(TranscriptEntry {
            seq,
            speaker,
            text: text.to_string(),
        });
        seq
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard all entries and restart sequencing for a fresh session.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }
}
