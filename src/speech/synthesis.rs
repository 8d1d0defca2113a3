//! Speech synthesis adapter.
//!
//! The synthesis output device is shared process-wide, so at most one
//! utterance may be audible at a time: every `speak` cancels whatever is
//! currently playing before starting the new utterance.

use std::sync::Mutex;

use tracing::debug;

use super::voices::VoiceCatalog;

/// A single utterance to synthesize.
#[derive(Debug, Clone)]
pub struct SpeakRequest {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Best-effort voice selection; `None` uses the platform default.
    pub voice_hint: Option<String>,
}

/// Synthesis capability contract.
pub trait SpeechSynthesis: Send + Sync {
    /// Whether the host environment offers a synthesis facility.
    fn is_available(&self) -> bool;

    /// Cancel any in-flight utterance and start speaking this one.
    /// A no-op when the capability is absent.
    fn speak(&self, req: SpeakRequest);

    /// Cancel all queued and in-flight utterances.
    fn cancel_all(&self);
}

/// Operations dispatched to the synthesis backend, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOp {
    CancelAll,
    Speak {
        text: String,
        /// Resolved voice name, or `None` for the platform default.
        voice: Option<String>,
    },
}

/// Demo synthesis backend: resolves voices against a catalog and records the
/// dispatched operations instead of producing audio.
pub struct SimulatedSynthesis {
    catalog: VoiceCatalog,
    ops: Mutex<Vec<SynthesisOp>>,
}

impl SimulatedSynthesis {
    pub fn new(catalog: VoiceCatalog) -> Self {
        Self {
            catalog,
            ops: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every operation dispatched so far, in order.
    pub fn ops(&self) -> Vec<SynthesisOp> {
        self.ops.lock().unwrap().clone()
    }

    /// The utterance currently "audible", if the last operation started one.
    pub fn current_utterance(&self) -> Option<String> {
        match self.ops.lock().unwrap().last() {
            Some(SynthesisOp::Speak { text, .. }) => Some(text.clone()),
            _ => None,
        }
    }
}

impl SpeechSynthesis for SimulatedSynthesis {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&self, req: SpeakRequest) {
        let voice = self
            .catalog
            .select(req.voice_hint.as_deref())
            .map(str::to_string);
        debug!(
            chars = req.text.len(),
            rate = req.rate,
            pitch = req.pitch,
            volume = req.volume,
            voice = voice.as_deref().unwrap_or("default"),
            "synthesizing utterance"
        );

        let mut ops = self.ops.lock().unwrap();
        ops.push(SynthesisOp::CancelAll);
        ops.push(SynthesisOp::Speak {
            text: req.text,
            voice,
        });
    }

    fn cancel_all(&self) {
        self.ops.lock().unwrap().push(SynthesisOp::CancelAll);
    }
}

/// Capability-absent variant: utterances degrade silently to transcript-only
/// display, never a user-visible error.
pub struct NullSynthesis;

impl SpeechSynthesis for NullSynthesis {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&self, req: SpeakRequest) {
        debug!(chars = req.text.len(), "synthesis unavailable, dropping utterance");
    }

    fn cancel_all(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str, hint: Option<&str>) -> SpeakRequest {
        SpeakRequest {
            text: text.to_string(),
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
            voice_hint: hint.map(str::to_string),
        }
    }

    #[test]
    fn test_speak_cancels_before_starting() {
        let synthesis = SimulatedSynthesis::new(VoiceCatalog::platform_default());
        synthesis.speak(request("first", None));

        assert_eq!(
            synthesis.ops(),
            vec![
                SynthesisOp::CancelAll,
                SynthesisOp::Speak {
                    text: "first".to_string(),
                    voice: None,
                },
            ]
        );
    }

    #[test]
    fn test_second_speak_replaces_first() {
        let synthesis = SimulatedSynthesis::new(VoiceCatalog::platform_default());
        synthesis.speak(request("first", None));
        synthesis.speak(request("second", None));

        // Call order: cancel, speak, cancel, speak — only the second audible.
        let ops = synthesis.ops();
        assert_eq!(ops.len(), 4);
        assert_eq!(ops[2], SynthesisOp::CancelAll);
        assert_eq!(synthesis.current_utterance(), Some("second".to_string()));
    }

    #[test]
    fn test_voice_hint_resolution() {
        let synthesis = SimulatedSynthesis::new(VoiceCatalog::platform_default());
        synthesis.speak(request("hello", Some("samantha")));

        match synthesis.ops().last() {
            Some(SynthesisOp::Speak { voice, .. }) => {
                assert_eq!(voice.as_deref(), Some("Samantha"));
            }
            other => panic!("expected speak op, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_all_silences() {
        let synthesis = SimulatedSynthesis::new(VoiceCatalog::platform_default());
        synthesis.speak(request("hello", None));
        synthesis.cancel_all();

        assert_eq!(synthesis.current_utterance(), None);
    }

    #[test]
    fn test_null_synthesis_is_silent() {
        let synthesis = NullSynthesis;
        assert!(!synthesis.is_available());
        synthesis.speak(request("nobody hears this", None));
        synthesis.cancel_all();
    }
}
