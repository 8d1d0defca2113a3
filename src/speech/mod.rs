//! Speech capture and synthesis adapters.
//!
//! Both capabilities are optional in the host environment; callers degrade
//! to text-only interaction when they are absent.

pub mod capture;
pub mod synthesis;
pub mod voices;

pub use capture::{
    CaptureError, CaptureEvent, CaptureEventKind, CaptureFailure, CaptureHandle, ScriptedCapture,
    SpeechCapture, UnavailableCapture,
};
pub use synthesis::{
    NullSynthesis, SimulatedSynthesis, SpeakRequest, SpeechSynthesis, SynthesisOp,
};
pub use voices::VoiceCatalog;
