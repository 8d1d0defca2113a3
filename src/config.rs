//! Configuration loading and management.
//!
//! Everything comes from the environment with sensible defaults; there is no
//! config file. `CLARA_*` variables tune the assistant.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// What to do when connection setup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailurePolicy {
    /// Fall back to a text-only connected state; the user is never blocked.
    Degrade,
    /// Surface a distinct error state, retryable by reopening the panel.
    Fail,
}

/// Which media session variant to run.
#[derive(Debug, Clone)]
pub enum MediaVariant {
    Local,
    Room { url: String, token: Option<String> },
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub variant: MediaVariant,
    pub connect_delay: Duration,
}

/// Which capture adapter to run.
#[derive(Debug, Clone)]
pub enum CaptureConfig {
    Scripted { script: Vec<String>, delay: Duration },
    Off,
}

/// Which synthesis adapter to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisConfig {
    Simulated,
    Off,
}

/// Fixed synthesis parameters for Clara's voice.
#[derive(Debug, Clone)]
pub struct SpeechDefaults {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice_hint: Option<String>,
}

/// Conversation-controller tuning.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Delay between connection success and the greeting, so the greeting
    /// audio does not overlap the connection transition.
    pub greeting_delay: Duration,
    /// Simulated think time before a reply is appended. Cosmetic.
    pub processing_delay: Duration,
    /// Upper bound on connection setup before it counts as failed.
    pub connect_timeout: Duration,
    pub connect_failure_policy: ConnectFailurePolicy,
    pub speech: SpeechDefaults,
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC.
    pub socket_path: PathBuf,

    /// Directory for runtime data.
    pub data_dir: PathBuf,

    /// Persisted session file.
    pub session_path: PathBuf,

    pub assistant: AssistantConfig,
    pub media: MediaConfig,
    pub capture: CaptureConfig,
    pub synthesis: SynthesisConfig,
}

impl Config {
    /// Load configuration from environment and defaults.
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("clara");

        let socket_path = data_dir.join("daemon.sock");
        let session_path = data_dir.join("session.json");

        let media = MediaConfig {
            variant: match std::env::var("CLARA_MEDIA").as_deref() {
                Ok("room") => MediaVariant::Room {
                    url: std::env::var("CLARA_ROOM_URL")
                        .unwrap_or_else(|_| "ws://127.0.0.1:7880".to_string()),
                    token: std::env::var("CLARA_ROOM_TOKEN").ok(),
                },
                Ok("local") | Err(_) => MediaVariant::Local,
                Ok(other) => {
                    warn!(value = other, "unknown CLARA_MEDIA, using local");
                    MediaVariant::Local
                }
            },
            connect_delay: env_duration_ms("CLARA_CONNECT_DELAY_MS", 1000),
        };

        let capture = match std::env::var("CLARA_CAPTURE").as_deref() {
            Ok("off") => CaptureConfig::Off,
            Ok("scripted") | Err(_) => CaptureConfig::Scripted {
                script: parse_script(std::env::var("CLARA_SCRIPT").ok().as_deref()),
                delay: env_duration_ms("CLARA_CAPTURE_DELAY_MS", 400),
            },
            Ok(other) => {
                warn!(value = other, "unknown CLARA_CAPTURE, using scripted");
                CaptureConfig::Scripted {
                    script: Vec::new(),
                    delay: env_duration_ms("CLARA_CAPTURE_DELAY_MS", 400),
                }
            }
        };

        let synthesis = match std::env::var("CLARA_SYNTHESIS").as_deref() {
            Ok("off") => SynthesisConfig::Off,
            Ok("simulated") | Err(_) => SynthesisConfig::Simulated,
            Ok(other) => {
                warn!(value = other, "unknown CLARA_SYNTHESIS, using simulated");
                SynthesisConfig::Simulated
            }
        };

        let assistant = AssistantConfig {
            greeting_delay: env_duration_ms("CLARA_GREETING_DELAY_MS", 500),
            processing_delay: env_duration_ms("CLARA_PROCESSING_DELAY_MS", 0),
            connect_timeout: env_duration_ms("CLARA_CONNECT_TIMEOUT_MS", 10_000),
            connect_failure_policy: parse_policy(
                std::env::var("CLARA_ON_CONNECT_FAILURE").ok().as_deref(),
            ),
            speech: SpeechDefaults {
                rate: 0.9,
                pitch: 1.0,
                volume: 0.8,
                voice_hint: match std::env::var("CLARA_VOICE_HINT") {
                    Ok(hint) if hint.trim().is_empty() => None,
                    Ok(hint) => Some(hint),
                    Err(_) => Some("samantha".to_string()),
                },
            },
        };

        Ok(Self {
            socket_path,
            data_dir,
            session_path,
            assistant,
            media,
            capture,
            synthesis,
        })
    }

    /// Ensure data directory exists.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

fn env_duration_ms(key: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

fn parse_policy(value: Option<&str>) -> ConnectFailurePolicy {
    match value {
        Some("fail") => ConnectFailurePolicy::Fail,
        Some("degrade") | None => ConnectFailurePolicy::Degrade,
        Some(other) => {
            warn!(value = other, "unknown CLARA_ON_CONNECT_FAILURE, degrading");
            ConnectFailurePolicy::Degrade
        }
    }
}

fn parse_script(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load() {
        let config = Config::load().unwrap();
        assert!(config.socket_path.to_string_lossy().contains("clara"));
        assert_eq!(config.session_path.file_name().unwrap(), "session.json");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(parse_policy(Some("fail")), ConnectFailurePolicy::Fail);
        assert_eq!(parse_policy(Some("degrade")), ConnectFailurePolicy::Degrade);
        assert_eq!(parse_policy(None), ConnectFailurePolicy::Degrade);
        assert_eq!(parse_policy(Some("bogus")), ConnectFailurePolicy::Degrade);
    }

    #[test]
    fn test_script_parsing() {
        assert_eq!(
            parse_script(Some("I have a headache, thanks")),
            vec!["I have a headache".to_string(), "thanks".to_string()]
        );
        assert!(parse_script(None).is_empty());
        assert!(parse_script(Some("  ,, ")).is_empty());
    }
}
