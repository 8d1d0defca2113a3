//! Member session state with file persistence.
//!
//! The session survives daemon restarts via a JSON file under the data
//! directory. A missing or corrupt file yields the signed-out state —
//! persistence problems never block the user.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{info, warn};

use super::members::{find_member, MemberProfile, DEMO_PASSWORD};

pub struct SessionStore {
    path: PathBuf,
    current: Mutex<Option<MemberProfile>>,
}

impl SessionStore {
    /// Load the persisted session, failing open to signed-out.
    pub fn load(path: PathBuf) -> Self {
        let current = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<MemberProfile>(&raw) {
                Ok(profile) => {
                    info!(email = %profile.email, "restored persisted session");
                    Some(profile)
                }
                Err(e) => {
                    warn!(error = %e, "corrupt session file, starting signed out");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(error = %e, "unreadable session file, starting signed out");
                None
            }
        };

        Self {
            path,
            current: Mutex::new(current),
        }
    }

    /// Sign a member in against the demo directory.
    pub fn sign_in(&self, email: &str, password: &str) -> bool {
        if password != DEMO_PASSWORD {
            return false;
        }
        let Some(profile) = find_member(email) else {
            return false;
        };

        if let Err(e) = self.persist(&profile) {
            warn!(error = %e, "failed to persist session, continuing in memory");
        }
        *self.current.lock().unwrap() = Some(profile);
        info!(email, "member signed in");
        true
    }

    /// Clear the session and remove the persisted file.
    pub fn sign_out(&self) {
        *self.current.lock().unwrap() = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "failed to remove session file"),
        }
        info!("member signed out");
    }

    /// Snapshot of the signed-in member, if any.
    pub fn current(&self) -> Option<MemberProfile> {
        self.current.lock().unwrap().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    fn persist(&self, profile: &MemberProfile) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(profile).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, raw)
    }
}
