//! Synthesis voice catalog and hint matching.

/// The set of voice names the synthesis backend reports as installed.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    names: Vec<String>,
}

impl VoiceCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The voice set shipped with the demo synthesis backend.
    pub fn platform_default() -> Self {
        Self::new(["Samantha", "Karen", "Daniel", "Alex", "Moira"])
    }

    /// Resolve a voice hint to an installed voice name.
    ///
    /// Best-effort, case-insensitive substring match; `None` means the
    /// platform default voice should be used.
    pub fn select(&self, hint: Option<&str>) -> Option<&str> {
        let hint = hint?.trim();
        if hint.is_empty() {
            return None;
        }
        let hint = hint.to_lowercase();
        self.names
            .iter()
            .find(|name| name.to_lowercase().contains(&hint))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_match_is_case_insensitive() {
        let catalog = VoiceCatalog::platform_default();
        assert_eq!(catalog.select(Some("SAMANTHA")), Some("Samantha"));
    }

    #[test]
    fn test_hint_matches_substring() {
        let catalog = VoiceCatalog::platform_default();
        assert_eq!(catalog.select(Some("kar")), Some("Karen"));
    }

    #[test]
    fn test_unmatched_hint_falls_back_to_default() {
        let catalog = VoiceCatalog::platform_default();
        assert_eq!(catalog.select(Some("nonexistent")), None);
    }

    #[test]
    fn test_missing_or_empty_hint() {
        let catalog = VoiceCatalog::platform_default();
        assert_eq!(catalog.select(None), None);
        assert_eq!(catalog.select(Some("  ")), None);
    }
}
