//! Scan options and candidate-search tuning.
//!
//! `ScanOptions` comes from command-line switches; `SearchConfig` has built-in
//! defaults and can be overridden from a JSON file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which event-call problems the classifier reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Report event calls without a target object.
    pub include_empty_events: bool,
    /// Report event calls naming a method the target type does not have.
    pub include_missing_methods: bool,
    /// Report event calls with a target but no method.
    pub include_unset_methods: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_empty_events: true,
            include_missing_methods: true,
            include_unset_methods: true,
        }
    }
}

impl ScanOptions {
    pub fn any_event_checks(&self) -> bool {
        self.include_empty_events || self.include_missing_methods || self.include_unset_methods
    }
}

/// Assemblies that never contain user types.
pub const DEFAULT_EXCLUDED_ASSEMBLIES: &[&str] = &[
    "UnityEngine*",
    "UnityEditor*",
    "Unity.*",
    "System*",
    "mscorlib",
    "netstandard",
    "Mono.*",
    "Microsoft.*",
    "*nunit*",
    "*NUnit*",
    "ExCSS*",
    "JetBrains.*",
];

/// Tuning for the candidate search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Glob patterns matched against assembly names; matches are skipped.
    pub excluded_assembly_patterns: Vec<String>,
    /// Types are kept while their name distance is below this.
    pub type_distance_limit: usize,
    /// Fuzzy assembly matches are kept while their distance is below this.
    pub assembly_distance_limit: usize,
    /// How long fuzzy assembly matching stays enabled, in milliseconds.
    pub fuzzy_budget_ms: u64,
    /// Extension of source assets, without the dot.
    pub source_extension: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            excluded_assembly_patterns: DEFAULT_EXCLUDED_ASSEMBLIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            type_distance_limit: 10,
            assembly_distance_limit: 50,
            fuzzy_budget_ms: 3000,
            source_extension: "cs".to_string(),
        }
    }
}

impl SearchConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn fuzzy_budget(&self) -> Duration {
        Duration::from_millis(self.fuzzy_budget_ms)
    }

    /// Compiles the exclusion patterns.
    pub fn exclusion_patterns(&self) -> Result<Vec<glob::Pattern>> {
        self.excluded_assembly_patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).with_context(|| format!("Invalid assembly pattern '{}'", p))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_enable_every_event_check() {
        let options = ScanOptions::default();
        assert!(options.include_empty_events);
        assert!(options.include_missing_methods);
        assert!(options.include_unset_methods);
        assert!(options.any_event_checks());
    }

    #[test]
    fn no_event_checks_when_all_disabled() {
        let options = ScanOptions {
            include_empty_events: false,
            include_missing_methods: false,
            include_unset_methods: false,
        };
        assert!(!options.any_event_checks());
    }

    #[test]
    fn load_keeps_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "type_distance_limit": 4 }}"#).unwrap();
        let config = SearchConfig::load(file.path()).unwrap();
        assert_eq!(config.type_distance_limit, 4);
        assert_eq!(config.assembly_distance_limit, 50);
        assert_eq!(config.fuzzy_budget(), Duration::from_secs(3));
        assert_eq!(config.source_extension, "cs");
    }

    #[test]
    fn load_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = SearchConfig::load(file.path()).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config"));
    }

    #[test]
    fn default_patterns_compile_and_match_framework_assemblies() {
        let patterns = SearchConfig::default().exclusion_patterns().unwrap();
        let excluded = |name: &str| patterns.iter().any(|p| p.matches(name));
        assert!(excluded("UnityEngine.CoreModule"));
        assert!(excluded("System.Core"));
        assert!(excluded("nunit.framework"));
        assert!(!excluded("Assembly-CSharp"));
        assert!(!excluded("MyGame.Runtime"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let config = SearchConfig {
            excluded_assembly_patterns: vec!["[".to_string()],
            ..SearchConfig::default()
        };
        let err = config.exclusion_patterns().unwrap_err().to_string();
        assert!(err.contains("Invalid assembly pattern"));
    }
}
