use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Inclusion policy for span records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPolicy {
    /// Spans shorter than this many characters are noise.
    pub min_span_chars: usize,
    /// Labels allowed to be shorter than `min_span_chars`.
    pub short_span_labels: Vec<String>,
    /// A span whose trimmed text is one of these characters is rejected.
    pub punctuation: Vec<char>,
    /// Single letters that still carry meaning (articles).
    pub allowed_single_letters: Vec<char>,
    /// Purely numeric spans need at least this many characters.
    pub min_numeric_chars: usize,
    /// `Validated` values (case-insensitive) that drop a span.
    pub rejected_validation_values: Vec<String>,
    /// Labels never published.
    pub personal_info_labels: Vec<String>,
    /// How many rejected spans to keep as examples per call.
    pub max_filter_examples: usize,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            min_span_chars: 2,
            short_span_labels: vec!["Ordem do Dia".into()],
            punctuation: vec![
                '.', ',', ':', ';', '!', '?', '-', '(', ')', '[', ']', '{', '}',
            ],
            allowed_single_letters: vec!['O', 'A'],
            min_numeric_chars: 3,
            rejected_validation_values: vec!["no".into(), "false".into()],
            personal_info_labels: vec!["Informação Pessoal".into()],
            max_filter_examples: 25,
        }
    }
}

impl ExtractionPolicy {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let policy: Self = serde_json::from_str(&data)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_span_chars == 0 {
            return Err(Error::InvalidPolicy("min_span_chars must be at least 1".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_personal_info(&self, label: &str) -> bool {
        self.personal_info_labels.iter().any(|l| l == label)
    }

    #[must_use]
    pub fn allows_short_span(&self, label: &str) -> bool {
        self.short_span_labels.iter().any(|l| l == label)
    }

    #[must_use]
    pub fn rejects_validation(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        self.rejected_validation_values
            .iter()
            .any(|v| v.to_lowercase() == value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub policy: ExtractionPolicy,
    /// Documents processed at once by batch runs.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policy: ExtractionPolicy::default(),
            workers: default_workers(),
        }
    }
}

impl PipelineConfig {
    /// `ATAS_POLICY` names a JSON policy file; otherwise
    /// `<config dir>/atas/policy.json` is used when it exists.
    /// `ATAS_WORKERS` bounds batch fan-out.
    pub fn from_env() -> Result<Self> {
        let policy = match policy_path_from_env() {
            Some(path) => ExtractionPolicy::from_json_file(&path)?,
            None => ExtractionPolicy::default(),
        };

        let workers = std::env::var("ATAS_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or_else(default_workers);

        Ok(Self { policy, workers })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ExtractionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

fn policy_path_from_env() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("ATAS_POLICY") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("atas").join("policy.json"))
        .filter(|path| path.is_file())
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ExtractionPolicy::default();

        assert!(policy.is_personal_info("Informação Pessoal"));
        assert!(policy.allows_short_span("Ordem do Dia"));
        assert!(policy.rejects_validation("No"));
        assert!(policy.rejects_validation("FALSE"));
        assert!(!policy.rejects_validation("yes"));
    }

    #[test]
    fn test_partial_policy_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, r#"{"min_numeric_chars": 4, "allowed_single_letters": ["E"]}"#)
            .unwrap();

        let policy = ExtractionPolicy::from_json_file(&path).unwrap();

        assert_eq!(policy.min_numeric_chars, 4);
        assert_eq!(policy.allowed_single_letters, vec!['E']);
        assert_eq!(policy.min_span_chars, 2);
    }

    #[test]
    fn test_invalid_policy() {
        let policy = ExtractionPolicy {
            min_span_chars: 0,
            ..ExtractionPolicy::default()
        };

        assert!(matches!(policy.validate(), Err(Error::InvalidPolicy(_))));
    }

    #[test]
    fn test_workers_floor() {
        let config = PipelineConfig::default().with_workers(0);
        assert_eq!(config.workers, 1);
    }
}
