use serde::{Deserialize, Serialize};

/// Thresholds used by the simple checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    /// Activity timeout the service applies when none is chosen
    pub default_timeout: String,
    /// Service maximum for parallel ForEach batches
    pub foreach_batch_max: u64,
    /// Linked service property name fragments that hold credentials
    pub sensitive_keywords: Vec<String>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            default_timeout: "7.00:00:00".to_string(),
            foreach_batch_max: 50,
            sensitive_keywords: vec![
                "key".to_string(),
                "secret".to_string(),
                "password".to_string(),
                "token".to_string(),
            ],
        }
    }
}

impl RuleSettings {
    pub fn is_sensitive_property(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.sensitive_keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    }
}
