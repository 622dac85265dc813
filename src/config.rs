//! Engine configuration.

use crate::differ::DiffGranularity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Token granularity for suggestion edit scripts. Word-level by
    /// default; character-level gives finer markers at the cost of
    /// mid-word splits.
    pub granularity: DiffGranularity,
    /// Project a marker for stale suggestions so the UI can show
    /// "no longer valid". Disable for hosts that hide them instead.
    pub decorate_stale: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            granularity: DiffGranularity::Word,
            decorate_stale: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.granularity, DiffGranularity::Word);
        assert!(config.decorate_stale);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"granularity":"char"}"#).unwrap();
        assert_eq!(config.granularity, DiffGranularity::Char);
        assert!(config.decorate_stale);
    }
}
