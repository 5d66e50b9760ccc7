//! Feature definitions

use super::expression::Expression;
use serde::{Deserialize, Serialize};

/// One parsed entry of a query's feature list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    /// Text as submitted, trimmed
    pub raw: String,
    pub expression: Expression,
    pub alias: Option<String>,
}

impl FeatureDefinition {
    /// Output column name: the alias, or the submitted text when unaliased
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_prefers_alias() {
        let feature = FeatureDefinition {
            raw: "obs_dt as when".to_string(),
            expression: Expression::ObservationDate,
            alias: Some("when".to_string()),
        };
        assert_eq!(feature.name(), "when");

        let unaliased = FeatureDefinition {
            raw: "obs_dt".to_string(),
            expression: Expression::ObservationDate,
            alias: None,
        };
        assert_eq!(unaliased.name(), "obs_dt");
    }
}
