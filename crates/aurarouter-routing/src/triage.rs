//! Complexity → role remapping.

use aurarouter_core::{TriageConfig, TriageRule};

pub struct TriageRouter {
    rules: Vec<TriageRule>,
    default_role: String,
}

impl TriageRouter {
    /// Rules are kept sorted by `max_complexity`, so the first match is the
    /// tightest bucket.
    pub fn new(mut rules: Vec<TriageRule>, default_role: impl Into<String>) -> Self {
        rules.sort_by_key(|r| r.max_complexity);
        Self {
            rules,
            default_role: default_role.into(),
        }
    }

    pub fn from_config(config: &TriageConfig) -> Self {
        Self::new(config.rules.clone(), config.default_role.clone())
    }

    /// First rule whose bound covers `complexity`, else the default role.
    pub fn select_role(&self, complexity: u8) -> &str {
        self.rules
            .iter()
            .find(|r| r.max_complexity >= complexity)
            .map(|r| r.preferred_role.as_str())
            .unwrap_or(&self.default_role)
    }

    pub fn rules(&self) -> &[TriageRule] {
        &self.rules
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(max: u8, role: &str) -> TriageRule {
        TriageRule {
            max_complexity: max,
            preferred_role: role.into(),
            description: String::new(),
        }
    }

    #[test]
    fn test_select_role() {
        let router = TriageRouter::new(vec![rule(3, "coding_lite"), rule(7, "coding")], "coding");
        assert_eq!(router.select_role(2), "coding_lite");
        assert_eq!(router.select_role(3), "coding_lite");
        assert_eq!(router.select_role(5), "coding");
        assert_eq!(router.select_role(9), "coding");
    }

    #[test]
    fn test_rules_sorted() {
        let router = TriageRouter::new(
            vec![rule(10, "coding_heavy"), rule(3, "coding_lite")],
            "coding",
        );
        assert_eq!(router.rules()[0].preferred_role, "coding_lite");
        assert_eq!(router.select_role(1), "coding_lite");
        assert_eq!(router.select_role(8), "coding_heavy");
    }

    #[test]
    fn test_no_rules_uses_default() {
        let router = TriageRouter::from_config(&TriageConfig::default());
        assert_eq!(router.select_role(4), "coding");
        assert_eq!(router.default_role(), "coding");
    }
}
