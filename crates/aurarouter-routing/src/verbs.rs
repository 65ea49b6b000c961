//! Canonical role names and their synonyms.

use std::collections::HashMap;

use aurarouter_core::RouterConfig;

/// A built-in canonical role.
#[derive(Debug, Clone, Copy)]
pub struct SemanticVerb {
    pub role: &'static str,
    pub synonyms: &'static [&'static str],
    /// The pipeline cannot run without a chain for this role.
    pub required: bool,
    pub description: &'static str,
}

const BUILTIN_VERBS: &[SemanticVerb] = &[
    SemanticVerb {
        role: "router",
        synonyms: &["classifier", "triage", "intent", "dispatcher", "routing"],
        required: true,
        description: "Classifies incoming tasks",
    },
    SemanticVerb {
        role: "reasoning",
        synonyms: &["planner", "planning", "architect", "reason", "thinking"],
        required: true,
        description: "Plans multi-step work",
    },
    SemanticVerb {
        role: "coding",
        synonyms: &["coder", "code", "programming", "developer", "implementation", "codegen"],
        required: true,
        description: "Writes code and executes plan steps",
    },
    SemanticVerb {
        role: "reviewer",
        synonyms: &["review", "critic", "qa", "verifier", "checker"],
        required: false,
        description: "Reviews output and requests corrections",
    },
    SemanticVerb {
        role: "summarization",
        synonyms: &["summarizer", "summary", "summarize", "tldr"],
        required: false,
        description: "Condenses long text",
    },
    SemanticVerb {
        role: "analysis",
        synonyms: &["analyst", "analyze", "analyse", "research"],
        required: false,
        description: "Investigates and explains",
    },
];

/// Lookup over the built-in verb table plus caller-supplied verbs.
pub struct SemanticVerbRegistry;

impl SemanticVerbRegistry {
    pub fn verbs() -> &'static [SemanticVerb] {
        BUILTIN_VERBS
    }

    pub fn verb(role: &str) -> Option<&'static SemanticVerb> {
        BUILTIN_VERBS.iter().find(|v| v.role.eq_ignore_ascii_case(role.trim()))
    }

    pub fn required_roles() -> impl Iterator<Item = &'static str> {
        BUILTIN_VERBS.iter().filter(|v| v.required).map(|v| v.role)
    }

    pub fn is_required(role: &str) -> bool {
        Self::verb(role).map(|v| v.required).unwrap_or(false)
    }

    /// Map a free-text label to its canonical role.
    ///
    /// Canonical names map to themselves first, so the result is stable
    /// under re-application. Custom synonyms are checked before built-in
    /// ones. Unknown labels come back unchanged.
    pub fn resolve_synonym(label: &str, custom: Option<&HashMap<String, Vec<String>>>) -> String {
        let needle = label.trim();
        if needle.is_empty() {
            return label.to_string();
        }

        // Custom canonical names, in a fixed order
        let mut custom_verbs: Vec<(&String, &Vec<String>)> =
            custom.map(|c| c.iter().collect()).unwrap_or_default();
        custom_verbs.sort_by(|a, b| a.0.cmp(b.0));

        if let Some((role, _)) = custom_verbs
            .iter()
            .find(|(role, _)| role.eq_ignore_ascii_case(needle))
        {
            return role.to_string();
        }
        if let Some(verb) = Self::verb(needle) {
            return verb.role.to_string();
        }

        for (role, synonyms) in &custom_verbs {
            if synonyms.iter().any(|s| s.trim().eq_ignore_ascii_case(needle)) {
                return role.to_string();
            }
        }
        for verb in BUILTIN_VERBS {
            if verb.synonyms.iter().any(|s| s.eq_ignore_ascii_case(needle)) {
                return verb.role.to_string();
            }
        }

        label.to_string()
    }

    /// Required roles with no chain in `config`.
    pub fn missing_required(config: &RouterConfig) -> Vec<&'static str> {
        Self::required_roles()
            .filter(|role| !config.has_role(role))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_synonyms() {
        assert_eq!(SemanticVerbRegistry::resolve_synonym("programming", None), "coding");
        assert_eq!(SemanticVerbRegistry::resolve_synonym("  Planner ", None), "reasoning");
        assert_eq!(SemanticVerbRegistry::resolve_synonym("QA", None), "reviewer");
        assert_eq!(SemanticVerbRegistry::resolve_synonym("Coding", None), "coding");
    }

    #[test]
    fn test_unknown_label_unchanged() {
        assert_eq!(
            SemanticVerbRegistry::resolve_synonym("SIMPLE_CODE", None),
            "SIMPLE_CODE"
        );
        assert_eq!(SemanticVerbRegistry::resolve_synonym("", None), "");
    }

    #[test]
    fn test_custom_synonyms_checked_first() {
        let mut custom = HashMap::new();
        custom.insert("coding_heavy".to_string(), vec!["code".to_string()]);
        custom.insert("SIMPLE_CODE".to_string(), vec!["simple".to_string()]);
        assert_eq!(
            SemanticVerbRegistry::resolve_synonym("code", Some(&custom)),
            "coding_heavy"
        );
        assert_eq!(
            SemanticVerbRegistry::resolve_synonym("simple", Some(&custom)),
            "SIMPLE_CODE"
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut custom = HashMap::new();
        custom.insert("a".to_string(), vec!["b".to_string()]);
        custom.insert("b".to_string(), vec!["c".to_string()]);

        for label in ["c", "b", "a", "coder", "router", "nothing", "Review", "intent"] {
            let once = SemanticVerbRegistry::resolve_synonym(label, Some(&custom));
            let twice = SemanticVerbRegistry::resolve_synonym(&once, Some(&custom));
            assert_eq!(once, twice, "label {}", label);
        }
    }

    #[test]
    fn test_required_roles() {
        let required: Vec<_> = SemanticVerbRegistry::required_roles().collect();
        assert_eq!(required, vec!["router", "reasoning", "coding"]);
        assert!(!SemanticVerbRegistry::is_required("reviewer"));
    }

    #[test]
    fn test_missing_required() {
        let mut config = RouterConfig::default();
        config.roles.insert("coding".into(), vec!["local".into()]);
        assert_eq!(
            SemanticVerbRegistry::missing_required(&config),
            vec!["router", "reasoning"]
        );
    }
}
