//! Rule definition and metadata

use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::EngineError;
use crate::environment::Environment;
use crate::syntax::SyntaxNode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule category for grouping related rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Code that is definitely wrong or useless
    Correctness,
    /// Code that is likely wrong or suspicious
    Suspicious,
    /// Idiomatic and consistent style rules
    #[default]
    Style,
    /// Rules that improve runtime performance
    Perf,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCategory::Correctness => write!(f, "correctness"),
            RuleCategory::Suspicious => write!(f, "suspicious"),
            RuleCategory::Style => write!(f, "style"),
            RuleCategory::Perf => write!(f, "perf"),
        }
    }
}

impl std::str::FromStr for RuleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "correctness" => Ok(RuleCategory::Correctness),
            "suspicious" => Ok(RuleCategory::Suspicious),
            "style" => Ok(RuleCategory::Style),
            "perf" | "performance" => Ok(RuleCategory::Perf),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// What kind of fix a rule can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FixAvailability {
    /// Never offers a fix
    #[default]
    None,
    /// Fixes can be applied without review
    Automatic,
    /// Fixes, or their absence, need a person to look
    RequiresHumanAttention,
}

impl fmt::Display for FixAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixAvailability::None => write!(f, "none"),
            FixAvailability::Automatic => write!(f, "automatic"),
            FixAvailability::RequiresHumanAttention => write!(f, "requires human attention"),
        }
    }
}

/// Static description of a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleInfo {
    /// Unique rule identifier (e.g., "math-round-int-long")
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    /// One-line summary, also the default diagnostic message
    pub summary: String,

    /// Longer explanation for `--explain`
    #[serde(default)]
    pub explanation: Option<String>,

    /// Default severity level
    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub category: RuleCategory,

    #[serde(default)]
    pub fix: FixAvailability,

    /// Documentation URL
    #[serde(default)]
    pub docs: Option<String>,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,

    /// Example of code that violates this rule
    #[serde(default)]
    pub example_bad: Option<String>,

    /// Example of correct code
    #[serde(default)]
    pub example_good: Option<String>,
}

impl RuleInfo {
    /// Create rule metadata with minimal required fields
    pub fn new(id: &str, summary: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            summary: summary.to_string(),
            explanation: None,
            severity: Severity::Warning,
            category: RuleCategory::default(),
            fix: FixAvailability::default(),
            docs: None,
            tags: Vec::new(),
            example_bad: None,
            example_good: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_explanation(mut self, explanation: &str) -> Self {
        self.explanation = Some(explanation.to_string());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_category(mut self, category: RuleCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_fix(mut self, fix: FixAvailability) -> Self {
        self.fix = fix;
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn with_docs(mut self, url: &str) -> Self {
        self.docs = Some(url.to_string());
        self
    }

    pub fn with_example_bad(mut self, example: &str) -> Self {
        self.example_bad = Some(example.to_string());
        self
    }

    pub fn with_example_good(mut self, example: &str) -> Self {
        self.example_good = Some(example.to_string());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A call-site rule.
///
/// `check` sees one node at a time and keeps nothing between calls.
/// `Ok(None)` is the normal "does not apply" answer; `Err` means the rule's
/// own logic is broken.
pub trait Rule: Send + Sync {
    fn info(&self) -> &RuleInfo;

    fn check(
        &self,
        node: &dyn SyntaxNode,
        env: &dyn Environment,
    ) -> Result<Option<Diagnostic>, EngineError>;

    fn id(&self) -> &str {
        &self.info().id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_info_builder() {
        let info = RuleInfo::new("test", "summary")
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Correctness)
            .with_fix(FixAvailability::Automatic)
            .with_tag("numeric")
            .with_docs("https://example.com");

        assert_eq!(info.severity, Severity::Error);
        assert_eq!(info.category, RuleCategory::Correctness);
        assert_eq!(info.fix, FixAvailability::Automatic);
        assert!(info.has_tag("numeric"));
        assert!(!info.has_tag("style"));
        assert_eq!(info.docs, Some("https://example.com".to_string()));
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("performance".parse::<RuleCategory>(), Ok(RuleCategory::Perf));
        assert!("nursery".parse::<RuleCategory>().is_err());
    }

    #[test]
    fn test_rule_info_serialize() {
        let info = RuleInfo::new("r", "s").with_fix(FixAvailability::RequiresHumanAttention);
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"fix\":\"requires-human-attention\""));
        assert!(json.contains("\"severity\":\"warning\""));
    }
}
