use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// An ordered list of rewrite rules plus metadata about where they apply.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct RuleSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RewriteRule>,
}

impl RuleSet {
    pub fn new(meta: Metadata, rules: Vec<RewriteRule>) -> Self {
        Self { meta, rules }
    }

    /// Append another set's rules after this set's rules.
    ///
    /// Metadata from `other` only fills fields this set leaves unset.
    pub fn merge(&mut self, other: RuleSet) {
        if self.meta.name.is_empty() {
            self.meta.name = other.meta.name;
        }
        if self.meta.description.is_none() {
            self.meta.description = other.meta.description;
        }
        if self.meta.target.is_none() {
            self.meta.target = other.meta.target;
        }
        self.rules.extend(other.rules);
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let rule_id = if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
                None
            } else {
                if !seen.insert(rule.id.as_str()) {
                    issues.push(ValidationIssue::DuplicateId {
                        rule_id: rule.id.clone(),
                    });
                }
                Some(rule.id.clone())
            };

            match &rule.query {
                Query::Declaration { selector, property } => {
                    if selector.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id: rule_id.clone(),
                            field: "query.selector",
                        });
                    }
                    if property.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id: rule_id.clone(),
                            field: "query.property",
                        });
                    }
                    if !matches!(rule.operation, Operation::ReplaceValue { .. }) {
                        issues.push(ValidationIssue::InvalidCombo {
                            rule_id: rule_id.clone(),
                            message: "declaration queries require a replace-value operation"
                                .to_string(),
                        });
                    }
                }
                Query::Regex { pattern } => {
                    if pattern.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id: rule_id.clone(),
                            field: "query.pattern",
                        });
                    } else if let Err(e) = Regex::new(pattern) {
                        issues.push(ValidationIssue::InvalidPattern {
                            rule_id: rule_id.clone(),
                            message: e.to_string(),
                        });
                    }
                    if !matches!(rule.operation, Operation::Template { .. }) {
                        issues.push(ValidationIssue::InvalidCombo {
                            rule_id: rule_id.clone(),
                            message: "regex queries require a template operation".to_string(),
                        });
                    }
                }
            }

            if let Operation::ReplaceValue { from, to } = &rule.operation {
                if from.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        rule_id: rule_id.clone(),
                        field: "operation.from",
                    });
                }
                if to.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        rule_id: rule_id.clone(),
                        field: "operation.to",
                    });
                }
                if from.trim() == to.trim() && !from.trim().is_empty() {
                    issues.push(ValidationIssue::InvalidCombo {
                        rule_id: rule_id.clone(),
                        message: "operation.from and operation.to are identical".to_string(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Stylesheet path the rules are meant for (overridden by `--file`)
    #[serde(default)]
    pub target: Option<String>,
}

/// One find-and-replace targeting a property value.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub id: String,
    pub query: Query,
    pub operation: Operation,
}

impl RewriteRule {
    /// Structural rule: rewrite `property` from `from` to `to` inside blocks
    /// whose selector list contains `selector`.
    pub fn declaration(
        id: impl Into<String>,
        selector: impl Into<String>,
        property: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            query: Query::Declaration {
                selector: selector.into(),
                property: property.into(),
            },
            operation: Operation::ReplaceValue {
                from: from.into(),
                to: to.into(),
            },
        }
    }

    /// Regex rule: replace every match of `pattern` using `replacement`
    /// (`regex` crate syntax, e.g. `${1}0.8rem;`).
    pub fn regex(
        id: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            query: Query::Regex {
                pattern: pattern.into(),
            },
            operation: Operation::Template {
                replacement: replacement.into(),
            },
        }
    }
}

impl fmt::Display for RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.query, &self.operation) {
            (Query::Declaration { selector, property }, Operation::ReplaceValue { from, to }) => {
                write!(f, "{selector} {{ {property}: {from} -> {to} }}")
            }
            (Query::Regex { pattern }, Operation::Template { replacement }) => {
                write!(f, "/{pattern}/ -> {replacement}")
            }
            (query, operation) => write!(f, "{query:?} -> {operation:?}"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Query {
    /// A property inside every block whose selector list contains `selector`
    Declaration { selector: String, property: String },
    /// A raw regular expression over the whole stylesheet text
    Regex { pattern: String },
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    ReplaceValue { from: String, to: String },
    Template { replacement: String },
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    InvalidPattern {
        rule_id: Option<String>,
        message: String,
    },
    InvalidCombo {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule set contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is used more than once")
            }
            ValidationIssue::InvalidPattern { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has an invalid regex: {message}"),
                None => write!(f, "invalid regex: {message}"),
            },
            ValidationIssue::InvalidCombo { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
        }
    }
}
