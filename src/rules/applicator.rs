//! Rule applicator - runs rewrite rules over stylesheet text
//!
//! Each rule is turned into a list of verified [`Edit`]s against the current
//! text, then spliced. Rules run strictly in order and each one sees the
//! output of the rules before it.

use crate::css::selector::normalize;
use crate::css::StyleSheetIndex;
use crate::edit::{apply_edits, Edit, EditError};
use crate::rules::schema::{Operation, Query, RewriteRule};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result of applying a single rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
#[must_use = "RuleResult should be checked"]
pub enum RuleResult {
    /// The rule rewrote `replacements` spans
    Applied { replacements: usize },
    /// The target already holds the new value
    AlreadyApplied,
    /// Nothing matched; `hint` may name a close selector
    NoMatch { hint: Option<String> },
}

impl fmt::Display for RuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleResult::Applied { replacements: 1 } => write!(f, "applied (1 replacement)"),
            RuleResult::Applied { replacements } => {
                write!(f, "applied ({replacements} replacements)")
            }
            RuleResult::AlreadyApplied => write!(f, "already applied"),
            RuleResult::NoMatch { hint: Some(hint) } => write!(f, "no match ({hint})"),
            RuleResult::NoMatch { hint: None } => write!(f, "no match"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub id: String,
    #[serde(flatten)]
    pub result: RuleResult,
}

/// Text after every rule ran, plus one report per rule in rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub text: String,
    pub reports: Vec<RuleReport>,
}

impl PatchOutcome {
    /// Total spans rewritten across all rules.
    pub fn replacements(&self) -> usize {
        self.reports
            .iter()
            .map(|report| match report.result {
                RuleResult::Applied { replacements } => replacements,
                _ => 0,
            })
            .sum()
    }

    /// True if any rule still had work to do.
    pub fn has_pending(&self) -> bool {
        self.replacements() > 0
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("rule '{rule_id}' has an invalid regex: {source}")]
    InvalidPattern {
        rule_id: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule_id}' pairs a {query} query with an incompatible operation")]
    InvalidCombo {
        rule_id: String,
        query: &'static str,
    },

    #[error("rule '{rule_id}' produced an invalid edit: {source}")]
    Edit {
        rule_id: String,
        #[source]
        source: EditError,
    },
}

/// Apply `rules` to `text` in order.
pub fn apply_rules(text: &str, rules: &[RewriteRule]) -> Result<PatchOutcome, ApplicationError> {
    let mut current = text.to_string();
    let mut reports = Vec::with_capacity(rules.len());

    for rule in rules {
        let (next, result) = apply_rule(&current, rule)?;
        tracing::debug!(rule = %rule.id, %result, "rule evaluated");
        current = next;
        reports.push(RuleReport {
            id: rule.id.clone(),
            result,
        });
    }

    Ok(PatchOutcome {
        text: current,
        reports,
    })
}

/// Apply one rule and return the new text with the rule's result.
pub fn apply_rule(
    text: &str,
    rule: &RewriteRule,
) -> Result<(String, RuleResult), ApplicationError> {
    let (edits, fallback) = match (&rule.query, &rule.operation) {
        (Query::Declaration { selector, property }, Operation::ReplaceValue { from, to }) => {
            compute_declaration_edits(text, selector, property, from, to)
        }
        (Query::Regex { pattern }, Operation::Template { replacement }) => {
            compute_regex_edits(text, &rule.id, pattern, replacement)?
        }
        (Query::Declaration { .. }, _) => {
            return Err(ApplicationError::InvalidCombo {
                rule_id: rule.id.clone(),
                query: "declaration",
            })
        }
        (Query::Regex { .. }, _) => {
            return Err(ApplicationError::InvalidCombo {
                rule_id: rule.id.clone(),
                query: "regex",
            })
        }
    };

    let replacements = edits.iter().filter(|edit| !edit.is_applied(text)).count();
    if replacements == 0 {
        return Ok((text.to_string(), fallback));
    }

    let new_text = apply_edits(text, edits).map_err(|source| ApplicationError::Edit {
        rule_id: rule.id.clone(),
        source,
    })?;

    Ok((new_text, RuleResult::Applied { replacements }))
}

/// Edits for every `property: from` inside blocks matching `selector`.
///
/// The second element is the result to report when there are no edits.
fn compute_declaration_edits(
    text: &str,
    selector: &str,
    property: &str,
    from: &str,
    to: &str,
) -> (Vec<Edit>, RuleResult) {
    let index = StyleSheetIndex::parse(text);
    let from = normalize(from);
    let to = to.trim();

    let mut edits = Vec::new();
    let mut saw_block = false;
    let mut saw_new_value = false;

    for block in index.blocks_matching(selector) {
        saw_block = true;
        for decl in block.declarations_named(property) {
            let value = normalize(&decl.value);
            if value == from {
                edits.push(Edit::new(
                    decl.value_span.start,
                    decl.value_span.end,
                    to,
                    &decl.value,
                ));
            } else if value == normalize(to) {
                saw_new_value = true;
            }
        }
    }

    let fallback = if saw_new_value {
        RuleResult::AlreadyApplied
    } else if saw_block {
        RuleResult::NoMatch { hint: None }
    } else {
        let hint = index
            .closest_selector(selector)
            .map(|candidate| format!("did you mean `{candidate}`?"));
        if let Some(hint) = &hint {
            tracing::warn!(%selector, %hint, "selector not found");
        }
        RuleResult::NoMatch { hint }
    };

    (edits, fallback)
}

/// One edit per non-overlapping regex match, expanded from `replacement`.
fn compute_regex_edits(
    text: &str,
    rule_id: &str,
    pattern: &str,
    replacement: &str,
) -> Result<(Vec<Edit>, RuleResult), ApplicationError> {
    let re = Regex::new(pattern).map_err(|source| ApplicationError::InvalidPattern {
        rule_id: rule_id.to_string(),
        source,
    })?;

    let mut edits = Vec::new();
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let mut expanded = String::new();
        caps.expand(replacement, &mut expanded);
        edits.push(Edit::new(whole.start(), whole.end(), expanded, whole.as_str()));
    }

    // Every match already equals its expansion: nothing left to do
    let fallback = if edits.is_empty() {
        RuleResult::NoMatch { hint: None }
    } else {
        RuleResult::AlreadyApplied
    };

    Ok((edits, fallback))
}
