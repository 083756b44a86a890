//! The built-in navbar tightening rules.

use crate::rules::schema::{Metadata, RewriteRule, RuleSet};

/// Stylesheet patched when neither `--file` nor a rule set target is given.
pub const DEFAULT_STYLESHEET: &str = "src/styles/index.css";

/// Selector whose block the built-in rules edit.
pub const NAV_LINK_SELECTOR: &str = ".nav-links a";

/// `(id, property, old value, new value)`
const NAV_LINK_TABLE: &[(&str, &str, &str, &str)] = &[
    ("nav-font-size", "font-size", "0.9rem", "0.8rem"),
    ("nav-padding", "padding", "0.6rem 1.2rem", "0.6rem 0.9rem"),
    ("nav-gap", "gap", "0.5rem", "0.4rem"),
];

/// Built-in rules as structural declaration rewrites.
pub fn nav_links_rules() -> RuleSet {
    RuleSet::new(
        Metadata {
            name: "nav-links-compact".to_string(),
            description: Some("Tighten font-size, padding and gap of navbar links".to_string()),
            target: Some(DEFAULT_STYLESHEET.to_string()),
        },
        NAV_LINK_TABLE
            .iter()
            .map(|(id, property, from, to)| {
                RewriteRule::declaration(*id, NAV_LINK_SELECTOR, *property, *from, *to)
            })
            .collect(),
    )
}

/// The same table expressed as block-scoped regular expressions.
///
/// Each pattern anchors at the selector header and crosses anything except
/// a closing brace to reach the property, so it can only match inside the
/// block.
pub fn nav_links_regex_rules() -> RuleSet {
    let rules = NAV_LINK_TABLE
        .iter()
        .map(|(id, property, from, to)| {
            let pattern = format!(
                r"({}\s*\{{[^}}]*{}:\s*){};",
                regex::escape(NAV_LINK_SELECTOR),
                regex::escape(property),
                regex::escape(from),
            );
            RewriteRule::regex(format!("{id}-regex"), pattern, format!("${{1}}{to};"))
        })
        .collect();

    RuleSet::new(
        Metadata {
            name: "nav-links-compact-regex".to_string(),
            description: Some("Regex form of nav-links-compact".to_string()),
            target: Some(DEFAULT_STYLESHEET.to_string()),
        },
        rules,
    )
}
