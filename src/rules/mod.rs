pub mod applicator;
pub mod builtin;
pub mod loader;
pub mod schema;

pub use applicator::{
    apply_rule, apply_rules, ApplicationError, PatchOutcome, RuleReport, RuleResult,
};
pub use builtin::{nav_links_regex_rules, nav_links_rules, DEFAULT_STYLESHEET, NAV_LINK_SELECTOR};
pub use loader::{load, load_from_dir, load_from_path, load_from_str, ConfigError};
pub use schema::{
    Metadata, Operation, Query, RewriteRule, RuleSet, ValidationError, ValidationIssue,
};
