//! Style Patcher: scoped CSS declaration patching
//!
//! Reads a stylesheet, applies an ordered list of rewrite rules that change
//! property values inside one selector block, and writes the result back.
//!
//! # Architecture
//!
//! All rule applications compile down to a single primitive: [`Edit`], a
//! verified byte-span replacement. Intelligence lives in span acquisition
//! (the `cssparser`-backed [`StyleSheetIndex`], or a block-scoped regex),
//! not in the application logic.
//!
//! # Safety
//!
//! - Every edit verifies its expected before-text
//! - Atomic file writes (tempfile + fsync + rename), permissions preserved
//! - Writes are refused if the file changed since it was read
//! - Idempotent rules: `patch(patch(x)) == patch(x)`
//!
//! # Example
//!
//! ```
//! let css = ".nav-links a {\n  font-size: 0.9rem;\n  padding: 0.6rem 1.2rem;\n  gap: 0.5rem;\n}\n";
//! let patched = style_patcher::patch(css);
//! assert_eq!(
//!     patched,
//!     ".nav-links a {\n  font-size: 0.8rem;\n  padding: 0.6rem 0.9rem;\n  gap: 0.4rem;\n}\n"
//! );
//! ```

pub mod css;
pub mod edit;
pub mod patcher;
pub mod rules;

// Re-exports
pub use css::{Declaration, StyleBlock, StyleSheetIndex};
pub use edit::{apply_edits, Edit, EditError, EditVerification};
pub use patcher::{patch, FileReport, PatchError, PatchOptions, StylePatcher};
pub use rules::{
    apply_rules, load, nav_links_rules, ApplicationError, ConfigError, PatchOutcome, RewriteRule,
    RuleReport, RuleResult, RuleSet, DEFAULT_STYLESHEET,
};
