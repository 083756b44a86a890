//! End-to-end library workflow
//!
//! Built-in rules, shipped rule files, both engines, and the file boundary.

use std::fs;
use std::path::PathBuf;
use style_patcher::rules::{load, load_from_path, nav_links_regex_rules, RuleResult};
use style_patcher::{patch, PatchError, PatchOptions, StylePatcher};
use tempfile::TempDir;

const NAV_BLOCK: &str = ".nav-links a {
  font-size: 0.9rem;
  padding: 0.6rem 1.2rem;
  gap: 0.5rem;
}
";

const NAV_BLOCK_PATCHED: &str = ".nav-links a {
  font-size: 0.8rem;
  padding: 0.6rem 0.9rem;
  gap: 0.4rem;
}
";

/// A realistic sheet: the target block sits among look-alikes.
const SITE_CSS: &str = r#"/* Navbar */
.nav-links {
  display: flex;
  gap: 0.5rem;
}

.nav-links a {
  color: var(--text);
  font-size: 0.9rem;
  padding: 0.6rem 1.2rem;
  border-radius: 999px;
  gap: 0.5rem;
}

.nav-links a:hover {
  font-size: 0.9rem;
}

.hero h1 {
  font-size: 0.9rem;
  padding: 0.6rem 1.2rem;
}

@media (max-width: 768px) {
  .nav-links a {
    font-size: 0.9rem;
  }
}
"#;

fn shipped_rules(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

#[test]
fn test_reference_example() {
    assert_eq!(patch(NAV_BLOCK), NAV_BLOCK_PATCHED);
}

#[test]
fn test_only_target_block_changes() {
    let patched = patch(SITE_CSS);

    let expected = SITE_CSS
        .replacen(
            ".nav-links a {\n  color: var(--text);\n  font-size: 0.9rem;\n  padding: 0.6rem 1.2rem;",
            ".nav-links a {\n  color: var(--text);\n  font-size: 0.8rem;\n  padding: 0.6rem 0.9rem;",
            1,
        )
        .replacen(
            "border-radius: 999px;\n  gap: 0.5rem;",
            "border-radius: 999px;\n  gap: 0.4rem;",
            1,
        )
        .replacen(
            "  .nav-links a {\n    font-size: 0.9rem;",
            "  .nav-links a {\n    font-size: 0.8rem;",
            1,
        );

    assert_eq!(patched, expected);
    // Look-alike selectors keep their values
    assert!(patched.contains(".nav-links {\n  display: flex;\n  gap: 0.5rem;"));
    assert!(patched.contains(".nav-links a:hover {\n  font-size: 0.9rem;"));
    assert!(patched.contains(".hero h1 {\n  font-size: 0.9rem;\n  padding: 0.6rem 1.2rem;"));
}

#[test]
fn test_no_old_values_is_byte_identical() {
    let css = "html{font-size:16px}\n.nav-links a { font-size: 1rem; padding: 0; }\r\n\t.x { gap: 2px }";
    assert_eq!(patch(css), css);
}

#[test]
fn test_idempotent_on_realistic_sheet() {
    let once = patch(SITE_CSS);
    assert_eq!(patch(&once), once);
}

#[test]
fn test_shipped_rule_file_matches_builtin() {
    let rules = load_from_path(shipped_rules("rules/nav-links-compact.toml")).unwrap();
    let outcome = StylePatcher::new(rules).patch_text(SITE_CSS).unwrap();
    assert_eq!(outcome.text, patch(SITE_CSS));
}

#[test]
fn test_rule_directory_skips_subdirectories() {
    let rules = load(shipped_rules("rules")).unwrap();
    assert_eq!(rules.meta.name, "nav-links-compact");
    assert_eq!(rules.rules.len(), 3);
}

#[test]
fn test_regex_engine_agrees_on_reference_block() {
    let shipped = load_from_path(shipped_rules("rules/regex/nav-links-compact.toml")).unwrap();
    let outcome = StylePatcher::new(shipped).patch_text(NAV_BLOCK).unwrap();
    assert_eq!(outcome.text, NAV_BLOCK_PATCHED);

    let generated = StylePatcher::new(nav_links_regex_rules())
        .patch_text(NAV_BLOCK)
        .unwrap();
    assert_eq!(generated.text, NAV_BLOCK_PATCHED);
}

#[test]
fn test_regex_engine_stays_inside_block() {
    let css = ".nav-links a { color: red; }\n.hero { font-size: 0.9rem; }\n";
    let outcome = StylePatcher::new(nav_links_regex_rules())
        .patch_text(css)
        .unwrap();

    assert_eq!(outcome.text, css);
    assert!(outcome
        .reports
        .iter()
        .all(|r| matches!(r.result, RuleResult::NoMatch { .. })));
}

#[test]
fn test_per_rule_reports() {
    let css = ".nav-links a { font-size: 0.8rem; padding: 0.6rem 1.2rem; }";
    let outcome = StylePatcher::default().patch_text(css).unwrap();

    let results: Vec<_> = outcome
        .reports
        .iter()
        .map(|r| (r.id.as_str(), r.result.clone()))
        .collect();
    assert_eq!(
        results,
        vec![
            ("nav-font-size", RuleResult::AlreadyApplied),
            ("nav-padding", RuleResult::Applied { replacements: 1 }),
            ("nav-gap", RuleResult::NoMatch { hint: None }),
        ]
    );
}

#[test]
fn test_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.css");
    fs::write(&path, SITE_CSS).unwrap();

    let report = StylePatcher::default()
        .patch_file(&path, PatchOptions::default())
        .unwrap();

    assert!(report.written);
    assert_eq!(report.outcome.replacements(), 4);
    assert_eq!(fs::read_to_string(&path).unwrap(), patch(SITE_CSS));

    // Second run has nothing to do and does not rewrite
    let again = StylePatcher::default()
        .patch_file(&path, PatchOptions::default())
        .unwrap();
    assert!(!again.written);
    assert!(!again.changed());
}

#[test]
fn test_nonexistent_file_fails_without_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("styles/index.css");

    let err = StylePatcher::default()
        .patch_file(&path, PatchOptions::default())
        .unwrap_err();

    assert!(matches!(err, PatchError::Io { .. }));
    assert!(err.to_string().contains("index.css"));
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
#[cfg(unix)]
fn test_unreadable_file_fails() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.css");
    fs::write(&path, NAV_BLOCK).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; only assert when the read really fails
    if fs::read(&path).is_err() {
        let err = StylePatcher::default()
            .patch_file(&path, PatchOptions::default())
            .unwrap_err();
        assert!(matches!(err, PatchError::Io { .. }));
    }

    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
}
