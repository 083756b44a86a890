use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: byte-span replacement with verification.
///
/// Both rule engines compile down to this. Intelligence lives in span
/// acquisition (the CSS locator, the regex engine), not in application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// What we expect to find in the span before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (cheaper to carry for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => fingerprint(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(fingerprint(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("before-text verification failed at byte {byte_start}: expected {expected}, found {found:?}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in text of length {text_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        text_len: usize,
    },

    #[error("overlapping edits around [{byte_start}, {byte_end})")]
    Overlap { byte_start: usize, byte_end: usize },

    #[error("edit boundary at byte {offset} splits a UTF-8 character")]
    NotCharBoundary { offset: usize },
}

impl Edit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl AsRef<str>,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before.as_ref()),
        }
    }

    /// Create an edit with explicit verification strategy.
    pub fn with_verification(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        verification: EditVerification,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: verification,
        }
    }

    /// Validate the edit against `text`.
    ///
    /// Returns the current text at [byte_start, byte_end) if validation succeeds.
    fn validate<'a>(&self, text: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > text.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                text_len: text.len(),
            });
        }

        for offset in [self.byte_start, self.byte_end] {
            if !text.is_char_boundary(offset) {
                return Err(EditError::NotCharBoundary { offset });
            }
        }

        let current = &text[self.byte_start..self.byte_end];

        // Already applied
        if current == self.new_text {
            return Ok(current);
        }

        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Whether the span already holds `new_text`.
    pub fn is_applied(&self, text: &str) -> bool {
        text.get(self.byte_start..self.byte_end) == Some(self.new_text.as_str())
    }
}

/// Apply edits to `text` and return the new text.
///
/// Edits are sorted by byte_start descending and spliced bottom-to-top so
/// earlier offsets stay valid. All edits are validated against the original
/// text before anything is spliced.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(text.to_string());
    }

    edits.sort_by(|a, b| b.byte_start.cmp(&a.byte_start));

    for edit in &edits {
        edit.validate(text)?;
    }

    // Sorted descending: the earlier edit must end before the later one starts
    for window in edits.windows(2) {
        let (later, earlier) = (&window[0], &window[1]);
        if earlier.byte_end > later.byte_start {
            return Err(EditError::Overlap {
                byte_start: earlier.byte_start,
                byte_end: later.byte_end,
            });
        }
    }

    let mut new_text = text.to_string();
    for edit in &edits {
        if edit.is_applied(&new_text) {
            continue;
        }
        new_text.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
    }

    Ok(new_text)
}

/// xxh3 fingerprint used for span verification and on-disk change detection.
pub fn fingerprint(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write lands or the original file is untouched. The
/// original file's permissions are carried over to the replacement. A
/// symlink is written through: its resolved target is replaced and the link
/// itself stays in place.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let resolved = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e),
    };
    let path = resolved.as_path();

    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Some(permissions) = permissions {
        fs::set_permissions(temp.path(), permissions)?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_verification_exact_match() {
        let verify = EditVerification::ExactMatch("0.9rem".to_string());
        assert!(verify.matches("0.9rem"));
        assert!(!verify.matches("0.8rem"));
    }

    #[test]
    fn test_edit_verification_hash() {
        let text = "font-size: 0.9rem;";
        let verify = EditVerification::Hash(xxh3_64(text.as_bytes()));
        assert!(verify.matches(text));
        assert!(!verify.matches("font-size: 0.8rem;"));
    }

    #[test]
    fn test_edit_verification_from_text_large() {
        let text = "x".repeat(2000);
        assert!(matches!(
            EditVerification::from_text(&text),
            EditVerification::Hash(_)
        ));
        assert!(matches!(
            EditVerification::from_text("small"),
            EditVerification::ExactMatch(_)
        ));
    }

    #[test]
    fn test_invalid_range() {
        let edit = Edit::new(5, 20, "replacement", "");
        let result = apply_edits("hello world", vec![edit]);
        assert!(matches!(result, Err(EditError::InvalidByteRange { .. })));
    }

    #[test]
    fn test_inverted_range() {
        let edit = Edit::new(10, 5, "replacement", "");
        let result = apply_edits("hello world", vec![edit]);
        assert!(matches!(result, Err(EditError::InvalidByteRange { .. })));
    }

    #[test]
    fn test_char_boundary_rejected() {
        // 'é' is two bytes; offset 2 falls inside it
        let edit = Edit::new(0, 2, "x", "c\u{e9}");
        let result = apply_edits("c\u{e9}a", vec![edit]);
        assert!(matches!(result, Err(EditError::NotCharBoundary { offset: 2 })));
    }

    #[test]
    fn test_before_text_mismatch() {
        let edit = Edit::new(0, 5, "HELLO", "howdy");
        let result = apply_edits("hello world", vec![edit]);
        assert!(matches!(result, Err(EditError::BeforeTextMismatch { .. })));
    }

    #[test]
    fn test_already_applied_is_noop() {
        let edit = Edit::new(0, 5, "hello", "HELLO");
        let result = apply_edits("hello world", vec![edit]).unwrap();
        assert_eq!(result, "hello world");
    }

    #[test]
    fn test_batch_edits_bottom_to_top() {
        let text = "line1\nline2\nline3\n";
        let edits = vec![
            Edit::new(0, 5, "L1", "line1"),
            Edit::new(6, 11, "LINE_TWO", "line2"),
            Edit::new(12, 17, "L3", "line3"),
        ];
        let result = apply_edits(text, edits).unwrap();
        assert_eq!(result, "L1\nLINE_TWO\nL3\n");
    }

    #[test]
    fn test_overlapping_edits_rejected() {
        let edits = vec![
            Edit::new(0, 6, "a", "hello "),
            Edit::new(4, 8, "b", "o wo"),
        ];
        let result = apply_edits("hello world", edits);
        assert!(matches!(result, Err(EditError::Overlap { .. })));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("index.css");
        fs::write(&file_path, "a { gap: 0.5rem; }").unwrap();

        atomic_write(&file_path, b"a { gap: 0.4rem; }").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "a { gap: 0.4rem; }");
    }

    #[test]
    fn test_atomic_write_creates_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("new.css");

        atomic_write(&file_path, b"a {}").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "a {}");
    }

    #[test]
    #[cfg(unix)]
    fn test_atomic_write_through_symlink() {
        let temp_dir = tempfile::tempdir().unwrap();
        let styles = temp_dir.path().join("shared");
        fs::create_dir(&styles).unwrap();
        let real = styles.join("real.css");
        let link = temp_dir.path().join("index.css");
        fs::write(&real, "a { gap: 0.5rem; }").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        atomic_write(&link, b"a { gap: 0.4rem; }").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "a { gap: 0.4rem; }");
        assert_eq!(fs::read_to_string(&link).unwrap(), "a { gap: 0.4rem; }");
        // No temp file left behind next to either path
        assert_eq!(fs::read_dir(&styles).unwrap().count(), 1);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 2);
    }

    #[test]
    #[cfg(unix)]
    fn test_atomic_write_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("index.css");
        fs::write(&file_path, "a {}").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();

        atomic_write(&file_path, b"b {}").unwrap();

        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
