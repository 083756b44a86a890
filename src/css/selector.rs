//! Selector text normalization.
//!
//! Selectors are compared as text, not as parsed selector trees: two
//! selectors are the same when they differ only in runs of whitespace.

/// Collapse whitespace runs to a single space and trim the ends.
pub fn normalize(selector: &str) -> String {
    selector.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a selector list on top-level commas and normalize each entry.
///
/// Commas inside parentheses or brackets (`:is(a, b)`, `[data-x="a,b"]`)
/// do not split.
pub fn split_list(prelude: &str) -> Vec<String> {
    let mut selectors = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in prelude.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                selectors.push(normalize(&prelude[start..idx]));
                start = idx + 1;
            }
            _ => {}
        }
    }
    selectors.push(normalize(&prelude[start..]));

    selectors.retain(|s| !s.is_empty());
    selectors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  .nav-links \n\t a  "), ".nav-links a");
    }

    #[test]
    fn split_simple_list() {
        assert_eq!(
            split_list(".footer a,\n.nav-links  a"),
            vec![".footer a".to_string(), ".nav-links a".to_string()]
        );
    }

    #[test]
    fn split_ignores_nested_commas() {
        assert_eq!(
            split_list(":is(.a, .b) span, [data-x=\"1,2\"]"),
            vec![":is(.a, .b) span".to_string(), "[data-x=\"1,2\"]".to_string()]
        );
    }

    #[test]
    fn split_drops_empty_entries() {
        assert_eq!(split_list(" , a ,"), vec!["a".to_string()]);
    }
}
