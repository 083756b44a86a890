//! Structural CSS lookup.
//!
//! Locates style blocks by selector and their declarations by property,
//! returning byte spans into the original text so edits can be spliced in
//! without reformatting anything else.

pub mod locator;
pub mod selector;

pub use locator::{Declaration, StyleBlock, StyleSheetIndex};
