use crate::css::selector;
use cssparser::{ParseError, Parser, ParserInput, Token};
use std::ops::Range;

/// At-rules whose block holds more style rules rather than declarations.
const GROUPING_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "layer",
    "container",
    "document",
    "-moz-document",
    "scope",
    "starting-style",
];

/// Minimum normalized Levenshtein similarity for a selector suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.6;

/// A single `name: value` declaration inside a style block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Property name as written
    pub name: String,
    pub name_span: Range<usize>,
    /// Value text with surrounding whitespace excluded
    pub value: String,
    pub value_span: Range<usize>,
}

impl Declaration {
    /// Property names compare ASCII case-insensitively.
    pub fn is_property(&self, property: &str) -> bool {
        self.name.eq_ignore_ascii_case(property.trim())
    }
}

/// A style rule: selector prelude plus its brace-delimited declaration list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleBlock {
    /// Normalized selectors from the prelude's selector list
    pub selectors: Vec<String>,
    pub prelude_span: Range<usize>,
    /// Span between the braces (exclusive of both)
    pub body_span: Range<usize>,
    /// 1-based line of the prelude
    pub line: usize,
    pub declarations: Vec<Declaration>,
}

impl StyleBlock {
    /// True if any selector in the block's list equals `selector` after
    /// whitespace normalization.
    pub fn matches_selector(&self, selector: &str) -> bool {
        let wanted = selector::normalize(selector);
        self.selectors.iter().any(|s| *s == wanted)
    }

    /// Declarations for `property`, in document order. Declarations of
    /// nested style rules belong to those rules, not to this block.
    pub fn declarations_named<'a>(
        &'a self,
        property: &'a str,
    ) -> impl Iterator<Item = &'a Declaration> + 'a {
        self.declarations
            .iter()
            .filter(move |decl| decl.is_property(property))
    }
}

/// Flat index of every style block in a stylesheet, in document order.
///
/// Built from the `cssparser` tokenizer, so comments, strings and nested
/// parentheses never confuse block boundaries. Tokenization never fails:
/// malformed input just yields fewer (or no) blocks.
#[derive(Debug, Clone, Default)]
pub struct StyleSheetIndex {
    blocks: Vec<StyleBlock>,
}

impl StyleSheetIndex {
    pub fn parse(source: &str) -> Self {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);
        let mut blocks = Vec::new();
        parse_rule_list(&mut parser, source, &mut blocks);

        tracing::trace!(blocks = blocks.len(), "indexed stylesheet");
        Self { blocks }
    }

    pub fn blocks(&self) -> &[StyleBlock] {
        &self.blocks
    }

    /// Every block whose selector list contains `selector`.
    pub fn blocks_matching<'a>(
        &'a self,
        selector: &'a str,
    ) -> impl Iterator<Item = &'a StyleBlock> + 'a {
        self.blocks
            .iter()
            .filter(move |block| block.matches_selector(selector))
    }

    /// All selectors in the sheet, in document order (duplicates kept).
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .flat_map(|block| block.selectors.iter().map(String::as_str))
    }

    /// The most similar selector present in the sheet, if any is close enough.
    pub fn closest_selector(&self, selector: &str) -> Option<&str> {
        let wanted = selector::normalize(selector);
        self.selectors()
            .map(|candidate| (candidate, strsim::normalized_levenshtein(&wanted, candidate)))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate)
    }
}

fn is_grouping_at_rule(name: &str) -> bool {
    GROUPING_AT_RULES.contains(&name)
}

fn parse_rule_list<'i, 't>(
    parser: &mut Parser<'i, 't>,
    source: &str,
    blocks: &mut Vec<StyleBlock>,
) {
    let mut prelude_start: Option<usize> = None;
    let mut at_rule: Option<String> = None;
    let mut comments: Vec<Range<usize>> = Vec::new();

    loop {
        let before = parser.position().byte_index();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => {}
            Token::Comment(_) => comments.push(before..parser.position().byte_index()),
            Token::Semicolon | Token::CloseCurlyBracket => {
                prelude_start = None;
                at_rule = None;
                comments.clear();
            }
            Token::CurlyBracketBlock => {
                let start = prelude_start.take().unwrap_or(before);
                match at_rule.take() {
                    Some(name) if is_grouping_at_rule(&name) => {
                        let _ = parser.parse_nested_block(|nested| {
                            parse_rule_list(nested, source, blocks);
                            Ok::<_, ParseError<'i, ()>>(())
                        });
                    }
                    // @font-face, @keyframes and friends: the block is
                    // skipped by the next call to next()
                    Some(_) => {}
                    None => parse_style_rule(parser, source, start..before, &comments, blocks),
                }
                comments.clear();
            }
            Token::AtKeyword(ref name) if prelude_start.is_none() => {
                prelude_start = Some(before);
                at_rule = Some(name.to_ascii_lowercase());
            }
            _ => {
                prelude_start.get_or_insert(before);
            }
        }
    }
}

/// Parse the block the parser is positioned at as a style rule with the
/// given prelude. The block is indexed before any rules nested in it.
fn parse_style_rule<'i, 't>(
    parser: &mut Parser<'i, 't>,
    source: &str,
    prelude: Range<usize>,
    comments: &[Range<usize>],
    blocks: &mut Vec<StyleBlock>,
) {
    let body_start = parser.position().byte_index();
    let slot = blocks.len();
    blocks.push(StyleBlock {
        selectors: selector::split_list(&prelude_text(source, &prelude, comments)),
        line: source[..prelude.start].matches('\n').count() + 1,
        prelude_span: prelude,
        body_span: body_start..body_start,
        declarations: Vec::new(),
    });

    let declarations = parser
        .parse_nested_block(|nested| {
            Ok::<_, ParseError<'i, ()>>(parse_declarations(nested, source, blocks))
        })
        .unwrap_or_default();
    let after = parser.position().byte_index();
    let body_end = if source[..after].ends_with('}') {
        after - 1
    } else {
        after
    };

    if let Some(block) = blocks.get_mut(slot) {
        block.body_span = body_start..body_end;
        block.declarations = declarations;
    }
}

/// Prelude source with comments cut out.
fn prelude_text(source: &str, prelude: &Range<usize>, comments: &[Range<usize>]) -> String {
    let mut text = String::with_capacity(prelude.len());
    let mut cursor = prelude.start;
    for comment in comments.iter() {
        if !(comment.start >= cursor && comment.end <= prelude.end) {
            continue;
        }
        text.push_str(&source[cursor..comment.start]);
        cursor = comment.end;
    }
    text.push_str(&source[cursor..prelude.end]);
    text
}

enum DeclarationState {
    Start,
    Name {
        name: String,
        span: Range<usize>,
    },
    Value {
        name: String,
        name_span: Range<usize>,
        value_span: Option<Range<usize>>,
        colon_end: usize,
    },
    /// Inside something that is not a declaration; resync at `;` or a block
    Skip,
}

/// Declarations of one style rule body.
///
/// Nested style rules are indexed into `blocks` as blocks of their own.
/// Declarations inside a nested conditional group (`@media` and friends)
/// still apply to this rule and are returned with the rest.
fn parse_declarations<'i, 't>(
    parser: &mut Parser<'i, 't>,
    source: &str,
    blocks: &mut Vec<StyleBlock>,
) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    let mut state = DeclarationState::Start;
    let mut item_start: Option<usize> = None;
    let mut at_rule: Option<String> = None;
    let mut comments: Vec<Range<usize>> = Vec::new();

    loop {
        let before = parser.position().byte_index();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => continue,
            Token::Comment(_) => {
                comments.push(before..parser.position().byte_index());
                continue;
            }
            Token::CurlyBracketBlock => {
                let start = item_start.take().unwrap_or(before);
                match at_rule.take() {
                    Some(name) if is_grouping_at_rule(&name) => {
                        if let Ok(nested) = parser.parse_nested_block(|nested| {
                            Ok::<_, ParseError<'i, ()>>(parse_declarations(nested, source, blocks))
                        }) {
                            declarations.extend(nested);
                        }
                    }
                    Some(_) => {}
                    None => parse_style_rule(parser, source, start..before, &comments, blocks),
                }
                comments.clear();
                state = DeclarationState::Start;
                continue;
            }
            Token::Semicolon => {
                item_start = None;
                at_rule = None;
                comments.clear();
            }
            Token::AtKeyword(ref name) if item_start.is_none() => {
                item_start = Some(before);
                at_rule = Some(name.to_ascii_lowercase());
            }
            _ => {
                item_start.get_or_insert(before);
            }
        }

        // Consume function/paren/bracket contents now so `after` lands past
        // the closing delimiter.
        if matches!(
            token,
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock
        ) {
            skip_nested_block(parser);
        }
        let after = parser.position().byte_index();

        state = match (state, token) {
            (
                DeclarationState::Value {
                    name,
                    name_span,
                    value_span,
                    colon_end,
                },
                Token::Semicolon,
            ) => {
                declarations.push(finish_declaration(
                    source,
                    name,
                    name_span,
                    value_span.unwrap_or(colon_end..colon_end),
                ));
                DeclarationState::Start
            }
            (_, Token::Semicolon) => DeclarationState::Start,
            (DeclarationState::Start, Token::Ident(name)) => DeclarationState::Name {
                name: name.to_string(),
                span: before..after,
            },
            (DeclarationState::Name { name, span }, Token::Colon) => DeclarationState::Value {
                name,
                name_span: span,
                value_span: None,
                colon_end: after,
            },
            (
                DeclarationState::Value {
                    name,
                    name_span,
                    value_span,
                    colon_end,
                },
                _,
            ) => DeclarationState::Value {
                name,
                name_span,
                value_span: Some(match value_span {
                    Some(span) => span.start..after,
                    None => before..after,
                }),
                colon_end,
            },
            _ => DeclarationState::Skip,
        };
    }

    // Last declaration may omit its semicolon
    if let DeclarationState::Value {
        name,
        name_span,
        value_span,
        colon_end,
    } = state
    {
        declarations.push(finish_declaration(
            source,
            name,
            name_span,
            value_span.unwrap_or(colon_end..colon_end),
        ));
    }

    declarations
}

fn finish_declaration(
    source: &str,
    name: String,
    name_span: Range<usize>,
    value_span: Range<usize>,
) -> Declaration {
    Declaration {
        name,
        name_span,
        value: source[value_span.clone()].to_string(),
        value_span,
    }
}

fn skip_nested_block<'i, 't>(parser: &mut Parser<'i, 't>) {
    let _ = parser.parse_nested_block(|nested| {
        while nested.next_including_whitespace_and_comments().is_ok() {}
        Ok::<_, ParseError<'i, ()>>(())
    });
}
