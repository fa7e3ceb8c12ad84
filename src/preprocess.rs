//! Macro-directive preprocessor
//!
//! Rewrites script text before it reaches a backend, giving sources
//! compile-time access to the current environment, resource name and exposed
//! environment variables without a module system.
//!
//! Directives live inside `/* #... */` comment markers:
//!
//! - `/* #define KEY VALUE */` stores VALUE under KEY and disappears;
//! - `/* #read KEY */` is replaced by the stored value, or nothing;
//! - `/* #ifdef KEY */ ... /* #endif */` keeps the block iff KEY is defined;
//! - `/* #if KEY == VALUE */ ... /* #endif */` keeps the block iff the
//!   stored value equals VALUE as a literal string or number — never any
//!   wider expression evaluation.
//!
//! The input is rescanned left to right until no marker remains. Unrecognized
//! directive names are dropped silently.

use std::collections::BTreeMap;

const MARKER: &str = "/* #";
const COMMENT_END: &str = "*/";
const ENDIF: &str = "/* #endif */";

/// One preprocessing pass's mutable key -> value store
#[derive(Debug, Default)]
pub struct Preprocessor {
    values: BTreeMap<String, String>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a definition before processing. An empty value still counts
    /// as defined and is stored as `null`.
    pub fn define(&mut self, key: &str, value: &str) {
        let stored = if value.is_empty() { "null" } else { value };
        self.values.insert(key.to_string(), stored.to_string());
    }

    /// Stored value for a key, if defined
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Run the directive rewriter over `input` until no marker remains.
    pub fn process(&mut self, input: &str) -> String {
        let mut text = input.to_string();

        while let Some(start) = text.find(MARKER) {
            let name_start = start + MARKER.len();
            let name: String = text[name_start..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();

            let close = match find_comment_end(&text, name_start) {
                Some(close) => close,
                None => {
                    // Unterminated marker: drop it and keep going.
                    text.replace_range(start..name_start, "");
                    continue;
                }
            };

            let body = text[name_start + name.len()..close - COMMENT_END.len()]
                .trim()
                .to_string();

            match name.as_str() {
                "define" => {
                    let (key, value) = split_once_whitespace(&body);
                    if !key.is_empty() {
                        self.define(key, value);
                    }
                    text.replace_range(start..close, "");
                }
                "read" => {
                    let value = self.value(&body).unwrap_or("").to_string();
                    text.replace_range(start..close, &value);
                }
                "ifdef" => self.apply_block(&mut text, start, close, |values| {
                    values.values.contains_key(&body)
                }),
                "if" => match body.split_once("==") {
                    Some((key, expected)) => {
                        let key = key.trim().to_string();
                        let expected = expected.trim().to_string();
                        self.apply_block(&mut text, start, close, |values| {
                            values
                                .value(&key)
                                .map(|stored| literal_eq(stored, &expected))
                                .unwrap_or(false)
                        });
                    }
                    None => text.replace_range(start..close, ""),
                },
                _ => text.replace_range(start..close, ""),
            }
        }

        text
    }

    /// Resolve an `ifdef`/`if` span: keep the enclosed block when the
    /// condition holds, otherwise remove directive and content together.
    fn apply_block(
        &mut self,
        text: &mut String,
        start: usize,
        opener_close: usize,
        condition: impl FnOnce(&Self) -> bool,
    ) {
        let Some(endif_rel) = text[opener_close..].find(ENDIF) else {
            // Missing endif: drop the opener and continue scanning.
            text.replace_range(start..opener_close, "");
            return;
        };
        let endif_start = opener_close + endif_rel;
        let endif_end = endif_start + ENDIF.len();

        if condition(self) {
            let content = text[opener_close..endif_start].to_string();
            text.replace_range(start..endif_end, &content);
        } else {
            text.replace_range(start..endif_end, "");
        }
    }
}

/// Index just past the `*/` closing a comment that starts before `from`
fn find_comment_end(text: &str, from: usize) -> Option<usize> {
    text[from..]
        .find(COMMENT_END)
        .map(|rel| from + rel + COMMENT_END.len())
}

fn split_once_whitespace(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (s, ""),
    }
}

/// Literal string/number equality, stripping one layer of matching quotes
fn literal_eq(a: &str, b: &str) -> bool {
    let a = strip_quotes(a);
    let b = strip_quotes(b);

    if let (Ok(a_num), Ok(b_num)) = (a.parse::<f64>(), b.parse::<f64>()) {
        return a_num == b_num;
    }

    a == b
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> String {
        Preprocessor::new().process(input)
    }

    #[test]
    fn define_disappears_and_read_substitutes() {
        let out = run("/* #define GREETING hello */local x = '/* #read GREETING */'");
        assert_eq!(out, "local x = 'hello'");
    }

    #[test]
    fn read_of_unset_key_is_empty() {
        assert_eq!(run("a/* #read MISSING */b"), "ab");
    }

    #[test]
    fn if_keeps_block_on_equal_literal() {
        let out = run("/* #define X 1 *//* #if X == 1 */A/* #endif */");
        assert_eq!(out.trim(), "A");
    }

    #[test]
    fn if_removes_block_on_unequal_literal() {
        let out = run("/* #define X 1 *//* #if X == 2 */A/* #endif */");
        assert_eq!(out.trim(), "");
    }

    #[test]
    fn if_compares_numbers_numerically() {
        let out = run("/* #define X 1 *//* #if X == 1.0 */A/* #endif */");
        assert_eq!(out.trim(), "A");
    }

    #[test]
    fn if_compares_quoted_strings() {
        let out = run("/* #define ENV 'server' *//* #if ENV == server */S/* #endif */");
        assert_eq!(out.trim(), "S");
    }

    #[test]
    fn ifdef_requires_a_definition() {
        assert_eq!(run("/* #ifdef UNSET */A/* #endif */"), "");

        let mut pp = Preprocessor::new();
        pp.define("IS_SERVER", "");
        assert_eq!(pp.process("/* #ifdef IS_SERVER */A/* #endif */"), "A");
    }

    #[test]
    fn empty_define_still_counts_as_defined() {
        let out = run("/* #define FLAG *//* #ifdef FLAG */on/* #endif */");
        assert_eq!(out.trim(), "on");
    }

    #[test]
    fn unknown_directive_is_dropped() {
        assert_eq!(run("a/* #pragma once */b"), "ab");
    }

    #[test]
    fn stray_endif_is_dropped() {
        assert_eq!(run("a/* #endif */b"), "ab");
    }

    #[test]
    fn missing_endif_drops_only_the_opener() {
        assert_eq!(run("/* #ifdef X */rest"), "rest");
    }

    #[test]
    fn directives_inside_kept_blocks_are_processed() {
        let mut pp = Preprocessor::new();
        pp.define("IS_CLIENT", "true");
        let out = pp.process(
            "/* #ifdef IS_CLIENT *//* #define HUD 1 */hud=/* #read HUD *//* #endif */",
        );
        assert_eq!(out, "hud=1");
    }
}
