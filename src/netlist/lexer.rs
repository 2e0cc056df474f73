//! Lexer for Spice netlists.
//!
//! Netlists are line oriented. The lexer hides the physical layout from the
//! parser: the first line becomes a [`TokenKind::Title`], `*` lines and blank
//! lines disappear, `+` lines are folded into the statement they continue and
//! every statement ends with a [`TokenKind::Newline`].

use std::collections::VecDeque;
use std::iter::{Enumerate, Peekable};
use std::str::Lines;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in a netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// The whole first line
    Title,
    /// A dot command such as `.END`; the rest of its line is dropped
    Directive,
    /// Any whitespace separated field of a component statement
    Word,
    /// End of a statement, after continuation lines were folded in
    Newline,
    /// End of input
    Eof,
}

/// Lexer for tokenizing netlist input.
pub struct Lexer<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
    pending: VecDeque<Token>,
    title_read: bool,
    last_line: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines().enumerate().peekable(),
            pending: VecDeque::new(),
            title_read: false,
            last_line: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return token;
            }
            if !self.fill() {
                return Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    line: self.last_line,
                    column: 1,
                };
            }
        }
    }

    /// Queue the tokens of the next statement. Returns false at end of input.
    fn fill(&mut self) -> bool {
        let Some((index, raw)) = self.lines.next() else {
            return false;
        };
        let line = index + 1;
        self.last_line = line;

        if !self.title_read {
            self.title_read = true;
            self.push(TokenKind::Title, raw.trim(), line, 1);
            self.push(TokenKind::Newline, "", line, raw.len() + 1);
            return true;
        }

        let text = strip_inline_comment(raw);
        let trimmed = text.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('*') {
            return true;
        }
        if trimmed.starts_with('+') {
            // A continuation with nothing to continue is a statement of its own.
            let column = text.len() - trimmed.len() + 2;
            self.push_words(&trimmed[1..], line, column);
            self.push(TokenKind::Newline, "", line, text.len() + 1);
            return true;
        }
        if trimmed.starts_with('.') {
            let word = trimmed.split_whitespace().next().unwrap_or(".");
            self.push(TokenKind::Directive, word, line, text.len() - trimmed.len() + 1);
            self.push(TokenKind::Newline, "", line, text.len() + 1);
            return true;
        }

        self.push_words(text, line, 1);
        let mut end = (line, text.len() + 1);
        while let Some((next_index, next_raw)) = self.lines.peek().copied() {
            let next_text = strip_inline_comment(next_raw);
            let next_trimmed = next_text.trim_start();
            if !next_trimmed.starts_with('+') {
                break;
            }
            self.lines.next();
            let column = next_text.len() - next_trimmed.len() + 2;
            self.push_words(&next_trimmed[1..], next_index + 1, column);
            end = (next_index + 1, next_text.len() + 1);
            self.last_line = next_index + 1;
        }
        self.push(TokenKind::Newline, "", end.0, end.1);
        true
    }

    fn push(&mut self, kind: TokenKind, text: &str, line: usize, column: usize) {
        self.pending.push_back(Token {
            kind,
            text: text.to_string(),
            line,
            column,
        });
    }

    /// Split `text` into words. `column` is the column of its first byte.
    fn push_words(&mut self, text: &str, line: usize, column: usize) {
        let mut start = None;
        for (pos, ch) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
            let separator = ch.is_whitespace() || ch == ',';
            match (start, separator) {
                (None, false) => start = Some(pos),
                (Some(begin), true) => {
                    self.push(TokenKind::Word, &text[begin..pos], line, column + begin);
                    start = None;
                }
                _ => {}
            }
        }
    }
}

/// Drop a `;` comment and everything after it.
fn strip_inline_comment(line: &str) -> &str {
    match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Parse a number with an optional Spice scale suffix.
///
/// Suffixes are case-insensitive: `F` 1e-15, `P` 1e-12, `N` 1e-9, `U` 1e-6,
/// `M` 1e-3, `K` 1e3, `MEG` 1e6, `G` 1e9, `T` 1e12. Letters after a suffix
/// are units and are ignored, so `10kOhm` and `4.7uF` both work.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    let split = number_prefix_len(text)?;
    let (number, suffix) = text.split_at(split);
    let value: f64 = number.parse().ok()?;

    let suffix = suffix.to_ascii_uppercase();
    if !suffix.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let multiplier = if suffix.starts_with("MEG") {
        1e6
    } else {
        match suffix.chars().next() {
            None => 1.0,
            Some('F') => 1e-15,
            Some('P') => 1e-12,
            Some('N') => 1e-9,
            Some('U') => 1e-6,
            Some('M') => 1e-3,
            Some('K') => 1e3,
            Some('G') => 1e9,
            Some('T') => 1e12,
            // Bare units such as "V" or "Ohm" leave the value unscaled.
            Some(_) => 1.0,
        }
    };
    Some(value * multiplier)
}

/// Length of the leading `[+-]digits[.digits][e[+-]digits]` part of `text`.
fn number_prefix_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut has_digits = i > digits_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let fraction_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        has_digits |= i > fraction_start;
    }
    if !has_digits {
        return None;
    }
    // Only a complete exponent counts; "1e" leaves the 'e' to the suffix.
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exponent_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exponent_start {
            i = j;
        }
    }
    Some(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kinds_and_text(input: &str) -> Vec<(TokenKind, String)> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push((tok.kind, tok.text));
        }
        out
    }

    #[test]
    fn test_parse_value() {
        assert_relative_eq!(parse_value("10k").unwrap(), 10_000.0);
        assert_relative_eq!(parse_value("100n").unwrap(), 100e-9);
        assert_relative_eq!(parse_value("4.7U").unwrap(), 4.7e-6);
        assert_relative_eq!(parse_value("4.7uF").unwrap(), 4.7e-6);
        assert_relative_eq!(parse_value("1MEG").unwrap(), 1e6);
        assert_relative_eq!(parse_value("1m").unwrap(), 1e-3);
        assert_relative_eq!(parse_value("2.2").unwrap(), 2.2);
        assert_relative_eq!(parse_value("1e-9").unwrap(), 1e-9);
        assert_relative_eq!(parse_value("3f").unwrap(), 3e-15);
        assert_relative_eq!(parse_value("2T").unwrap(), 2e12);
        assert_relative_eq!(parse_value("-5").unwrap(), -5.0);
        assert_relative_eq!(parse_value(".5").unwrap(), 0.5);
    }

    #[test]
    fn test_parse_value_rejects() {
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("k10"), None);
        assert_eq!(parse_value("1.2.3"), None);
        assert_eq!(parse_value("12%"), None);
        assert_eq!(parse_value("-"), None);
    }

    #[test]
    fn test_title_and_comments() {
        let tokens = kinds_and_text("My circuit\n* comment\n\nR1 1 0 1k ; note\n.END\n");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Title, "My circuit".to_string()),
                (TokenKind::Newline, String::new()),
                (TokenKind::Word, "R1".to_string()),
                (TokenKind::Word, "1".to_string()),
                (TokenKind::Word, "0".to_string()),
                (TokenKind::Word, "1k".to_string()),
                (TokenKind::Newline, String::new()),
                (TokenKind::Directive, ".END".to_string()),
                (TokenKind::Newline, String::new()),
            ]
        );
    }

    #[test]
    fn test_continuation_lines() {
        let tokens = kinds_and_text("t\nV1 1 0\n+ AC 1\n*\n+ 45\n");
        let words: Vec<_> = tokens
            .iter()
            .filter(|(k, _)| *k == TokenKind::Word)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(words, vec!["V1", "1", "0", "AC", "1", "45"]);
        let newlines = tokens.iter().filter(|(k, _)| *k == TokenKind::Newline).count();
        // Title, the V1 statement, and the stray continuation after the comment.
        assert_eq!(newlines, 3);
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("title\n  R1  a b 1\n");
        lexer.next_token();
        lexer.next_token();
        let r1 = lexer.next_token();
        assert_eq!((r1.line, r1.column), (2, 3));
        let a = lexer.next_token();
        assert_eq!((a.line, a.column), (2, 7));
    }
}
