//! Lightweight shell syntax highlighting for the commands panel.
//!
//! Tokenization is lossless: concatenating the token texts of a line
//! reproduces the line exactly, so highlighting never alters a command.

use colored::{ColoredString, Colorize};

/// Lexical class of a shell token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// First word of a pipeline stage.
    Command,
    Flag,
    String,
    Variable,
    /// `<TARGET>`-style value the user must fill in.
    Placeholder,
    Operator,
    Comment,
    Word,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

const WORD_BREAKS: &[char] = &['|', ';', '&', '<', '>', '"', '\'', '$', '(', ')'];
const OPERATORS: &[&str] = &["&&", "||", ">>", "|", ";", "&", ">", "<", "(", ")"];

/// Split one line of shell into tokens.
pub fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = line;
    let mut expect_command = true;

    while let Some(c) = rest.chars().next() {
        let (kind, len) = if c.is_whitespace() {
            (TokenKind::Space, prefix_len(rest, char::is_whitespace))
        } else if c == '#' {
            (TokenKind::Comment, rest.len())
        } else if c == '\'' || c == '"' {
            (TokenKind::String, quoted_len(rest, c))
        } else if c == '$' {
            dollar(rest)
        } else if let Some(len) = placeholder_len(rest) {
            (TokenKind::Placeholder, len)
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            (TokenKind::Operator, op.len())
        } else {
            let len = prefix_len(rest, |ch| !ch.is_whitespace() && !WORD_BREAKS.contains(&ch));
            let word = &rest[..len];
            let kind = if expect_command && !word.contains('=') {
                TokenKind::Command
            } else if word.len() > 1 && word.starts_with('-') {
                TokenKind::Flag
            } else {
                TokenKind::Word
            };
            (kind, len)
        };

        let (text, tail) = rest.split_at(len);
        expect_command = match kind {
            TokenKind::Space | TokenKind::Comment => expect_command,
            TokenKind::Operator => matches!(text, "|" | "||" | "&&" | ";" | "&" | "(" | "$("),
            // `VAR=value cmd`: assignments keep the command slot open.
            TokenKind::Word => expect_command && text.contains('='),
            _ => false,
        };
        tokens.push(Token { kind, text });
        rest = tail;
    }

    tokens
}

/// Apply the terminal style for a token kind.
pub fn paint(kind: TokenKind, text: &str) -> ColoredString {
    match kind {
        TokenKind::Command => text.cyan().bold(),
        TokenKind::Flag => text.yellow(),
        TokenKind::String => text.green(),
        TokenKind::Variable => text.magenta(),
        TokenKind::Placeholder => text.red().bold(),
        TokenKind::Operator => text.white().bold(),
        TokenKind::Comment => text.dimmed().italic(),
        TokenKind::Word | TokenKind::Space => text.normal(),
    }
}

/// Byte length of the longest prefix whose chars all satisfy `pred`.
fn prefix_len(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|(_, ch)| !pred(*ch))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Length of a quoted string starting at `s[0]`, through the closing quote.
/// An unterminated string runs to the end of the line.
fn quoted_len(s: &str, quote: char) -> usize {
    let mut escaped = false;
    for (i, ch) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if ch == '\\' && quote == '"' {
            escaped = true;
        } else if ch == quote {
            return i + ch.len_utf8();
        }
    }
    s.len()
}

/// `$NAME`, `${NAME}`, `$1`, `$?` are variables; `$(` opens a subshell.
fn dollar(s: &str) -> (TokenKind, usize) {
    let after = &s[1..];
    if after.starts_with('(') {
        return (TokenKind::Operator, 2);
    }
    if after.starts_with('{') {
        let len = after.find('}').map(|i| i + 2).unwrap_or(s.len());
        return (TokenKind::Variable, len);
    }

    let name = prefix_len(after, |ch| ch.is_alphanumeric() || ch == '_');
    if name > 0 {
        return (TokenKind::Variable, 1 + name);
    }
    match after.chars().next() {
        Some(ch) if !ch.is_whitespace() && !WORD_BREAKS.contains(&ch) => {
            (TokenKind::Variable, 1 + ch.len_utf8())
        }
        _ => (TokenKind::Variable, 1),
    }
}

/// `<NAME>` where NAME starts with a letter and holds letters, digits, `_` or `-`.
fn placeholder_len(s: &str) -> Option<usize> {
    let inner = s.strip_prefix('<')?;
    if !inner.chars().next()?.is_ascii_alphabetic() {
        return None;
    }
    let name = prefix_len(inner, |ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    inner[name..].starts_with('>').then_some(name + 2)
}
