//! Preprocessing token lexer
//!
//! Splits macro replacement lists into preprocessing tokens. Only what
//! expansion and stringification need is distinguished; everything else is
//! carried through as text.

use std::collections::BTreeSet;

/// Kind of preprocessing token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
    Other,
    /// Stands in for an empty argument next to `##`; never survives expansion
    Placemarker,
}

/// A preprocessing token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Whitespace preceded this token
    pub space_before: bool,
    /// Macros that must not be expanded again from this token
    pub hide: BTreeSet<String>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, space_before: bool) -> Self {
        Self {
            kind,
            text: text.into(),
            space_before,
            hide: BTreeSet::new(),
        }
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }
}

const PUNCT3: &[&str] = &["...", "<<=", ">>="];
const PUNCT2: &[&str] = &[
    "##", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "*=", "/=", "%=",
    "+=", "-=", "&=", "^=", "|=", "::",
];

/// Split `src` into preprocessing tokens
pub fn tokenize(src: &str) -> Vec<Token> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut space = false;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            space = true;
            i += 1;
            continue;
        }

        let start = i;
        let kind = if is_ident_start(c) {
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            // Encoding prefixes glue onto the literal that follows
            let word: String = chars[start..i].iter().collect();
            match chars.get(i).copied() {
                Some(q) if (q == '"' || q == '\'') && matches!(word.as_str(), "L" | "u" | "U" | "u8") => {
                    i = skip_quoted(&chars, i, q);
                    if q == '"' {
                        TokenKind::Str
                    } else {
                        TokenKind::Char
                    }
                }
                _ => TokenKind::Ident,
            }
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            i += 1;
            while i < chars.len() {
                let ch = chars[i];
                if matches!(ch, '+' | '-') && matches!(chars[i - 1], 'e' | 'E' | 'p' | 'P') {
                    i += 1;
                } else if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                    i += 1;
                } else {
                    break;
                }
            }
            TokenKind::Number
        } else if c == '"' || c == '\'' {
            i = skip_quoted(&chars, i, c);
            if c == '"' {
                TokenKind::Str
            } else {
                TokenKind::Char
            }
        } else if c.is_ascii_punctuation() {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let len = PUNCT3
                .iter()
                .chain(PUNCT2)
                .find(|p| rest.starts_with(**p))
                .map_or(1, |p| p.len());
            i += len;
            TokenKind::Punct
        } else {
            i += 1;
            TokenKind::Other
        };

        let text: String = chars[start..i].iter().collect();
        tokens.push(Token::new(kind, text, space));
        space = false;
    }

    tokens
}

/// Index just past the closing quote, or the end of input if unterminated
fn skip_quoted(chars: &[char], open: usize, quote: char) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            ch if ch == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Render tokens as source text, one space wherever whitespace separated them
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        if i > 0 && tok.space_before {
            out.push(' ');
        }
        out.push_str(&tok.text);
    }
    out
}

/// Apply the `#` operator: render tokens as a string literal
pub fn stringify(tokens: &[Token]) -> String {
    let mut out = String::from("\"");
    for (i, tok) in tokens.iter().enumerate() {
        if i > 0 && tok.space_before {
            out.push(' ');
        }
        match tok.kind {
            TokenKind::Str | TokenKind::Char => {
                for ch in tok.text.chars() {
                    if ch == '"' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
            }
            _ => out.push_str(&tok.text),
        }
    }
    out.push('"');
    out
}
