//! Macro expansion
//!
//! Resolves a name against a [`MacroTable`] the way a C preprocessor would
//! when the name appears in running text: object-like and function-like
//! macros are replaced and rescanned, with per-token hide sets preventing
//! recursive expansion.

use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;
use tracing::trace;

use oflagsgen_core::MacroDefinition;

use crate::dump::MacroTable;
use crate::lexer::{self, Token, TokenKind};

/// Replacement budget per top-level expansion
pub const DEFAULT_STEP_LIMIT: usize = 10_000;

/// Errors that can occur during expansion
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("Expanding {name} exceeded {limit} macro replacements")]
    StepLimit { name: String, limit: usize },

    #[error("Unterminated argument list invoking macro {0}")]
    UnterminatedArgs(String),

    #[error("Macro {name} requires {expected} arguments, but {got} given")]
    ArgCount {
        name: String,
        expected: usize,
        got: usize,
    },
}

impl From<ExpandError> for oflagsgen_core::Error {
    fn from(err: ExpandError) -> Self {
        Self::Expand(err.to_string())
    }
}

/// Macro expander over a fixed table
pub struct Expander<'a> {
    table: &'a MacroTable,
    limit: usize,
}

impl<'a> Expander<'a> {
    pub fn new(table: &'a MacroTable) -> Self {
        Self {
            table,
            limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Override the replacement budget
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Expand a single macro name as if it appeared alone in source text.
    pub fn expand_name(&self, name: &str) -> Result<Vec<Token>, ExpandError> {
        self.expand_text(name)
    }

    /// Expand arbitrary source text.
    pub fn expand_text(&self, text: &str) -> Result<Vec<Token>, ExpandError> {
        let mut tokens = self.expand(lexer::tokenize(text))?;
        if let Some(first) = tokens.first_mut() {
            first.space_before = false;
        }
        Ok(tokens)
    }

    /// Fully expand a token sequence
    pub fn expand(&self, tokens: Vec<Token>) -> Result<Vec<Token>, ExpandError> {
        let mut steps = 0;
        self.expand_counted(tokens, &mut steps)
    }

    fn expand_counted(
        &self,
        tokens: Vec<Token>,
        steps: &mut usize,
    ) -> Result<Vec<Token>, ExpandError> {
        let mut pending: VecDeque<Token> = tokens.into();
        let mut out = Vec::new();

        while let Some(tok) = pending.pop_front() {
            let Some(def) = self.lookup(&tok) else {
                out.push(tok);
                continue;
            };

            *steps += 1;
            if *steps > self.limit {
                return Err(ExpandError::StepLimit {
                    name: tok.text,
                    limit: self.limit,
                });
            }

            let replacement = match &def.params {
                None => {
                    let mut hide = tok.hide.clone();
                    hide.insert(def.name.clone());
                    self.substitute(def, &[], &hide, steps)?
                }
                Some(_) => {
                    // Without an argument list the name stays as it is
                    if !pending.front().is_some_and(|t| t.is_punct("(")) {
                        out.push(tok);
                        continue;
                    }
                    pending.pop_front();

                    let (args, rparen) = collect_args(&mut pending, &def.name)?;
                    let args = normalize_args(def, args)?;

                    let mut hide: BTreeSet<String> =
                        tok.hide.intersection(&rparen.hide).cloned().collect();
                    hide.insert(def.name.clone());
                    self.substitute(def, &args, &hide, steps)?
                }
            };

            trace!("{} -> {}", def.name, lexer::render(&replacement));

            let mut replacement = replacement;
            if let Some(first) = replacement.first_mut() {
                first.space_before = tok.space_before;
            }
            for t in replacement.into_iter().rev() {
                pending.push_front(t);
            }
        }

        Ok(out)
    }

    fn lookup(&self, tok: &Token) -> Option<&'a MacroDefinition> {
        if tok.kind != TokenKind::Ident || tok.hide.contains(&tok.text) {
            return None;
        }
        self.table.get(&tok.text)
    }

    /// Build the replacement list for one invocation.
    fn substitute(
        &self,
        def: &MacroDefinition,
        args: &[Vec<Token>],
        hide: &BTreeSet<String>,
        steps: &mut usize,
    ) -> Result<Vec<Token>, ExpandError> {
        let body = lexer::tokenize(&def.body);
        let params: &[String] = def.params.as_deref().unwrap_or(&[]);
        let param_index = |t: &Token| -> Option<usize> {
            if t.kind == TokenKind::Ident {
                params.iter().position(|p| *p == t.text)
            } else {
                None
            }
        };
        let function_like = def.is_function_like();

        let mut result: Vec<Token> = Vec::new();
        let mut i = 0;

        while i < body.len() {
            let t = &body[i];

            if function_like && t.is_punct("#") {
                if let Some(idx) = body.get(i + 1).and_then(param_index) {
                    result.push(Token::new(
                        TokenKind::Str,
                        lexer::stringify(&args[idx]),
                        t.space_before,
                    ));
                    i += 2;
                    continue;
                }
            }

            if t.is_punct("##") && i > 0 && i + 1 < body.len() {
                let rhs_tok = &body[i + 1];
                let rhs_param = param_index(rhs_tok);
                let mut rhs = match rhs_param {
                    Some(idx) => args[idx].clone().into_iter(),
                    None => vec![rhs_tok.clone()].into_iter(),
                };

                // GNU `, ## __VA_ARGS__`: no paste, and the comma goes away
                // when the variadic argument is empty
                let gnu_comma = def.variadic && rhs_param == Some(params.len() - 1);

                match (result.pop(), rhs.next()) {
                    (Some(lhs), Some(mut first)) if gnu_comma && lhs.is_punct(",") => {
                        first.space_before = false;
                        result.push(lhs);
                        result.push(first);
                    }
                    (Some(lhs), Some(mut first)) if lhs.kind == TokenKind::Placemarker => {
                        first.space_before = lhs.space_before;
                        result.push(first);
                    }
                    (Some(lhs), Some(first)) => result.push(paste(&lhs, &first)),
                    (Some(lhs), None) => {
                        if !(gnu_comma && lhs.is_punct(",")) {
                            result.push(lhs);
                        }
                    }
                    (None, Some(first)) => result.push(first),
                    (None, None) => {}
                }
                result.extend(rhs);
                i += 2;
                continue;
            }

            if let Some(idx) = param_index(t) {
                let pasted_next = body.get(i + 1).is_some_and(|n| n.is_punct("##"));
                let mut replacement = if pasted_next {
                    args[idx].clone()
                } else {
                    self.expand_counted(args[idx].clone(), steps)?
                };
                if let Some(first) = replacement.first_mut() {
                    first.space_before = t.space_before;
                }
                if pasted_next && replacement.is_empty() {
                    replacement.push(Token::new(TokenKind::Placemarker, "", t.space_before));
                }
                result.extend(replacement);
                i += 1;
                continue;
            }

            result.push(t.clone());
            i += 1;
        }

        result.retain(|tok| tok.kind != TokenKind::Placemarker);
        for tok in &mut result {
            tok.hide.extend(hide.iter().cloned());
        }
        Ok(result)
    }
}

/// Collect the arguments of an invocation whose `(` was already consumed.
/// Returns the arguments and the closing parenthesis.
fn collect_args(
    pending: &mut VecDeque<Token>,
    name: &str,
) -> Result<(Vec<Vec<Token>>, Token), ExpandError> {
    let mut args = vec![Vec::new()];
    let mut depth = 0usize;

    while let Some(tok) = pending.pop_front() {
        if tok.is_punct("(") {
            depth += 1;
        } else if tok.is_punct(")") {
            if depth == 0 {
                return Ok((args, tok));
            }
            depth -= 1;
        } else if tok.is_punct(",") && depth == 0 {
            args.push(Vec::new());
            continue;
        }

        if let Some(current) = args.last_mut() {
            current.push(tok);
        }
    }

    Err(ExpandError::UnterminatedArgs(name.to_string()))
}

/// Match collected arguments to the macro's parameters.
fn normalize_args(
    def: &MacroDefinition,
    mut args: Vec<Vec<Token>>,
) -> Result<Vec<Vec<Token>>, ExpandError> {
    let expected = def.params.as_ref().map_or(0, Vec::len);
    let arg_count_error = |got: usize| ExpandError::ArgCount {
        name: def.name.clone(),
        expected,
        got,
    };

    // `F()` supplies one empty argument
    if expected == 0 {
        return if args.len() == 1 && args[0].is_empty() {
            Ok(Vec::new())
        } else {
            Err(arg_count_error(args.len()))
        };
    }

    if def.variadic {
        if args.len() + 1 < expected {
            return Err(arg_count_error(args.len()));
        }
        if args.len() + 1 == expected {
            args.push(Vec::new());
        }
        if args.len() > expected {
            let extra = args.split_off(expected);
            if let Some(rest) = args.last_mut() {
                for arg in extra {
                    rest.push(Token::new(TokenKind::Punct, ",", false));
                    rest.extend(arg);
                }
            }
        }
        return Ok(args);
    }

    if args.len() != expected {
        return Err(arg_count_error(args.len()));
    }
    Ok(args)
}

/// Apply the `##` operator to two tokens
fn paste(lhs: &Token, rhs: &Token) -> Token {
    let text = format!("{}{}", lhs.text, rhs.text);
    let mut tokens = lexer::tokenize(&text);
    let mut pasted = if tokens.len() == 1 {
        tokens.remove(0)
    } else {
        Token::new(TokenKind::Other, text, false)
    };
    pasted.space_before = lhs.space_before;
    pasted.hide = lhs.hide.union(&rhs.hide).cloned().collect();
    pasted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{render, stringify};

    fn table(dump: &str) -> MacroTable {
        MacroTable::from_dump(dump).unwrap()
    }

    fn expand(dump: &str, text: &str) -> String {
        let table = table(dump);
        render(&Expander::new(&table).expand_text(text).unwrap())
    }

    #[test]
    fn test_plain_value() {
        assert_eq!(expand("#define O_RDONLY 00", "O_RDONLY"), "00");
    }

    #[test]
    fn test_alias_chain() {
        let dump = "#define O_NDELAY O_NONBLOCK\n#define O_FSYNC O_SYNC\n\
                    #define O_NONBLOCK 04000\n#define O_SYNC 04010000\n";
        assert_eq!(expand(dump, "O_NDELAY"), "04000");
        assert_eq!(expand(dump, "O_FSYNC"), "04010000");
    }

    #[test]
    fn test_nested_expression() {
        let dump = "#define __O_TMPFILE (020000000 | __O_DIRECTORY)\n\
                    #define O_TMPFILE __O_TMPFILE\n\
                    #define __O_DIRECTORY 0200000\n";
        let table = table(dump);
        let tokens = Expander::new(&table).expand_name("O_TMPFILE").unwrap();
        assert_eq!(stringify(&tokens), r#""(020000000 | 0200000)""#);
    }

    #[test]
    fn test_undefined_identifiers_stay() {
        assert_eq!(expand("#define O_X (FOO | 1)", "O_X"), "(FOO | 1)");
        assert_eq!(expand("", "O_MISSING"), "O_MISSING");
    }

    #[test]
    fn test_self_reference_is_not_reexpanded() {
        assert_eq!(expand("#define O_LOOP O_LOOP", "O_LOOP"), "O_LOOP");
        let dump = "#define A (B + 1)\n#define B (A + 2)\n";
        assert_eq!(expand(dump, "A"), "((A + 2) + 1)");
    }

    #[test]
    fn test_function_like_invocation() {
        let dump = "#define __BIT(n) (1U << (n))\n#define O_X __BIT(O_SHIFT)\n#define O_SHIFT 3\n";
        assert_eq!(expand(dump, "O_X"), "(1U << (3))");
    }

    #[test]
    fn test_function_like_without_arguments() {
        let dump = "#define F(x) x\n#define O_F F\n";
        assert_eq!(expand(dump, "O_F"), "F");
    }

    #[test]
    fn test_stringify_and_paste_operators() {
        let dump = "#define STR(x) #x\n#define CAT(a, b) a ## b\n#define FOO 7\n";
        assert_eq!(expand(dump, "STR(FOO  +  1)"), r#""FOO + 1""#);
        assert_eq!(expand(dump, "CAT(F, OO)"), "7");
        assert_eq!(expand(dump, "CAT(0, x10)"), "0x10");
    }

    #[test]
    fn test_indirect_stringify() {
        let dump = "#define strfry2(x) #x\n\
                    #define strfry(x) strfry2(x)\n\
                    #define O_NDELAY O_NONBLOCK\n#define O_NONBLOCK 04000\n";
        assert_eq!(expand(dump, "strfry(O_NDELAY)"), r#""04000""#);
        assert_eq!(expand(dump, "strfry2(O_NDELAY)"), r#""O_NDELAY""#);
    }

    #[test]
    fn test_paste_with_empty_left_argument() {
        let dump = "#define __P(p, v) 0 p ## v\n#define O_X __P(, 1)\n\
                    #define CAT(a, b) x a ## b\n";
        let table = table(dump);
        let tokens = Expander::new(&table).expand_name("O_X").unwrap();
        assert_eq!(stringify(&tokens), r#""0 1""#);
        assert_eq!(expand(dump, "CAT(, y)"), "x y");
        assert_eq!(expand(dump, "CAT(w, )"), "x w");
        assert_eq!(expand(dump, "CAT(, )"), "x");
    }

    #[test]
    fn test_paste_chain_with_empty_middle() {
        let dump = "#define CAT3(a, b, c) a ## b ## c\n";
        assert_eq!(expand(dump, "CAT3(x, , z)"), "xz");
        assert_eq!(expand(dump, "CAT3(, , z)"), "z");
    }

    #[test]
    fn test_variadic() {
        let dump = "#define OR(first, ...) (first | __VA_ARGS__)\n\
                    #define JOIN(fmt, args...) f(fmt, ## args)\n";
        assert_eq!(expand(dump, "OR(1, 2, 4)"), "(1 | 2, 4)");
        assert_eq!(expand(dump, "JOIN(x)"), "f(x)");
        assert_eq!(expand(dump, "JOIN(x, y)"), "f(x,y)");
    }

    #[test]
    fn test_argument_errors() {
        let table = table("#define F(a, b) a b\n#define G() 1\n");
        let expander = Expander::new(&table);
        assert!(matches!(
            expander.expand_text("F(1)"),
            Err(ExpandError::ArgCount { expected: 2, got: 1, .. })
        ));
        assert!(matches!(
            expander.expand_text("F(1, 2"),
            Err(ExpandError::UnterminatedArgs(_))
        ));
        assert!(matches!(
            expander.expand_text("G(1)"),
            Err(ExpandError::ArgCount { expected: 0, .. })
        ));
        assert_eq!(render(&expander.expand_text("G()").unwrap()), "1");
    }

    #[test]
    fn test_step_limit() {
        let dump = "#define A B B\n#define B C C\n#define C D D\n#define D 1\n";
        let table = table(dump);
        let err = Expander::new(&table).with_limit(5).expand_name("A").unwrap_err();
        assert!(matches!(err, ExpandError::StepLimit { limit: 5, .. }));
        assert!(Expander::new(&table).expand_name("A").is_ok());
    }
}
