//! Ordered-rule lexer for monitor expressions.
//!
//! Rules are tried in declaration order at the cursor and the first match
//! wins, so `!=` must be declared before `!` and the literal rules before the
//! identifier rule.

use regex::Regex;
use thiserror::Error;
use tracing::trace;

use super::ExprError;

/// Maximum number of tokens one expression may produce.
pub const MAX_TOKENS: usize = 65_536;

/// Maximum length in bytes of literal and identifier text.
pub const MAX_TOKEN_TEXT: usize = 31;

/// Closed set of token kinds produced by the lexer and the re-tagging pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TokenKind {
    /// Decimal integer literal.
    Decimal,
    /// `0x`-prefixed hexadecimal literal.
    Hex,
    /// Register name (with or without `$`).
    Identifier,
    /// `+`
    Add,
    /// Binary `-`.
    Sub,
    /// Binary `*`.
    Mul,
    /// `/`
    Div,
    /// Prefix `-`.
    UnaryMinus,
    /// `!`
    Not,
    /// Prefix `*`.
    Deref,
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `(`
    LParen,
    /// `)`
    RParen,
}

impl TokenKind {
    /// Binding strength of a binary operator; lower binds looser.
    #[must_use]
    pub const fn precedence(self) -> Option<u8> {
        match self {
            Self::Or => Some(0),
            Self::And => Some(1),
            Self::Eq | Self::Neq => Some(2),
            Self::Add | Self::Sub => Some(3),
            Self::Mul | Self::Div => Some(4),
            _ => None,
        }
    }

    /// Literal and identifier tokens keep their matched text.
    #[must_use]
    pub const fn carries_text(self) -> bool {
        matches!(self, Self::Decimal | Self::Hex | Self::Identifier)
    }

    /// Tokens after which `-` and `*` stay binary.
    const fn ends_operand(self) -> bool {
        matches!(self, Self::Decimal | Self::Hex | Self::RParen)
    }
}

/// One lexed token. Operator tokens carry empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Token {
    /// Token classification.
    pub kind: TokenKind,
    /// Matched text for literals and identifiers.
    pub text: String,
}

impl Token {
    /// Creates a token that carries no text.
    #[must_use]
    pub const fn operator(kind: TokenKind) -> Self {
        Self {
            kind,
            text: String::new(),
        }
    }

    /// Creates a token with text.
    #[must_use]
    pub fn with_text(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

const RULES: [(&str, Option<TokenKind>); 15] = [
    ("!=", Some(TokenKind::Neq)),
    ("==", Some(TokenKind::Eq)),
    ("[ \t]+", None),
    (r"\+", Some(TokenKind::Add)),
    ("-", Some(TokenKind::Sub)),
    (r"\*", Some(TokenKind::Mul)),
    ("/", Some(TokenKind::Div)),
    (r"\(", Some(TokenKind::LParen)),
    (r"\)", Some(TokenKind::RParen)),
    ("&&", Some(TokenKind::And)),
    (r"\|\|", Some(TokenKind::Or)),
    ("!", Some(TokenKind::Not)),
    ("0[xX][0-9a-fA-F]+", Some(TokenKind::Hex)),
    ("[0-9]+", Some(TokenKind::Decimal)),
    (r"\$?[a-z0-9]+", Some(TokenKind::Identifier)),
];

/// A lexical rule failed to compile.
#[derive(Debug, Error)]
#[error("failed to compile lexical rule `{pattern}`")]
pub struct RuleError {
    /// Offending pattern.
    pub pattern: &'static str,
    /// Underlying regex error.
    #[source]
    pub source: regex::Error,
}

/// Compiled rule list. Patterns are anchored to the cursor.
#[derive(Debug, Clone)]
pub struct Lexer {
    rules: Vec<(Regex, Option<TokenKind>)>,
}

impl Lexer {
    /// Compiles every rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] naming the first pattern that fails to compile.
    pub fn new() -> Result<Self, RuleError> {
        let rules = RULES
            .iter()
            .map(|&(pattern, kind)| {
                Regex::new(&format!("^(?:{pattern})"))
                    .map(|regex| (regex, kind))
                    .map_err(|source| RuleError { pattern, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Splits `input` into `tokens`, clearing the buffer first, then applies
    /// the unary re-tagging pass.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::NoMatch`] with the byte offset where no rule
    /// matched, [`ExprError::TokenTooLong`] for oversized literal text, and
    /// [`ExprError::TooManyTokens`] when the buffer limit is reached.
    pub fn tokenize(&self, input: &str, tokens: &mut Vec<Token>) -> Result<(), ExprError> {
        tokens.clear();
        let mut position = 0;

        while position < input.len() {
            let rest = &input[position..];
            let (len, kind) = self
                .rules
                .iter()
                .find_map(|(regex, kind)| regex.find(rest).map(|m| (m.end(), *kind)))
                .ok_or(ExprError::NoMatch { position })?;
            let lexeme = &rest[..len];
            trace!(position, lexeme, ?kind, "matched rule");
            position += len;

            let Some(kind) = kind else { continue };
            if tokens.len() >= MAX_TOKENS {
                return Err(ExprError::TooManyTokens);
            }
            let token = if kind.carries_text() {
                if lexeme.len() > MAX_TOKEN_TEXT {
                    return Err(ExprError::TokenTooLong(lexeme.len()));
                }
                Token::with_text(kind, lexeme)
            } else {
                Token::operator(kind)
            };
            tokens.push(token);
        }

        retag_unary(tokens);
        Ok(())
    }
}

fn retag_unary(tokens: &mut [Token]) {
    let mut previous: Option<TokenKind> = None;
    for token in tokens.iter_mut() {
        let binary_context = previous.is_some_and(TokenKind::ends_operand);
        if !binary_context {
            token.kind = match token.kind {
                TokenKind::Sub => TokenKind::UnaryMinus,
                TokenKind::Mul => TokenKind::Deref,
                other => other,
            };
        }
        previous = Some(token.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, Token, TokenKind, MAX_TOKENS};
    use crate::expr::ExprError;

    fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
        let lexer = Lexer::new().expect("rules compile");
        let mut tokens = Vec::new();
        lexer.tokenize(input, &mut tokens)?;
        Ok(tokens)
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input)
            .expect("input tokenizes")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn arithmetic_keeps_literal_text() {
        assert_eq!(
            lex("1+2*3").expect("tokenizes"),
            vec![
                Token::with_text(TokenKind::Decimal, "1"),
                Token::operator(TokenKind::Add),
                Token::with_text(TokenKind::Decimal, "2"),
                Token::operator(TokenKind::Mul),
                Token::with_text(TokenKind::Decimal, "3"),
            ]
        );
    }

    #[test]
    fn two_character_operators_win_over_prefixes() {
        assert_eq!(
            kinds("1!=2 == 3 && !4 || 5"),
            vec![
                TokenKind::Decimal,
                TokenKind::Neq,
                TokenKind::Decimal,
                TokenKind::Eq,
                TokenKind::Decimal,
                TokenKind::And,
                TokenKind::Not,
                TokenKind::Decimal,
                TokenKind::Or,
                TokenKind::Decimal,
            ]
        );
    }

    #[test]
    fn hex_and_registers_are_recognised() {
        let tokens = lex("0X1F + $sp + a0 + $0").expect("tokenizes");
        assert_eq!(tokens[0], Token::with_text(TokenKind::Hex, "0X1F"));
        assert_eq!(tokens[2], Token::with_text(TokenKind::Identifier, "$sp"));
        assert_eq!(tokens[4], Token::with_text(TokenKind::Identifier, "a0"));
        assert_eq!(tokens[6], Token::with_text(TokenKind::Identifier, "$0"));
    }

    #[test]
    fn minus_and_star_are_retagged_by_context() {
        assert_eq!(
            kinds("-1 - -(2) * *3"),
            vec![
                TokenKind::UnaryMinus,
                TokenKind::Decimal,
                TokenKind::Sub,
                TokenKind::UnaryMinus,
                TokenKind::LParen,
                TokenKind::Decimal,
                TokenKind::RParen,
                TokenKind::Mul,
                TokenKind::Deref,
                TokenKind::Decimal,
            ]
        );
    }

    #[test]
    fn identifiers_do_not_keep_minus_binary() {
        assert_eq!(
            kinds("ra - 1"),
            vec![
                TokenKind::Identifier,
                TokenKind::UnaryMinus,
                TokenKind::Decimal
            ]
        );
    }

    #[test]
    fn unknown_character_reports_position() {
        assert_eq!(lex("1 + @"), Err(ExprError::NoMatch { position: 4 }));
        assert_eq!(lex("RA"), Err(ExprError::NoMatch { position: 0 }));
    }

    #[test]
    fn oversized_literal_is_rejected() {
        let long = "9".repeat(32);
        assert_eq!(lex(&long), Err(ExprError::TokenTooLong(32)));
        assert!(lex(&"9".repeat(31)).is_ok());
    }

    #[test]
    fn token_buffer_is_bounded() {
        let input = "(".repeat(MAX_TOKENS + 1);
        assert_eq!(lex(&input), Err(ExprError::TooManyTokens));
    }

    #[test]
    fn buffer_is_cleared_between_calls() {
        let lexer = Lexer::new().expect("rules compile");
        let mut tokens = Vec::new();
        lexer.tokenize("1 + 2", &mut tokens).expect("first");
        lexer.tokenize("7", &mut tokens).expect("second");
        assert_eq!(tokens, vec![Token::with_text(TokenKind::Decimal, "7")]);
    }

    #[test]
    fn whitespace_only_yields_no_tokens() {
        assert!(lex(" \t ").expect("tokenizes").is_empty());
    }
}
