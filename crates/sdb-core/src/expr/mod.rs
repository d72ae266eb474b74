//! Expression engine: ordered-rule tokenizer plus a precedence-aware
//! recursive evaluator over the flat token buffer.
//!
//! Grammar, loosest to tightest binding: `||`, `&&`, `== !=`, `+ -`, `* /`,
//! then the prefix operators `-`, `!` and `*`. Operands are decimal or `0x`
//! literals and register names (`$sp`, `a0`, `pc`). Arithmetic is on the
//! signed machine word and wraps; `&&` and `||` evaluate both sides.
//!
//! Prefix `*` on a bare register name reads that register, and an unknown
//! name reads as `0` rather than failing the expression. Prefix `*` on any
//! other operand reads a 4-byte word from guest memory.

mod eval;
/// Lexer, token kinds, and lexical limits.
pub mod token;

pub use token::{Lexer, RuleError, Token, TokenKind, MAX_TOKENS, MAX_TOKEN_TEXT};

use thiserror::Error;
use tracing::debug;

use crate::{MemoryFault, SWord, Target};
use eval::Evaluator;

/// Deepest operator or parenthesis nesting the evaluator descends into.
pub const MAX_NESTING: usize = 256;

/// Recoverable expression failures reported to the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExprError {
    /// No lexical rule matched at the byte offset.
    #[error("no match at position {position}")]
    NoMatch {
        /// Byte offset into the input.
        position: usize,
    },
    /// Input produced more than [`MAX_TOKENS`] tokens.
    #[error("expression has too many tokens (limit {MAX_TOKENS})")]
    TooManyTokens,
    /// Literal or identifier text exceeded [`MAX_TOKEN_TEXT`] bytes.
    #[error("token of {0} bytes exceeds the {MAX_TOKEN_TEXT}-byte limit")]
    TokenTooLong(usize),
    /// Parentheses do not nest.
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
    /// An operator has no operand, or the expression is empty.
    #[error("missing operand")]
    MissingOperand,
    /// A token cannot start or complete an expression here.
    #[error("unexpected token '{0}'")]
    UnknownToken(String),
    /// Operators or parentheses nest deeper than [`MAX_NESTING`].
    #[error("expression nests deeper than {MAX_NESTING} levels")]
    TooDeep,
    /// Right-hand side of `/` evaluated to zero.
    #[error("division by zero")]
    DivideByZero,
    /// Memory dereference faulted.
    #[error(transparent)]
    Memory(#[from] MemoryFault),
}

/// Tokenizer state and token buffer, reused across evaluations.
#[derive(Debug, Clone)]
pub struct ExprEngine {
    lexer: Lexer,
    tokens: Vec<Token>,
}

impl ExprEngine {
    /// Compiles the lexical rules.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if a rule fails to compile.
    pub fn new() -> Result<Self, RuleError> {
        Ok(Self {
            lexer: Lexer::new()?,
            tokens: Vec::new(),
        })
    }

    /// Tokenizes `input` into the engine's buffer and returns it.
    ///
    /// # Errors
    ///
    /// Returns the lexer's [`ExprError`] on unmatched input or limit
    /// violations.
    pub fn tokenize(&mut self, input: &str) -> Result<&[Token], ExprError> {
        self.lexer.tokenize(input, &mut self.tokens)?;
        Ok(&self.tokens)
    }

    /// Tokenizes and evaluates `input` against `target`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExprError`] for lexical failures, malformed structure,
    /// division by zero, and faulting memory dereferences.
    pub fn evaluate(&mut self, input: &str, target: &dyn Target) -> Result<SWord, ExprError> {
        self.lexer.tokenize(input, &mut self.tokens)?;
        let value = Evaluator::new(&self.tokens, target).eval(0, self.tokens.len())?;
        debug!(input, value, "evaluated expression");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ExprEngine, ExprError, Token, TokenKind, MAX_NESTING};
    use crate::{MemoryFault, RunState, StepOutcome, Target, Word};

    /// Register `i` holds `i * 16`; memory word at `addr` holds `!addr`.
    struct FakeTarget;

    impl Target for FakeTarget {
        fn register(&self, index: usize) -> Option<Word> {
            (index < 32).then(|| u32::try_from(index * 16).unwrap_or(0))
        }

        fn pc(&self) -> Word {
            0x8000_0000
        }

        fn read_memory(&self, addr: Word, width: usize) -> Result<Word, MemoryFault> {
            if addr < 0x8000_0000 {
                return Err(MemoryFault::OutOfBounds { addr, width });
            }
            Ok(!addr)
        }

        fn step(&mut self) -> StepOutcome {
            StepOutcome::Retired { pc: 0, raw: 0 }
        }

        fn run_state(&self) -> RunState {
            RunState::Stop
        }

        fn set_run_state(&mut self, _state: RunState) {}
    }

    fn eval(input: &str) -> Result<i32, ExprError> {
        ExprEngine::new()
            .expect("rules compile")
            .evaluate(input, &FakeTarget)
    }

    #[rstest]
    #[case("1+2*3", 7)]
    #[case("(1+2)*3", 9)]
    #[case("((1))", 1)]
    #[case("10/3", 3)]
    #[case("-5+3", -2)]
    #[case("--5", 5)]
    #[case("!0", 1)]
    #[case("!3", 0)]
    #[case("1==1&&2!=3", 1)]
    #[case("10-4-3", 3)]
    #[case("64/4/2", 8)]
    #[case("0 || 0", 0)]
    #[case("0 && 1 || 2", 1)]
    #[case("0x10 + 0XfF", 271)]
    #[case("-7/2", -3)]
    #[case("1 - -1", 2)]
    #[case("(2+3)*(4-1)", 15)]
    #[case("2147483647+1", i32::MIN)]
    #[case("0xffffffff", -1)]
    fn literal_expressions(#[case] input: &str, #[case] expected: i32) {
        assert_eq!(eval(input), Ok(expected));
    }

    #[rstest]
    #[case("$sp", 32)]
    #[case("a0 + 1", 161)]
    #[case("*ra", 16)]
    #[case("2 * *$t0", 160)]
    #[case("*nosuch", 0)]
    #[case("$0", 0)]
    fn register_operands(#[case] input: &str, #[case] expected: i32) {
        assert_eq!(eval(input), Ok(expected));
    }

    #[test]
    fn pc_reads_program_counter() {
        assert_eq!(eval("pc"), Ok(i32::MIN));
        assert_eq!(eval("$pc"), Ok(i32::MIN));
    }

    #[test]
    fn deref_of_expression_reads_memory() {
        assert_eq!(eval("*0x80000010"), Ok(0x7FFF_FFEF));
        assert_eq!(
            eval("*(0x10 + 0x10)"),
            Err(ExprError::Memory(MemoryFault::OutOfBounds {
                addr: 0x20,
                width: 4
            }))
        );
    }

    #[rstest]
    #[case("10/0", ExprError::DivideByZero)]
    #[case("1/(2-2)", ExprError::DivideByZero)]
    #[case("(1+2", ExprError::UnbalancedParentheses)]
    #[case("1+2)", ExprError::UnbalancedParentheses)]
    #[case("", ExprError::MissingOperand)]
    #[case("1+", ExprError::MissingOperand)]
    #[case("()", ExprError::MissingOperand)]
    #[case("nosuch", ExprError::UnknownToken("nosuch".into()))]
    #[case("1 @", ExprError::NoMatch { position: 2 })]
    fn malformed_expressions_are_typed_errors(#[case] input: &str, #[case] expected: ExprError) {
        assert_eq!(eval(input), Err(expected));
    }

    #[rstest]
    #[case("!".repeat(60_000) + "1")]
    #[case("-(".repeat(20_000) + "1" + &")".repeat(20_000))]
    #[case("*".repeat(60_000) + "0x80000000")]
    #[case("1+".repeat(30_000) + "1")]
    fn deep_nesting_is_rejected(#[case] input: String) {
        assert_eq!(eval(&input), Err(ExprError::TooDeep));
    }

    #[test]
    fn nesting_within_limit_evaluates() {
        let input = "!".repeat(MAX_NESTING - 1) + "0";
        assert_eq!(eval(&input), Ok(1));
        let input = "(".repeat(100) + "7" + &")".repeat(100);
        assert_eq!(eval(&input), Ok(7));
    }

    #[test]
    fn minus_after_register_is_unary() {
        assert!(matches!(eval("ra - 1"), Err(ExprError::UnknownToken(_))));
    }

    #[test]
    fn engine_is_reusable_after_errors() {
        let mut engine = ExprEngine::new().expect("rules compile");
        assert!(engine.evaluate("(", &FakeTarget).is_err());
        assert_eq!(engine.evaluate("6*7", &FakeTarget), Ok(42));
        assert_eq!(
            engine.tokenize("6*7").expect("tokenizes")[1],
            Token::operator(TokenKind::Mul)
        );
    }
}
