//! Recursive evaluation over token ranges.
//!
//! Every call re-scans its `[left, right)` range for the controlling operator;
//! no parse tree is built.

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use super::token::{Token, TokenKind};
use super::{ExprError, MAX_NESTING};
use crate::memory::WORD_ACCESS_BYTES;
use crate::registers::register_index;
use crate::{SWord, Target, Word};

pub(super) struct Evaluator<'a> {
    tokens: &'a [Token],
    target: &'a dyn Target,
}

impl<'a> Evaluator<'a> {
    pub(super) const fn new(tokens: &'a [Token], target: &'a dyn Target) -> Self {
        Self { tokens, target }
    }

    pub(super) fn eval(&self, left: usize, right: usize) -> Result<SWord, ExprError> {
        self.eval_nested(left, right, 0)
    }

    /// `depth` counts the enclosing sub-ranges; it bounds native recursion.
    fn eval_nested(&self, left: usize, right: usize, depth: usize) -> Result<SWord, ExprError> {
        if depth >= MAX_NESTING {
            return Err(ExprError::TooDeep);
        }
        if left >= right {
            return Err(ExprError::MissingOperand);
        }
        if right - left == 1 {
            return self.operand(&self.tokens[left]);
        }
        let depth = depth + 1;
        if self.wrapped_in_parens(left, right)? {
            return self.eval_nested(left + 1, right - 1, depth);
        }

        if let Some(op) = self.main_operator(left, right)? {
            let lhs = self.eval_nested(left, op, depth)?;
            let rhs = self.eval_nested(op + 1, right, depth)?;
            return apply_binary(self.tokens[op].kind, lhs, rhs);
        }

        self.unary(left, right, depth)
    }

    fn operand(&self, token: &Token) -> Result<SWord, ExprError> {
        match token.kind {
            TokenKind::Decimal => Ok(parse_decimal(&token.text) as SWord),
            TokenKind::Hex => Ok(parse_hex(&token.text) as SWord),
            TokenKind::Identifier => self
                .register(&token.text)
                .map(|value| value as SWord)
                .ok_or_else(|| ExprError::UnknownToken(token.text.clone())),
            _ => Err(ExprError::MissingOperand),
        }
    }

    fn register(&self, name: &str) -> Option<Word> {
        if name == "pc" || name == "$pc" {
            return Some(self.target.pc());
        }
        register_index(name).and_then(|index| self.target.register(index))
    }

    /// `true` when one parenthesised group spans the whole range.
    fn wrapped_in_parens(&self, left: usize, right: usize) -> Result<bool, ExprError> {
        if self.tokens[left].kind != TokenKind::LParen
            || self.tokens[right - 1].kind != TokenKind::RParen
        {
            return Ok(false);
        }
        let mut depth = 0_usize;
        for (offset, token) in self.tokens[left..right].iter().enumerate() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or(ExprError::UnbalancedParentheses)?;
                    if depth == 0 && left + offset != right - 1 {
                        return Ok(false);
                    }
                }
                _ => {}
            }
        }
        if depth == 0 {
            Ok(true)
        } else {
            Err(ExprError::UnbalancedParentheses)
        }
    }

    /// Rightmost loosest-binding binary operator at nesting depth zero.
    fn main_operator(&self, left: usize, right: usize) -> Result<Option<usize>, ExprError> {
        let mut depth = 0_usize;
        let mut floor = u8::MAX;
        let mut best = None;

        for index in left..right {
            let kind = self.tokens[index].kind;
            match kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or(ExprError::UnbalancedParentheses)?;
                }
                _ if depth == 0 => {
                    if let Some(precedence) = kind.precedence() {
                        if precedence <= floor {
                            floor = precedence;
                            best = Some(index);
                        }
                    }
                }
                _ => {}
            }
        }

        if depth == 0 {
            Ok(best)
        } else {
            Err(ExprError::UnbalancedParentheses)
        }
    }

    fn unary(&self, left: usize, right: usize, depth: usize) -> Result<SWord, ExprError> {
        let head = &self.tokens[left];
        match head.kind {
            TokenKind::UnaryMinus if self.tokens[left + 1].kind == TokenKind::UnaryMinus => {
                self.eval_nested(left + 2, right, depth)
            }
            TokenKind::UnaryMinus => Ok(self.eval_nested(left + 1, right, depth)?.wrapping_neg()),
            TokenKind::Not => Ok(SWord::from(self.eval_nested(left + 1, right, depth)? == 0)),
            TokenKind::Deref => self.deref(left + 1, right, depth),
            _ => Err(ExprError::UnknownToken(describe(head))),
        }
    }

    fn deref(&self, left: usize, right: usize, depth: usize) -> Result<SWord, ExprError> {
        let operand = &self.tokens[left];
        if right - left == 1 && operand.kind == TokenKind::Identifier {
            // Unknown register names read as zero.
            return Ok(self.register(&operand.text).unwrap_or(0) as SWord);
        }
        let addr = self.eval_nested(left, right, depth)? as Word;
        let value = self.target.read_memory(addr, WORD_ACCESS_BYTES)?;
        Ok(value as SWord)
    }
}

fn apply_binary(kind: TokenKind, lhs: SWord, rhs: SWord) -> Result<SWord, ExprError> {
    let value = match kind {
        TokenKind::Add => lhs.wrapping_add(rhs),
        TokenKind::Sub => lhs.wrapping_sub(rhs),
        TokenKind::Mul => lhs.wrapping_mul(rhs),
        TokenKind::Div => {
            if rhs == 0 {
                return Err(ExprError::DivideByZero);
            }
            lhs.wrapping_div(rhs)
        }
        TokenKind::Eq => SWord::from(lhs == rhs),
        TokenKind::Neq => SWord::from(lhs != rhs),
        TokenKind::And => SWord::from(lhs != 0 && rhs != 0),
        TokenKind::Or => SWord::from(lhs != 0 || rhs != 0),
        _ => return Err(ExprError::MissingOperand),
    };
    Ok(value)
}

fn parse_decimal(text: &str) -> Word {
    text.bytes().fold(0, |acc: Word, digit| {
        acc.wrapping_mul(10).wrapping_add(Word::from(digit - b'0'))
    })
}

fn parse_hex(text: &str) -> Word {
    text.bytes().skip(2).fold(0, |acc: Word, digit| {
        let nibble = match digit {
            b'0'..=b'9' => digit - b'0',
            b'a'..=b'f' => digit - b'a' + 10,
            _ => digit - b'A' + 10,
        };
        (acc << 4) | Word::from(nibble)
    })
}

fn describe(token: &Token) -> String {
    if token.text.is_empty() {
        format!("{:?}", token.kind)
    } else {
        token.text.clone()
    }
}
