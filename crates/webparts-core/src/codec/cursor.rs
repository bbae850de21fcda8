//! Positional walk over decoded tokens.

use smol_str::SmolStr;

use super::token::Token;
use crate::error::DecodeError;
use crate::value::PropertyValue;

/// Consumes tokens in exactly the order the writer emitted them.
pub(crate) struct TokenCursor {
    tokens: std::vec::IntoIter<Token>,
    position: usize,
}

impl TokenCursor {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            position: 0,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn next(&mut self, expected: &'static str) -> Result<Token, DecodeError> {
        let token = self.tokens.next().ok_or(DecodeError::MissingToken {
            position: self.position,
            expected,
        })?;
        self.position += 1;
        Ok(token)
    }

    pub(crate) fn unexpected(&self, expected: &'static str, found: &Token) -> DecodeError {
        DecodeError::UnexpectedToken {
            position: self.position.saturating_sub(1),
            expected,
            found: found.kind(),
        }
    }

    pub(crate) fn value(&mut self, expected: &'static str) -> Result<PropertyValue, DecodeError> {
        match self.next(expected)? {
            Token::Value(value) => Ok(value),
            other => Err(self.unexpected(expected, &other)),
        }
    }

    pub(crate) fn int(&mut self, expected: &'static str) -> Result<i32, DecodeError> {
        match self.next(expected)? {
            Token::Value(PropertyValue::Int(value)) => Ok(value),
            other => Err(self.unexpected(expected, &other)),
        }
    }

    /// A non-negative element count.
    pub(crate) fn count(&mut self, what: &'static str) -> Result<usize, DecodeError> {
        let count = self.int(what)?;
        usize::try_from(count).map_err(|_| DecodeError::NegativeCount { what, count })
    }

    pub(crate) fn bool(&mut self, expected: &'static str) -> Result<bool, DecodeError> {
        match self.next(expected)? {
            Token::Value(PropertyValue::Bool(value)) => Ok(value),
            other => Err(self.unexpected(expected, &other)),
        }
    }

    pub(crate) fn string(&mut self, expected: &'static str) -> Result<SmolStr, DecodeError> {
        match self.next(expected)? {
            Token::Value(PropertyValue::String(value)) => Ok(value),
            other => Err(self.unexpected(expected, &other)),
        }
    }

    pub(crate) fn name(&mut self, expected: &'static str) -> Result<SmolStr, DecodeError> {
        match self.next(expected)? {
            Token::Name(name) => Ok(name),
            other => Err(self.unexpected(expected, &other)),
        }
    }
}
