//! Size-expression evaluation
//!
//! Kernel configs give every buffer size as an arithmetic expression over
//! three symbols derived from the encoded matrix: `v_MWidthC_1` (declared
//! width), `v_MHeight_2` (declared height), `v_VLength_3` (vector length).
//! Arithmetic is carried out in f64 and truncated to an integer byte
//! count, matching the expression engine the kernel generator targets.

use crate::error::{Error, Result};

/// The three size symbols in scope for every expression.
#[derive(Debug, Clone, Copy)]
pub struct SizeScope {
    /// `v_MWidthC_1` — encoded matrix width
    pub m_width_c: i64,
    /// `v_MHeight_2` — encoded matrix height
    pub m_height: i64,
    /// `v_VLength_3` — logical vector length
    pub v_length: i64,
}

impl SizeScope {
    fn lookup(&self, name: &str) -> Option<f64> {
        match name {
            "v_MWidthC_1" => Some(self.m_width_c as f64),
            "v_MHeight_2" => Some(self.m_height as f64),
            "v_VLength_3" => Some(self.v_length as f64),
            _ => None,
        }
    }
}

/// Evaluate a size expression to an integer byte count.
///
/// Supports `+ - * /`, unary minus, parentheses, and numeric literals.
///
/// # Errors
///
/// Returns [`Error::Expr`] for unknown symbols or malformed syntax.
pub fn evaluate(expr: &str, scope: &SizeScope) -> Result<i64> {
    let mut parser = Parser {
        expr,
        tokens: tokenize(expr)?,
        pos: 0,
        scope,
    };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::expr(expr, "trailing tokens after expression"));
    }
    Ok(value as i64)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Symbol(String),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &expr[start..end];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| Error::expr(expr, format!("bad number '{text}'")))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Symbol(expr[start..end].to_string()));
            }
            other => {
                return Err(Error::expr(expr, format!("unexpected character '{other}'")));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    expr: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    scope: &'a SizeScope,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expression(&mut self) -> Result<f64> {
        let mut acc = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    acc += self.term()?;
                }
                Token::Minus => {
                    self.pos += 1;
                    acc -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<f64> {
        let mut acc = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.pos += 1;
                    acc *= self.factor()?;
                }
                Token::Slash => {
                    self.pos += 1;
                    acc /= self.factor()?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<f64> {
        match self.advance() {
            Some(Token::Number(v)) => Ok(v),
            Some(Token::Symbol(name)) => self
                .scope
                .lookup(&name)
                .ok_or_else(|| Error::expr(self.expr, format!("unknown symbol '{name}'"))),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::Open) => {
                let inner = self.expression()?;
                match self.advance() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(Error::expr(self.expr, "missing closing parenthesis")),
                }
            }
            other => Err(Error::expr(
                self.expr,
                format!("expected a value, found {other:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: SizeScope = SizeScope {
        m_width_c: 16,
        m_height: 128,
        v_length: 100,
    };

    #[test]
    fn literals_and_precedence() {
        assert_eq!(evaluate("4", &SCOPE).unwrap(), 4);
        assert_eq!(evaluate("2 + 3 * 4", &SCOPE).unwrap(), 14);
        assert_eq!(evaluate("(2 + 3) * 4", &SCOPE).unwrap(), 20);
    }

    #[test]
    fn symbols_resolve_from_scope() {
        assert_eq!(evaluate("v_MWidthC_1 * v_MHeight_2 * 4", &SCOPE).unwrap(), 8192);
        assert_eq!(evaluate("v_VLength_3 * 4", &SCOPE).unwrap(), 400);
    }

    #[test]
    fn division_truncates_like_the_original() {
        // f64 arithmetic, truncated at the end
        assert_eq!(evaluate("v_VLength_3 / 8", &SCOPE).unwrap(), 12);
    }

    #[test]
    fn unary_minus() {
        assert_eq!(evaluate("-(2 - 5)", &SCOPE).unwrap(), 3);
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let err = evaluate("v_Bogus_9 * 4", &SCOPE).unwrap_err();
        assert!(matches!(err, Error::Expr { .. }));
    }

    #[test]
    fn malformed_syntax_is_an_error() {
        assert!(evaluate("4 +", &SCOPE).is_err());
        assert!(evaluate("(4", &SCOPE).is_err());
        assert!(evaluate("4 5", &SCOPE).is_err());
    }
}
