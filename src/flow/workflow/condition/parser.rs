//! Condition expression parser
//!
//! Parses expressions like:
//! - `stop == True`
//! - `quality_score >= 70 and iteration < max_iterations`
//! - `not (review.approved or tags contains 'skip')`
//!
//! Precedence from loosest to tightest: `or`, `and`, `not`, comparison.

use super::ast::{CompareOp, Expression, Literal, Operand};
use super::ConditionError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    Op(CompareOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

/// Parse a condition expression string into an AST
pub fn parse(input: &str) -> Result<Expression, ConditionError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ConditionError::parse(input, "empty expression"));
    }

    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(tok) = parser.peek() {
        return Err(ConditionError::parse(
            input,
            format!("unexpected token {:?}", tok),
        ));
    }
    Ok(expr)
}

fn tokenize(input: &str) -> Result<Vec<Token>, ConditionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| ConditionError::parse(input, "unterminated string"))?;
                let s: String = chars[i + 1..i + 1 + end].iter().collect();
                tokens.push(Token::Str(s));
                i += end + 2;
            }
            '=' | '!' | '<' | '>' => {
                let next = chars.get(i + 1).copied();
                let (op, width) = match (c, next) {
                    ('=', Some('=')) => (CompareOp::Eq, 2),
                    ('!', Some('=')) => (CompareOp::NotEq, 2),
                    ('>', Some('=')) => (CompareOp::Gte, 2),
                    ('<', Some('=')) => (CompareOp::Lte, 2),
                    ('>', _) => (CompareOp::Gt, 1),
                    ('<', _) => (CompareOp::Lt, 1),
                    _ => {
                        return Err(ConditionError::parse(
                            input,
                            format!("unsupported operator at position {}", i),
                        ))
                    }
                };
                tokens.push(Token::Op(op));
                i += width;
            }
            c if c.is_ascii_digit() || (c == '-' && next_is_digit(&chars, i)) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| ConditionError::parse(input, format!("bad number '{}'", text)))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "contains" => Token::Op(CompareOp::Contains),
                    _ => Token::Ident(word),
                });
            }
            other => {
                return Err(ConditionError::parse(
                    input,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn error(&self, message: impl Into<String>) -> ConditionError {
        ConditionError::parse(self.input, message)
    }

    fn parse_or(&mut self) -> Result<Expression, ConditionError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ConditionError> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, ConditionError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_not()?;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, ConditionError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let expr = self.parse_or()?;
            return match self.next() {
                Some(Token::RParen) => Ok(expr),
                _ => Err(self.error("missing closing parenthesis")),
            };
        }

        let left = self.parse_operand()?;
        match self.peek() {
            Some(Token::Op(op)) => {
                let op = *op;
                self.pos += 1;
                let right = self.parse_operand()?;
                Ok(Expression::Compare { left, op, right })
            }
            _ => Ok(Expression::Truthy(left)),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ConditionError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Operand::Literal(Literal::String(s))),
            Some(Token::Number(n)) => Ok(Operand::Literal(Literal::Number(n))),
            Some(Token::Ident(word)) => Ok(match word.as_str() {
                "true" | "True" => Operand::Literal(Literal::Boolean(true)),
                "false" | "False" => Operand::Literal(Literal::Boolean(false)),
                "null" | "None" => Operand::Literal(Literal::Null),
                _ => {
                    if word.split('.').any(str::is_empty) {
                        return Err(self.error(format!("malformed path '{}'", word)));
                    }
                    Operand::Path(word)
                }
            }),
            Some(tok) => Err(self.error(format!("expected a value, found {:?}", tok))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Operand {
        Operand::Path(p.to_string())
    }

    fn num(n: f64) -> Operand {
        Operand::Literal(Literal::Number(n))
    }

    #[test]
    fn test_parse_simple_equality() {
        let expr = parse("intent == 'search'").unwrap();
        assert_eq!(
            expr,
            Expression::Compare {
                left: path("intent"),
                op: CompareOp::Eq,
                right: Operand::Literal(Literal::String("search".to_string())),
            }
        );
    }

    #[test]
    fn test_parse_python_style_boolean() {
        let expr = parse("stop == True").unwrap();
        assert_eq!(
            expr,
            Expression::Compare {
                left: path("stop"),
                op: CompareOp::Eq,
                right: Operand::Literal(Literal::Boolean(true)),
            }
        );
    }

    #[test]
    fn test_parse_all_comparison_ops() {
        for (src, op) in [
            ("a != 1", CompareOp::NotEq),
            ("a > 1", CompareOp::Gt),
            ("a >= 1", CompareOp::Gte),
            ("a < 1", CompareOp::Lt),
            ("a <= 1", CompareOp::Lte),
            ("a contains 1", CompareOp::Contains),
        ] {
            assert_eq!(
                parse(src).unwrap(),
                Expression::Compare {
                    left: path("a"),
                    op,
                    right: num(1.0),
                },
                "{}",
                src
            );
        }
    }

    #[test]
    fn test_parse_path_on_both_sides() {
        let expr = parse("iteration >= max_iterations").unwrap();
        assert_eq!(
            expr,
            Expression::Compare {
                left: path("iteration"),
                op: CompareOp::Gte,
                right: path("max_iterations"),
            }
        );
    }

    #[test]
    fn test_parse_negative_and_decimal_numbers() {
        assert_eq!(
            parse("delta > -0.5").unwrap(),
            Expression::Compare {
                left: path("delta"),
                op: CompareOp::Gt,
                right: num(-0.5),
            }
        );
    }

    #[test]
    fn test_parse_null_aliases() {
        for src in ["error == null", "error == None"] {
            assert_eq!(
                parse(src).unwrap(),
                Expression::Compare {
                    left: path("error"),
                    op: CompareOp::Eq,
                    right: Operand::Literal(Literal::Null),
                }
            );
        }
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a or b and c").unwrap();
        assert_eq!(
            expr,
            Expression::Or(
                Box::new(Expression::Truthy(path("a"))),
                Box::new(Expression::And(
                    Box::new(Expression::Truthy(path("b"))),
                    Box::new(Expression::Truthy(path("c"))),
                )),
            )
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse("(a or b) and c").unwrap();
        assert!(matches!(expr, Expression::And(_, _)));
    }

    #[test]
    fn test_parse_not() {
        let expr = parse("not stop").unwrap();
        assert_eq!(
            expr,
            Expression::Not(Box::new(Expression::Truthy(path("stop"))))
        );
    }

    #[test]
    fn test_keywords_inside_strings_are_literal() {
        let expr = parse("note == 'this and that'").unwrap();
        assert_eq!(
            expr,
            Expression::Compare {
                left: path("note"),
                op: CompareOp::Eq,
                right: Operand::Literal(Literal::String("this and that".to_string())),
            }
        );
    }

    #[test]
    fn test_parse_double_quotes() {
        let expr = parse(r#"name == "hello""#).unwrap();
        assert_eq!(
            expr,
            Expression::Compare {
                left: path("name"),
                op: CompareOp::Eq,
                right: Operand::Literal(Literal::String("hello".to_string())),
            }
        );
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        for src in [
            "",
            "this is not valid",
            "__import__('os').system('ls')",
            "a = 1",
            "a ==",
            "(a == 1",
            "a == 'open",
            "a..b == 1",
            "len(items) > 2",
        ] {
            assert!(parse(src).is_err(), "expected parse error for {:?}", src);
        }
    }
}
