// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for condition expressions

/// A condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Comparison expression: left op right
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// A bare operand tested for truthiness
    Truthy(Operand),
    /// Logical AND
    And(Box<Expression>, Box<Expression>),
    /// Logical OR
    Or(Box<Expression>, Box<Expression>),
    /// Logical NOT
    Not(Box<Expression>),
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Dotted lookup into state, e.g. `result.score`
    Path(String),
    Literal(Literal),
}

/// Comparison operators. `Contains` tests substrings, array membership and
/// object keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl CompareOp {
    /// Source spelling of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Contains => "contains",
        }
    }

    /// Ordering comparisons only accept numbers
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte
        )
    }
}

/// Literal values in expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl Expression {
    /// Every state path the expression reads
    pub fn paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Compare { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Path(p) = operand {
                        out.push(p);
                    }
                }
            }
            Expression::Truthy(Operand::Path(p)) => out.push(p),
            Expression::Truthy(Operand::Literal(_)) => {}
            Expression::And(l, r) | Expression::Or(l, r) => {
                l.collect_paths(out);
                r.collect_paths(out);
            }
            Expression::Not(inner) => inner.collect_paths(out),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_spelling() {
        let rendered: Vec<String> = [CompareOp::NotEq, CompareOp::Lte, CompareOp::Contains]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, ["!=", "<=", "contains"]);
        assert!(CompareOp::Gt.is_ordering());
        assert!(!CompareOp::Contains.is_ordering());
    }

    #[test]
    fn test_paths_walks_whole_tree() {
        let expr = Expression::Or(
            Box::new(Expression::Compare {
                left: Operand::Path("score".into()),
                op: CompareOp::Gte,
                right: Operand::Literal(Literal::Number(70.0)),
            }),
            Box::new(Expression::Not(Box::new(Expression::Truthy(
                Operand::Path("review.pending".into()),
            )))),
        );
        assert_eq!(expr.paths(), vec!["score", "review.pending"]);
    }
}
