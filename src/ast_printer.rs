use crate::ast::{Expr, LiteralValue};

/// Renders an expression in parenthesised prefix (Polish) form:
/// `(* (- 123.0) (group 45.67))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr<'_>) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => literal(lit),

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            // ── names, calls, properties ────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.into(),

            Expr::This { .. } => "this".into(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),
        }
    }
}

/// Renders an expression in postfix (reverse Polish) form. Grouping leaves
/// no trace: `(1 + 2) * (4 - 3)` prints as `1.0 2.0 + 4.0 3.0 - *`.
pub struct RpnPrinter;

impl RpnPrinter {
    pub fn print(expr: &Expr<'_>) -> String {
        match expr {
            Expr::Literal(lit) => literal(lit),

            Expr::Grouping(inner) => Self::print(inner),

            Expr::Unary { operator, right } => {
                format!("{} {}", Self::print(right), operator.lexeme)
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "{} {} {}",
                Self::print(left),
                Self::print(right),
                operator.lexeme
            ),

            Expr::Variable { name, .. } => name.lexeme.into(),

            Expr::This { .. } => "this".into(),

            Expr::Assign { name, value, .. } => format!("{} {} =", Self::print(value), name.lexeme),

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut parts: Vec<String> = arguments.iter().map(Self::print).collect();
                parts.push(Self::print(callee));
                parts.push(format!("call/{}", arguments.len()));
                parts.join(" ")
            }

            Expr::Get { object, name } => format!("{} .{}", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "{} {} .{} =",
                Self::print(value),
                Self::print(object),
                name.lexeme
            ),
        }
    }
}

fn literal(lit: &LiteralValue) -> String {
    match lit {
        LiteralValue::True => "true".into(),

        LiteralValue::False => "false".into(),

        LiteralValue::Nil => "nil".into(),

        LiteralValue::Str(s) => s.clone(),

        LiteralValue::Number(n) => {
            if n.fract() == 0.0 {
                // 3.0 → "3.0"
                format!("{:.1}", n)
            } else {
                n.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;
    use crate::token::Token;

    fn tokens(src: &str) -> Vec<Token<'_>> {
        let (tokens, errors) = Scanner::new(src).scan_all();
        assert!(errors.is_empty(), "{:?}", errors);
        tokens
    }

    #[test]
    fn prefix_form() {
        let toks = tokens("-123 * (45.67)");
        let expr = Parser::new(&toks).parse_expression().unwrap();
        assert_eq!(AstPrinter::print(&expr), "(* (- 123.0) (group 45.67))");
    }

    #[test]
    fn postfix_form_drops_grouping() {
        let toks = tokens("(1 + 2) * (4 - 3)");
        let expr = Parser::new(&toks).parse_expression().unwrap();
        assert_eq!(RpnPrinter::print(&expr), "1.0 2.0 + 4.0 3.0 - *");
    }

    #[test]
    fn calls_and_properties() {
        let toks = tokens("a.b(1, c) or (x = 2)");
        let expr = Parser::new(&toks).parse_expression().unwrap();
        assert_eq!(
            AstPrinter::print(&expr),
            "(or (call (. a b) 1.0 c) (group (= x 2.0)))"
        );
        assert_eq!(RpnPrinter::print(&expr), "1.0 c a .b call/2 2.0 x = or");
    }
}
