//! Expression parsing implementation
//!
//! This module handles parsing of C expressions using precedence climbing
//! for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: integers, floats, characters, strings
//! - Identifiers resolved against the open scopes
//! - Binary operators: arithmetic, shift, comparison, bitwise, logical
//! - Unary operators: `+`, `-`, `!`, `~`, `&`, `*`, `++`, `--`
//! - Postfix: `[]`, `.`, `->`, `()`, `++`, `--`
//! - Assignment and compound assignment, ternary `? :`, comma
//! - Type casts: `(type)expr`
//! - `sizeof expr` and `sizeof(type)`
//!
//! # Precedence
//!
//! Binary operators follow C precedence rules using a precedence climbing
//! algorithm; the table lives on [`BinaryOp::precedence`].
//!
//! Every node is typed as it is built (see the `typing` module).
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::lexer::token::{Keyword, LiteralKind, Punctuator, Token, TokenKind, TokenValue};
use crate::parser::ast::*;
use crate::parser::parse::{ParseError, Parser};
use crate::symbols::scope::Binding;
use crate::symbols::types::TypeSymbol;
use std::rc::Rc;

impl Parser {
    /// Parse a full expression, comma operator included.
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_assignment_expression()?;
        let Some(comma) = self.accept_punct(Punctuator::Comma)? else {
            return Ok(first);
        };

        let mut items = vec![first];
        loop {
            items.push(self.parse_assignment_expression()?);
            if !self.match_punct(Punctuator::Comma)? {
                break;
            }
        }

        let ty = match items.last() {
            Some(last) => self.value_type(&last.ty),
            None => self.builtins.void_type.clone(),
        };
        Ok(Expr::new(ExprKind::Comma(items), comma, ty))
    }

    /// Parse assignment or ternary (right-associative)
    pub(crate) fn parse_assignment_expression(&mut self) -> Result<Expr, ParseError> {
        let location = self.peek()?.location;
        self.nested("expression", location, Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_conditional_expression()?;

        let token = self.next_token()?;
        let op = match token.kind {
            TokenKind::Punctuator(punctuator) => AssignOp::from_punctuator(punctuator),
            _ => None,
        };
        let Some(op) = op else {
            self.push_back(token);
            return Ok(target);
        };

        let value = self.parse_assignment_expression()?;
        let ty = self.assignment_type(op, &target, &value, &token)?;
        Ok(Expr::new(
            ExprKind::Assignment {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            token,
            ty,
        ))
    }

    pub(crate) fn parse_conditional_expression(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_binary(0)?;
        let Some(question) = self.accept_punct(Punctuator::Question)? else {
            return Ok(condition);
        };

        let then_branch = self.parse_expression()?;
        self.expect_punct(Punctuator::Colon, "in conditional expression")?;
        let else_branch =
            self.nested("expression", question.location, Self::parse_conditional_expression)?;

        let ty = self.conditional_type(&condition, &then_branch, &else_branch, &question)?;
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            question,
            ty,
        ))
    }

    /// Precedence climbing over the binary operators binding at least as
    /// tightly as `min_precedence`.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_cast_expression()?;

        loop {
            let token = self.next_token()?;
            let op = match token.kind {
                TokenKind::Punctuator(punctuator) => BinaryOp::from_punctuator(punctuator),
                _ => None,
            };
            let Some(op) = op.filter(|op| op.precedence() >= min_precedence) else {
                self.push_back(token);
                return Ok(lhs);
            };

            let rhs = self.parse_binary(op.precedence() + 1)?;
            let ty = self.binary_type(op, &lhs, &rhs, &token)?;
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                token,
                ty,
            );
        }
    }

    /// Whether the next two tokens are `(` and the start of a type name.
    fn at_parenthesized_type(&mut self) -> Result<bool, ParseError> {
        if !self.check_punct(Punctuator::LParen)? {
            return Ok(false);
        }
        let second = self.peek_second()?;
        Ok(self.is_type_specifier(&second))
    }

    fn parse_cast_expression(&mut self) -> Result<Expr, ParseError> {
        if !self.at_parenthesized_type()? {
            return self.parse_unary_expression();
        }

        let open = self.next_token()?;
        let target = self.parse_type_name(open.clone())?;
        self.expect_rparen("after type name")?;
        let operand = self.nested("expression", open.location, Self::parse_cast_expression)?;

        self.cast_check(&target.ty, &operand, &open)?;
        let ty = TypeSymbol::unqualified(&target.ty);
        Ok(Expr::new(
            ExprKind::Cast {
                target: Box::new(target),
                operand: Box::new(operand),
            },
            open,
            ty,
        ))
    }

    /// Parse a type name (specifiers plus an abstract declarator).
    pub(crate) fn parse_type_name(&mut self, token: Token) -> Result<Expr, ParseError> {
        let Some(spec) = self.parse_specifiers()? else {
            let found = self.peek()?;
            return Err(ParseError::syntax(
                format!("Expected type name, found {}", found),
                found.location,
            ));
        };
        if spec.is_typedef {
            return Err(ParseError::syntax(
                "storage class 'typedef' in type name",
                spec.token.location,
            ));
        }

        let declarator = self.parse_declarator(true)?;
        if let Some(name) = &declarator.name {
            return Err(ParseError::syntax(
                format!("unexpected identifier '{}' in type name", name.text),
                name.location,
            ));
        }

        let ty = self.apply_declarator(&spec.ty, declarator.chain, spec.token.location)?;
        Ok(Expr::new(ExprKind::TypeName, token, ty))
    }

    fn parse_unary_expression(&mut self) -> Result<Expr, ParseError> {
        let location = self.peek()?.location;
        self.nested("expression", location, Self::parse_unary)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let token = self.next_token()?;

        let op = match token.kind {
            TokenKind::Punctuator(Punctuator::PlusPlus) => UnaryOp::PreIncrement,
            TokenKind::Punctuator(Punctuator::MinusMinus) => UnaryOp::PreDecrement,
            TokenKind::Punctuator(Punctuator::Plus) => UnaryOp::Plus,
            TokenKind::Punctuator(Punctuator::Minus) => UnaryOp::Minus,
            TokenKind::Punctuator(Punctuator::Bang) => UnaryOp::Not,
            TokenKind::Punctuator(Punctuator::Tilde) => UnaryOp::BitNot,
            TokenKind::Punctuator(Punctuator::Amp) => UnaryOp::AddressOf,
            TokenKind::Punctuator(Punctuator::Star) => UnaryOp::Deref,
            TokenKind::Keyword(Keyword::Sizeof) => return self.parse_sizeof(token),
            _ => {
                self.push_back(token);
                return self.parse_postfix_expression();
            }
        };

        // ++/-- bind to a unary expression, the rest to a cast expression.
        let operand = match op {
            UnaryOp::PreIncrement | UnaryOp::PreDecrement => self.parse_unary_expression()?,
            _ => self.parse_cast_expression()?,
        };
        self.unary(op, operand, token)
    }

    fn parse_sizeof(&mut self, token: Token) -> Result<Expr, ParseError> {
        let operand = if self.at_parenthesized_type()? {
            let open = self.next_token()?;
            let operand = self.parse_type_name(open)?;
            self.expect_rparen("after type name")?;
            operand
        } else {
            self.parse_unary_expression()?
        };
        self.unary(UnaryOp::Sizeof, operand, token)
    }

    fn unary(&self, op: UnaryOp, operand: Expr, token: Token) -> Result<Expr, ParseError> {
        let ty = self.unary_type(op, &operand, &token)?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            token,
            ty,
        ))
    }

    fn parse_postfix_expression(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            let token = self.next_token()?;
            expr = match token.kind {
                TokenKind::Punctuator(Punctuator::LBracket) => {
                    let index = self.parse_expression()?;
                    self.expect_punct(Punctuator::RBracket, "after array subscript")?;
                    let ty = self.subscript_type(&expr, &index, &token)?;
                    Expr::new(
                        ExprKind::Subscript {
                            array: Box::new(expr),
                            index: Box::new(index),
                        },
                        token,
                        ty,
                    )
                }
                TokenKind::Punctuator(Punctuator::LParen) => {
                    let arguments = self.parse_argument_list()?;
                    let ty = self.call_type(&expr, &arguments, &token)?;
                    Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            arguments,
                        },
                        token,
                        ty,
                    )
                }
                TokenKind::Punctuator(punctuator @ (Punctuator::Dot | Punctuator::Arrow)) => {
                    let arrow = punctuator == Punctuator::Arrow;
                    let ctx = format!("after '{}'", token.text);
                    let name = self.expect_identifier(&ctx)?;
                    let (member, ty) = self.resolve_member(&expr, &name, arrow)?;
                    Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            member,
                            arrow,
                        },
                        token,
                        ty,
                    )
                }
                TokenKind::Punctuator(Punctuator::PlusPlus) => self.unary(UnaryOp::PostIncrement, expr, token)?,
                TokenKind::Punctuator(Punctuator::MinusMinus) => {
                    self.unary(UnaryOp::PostDecrement, expr, token)?
                }
                _ => {
                    self.push_back(token);
                    return Ok(expr);
                }
            };
        }
    }

    /// Parse call arguments after the opening parenthesis.
    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut arguments = Vec::new();
        if self.match_punct(Punctuator::RParen)? {
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_assignment_expression()?);
            if !self.match_punct(Punctuator::Comma)? {
                break;
            }
        }
        self.expect_rparen("after argument list")?;
        Ok(arguments)
    }

    fn parse_primary_expression(&mut self) -> Result<Expr, ParseError> {
        let token = self.next_token()?;

        match token.kind {
            TokenKind::Identifier => match self.scopes.resolve(&token.text) {
                Some(Binding::Variable(variable)) => {
                    let ty = variable.ty.clone();
                    Ok(Expr::new(ExprKind::Identifier(variable), token, ty))
                }
                Some(Binding::Type(_)) => Err(ParseError::syntax(
                    format!("unexpected type name '{}'", token.text),
                    token.location,
                )),
                None => Err(ParseError::syntax(
                    format!("undeclared identifier '{}'", token.text),
                    token.location,
                )),
            },
            TokenKind::Literal(kind) => {
                let ty = match kind {
                    LiteralKind::Char => self.builtins.char_type.clone(),
                    LiteralKind::Int => self.builtins.int_type.clone(),
                    LiteralKind::Float => self.builtins.float_type.clone(),
                    LiteralKind::String => {
                        let length = match &token.value {
                            TokenValue::Bytes(bytes) => bytes.len(),
                            _ => 0,
                        };
                        Rc::new(TypeSymbol::Array {
                            element: self.builtins.char_type.clone(),
                            size: Some(length + 1),
                        })
                    }
                };
                Ok(Expr::new(ExprKind::Literal, token, ty))
            }
            TokenKind::Punctuator(Punctuator::LParen) => {
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                Ok(expr)
            }
            _ => Err(ParseError::syntax(
                format!("Expected expression, found {}", token),
                token.location,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::{Expr, StatementKind};
    use crate::parser::parse::{ParseError, Parser, TranslationUnit};

    fn parse(source: &str) -> Result<TranslationUnit, ParseError> {
        Parser::new(source.as_bytes()).parse_translation_unit()
    }

    /// Parse `int f(...) { <body> }` and render the first expression
    /// statement of the body.
    fn render(params: &str, expression: &str) -> String {
        let source = format!("int f({}) {{ {}; return 0; }}", params, expression);
        let unit = parse(&source).unwrap_or_else(|e| panic!("{}: {}", source, e));
        let f = unit.function("f").unwrap();
        let function = f.ty.as_function().unwrap();
        let body = function.body().unwrap();
        let first = body.sub_statements()[0];
        match &first.kind {
            StatementKind::Expression(Some(expr)) => expr.to_string(),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    fn initializer_type(source: &str, name: &str) -> String {
        let unit = parse(source).unwrap();
        let variable = unit.variable(name).unwrap();
        let expr: &Expr = &variable.initializer[0];
        expr.ty.qualified_name()
    }

    #[test]
    fn test_binary_precedence() {
        assert_eq!(render("int a, int b", "a + b * 2"), "(+ a (* b 2))");
        assert_eq!(render("int a, int b", "a * b + 2"), "(+ (* a b) 2)");
        assert_eq!(render("int a, int b", "a < b == b > a"), "(== (< a b) (> b a))");
        assert_eq!(render("int a, int b", "a || b && a | b"), "(|| a (&& b (| a b)))");
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(render("int a, int b", "a - b - 1"), "(- (- a b) 1)");
        assert_eq!(render("int a", "a / 2 % 3"), "(% (/ a 2) 3)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(render("int a, int b", "a = b = 3"), "(= a (= b 3))");
        assert_eq!(render("int a", "a += 2"), "(+= a 2)");
    }

    #[test]
    fn test_conditional_and_comma() {
        assert_eq!(render("int a, int b", "a ? b : a ? 1 : 2"), "(? a b (? a 1 2))");
        assert_eq!(render("int a, int b", "a = 1, b = 2"), "(, (= a 1) (= b 2))");
    }

    #[test]
    fn test_unary_and_postfix() {
        assert_eq!(render("int *p", "*p++"), "(* (post++ p))");
        assert_eq!(render("int *p", "-*p"), "(- (* p))");
        assert_eq!(render("int a", "!~a"), "(! (~ a))");
        assert_eq!(render("int a", "++a"), "(++ a)");
    }

    #[test]
    fn test_calls_and_members() {
        let params = "struct p { int x; } *s, int (*g)(int)";
        assert_eq!(render(params, "g(s->x)"), "(call g (-> s x))");
        assert_eq!(render("int *a", "a[1]"), "([] a 1)");
    }

    #[test]
    fn test_casts_and_sizeof() {
        assert_eq!(render("int a", "(char)a"), "(cast <char> a)");
        assert_eq!(render("int a", "sizeof(int)"), "(sizeof <int>)");
        assert_eq!(render("int a", "sizeof a"), "(sizeof a)");
    }

    #[test]
    fn test_children_in_source_order() {
        let unit = parse("int g(int, int); int x = g(1, 2) ? 3 : 4;").unwrap();
        let x = unit.variable("x").unwrap();
        let rendered: Vec<_> = x.initializer[0].children().iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered, vec!["(call g 1 2)", "3", "4"]);
    }

    #[test]
    fn test_parentheses_group() {
        assert_eq!(render("int a, int b", "(a + b) * 2"), "(* (+ a b) 2)");
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(initializer_type("int x = 'a';", "x"), "char");
        assert_eq!(initializer_type("float x = 1.5;", "x"), "float");
        assert_eq!(initializer_type("char *s = \"abc\";", "s"), "array of 4 char");
    }

    #[test]
    fn test_expression_result_types() {
        assert_eq!(initializer_type("char c; int x = c + c;", "x"), "int");
        assert_eq!(initializer_type("float f; float x = f * 2;", "x"), "float");
        assert_eq!(initializer_type("int a[3]; int *p = a + 1;", "p"), "pointer to int");
        assert_eq!(initializer_type("int a; int x = a < 2;", "x"), "int");
    }

    #[test]
    fn test_undeclared_identifier() {
        let err = parse("int f(void) { return y; }").unwrap_err();
        assert_eq!(err.message(), "undeclared identifier 'y'");
    }

    #[test]
    fn test_type_name_in_expression() {
        let err = parse("typedef int T; int f(void) { return T; }").unwrap_err();
        assert_eq!(err.message(), "unexpected type name 'T'");
    }

    #[test]
    fn test_missing_operand() {
        let err = parse("int x = 1 + ;").unwrap_err();
        assert_eq!(err.message(), "Expected expression, found ';'");
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let deep = format!("int x = {}1{};", "(".repeat(20000), ")".repeat(20000));
        let err = parse(&deep).unwrap_err();
        assert_eq!(err.message(), "expression nested too deeply");

        let unary = format!("int x = {}1;", "- ".repeat(20000));
        assert_eq!(parse(&unary).unwrap_err().message(), "expression nested too deeply");

        let shallow = format!("int x = {}1{};", "(".repeat(40), ")".repeat(40));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn test_variable_visible_after_initializer() {
        let err = parse("int f(void) { int y = y; return 0; }").unwrap_err();
        assert_eq!(err.message(), "undeclared identifier 'y'");
    }
}
