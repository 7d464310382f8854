//! Statement parsing implementation
//!
//! This module handles parsing of all supported C statement types:
//!
//! - Compound statements: `{ ... }` with their own block scope
//! - Declarations inside blocks, kept in order with the statements
//! - Control flow: `if`/`else`, `while`, `do`/`while`, `for`
//! - Jump statements: `return`, `break`, `continue`
//! - Expression statements and the empty statement `;`
//!
//! # Grammar
//!
//! ```text
//! statement ::= compound | ";" | expr ";" | if_stmt | while_stmt
//!             | do_while_stmt | for_stmt | return_stmt
//!             | "break" ";" | "continue" ";"
//! compound  ::= "{" ( declaration | statement )* "}"
//! for_stmt  ::= "for" "(" ( declaration | expr? ";" ) expr? ";" expr? ")" statement
//! ```
//!
//! `break` and `continue` record the [`LoopId`] of the innermost enclosing
//! loop; [`Statement::find_loop`] maps it back to the loop node.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::lexer::token::{Keyword, Punctuator, Token, TokenKind};
use crate::parser::ast::*;
use crate::parser::parse::{ParseError, Parser};
use crate::symbols::scope::ScopeKind;

impl Parser {
    /// Parse `{ ... }`. The block's scope is stored in the node.
    pub(crate) fn parse_compound_statement(&mut self) -> Result<Statement, ParseError> {
        let open = self.expect_punct(Punctuator::LBrace, "to open block")?;
        self.scopes.push(ScopeKind::Block);

        let mut statements = Vec::new();
        loop {
            let token = self.peek()?;
            if token.is_punctuator(Punctuator::RBrace) || token.is_eof() {
                break;
            }
            statements.push(self.parse_block_item()?);
        }
        self.expect_punct(Punctuator::RBrace, "after block")?;

        let scope = self.scopes.pop();
        Ok(Statement::new(StatementKind::Compound { scope, statements }, open))
    }

    fn parse_block_item(&mut self) -> Result<Statement, ParseError> {
        if self.is_declaration_start()? {
            let token = self.peek()?;
            let variables = self.parse_declaration()?;
            return Ok(Statement::new(StatementKind::Declaration(variables), token));
        }
        self.parse_statement()
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.peek()?.location;
        self.nested("statement", location, Self::parse_inner_statement)
    }

    fn parse_inner_statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.next_token()?;

        match token.kind {
            TokenKind::Punctuator(Punctuator::LBrace) => {
                self.push_back(token);
                self.parse_compound_statement()
            }
            TokenKind::Punctuator(Punctuator::Semicolon) => Ok(Statement::new(StatementKind::Expression(None), token)),
            TokenKind::Keyword(Keyword::If) => self.parse_if(token),
            TokenKind::Keyword(Keyword::While) => self.parse_while(token),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while(token),
            TokenKind::Keyword(Keyword::For) => self.parse_for(token),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(token),
            TokenKind::Keyword(Keyword::Break) => {
                let target = self.enclosing_loop(&token)?;
                self.expect_semicolon("after 'break'")?;
                Ok(Statement::new(StatementKind::Break { target }, token))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let target = self.enclosing_loop(&token)?;
                self.expect_semicolon("after 'continue'")?;
                Ok(Statement::new(StatementKind::Continue { target }, token))
            }
            TokenKind::Keyword(keyword @ (Keyword::Switch | Keyword::Case | Keyword::Default | Keyword::Goto)) => {
                Err(ParseError::syntax(
                    format!("unsupported keyword '{}'", keyword.as_str()),
                    token.location,
                ))
            }
            _ => {
                self.push_back(token.clone());
                let expr = self.parse_expression()?;
                self.expect_semicolon("after expression")?;
                Ok(Statement::new(StatementKind::Expression(Some(expr)), token))
            }
        }
    }

    fn enclosing_loop(&self, token: &Token) -> Result<LoopId, ParseError> {
        self.loops.last().copied().ok_or_else(|| {
            ParseError::syntax(
                format!("{} statement not within loop", token.text),
                token.location,
            )
        })
    }

    /// Parse `( condition )` for `if`, `while`, and `do`.
    fn parse_condition(&mut self, keyword: &str) -> Result<Expr, ParseError> {
        self.expect_lparen(&format!("after '{}'", keyword))?;
        let condition = self.parse_expression()?;
        self.check_scalar(&condition, &format!("'{}' condition", keyword))?;
        self.expect_rparen(&format!("after '{}' condition", keyword))?;
        Ok(condition)
    }

    /// Parse a loop body with `id` as the innermost loop.
    fn parse_loop_body(&mut self, id: LoopId) -> Result<Statement, ParseError> {
        self.loops.push(id);
        let body = self.parse_statement();
        self.loops.pop();
        body
    }

    fn parse_if(&mut self, token: Token) -> Result<Statement, ParseError> {
        let condition = self.parse_condition("if")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_keyword(Keyword::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::new(
            StatementKind::Selection {
                condition,
                then_branch,
                else_branch,
            },
            token,
        ))
    }

    fn parse_while(&mut self, token: Token) -> Result<Statement, ParseError> {
        let id = self.new_loop_id();
        let condition = self.parse_condition("while")?;
        let body = Box::new(self.parse_loop_body(id)?);
        Ok(Statement::new(StatementKind::While { id, condition, body }, token))
    }

    fn parse_do_while(&mut self, token: Token) -> Result<Statement, ParseError> {
        let id = self.new_loop_id();
        let body = Box::new(self.parse_loop_body(id)?);

        if !self.match_keyword(Keyword::While)? {
            let found = self.next_token()?;
            return Err(ParseError::syntax(
                format!("Expected 'while' after 'do' body, found {}", found),
                found.location,
            ));
        }
        let condition = self.parse_condition("while")?;
        self.expect_semicolon("after 'do' statement")?;

        Ok(Statement::new(StatementKind::Do { id, body, condition }, token))
    }

    /// The `for` header gets its own Loop scope so a declaration in the
    /// initializer is visible in the condition, step, and body only.
    fn parse_for(&mut self, token: Token) -> Result<Statement, ParseError> {
        let id = self.new_loop_id();
        self.expect_lparen("after 'for'")?;
        self.scopes.push(ScopeKind::Loop);

        let init = if self.match_punct(Punctuator::Semicolon)? {
            None
        } else if self.is_declaration_start()? {
            let start = self.peek()?;
            let variables = self.parse_declaration()?;
            Some(Box::new(Statement::new(StatementKind::Declaration(variables), start)))
        } else {
            let start = self.peek()?;
            let expr = self.parse_expression()?;
            self.expect_semicolon("after 'for' initializer")?;
            Some(Box::new(Statement::new(StatementKind::Expression(Some(expr)), start)))
        };

        let condition = if self.check_punct(Punctuator::Semicolon)? {
            None
        } else {
            let condition = self.parse_expression()?;
            self.check_scalar(&condition, "'for' condition")?;
            Some(condition)
        };
        self.expect_semicolon("after 'for' condition")?;

        let step = if self.check_punct(Punctuator::RParen)? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_rparen("after 'for' clauses")?;

        let body = Box::new(self.parse_loop_body(id)?);
        let scope = self.scopes.pop();

        Ok(Statement::new(
            StatementKind::For {
                id,
                scope,
                init,
                condition,
                step,
                body,
            },
            token,
        ))
    }

    fn parse_return(&mut self, token: Token) -> Result<Statement, ParseError> {
        let value = if self.check_punct(Punctuator::Semicolon)? {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if let (Some(value), Some(return_type)) = (&value, &self.return_type) {
            if return_type.is_void() {
                return Err(ParseError::syntax(
                    "'return' with a value, in function returning void",
                    token.location,
                ));
            }
            self.check_assignable(return_type, value, "return")?;
        }
        self.expect_semicolon("after return statement")?;

        Ok(Statement::new(StatementKind::Return(value), token))
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::{Statement, StatementKind};
    use crate::parser::parse::{ParseError, Parser, TranslationUnit};

    fn parse(source: &str) -> Result<TranslationUnit, ParseError> {
        Parser::new(source.as_bytes()).parse_translation_unit()
    }

    /// Run `check` on the body of function `f`.
    fn with_body(source: &str, check: impl FnOnce(&Statement)) {
        let unit = parse(source).unwrap_or_else(|e| panic!("{}", e));
        let f = unit.function("f").unwrap();
        let body = f.ty.as_function().unwrap().body().unwrap();
        check(&body);
    }

    #[test]
    fn test_block_keeps_declarations_in_order() {
        with_body("int f(void) { int a; a = 1; int b; return a; }", |body| {
            let kinds: Vec<&str> = body
                .sub_statements()
                .iter()
                .map(|s| match s.kind {
                    StatementKind::Declaration(_) => "declaration",
                    StatementKind::Expression(_) => "expression",
                    StatementKind::Return(_) => "return",
                    _ => "other",
                })
                .collect();
            assert_eq!(kinds, vec!["declaration", "expression", "declaration", "return"]);

            let StatementKind::Compound { scope, .. } = &body.kind else {
                panic!("body is not a block");
            };
            let names: Vec<_> = scope.variables().map(|v| v.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b"]);
        });
    }

    #[test]
    fn test_break_targets_innermost_loop() {
        let source = "int f(int n) { while (n) { for (;;) { break; } continue; } return 0; }";
        with_body(source, |body| {
            let outer = body.sub_statements()[0];
            let StatementKind::While { id: outer_id, body: outer_body, .. } = &outer.kind else {
                panic!("expected while");
            };
            let inner = outer_body.sub_statements()[0];
            let inner_id = inner.loop_id().unwrap();
            assert_ne!(*outer_id, inner_id);

            let StatementKind::For { body: inner_body, .. } = &inner.kind else {
                panic!("expected for");
            };
            let brk = inner_body.sub_statements()[0];
            let StatementKind::Break { target } = brk.kind else {
                panic!("expected break");
            };
            assert_eq!(target, inner_id);
            assert!(std::ptr::eq(body.find_loop(target).unwrap(), inner));

            let cont = outer_body.sub_statements()[1];
            let StatementKind::Continue { target } = cont.kind else {
                panic!("expected continue");
            };
            assert_eq!(target, *outer_id);
        });
    }

    #[test]
    fn test_break_outside_loop() {
        let err = parse("int f(void) { break; }").unwrap_err();
        assert_eq!(err.message(), "break statement not within loop");
        let err = parse("int f(void) { if (1) continue; return 0; }").unwrap_err();
        assert_eq!(err.message(), "continue statement not within loop");
    }

    #[test]
    fn test_for_declaration_scope() {
        with_body("int f(void) { for (int i = 0; i < 3; i++) ; return 0; }", |body| {
            let StatementKind::For { scope, init, condition, step, .. } = &body.sub_statements()[0].kind else {
                panic!("expected for");
            };
            assert!(scope.lookup_variable("i").is_some());
            assert!(matches!(init.as_deref().map(|s| &s.kind), Some(StatementKind::Declaration(_))));
            assert!(condition.is_some());
            assert!(step.is_some());
        });

        let err = parse("int f(void) { for (int i = 0; i < 3; i++) ; return i; }").unwrap_err();
        assert_eq!(err.message(), "undeclared identifier 'i'");
    }

    #[test]
    fn test_if_else_and_do_while() {
        let source = "int f(int x) { if (x) x = 1; else if (x > 2) x = 2; else ; do x--; while (x); return x; }";
        with_body(source, |body| {
            let StatementKind::Selection { else_branch, .. } = &body.sub_statements()[0].kind else {
                panic!("expected if");
            };
            let nested = else_branch.as_deref().unwrap();
            assert!(matches!(nested.kind, StatementKind::Selection { .. }));
            assert!(matches!(body.sub_statements()[1].kind, StatementKind::Do { .. }));
        });
    }

    #[test]
    fn test_nested_block_shadows() {
        with_body("int f(int x) { { char x; x = 'a'; } return x; }", |body| {
            let StatementKind::Compound { scope, .. } = &body.sub_statements()[0].kind else {
                panic!("expected block");
            };
            assert_eq!(scope.lookup_variable("x").unwrap().ty.qualified_name(), "char");
        });
    }

    #[test]
    fn test_return_checks() {
        assert!(parse("void f(void) { return; }").is_ok());
        let err = parse("void f(void) { return 1; }").unwrap_err();
        assert_eq!(err.message(), "'return' with a value, in function returning void");
        let err = parse("int *f(void) { return 1.5; }").unwrap_err();
        assert!(err.message().starts_with("incompatible types in return"), "{}", err);
    }

    #[test]
    fn test_unsupported_statements() {
        let err = parse("int f(int x) { switch (x) { } return 0; }").unwrap_err();
        assert_eq!(err.message(), "unsupported keyword 'switch'");
        let err = parse("int f(void) { goto end; }").unwrap_err();
        assert_eq!(err.message(), "unsupported keyword 'goto'");
    }

    #[test]
    fn test_statement_nesting_is_bounded() {
        let deep = format!("int f(void) {{ {}{} return 0; }}", "{".repeat(20000), "}".repeat(20000));
        assert_eq!(parse(&deep).unwrap_err().message(), "statement nested too deeply");

        let ifs = format!("int f(void) {{ {} return 0; }}", "if (1) ".repeat(20000));
        assert_eq!(parse(&ifs).unwrap_err().message(), "statement nested too deeply");
    }

    #[test]
    fn test_unterminated_block() {
        let err = parse("int f(void) { return 0;").unwrap_err();
        assert_eq!(err.message(), "Expected '}' after block, found end of file");
    }

    #[test]
    fn test_missing_semicolon_after_expression() {
        let err = parse("int f(int x) { x = 1 return x; }").unwrap_err();
        assert_eq!(err.message(), "Expected ';' after expression, found 'return'");
    }
}
