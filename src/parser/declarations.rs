//! Declaration parsing implementation
//!
//! This module handles every declaration form of the supported C subset:
//!
//! - Declaration specifiers: `typedef`, `const`, `char`, `int`, `float`,
//!   `void`, struct specifiers, and typedef names
//! - Declarators: pointers, arrays, function parameter lists, grouping
//! - Struct definitions, typedefs, variables with initializers
//! - Function prototypes and definitions
//!
//! # Grammar
//!
//! ```text
//! declaration  ::= specifiers ( ";" | init_declarator ( "," init_declarator )* ";" )
//! function_def ::= specifiers declarator compound_statement
//! declarator   ::= ( "*" "const"* )* direct ( "[" const_expr? "]" | "(" params ")" )*
//! direct       ::= identifier | "(" declarator ")"
//! initializer  ::= assignment_expr | "{" assignment_expr ( "," assignment_expr )* ","? "}"
//! ```
//!
//! A declarator is collected as a chain of derivations ordered from the
//! name outward, then applied to the specifier type from the outside in.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::lexer::token::{Keyword, Punctuator, SourceLocation, Token, TokenKind, TokenValue};
use crate::parser::ast::*;
use crate::parser::parse::{ParseError, Parser};
use crate::symbols::scope::{tag_key, Binding, Scope, ScopeKind, Variable, VariableKind};
use crate::symbols::types::{is_compatible, FunctionType, StructType, TypeRef, TypeSymbol};
use std::rc::Rc;
use tracing::debug;

/// Keywords that are lexed but not supported in declarations
const UNSUPPORTED_SPECIFIERS: [Keyword; 12] = [
    Keyword::Auto,
    Keyword::Register,
    Keyword::Static,
    Keyword::Extern,
    Keyword::Volatile,
    Keyword::Signed,
    Keyword::Unsigned,
    Keyword::Short,
    Keyword::Long,
    Keyword::Double,
    Keyword::Union,
    Keyword::Enum,
];

/// Parsed declaration specifiers
#[derive(Debug)]
pub(crate) struct Specifiers {
    pub ty: TypeRef,
    pub is_typedef: bool,
    /// First token of the specifiers
    pub token: Token,
}

/// One step of a declarator
#[derive(Debug)]
pub(crate) enum Derivation {
    Pointer { is_const: bool },
    Array(Option<usize>),
    Function { params: Scope, prototyped: bool },
}

/// A parsed declarator, not yet applied to a type
#[derive(Debug)]
pub(crate) struct Declarator {
    pub name: Option<Token>,
    /// Derivations ordered from the name outward
    pub chain: Vec<Derivation>,
}

/// An initializer and whether it was braced
struct Initializer {
    items: Vec<Expr>,
    braced: bool,
}

impl Parser {
    // ===== Specifiers =====

    /// Whether the next token can start a declaration.
    pub(crate) fn is_declaration_start(&mut self) -> Result<bool, ParseError> {
        let token = self.peek()?;
        Ok(token.is_keyword(Keyword::Typedef) || self.is_type_specifier(&token))
    }

    pub(crate) fn is_type_specifier(&self, token: &Token) -> bool {
        match token.kind {
            TokenKind::Keyword(keyword) => {
                matches!(
                    keyword,
                    Keyword::Const | Keyword::Char | Keyword::Int | Keyword::Float | Keyword::Void | Keyword::Struct
                ) || UNSUPPORTED_SPECIFIERS.contains(&keyword)
            }
            TokenKind::Identifier => self.scopes.is_type_name(&token.text),
            _ => false,
        }
    }

    /// Parse declaration specifiers. Returns `None` if the next token does
    /// not start any.
    pub(crate) fn parse_specifiers(&mut self) -> Result<Option<Specifiers>, ParseError> {
        let first = self.peek()?;
        let mut base: Option<TypeRef> = None;
        let mut is_const = false;
        let mut is_typedef = false;
        let mut seen = false;

        loop {
            let token = self.next_token()?;
            match token.kind {
                TokenKind::Keyword(Keyword::Typedef) => {
                    if is_typedef {
                        return Err(ParseError::syntax("duplicate 'typedef'", token.location));
                    }
                    is_typedef = true;
                }
                TokenKind::Keyword(Keyword::Const) => is_const = true,
                TokenKind::Keyword(Keyword::Char) => {
                    let ty = self.builtins.char_type.clone();
                    set_base(&mut base, ty, &token)?;
                }
                TokenKind::Keyword(Keyword::Int) => {
                    let ty = self.builtins.int_type.clone();
                    set_base(&mut base, ty, &token)?;
                }
                TokenKind::Keyword(Keyword::Float) => {
                    let ty = self.builtins.float_type.clone();
                    set_base(&mut base, ty, &token)?;
                }
                TokenKind::Keyword(Keyword::Void) => {
                    let ty = self.builtins.void_type.clone();
                    set_base(&mut base, ty, &token)?;
                }
                TokenKind::Keyword(Keyword::Struct) => {
                    let ty = self.parse_struct_specifier(&token)?;
                    set_base(&mut base, ty, &token)?;
                }
                TokenKind::Keyword(keyword) if UNSUPPORTED_SPECIFIERS.contains(&keyword) => {
                    return Err(ParseError::syntax(
                        format!("unsupported keyword '{}'", keyword.as_str()),
                        token.location,
                    ));
                }
                TokenKind::Identifier if base.is_none() => match self.scopes.resolve(&token.text) {
                    // Typedef names are replaced by their target right away.
                    Some(Binding::Type(ty)) => {
                        base = Some(match &*ty {
                            TypeSymbol::Typedef { target, .. } => target.clone(),
                            _ => ty.clone(),
                        });
                    }
                    _ => {
                        self.push_back(token);
                        break;
                    }
                },
                _ => {
                    self.push_back(token);
                    break;
                }
            }
            seen = true;
        }

        if !seen {
            return Ok(None);
        }

        let Some(mut ty) = base else {
            let found = self.peek()?;
            return Err(ParseError::syntax(
                format!("Expected type specifier, found {}", found),
                found.location,
            ));
        };
        if is_const && !ty.is_const() {
            ty = Rc::new(TypeSymbol::Const(ty));
        }

        Ok(Some(Specifiers {
            ty,
            is_typedef,
            token: first,
        }))
    }

    // ===== Structs =====

    /// Parse the rest of a struct specifier after the `struct` keyword.
    fn parse_struct_specifier(&mut self, keyword: &Token) -> Result<TypeRef, ParseError> {
        let token = self.next_token()?;
        let tag = if token.kind == TokenKind::Identifier {
            Some(token)
        } else {
            self.push_back(token);
            None
        };

        if !self.match_punct(Punctuator::LBrace)? {
            let Some(tag) = tag else {
                let found = self.peek()?;
                return Err(ParseError::syntax(
                    format!("Expected identifier or '{{' after 'struct', found {}", found),
                    found.location,
                ));
            };
            return Ok(match self.scopes.lookup_tag(&tag.text) {
                Some(existing) => existing,
                None => self.declare_struct(&tag.text),
            });
        }

        let ty = match &tag {
            Some(tag) => match self.scopes.lookup_local_tag(&tag.text) {
                Some(existing) if existing.is_complete() => {
                    return Err(ParseError::syntax(
                        format!("redefinition of 'struct {}'", tag.text),
                        tag.location,
                    ));
                }
                Some(existing) => existing,
                None => self.declare_struct(&tag.text),
            },
            None => {
                let tag = self.anonymous_tag();
                self.declare_struct(&tag)
            }
        };

        self.scopes.push(ScopeKind::Structure);
        self.nested("struct definition", keyword.location, Self::parse_struct_fields)?;
        let members = self.scopes.pop();

        if let Some(s) = ty.as_struct() {
            let (tag, location) = (&s.tag, keyword.location);
            debug!(%tag, fields = members.len(), %location, "completed struct");
            s.complete(members);
        }
        Ok(ty)
    }

    /// Register a new, incomplete struct in the current declaration scope.
    fn declare_struct(&mut self, tag: &str) -> TypeRef {
        let ty = Rc::new(TypeSymbol::Struct(StructType::new(tag)));
        self.scopes
            .declaration_scope_mut()
            .add_type(tag_key(tag), ty.clone());
        ty
    }

    /// Parse member declarations up to and including the closing brace.
    fn parse_struct_fields(&mut self) -> Result<(), ParseError> {
        loop {
            let token = self.peek()?;
            if token.is_punctuator(Punctuator::RBrace) || token.is_eof() {
                break;
            }

            let Some(spec) = self.parse_specifiers()? else {
                return Err(ParseError::syntax(
                    format!("Expected member declaration, found {}", token),
                    token.location,
                ));
            };
            if spec.is_typedef {
                return Err(ParseError::syntax(
                    "typedef is not allowed in a struct member",
                    spec.token.location,
                ));
            }
            if self.check_punct(Punctuator::Semicolon)? {
                return Err(ParseError::syntax(
                    "declaration does not declare anything",
                    spec.token.location,
                ));
            }

            loop {
                let declarator = self.parse_declarator(false)?;
                let (name, location) = declarator_name(&declarator, &spec);
                let ty = self.apply_declarator(&spec.ty, declarator.chain, location)?;

                if ty.is_function() {
                    return Err(ParseError::syntax(
                        format!("field '{}' declared as a function", name),
                        location,
                    ));
                }
                if !ty.is_complete() {
                    return Err(ParseError::syntax(
                        format!("field '{}' has incomplete type '{}'", name, ty),
                        location,
                    ));
                }

                let field = Rc::new(Variable::new(name.clone(), ty, VariableKind::Field, location));
                if !self.scopes.current_mut().add_variable(field) {
                    return Err(ParseError::syntax(format!("duplicate member '{}'", name), location));
                }

                if !self.match_punct(Punctuator::Comma)? {
                    break;
                }
            }
            self.expect_semicolon("after struct member")?;
        }

        self.expect_punct(Punctuator::RBrace, "after struct members")?;
        Ok(())
    }

    // ===== Declarators =====

    /// Parse a declarator. Abstract declarators (no name) are accepted only
    /// when `allow_abstract` is set.
    pub(crate) fn parse_declarator(&mut self, allow_abstract: bool) -> Result<Declarator, ParseError> {
        let location = self.peek()?.location;
        self.nested("declarator", location, |parser| parser.parse_inner_declarator(allow_abstract))
    }

    fn parse_inner_declarator(&mut self, allow_abstract: bool) -> Result<Declarator, ParseError> {
        let mut pointers = Vec::new();
        while self.match_punct(Punctuator::Star)? {
            let mut is_const = false;
            while self.match_keyword(Keyword::Const)? {
                is_const = true;
            }
            pointers.push(Derivation::Pointer { is_const });
        }

        let token = self.next_token()?;
        let (name, mut chain) = if token.kind == TokenKind::Identifier {
            (Some(token), Vec::new())
        } else if token.is_punctuator(Punctuator::LParen) && self.is_grouping()? {
            let inner = self.parse_declarator(allow_abstract)?;
            self.expect_rparen("to close declarator")?;
            (inner.name, inner.chain)
        } else if allow_abstract {
            self.push_back(token);
            (None, Vec::new())
        } else {
            return Err(ParseError::syntax(
                format!("Expected identifier in declarator, found {}", token),
                token.location,
            ));
        };

        loop {
            if self.match_punct(Punctuator::LBracket)? {
                let size = if self.match_punct(Punctuator::RBracket)? {
                    None
                } else {
                    let size = self.parse_array_size()?;
                    self.expect_punct(Punctuator::RBracket, "after array size")?;
                    Some(size)
                };
                chain.push(Derivation::Array(size));
            } else if self.match_punct(Punctuator::LParen)? {
                let (params, prototyped) = self.parse_parameters()?;
                chain.push(Derivation::Function { params, prototyped });
            } else {
                break;
            }
        }

        chain.extend(pointers.into_iter().rev());
        Ok(Declarator { name, chain })
    }

    /// After a `(` inside a declarator: does it group a nested declarator,
    /// or open a parameter list?
    fn is_grouping(&mut self) -> Result<bool, ParseError> {
        let token = self.peek()?;
        Ok(match token.kind {
            TokenKind::Punctuator(Punctuator::Star) | TokenKind::Punctuator(Punctuator::LParen) => true,
            TokenKind::Identifier => !self.scopes.is_type_name(&token.text),
            _ => false,
        })
    }

    fn parse_array_size(&mut self) -> Result<usize, ParseError> {
        let expr = self.parse_conditional_expression()?;
        match self.const_value(&expr) {
            Some(size) if size > 0 => usize::try_from(size).map_err(|_| {
                ParseError::syntax("size of array is too large", expr.location())
            }),
            Some(_) => Err(ParseError::syntax("size of array is not positive", expr.location())),
            None => Err(ParseError::syntax(
                "array size is not an integer constant",
                expr.location(),
            )),
        }
    }

    /// Parse a parameter list after its opening parenthesis.
    fn parse_parameters(&mut self) -> Result<(Scope, bool), ParseError> {
        self.scopes.push(ScopeKind::Parameters);

        if self.match_punct(Punctuator::RParen)? {
            return Ok((self.scopes.pop(), false));
        }
        if self.peek()?.is_keyword(Keyword::Void) && self.peek_second()?.is_punctuator(Punctuator::RParen) {
            self.next_token()?;
            self.next_token()?;
            return Ok((self.scopes.pop(), true));
        }

        loop {
            if let Some(ellipsis) = self.accept_punct(Punctuator::Ellipsis)? {
                return Err(ParseError::syntax(
                    "variadic functions are not supported",
                    ellipsis.location,
                ));
            }

            let Some(spec) = self.parse_specifiers()? else {
                let found = self.peek()?;
                return Err(ParseError::syntax(
                    format!("Expected parameter declaration, found {}", found),
                    found.location,
                ));
            };
            if spec.is_typedef {
                return Err(ParseError::syntax(
                    "typedef is not allowed in a parameter",
                    spec.token.location,
                ));
            }

            let declarator = self.parse_declarator(true)?;
            let (name, location) = declarator_name(&declarator, &spec);
            let ty = self.apply_declarator(&spec.ty, declarator.chain, location)?;
            let ty = adjust_parameter(ty);

            if ty.is_void() {
                return Err(ParseError::syntax(
                    "'void' must be the only parameter",
                    location,
                ));
            }

            let param = Rc::new(Variable::new(name.clone(), ty, VariableKind::Parameter, location));
            if !self.scopes.current_mut().add_variable(param) {
                return Err(ParseError::syntax(
                    format!("redefinition of parameter '{}'", name),
                    location,
                ));
            }

            if !self.match_punct(Punctuator::Comma)? {
                break;
            }
        }

        self.expect_rparen("after parameter list")?;
        Ok((self.scopes.pop(), true))
    }

    /// Build the declared type from the specifier type and a declarator chain.
    pub(crate) fn apply_declarator(
        &self,
        base: &TypeRef,
        chain: Vec<Derivation>,
        location: SourceLocation,
    ) -> Result<TypeRef, ParseError> {
        let mut ty = base.clone();

        for derivation in chain.into_iter().rev() {
            ty = match derivation {
                Derivation::Pointer { is_const } => {
                    let pointer = Rc::new(TypeSymbol::Pointer(ty));
                    if is_const {
                        Rc::new(TypeSymbol::Const(pointer))
                    } else {
                        pointer
                    }
                }
                Derivation::Array(size) => {
                    if ty.is_void() {
                        return Err(ParseError::syntax("declaration of array of void", location));
                    }
                    if ty.is_function() {
                        return Err(ParseError::syntax("declaration of array of functions", location));
                    }
                    if !ty.is_complete() {
                        return Err(ParseError::syntax(
                            format!("array has incomplete element type '{}'", ty),
                            location,
                        ));
                    }
                    let array = Rc::new(TypeSymbol::Array { element: ty, size });
                    if size.is_some() && array.size_of().is_none() {
                        return Err(ParseError::syntax("size of array is too large", location));
                    }
                    array
                }
                Derivation::Function { params, prototyped } => {
                    if ty.is_array() {
                        return Err(ParseError::syntax("function cannot return an array", location));
                    }
                    if ty.is_function() {
                        return Err(ParseError::syntax("function cannot return a function", location));
                    }
                    Rc::new(TypeSymbol::Function(FunctionType::new(ty, params, prototyped)))
                }
            };
        }

        Ok(ty)
    }

    // ===== Declarations =====

    /// Parse one declaration at file scope, including function definitions.
    pub(crate) fn parse_external_declaration(&mut self) -> Result<(), ParseError> {
        let Some(spec) = self.parse_specifiers()? else {
            let token = self.next_token()?;
            return Err(ParseError::syntax(
                format!("Expected declaration, found {}", token),
                token.location,
            ));
        };
        if self.match_punct(Punctuator::Semicolon)? {
            return Ok(());
        }

        let declarator = self.parse_declarator(false)?;
        let defines_function = matches!(declarator.chain.first(), Some(Derivation::Function { .. }));
        if !spec.is_typedef && defines_function && self.check_punct(Punctuator::LBrace)? {
            return self.parse_function_definition(&spec, declarator);
        }

        self.finish_declaration(&spec, declarator)?;
        Ok(())
    }

    /// Parse one declaration inside a block or `for` header, including the
    /// terminating semicolon.
    pub(crate) fn parse_declaration(&mut self) -> Result<Vec<Rc<Variable>>, ParseError> {
        let Some(spec) = self.parse_specifiers()? else {
            let token = self.next_token()?;
            return Err(ParseError::syntax(
                format!("Expected declaration, found {}", token),
                token.location,
            ));
        };
        if self.match_punct(Punctuator::Semicolon)? {
            return Ok(Vec::new());
        }

        let declarator = self.parse_declarator(false)?;
        self.finish_declaration(&spec, declarator)
    }

    /// Declare `first` and any further comma-separated declarators.
    fn finish_declaration(
        &mut self,
        spec: &Specifiers,
        first: Declarator,
    ) -> Result<Vec<Rc<Variable>>, ParseError> {
        let mut declared = Vec::new();
        let mut declarator = first;

        loop {
            if let Some(variable) = self.declare(spec, declarator)? {
                declared.push(variable);
            }
            if !self.match_punct(Punctuator::Comma)? {
                break;
            }
            declarator = self.parse_declarator(false)?;
        }

        self.expect_semicolon("after declaration")?;
        Ok(declared)
    }

    /// Register one declarator: a typedef, a function prototype, or a
    /// variable with its optional initializer.
    fn declare(
        &mut self,
        spec: &Specifiers,
        declarator: Declarator,
    ) -> Result<Option<Rc<Variable>>, ParseError> {
        let Some(name_token) = declarator.name else {
            return Err(ParseError::syntax("Expected identifier in declarator", spec.token.location));
        };
        let name = name_token.text.clone();
        let location = name_token.location;
        let ty = self.apply_declarator(&spec.ty, declarator.chain, location)?;

        if self.scopes.redeclares_parameter(&name) {
            return Err(ParseError::syntax(format!("redeclaration of '{}'", name), location));
        }

        if spec.is_typedef {
            if self.check_punct(Punctuator::Eq)? {
                return Err(ParseError::syntax(format!("typedef '{}' is initialized", name), location));
            }
            let alias = Rc::new(TypeSymbol::Typedef {
                name: name.clone(),
                target: ty,
            });
            if !self.scopes.declaration_scope_mut().add_type(name.clone(), alias) {
                return Err(ParseError::syntax(format!("redeclaration of '{}'", name), location));
            }
            debug!(%name, "declared typedef");
            return Ok(None);
        }

        if ty.is_function() {
            if self.check_punct(Punctuator::LBrace)? {
                return Err(ParseError::syntax(
                    "function definition is not allowed here",
                    location,
                ));
            }
            if self.check_punct(Punctuator::Eq)? {
                return Err(ParseError::syntax(
                    format!("function '{}' is initialized like a variable", name),
                    location,
                ));
            }
            self.declare_function(&name_token, ty)?;
            return Ok(None);
        }

        if ty.is_void() {
            return Err(ParseError::syntax(format!("variable '{}' declared void", name), location));
        }

        let initializer = if self.match_punct(Punctuator::Eq)? {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        let ty = match &initializer {
            Some(initializer) => self.check_initializer(&name_token, ty, initializer)?,
            None => ty,
        };

        if !ty.is_complete() {
            let message = match ty.base() {
                TypeSymbol::Array { size: None, .. } => format!("array size missing in '{}'", name),
                _ => format!("variable '{}' has incomplete type '{}'", name, ty),
            };
            return Err(ParseError::syntax(message, location));
        }

        let items = initializer.map(|initializer| initializer.items).unwrap_or_default();
        let variable = Rc::new(
            Variable::new(name.clone(), ty, VariableKind::Variable, location).with_initializer(items),
        );
        if !self.scopes.current_mut().add_variable(variable.clone()) {
            return Err(ParseError::syntax(format!("redeclaration of '{}'", name), location));
        }
        Ok(Some(variable))
    }

    /// Register a function signature in the current declaration scope.
    /// Every declaration of one name shares the first signature, which later
    /// declarations must be compatible with wherever they appear.
    fn declare_function(&mut self, name_token: &Token, ty: TypeRef) -> Result<Rc<Variable>, ParseError> {
        let name = &name_token.text;

        let function = match self.linkage.get(name) {
            Some(existing) if !is_compatible(&existing.ty, &ty) => {
                return Err(ParseError::syntax(
                    format!("conflicting types for '{}'", name),
                    name_token.location,
                ));
            }
            Some(existing) => existing.clone(),
            None => {
                // Declarators sharing a typedef'd signature each get their own body.
                let ty = match ty.as_function() {
                    Some(signature) => Rc::new(TypeSymbol::Function(signature.redeclare())),
                    None => ty,
                };
                Rc::new(Variable::new(name.clone(), ty, VariableKind::Function, name_token.location))
            }
        };

        let scope = self.scopes.declaration_scope_mut();
        if scope.lookup_function(name).is_none() {
            if !scope.add_function(function.clone()) {
                return Err(ParseError::syntax(
                    format!("'{}' redeclared as a different kind of symbol", name),
                    name_token.location,
                ));
            }
            debug!(%name, scope = %scope.kind(), "declared function");
        }
        self.linkage.insert(name.clone(), function.clone());
        Ok(function)
    }

    /// Parse a function body. The signature is registered first so the body
    /// may call the function recursively.
    fn parse_function_definition(
        &mut self,
        spec: &Specifiers,
        declarator: Declarator,
    ) -> Result<(), ParseError> {
        let Some(name_token) = declarator.name else {
            return Err(ParseError::syntax("Expected function name", spec.token.location));
        };
        let ty = self.apply_declarator(&spec.ty, declarator.chain, name_token.location)?;
        let Some(signature) = ty.as_function() else {
            return Err(ParseError::syntax(
                format!("'{}' is not a function", name_token.text),
                name_token.location,
            ));
        };

        let params = signature.params().clone();
        let prototyped = signature.is_prototyped();
        let return_type = signature.return_type.clone();

        if let Some(unnamed) = params.variables().find(|param| param.name.is_empty()) {
            return Err(ParseError::syntax("parameter name omitted", unnamed.location));
        }
        if !return_type.is_void() && !return_type.is_complete() {
            return Err(ParseError::syntax(
                format!("return type '{}' is incomplete", return_type),
                name_token.location,
            ));
        }

        let function = self.declare_function(&name_token, ty.clone())?;
        let Some(declared) = function.ty.as_function() else {
            return Err(ParseError::syntax(
                format!("'{}' is not a function", name_token.text),
                name_token.location,
            ));
        };
        if declared.has_body() {
            return Err(ParseError::syntax(
                format!("redefinition of '{}'", name_token.text),
                name_token.location,
            ));
        }

        let name = &name_token.text;
        debug!(%name, params = params.len(), "defining function");
        self.scopes.push_scope(params.clone());
        self.return_type = Some(return_type);
        let body = self.parse_compound_statement()?;
        self.return_type = None;
        self.scopes.pop();

        declared.define(params, prototyped, body).map_err(|_| {
            ParseError::syntax(
                format!("redefinition of '{}'", name_token.text),
                name_token.location,
            )
        })
    }

    // ===== Initializers =====

    fn parse_initializer(&mut self) -> Result<Initializer, ParseError> {
        if !self.match_punct(Punctuator::LBrace)? {
            let item = self.parse_assignment_expression()?;
            return Ok(Initializer {
                items: vec![item],
                braced: false,
            });
        }

        let mut items = Vec::new();
        loop {
            items.push(self.parse_assignment_expression()?);
            if !self.match_punct(Punctuator::Comma)? || self.check_punct(Punctuator::RBrace)? {
                break;
            }
        }
        self.expect_punct(Punctuator::RBrace, "after initializer list")?;

        Ok(Initializer { items, braced: true })
    }

    /// Check an initializer against the declared type, completing an array
    /// type whose size was omitted.
    fn check_initializer(
        &self,
        name: &Token,
        ty: TypeRef,
        initializer: &Initializer,
    ) -> Result<TypeRef, ParseError> {
        let items = &initializer.items;
        let count_mismatch = || {
            ParseError::syntax(
                format!("initializer count mismatch for '{}'", name.text),
                name.location,
            )
        };

        match ty.base() {
            TypeSymbol::Array { element, size } => {
                if let [item] = items.as_slice() {
                    if let (TokenValue::Bytes(bytes), TypeSymbol::Char) = (&item.token.value, element.base()) {
                        if matches!(item.kind, ExprKind::Literal) {
                            return match size {
                                Some(size) if bytes.len() > *size => Err(ParseError::syntax(
                                    format!("initializer-string for array '{}' is too long", name.text),
                                    item.location(),
                                )),
                                Some(_) => Ok(ty.clone()),
                                None => Ok(Rc::new(TypeSymbol::Array {
                                    element: element.clone(),
                                    size: Some(bytes.len() + 1),
                                })),
                            };
                        }
                    }
                }

                if !initializer.braced {
                    return Err(ParseError::syntax(
                        format!("invalid initializer for array '{}'", name.text),
                        name.location,
                    ));
                }
                if size.is_some_and(|size| items.len() > size) {
                    return Err(count_mismatch());
                }
                for item in items {
                    self.check_assignable(element, item, "initializer")?;
                }

                Ok(match size {
                    Some(_) => ty.clone(),
                    None => Rc::new(TypeSymbol::Array {
                        element: element.clone(),
                        size: Some(items.len()),
                    }),
                })
            }
            TypeSymbol::Struct(s) if initializer.braced => {
                if !s.is_complete() {
                    return Ok(ty.clone());
                }
                let fields: Vec<_> = s.members().variables().cloned().collect();
                if items.len() > fields.len() {
                    return Err(count_mismatch());
                }
                for (field, item) in fields.iter().zip(items) {
                    self.check_assignable(&field.ty, item, "initializer")?;
                }
                Ok(ty.clone())
            }
            _ => {
                let [item] = items.as_slice() else {
                    return Err(count_mismatch());
                };
                self.check_assignable(&ty, item, "initializer")?;
                Ok(ty.clone())
            }
        }
    }
}

fn set_base(base: &mut Option<TypeRef>, ty: TypeRef, token: &Token) -> Result<(), ParseError> {
    if base.is_some() {
        return Err(ParseError::syntax(
            "two or more data types in declaration specifiers",
            token.location,
        ));
    }
    *base = Some(ty);
    Ok(())
}

/// Name and location of a declarator, or empty and the specifier location
/// for an abstract one.
fn declarator_name(declarator: &Declarator, spec: &Specifiers) -> (String, SourceLocation) {
    match &declarator.name {
        Some(token) => (token.text.clone(), token.location),
        None => (String::new(), spec.token.location),
    }
}

/// Parameters of array or function type are adjusted to pointers.
fn adjust_parameter(ty: TypeRef) -> TypeRef {
    match ty.base() {
        TypeSymbol::Array { element, .. } => Rc::new(TypeSymbol::Pointer(element.clone())),
        TypeSymbol::Function(_) => Rc::new(TypeSymbol::Pointer(ty.clone())),
        _ => ty,
    }
}
