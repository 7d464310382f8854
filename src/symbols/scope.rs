//! Scopes and name resolution
//!
//! A [`Scope`] maps names to types, variables, and functions. The parser keeps
//! open scopes on a [`ScopeStack`]; closed scopes are moved into the AST node
//! (or type) that owns them, so nothing is ever shared between siblings.

use crate::parser::ast::Expr;
use crate::lexer::token::SourceLocation;
use crate::symbols::types::{TypeRef, TypeSymbol};
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Internal,
    Global,
    Parameters,
    Structure,
    Block,
    Loop,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::Internal => "internal",
            ScopeKind::Global => "global",
            ScopeKind::Parameters => "parameters",
            ScopeKind::Structure => "structure",
            ScopeKind::Block => "block",
            ScopeKind::Loop => "loop",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Variable,
    Parameter,
    Field,
    Function,
}

/// A named object: variable, parameter, struct field, or function signature
#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub ty: TypeRef,
    pub kind: VariableKind,
    pub location: SourceLocation,
    pub initializer: Vec<Expr>,
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        ty: TypeRef,
        kind: VariableKind,
        location: SourceLocation,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
            location,
            initializer: Vec::new(),
        }
    }

    pub fn with_initializer(mut self, initializer: Vec<Expr>) -> Self {
        self.initializer = initializer;
        self
    }
}

/// What an ordinary identifier resolves to
#[derive(Debug, Clone)]
pub enum Binding {
    Type(TypeRef),
    Variable(Rc<Variable>),
}

/// A symbol table for one lexical region
#[derive(Debug, Clone)]
pub struct Scope {
    kind: ScopeKind,
    types: FxHashMap<String, TypeRef>,
    variables: FxHashMap<String, Rc<Variable>>,
    functions: FxHashMap<String, Rc<Variable>>,
    /// Variables in declaration order, unnamed parameters included
    order: Vec<Rc<Variable>>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            types: FxHashMap::default(),
            variables: FxHashMap::default(),
            functions: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Whether struct tags and typedefs declared while this scope is open
    /// belong to it.
    pub fn holds_declarations(&self) -> bool {
        matches!(self.kind, ScopeKind::Global | ScopeKind::Block | ScopeKind::Loop)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.variables.is_empty() && self.functions.is_empty() && self.order.is_empty()
    }

    /// Number of variables (fields, parameters) in declaration order.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn lookup_type(&self, name: &str) -> Option<TypeRef> {
        self.types.get(name).cloned()
    }

    pub fn lookup_variable(&self, name: &str) -> Option<Rc<Variable>> {
        self.variables.get(name).cloned()
    }

    pub fn lookup_function(&self, name: &str) -> Option<Rc<Variable>> {
        self.functions.get(name).cloned()
    }

    /// Whether `name` is taken in the ordinary identifier namespace.
    pub fn declares(&self, name: &str) -> bool {
        self.variables.contains_key(name) || self.functions.contains_key(name) || self.types.contains_key(name)
    }

    /// Register a type under `name`. Returns `false` if the name is taken.
    pub fn add_type(&mut self, name: impl Into<String>, ty: TypeRef) -> bool {
        let name = name.into();
        if self.declares(&name) {
            return false;
        }
        self.types.insert(name, ty);
        true
    }

    /// Register a variable. Returns `false` if the name is taken. Unnamed
    /// variables (abstract parameters) are only kept in order.
    pub fn add_variable(&mut self, variable: Rc<Variable>) -> bool {
        if !variable.name.is_empty() {
            if self.declares(&variable.name) {
                return false;
            }
            self.variables.insert(variable.name.clone(), variable.clone());
        }
        self.order.push(variable);
        true
    }

    /// Register a function signature. Returns `false` if the name is taken.
    pub fn add_function(&mut self, function: Rc<Variable>) -> bool {
        if self.declares(&function.name) {
            return false;
        }
        self.functions.insert(function.name.clone(), function);
        true
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &Rc<Variable>> {
        self.order.iter()
    }

    /// Types sorted by name.
    pub fn types_sorted(&self) -> Vec<(&str, &TypeRef)> {
        let mut types: Vec<_> = self.types.iter().map(|(name, ty)| (name.as_str(), ty)).collect();
        types.sort_by(|a, b| a.0.cmp(b.0));
        types
    }

    /// Functions sorted by name.
    pub fn functions_sorted(&self) -> Vec<&Rc<Variable>> {
        let mut functions: Vec<_> = self.functions.values().collect();
        functions.sort_by(|a, b| a.name.cmp(&b.name));
        functions
    }

    pub fn clear(&mut self) {
        self.types.clear();
        self.variables.clear();
        self.functions.clear();
        self.order.clear();
    }
}

impl Drop for Scope {
    // Structs declared here may reach themselves through their members, and
    // function bodies may call themselves. Both cycles are cut on the way out.
    fn drop(&mut self) {
        for ty in self.types.values() {
            if let TypeSymbol::Struct(s) = &**ty {
                s.release_members();
            }
        }
        for function in self.functions.values() {
            if let TypeSymbol::Function(f) = &*function.ty {
                f.release_body();
            }
        }
    }
}

/// The stack of open scopes, innermost last
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// A stack holding only the Internal and Global scopes.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Internal), Scope::new(ScopeKind::Global)],
        }
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.push_scope(Scope::new(kind));
    }

    pub fn push_scope(&mut self, scope: Scope) {
        trace!(kind = %scope.kind(), depth = self.scopes.len(), "push scope");
        self.scopes.push(scope);
    }

    /// Remove the innermost scope. The outermost scope is never popped.
    pub fn pop(&mut self) -> Scope {
        if self.scopes.len() <= 1 {
            return Scope::new(ScopeKind::Internal);
        }
        let scope = self.scopes.pop().unwrap_or_else(|| Scope::new(ScopeKind::Internal));
        trace!(kind = %scope.kind(), depth = self.scopes.len(), "pop scope");
        scope
    }

    pub fn current_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn internal_mut(&mut self) -> &mut Scope {
        &mut self.scopes[0]
    }

    /// Whether declaring `name` in the current scope would clash with a
    /// parameter. A function's parameters and the outermost block of its
    /// body share one scope.
    pub fn redeclares_parameter(&self, name: &str) -> bool {
        match self.scopes.as_slice() {
            [.., params, body] => {
                params.kind() == ScopeKind::Parameters
                    && body.kind() == ScopeKind::Block
                    && params.declares(name)
            }
            _ => false,
        }
    }

    /// The innermost scope that takes struct tags and typedefs.
    pub fn declaration_scope(&self) -> &Scope {
        self.scopes
            .iter()
            .rev()
            .find(|scope| scope.holds_declarations())
            .unwrap_or(&self.scopes[1])
    }

    pub fn declaration_scope_mut(&mut self) -> &mut Scope {
        let index = self
            .scopes
            .iter()
            .rposition(Scope::holds_declarations)
            .unwrap_or(1);
        &mut self.scopes[index]
    }

    /// Resolve an ordinary identifier, innermost scope first. Structure
    /// scopes are skipped: field names are only reachable through `.`/`->`.
    pub fn resolve(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .filter(|scope| scope.kind() != ScopeKind::Structure)
            .find_map(|scope| {
                scope
                    .lookup_variable(name)
                    .or_else(|| scope.lookup_function(name))
                    .map(Binding::Variable)
                    .or_else(|| scope.lookup_type(name).map(Binding::Type))
            })
    }

    /// Whether `name` currently names a type.
    pub fn is_type_name(&self, name: &str) -> bool {
        matches!(self.resolve(name), Some(Binding::Type(_)))
    }

    /// Find a struct tag anywhere in the chain.
    pub fn lookup_tag(&self, tag: &str) -> Option<TypeRef> {
        let key = tag_key(tag);
        self.scopes
            .iter()
            .rev()
            .filter(|scope| scope.holds_declarations())
            .find_map(|scope| scope.lookup_type(&key))
    }

    /// Find a struct tag in the current declaration scope only.
    pub fn lookup_local_tag(&self, tag: &str) -> Option<TypeRef> {
        self.declaration_scope().lookup_type(&tag_key(tag))
    }

    /// Pop every remaining scope, returning (internal, global).
    pub fn finish(mut self) -> (Scope, Scope) {
        self.scopes.truncate(2);
        let global = self.scopes.pop().unwrap_or_else(|| Scope::new(ScopeKind::Global));
        let internal = self.scopes.pop().unwrap_or_else(|| Scope::new(ScopeKind::Internal));
        (internal, global)
    }
}

/// Key under which a struct tag is stored in a types map.
pub fn tag_key(tag: &str) -> String {
    format!("struct {}", tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::types::StructType;

    fn int_variable(name: &str) -> Rc<Variable> {
        Rc::new(Variable::new(
            name,
            Rc::new(TypeSymbol::Int),
            VariableKind::Variable,
            SourceLocation::default(),
        ))
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut stack = ScopeStack::new();
        stack.current_mut().add_variable(int_variable("x"));
        stack.push(ScopeKind::Block);
        let inner = Rc::new(Variable::new(
            "x",
            Rc::new(TypeSymbol::Char),
            VariableKind::Variable,
            SourceLocation::default(),
        ));
        stack.current_mut().add_variable(inner);

        match stack.resolve("x") {
            Some(Binding::Variable(v)) => assert_eq!(v.ty.qualified_name(), "char"),
            other => panic!("expected variable, got {:?}", other),
        }
        stack.pop();
        match stack.resolve("x") {
            Some(Binding::Variable(v)) => assert_eq!(v.ty.qualified_name(), "int"),
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn test_popped_scope_is_gone() {
        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::Block);
        stack.current_mut().add_variable(int_variable("local"));
        assert!(stack.resolve("local").is_some());
        stack.pop();
        assert!(stack.resolve("local").is_none());
    }

    #[test]
    fn test_structure_scope_is_not_searched() {
        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::Structure);
        stack.current_mut().add_variable(int_variable("field"));
        assert!(stack.resolve("field").is_none());
    }

    #[test]
    fn test_names_are_unique_per_scope() {
        let mut scope = Scope::new(ScopeKind::Global);
        assert!(scope.add_variable(int_variable("a")));
        assert!(!scope.add_variable(int_variable("a")));
        assert!(!scope.add_type("a", Rc::new(TypeSymbol::Int)));
        assert!(scope.add_type(tag_key("a"), Rc::new(TypeSymbol::Int)));
    }

    #[test]
    fn test_tags_go_to_declaration_scope() {
        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::Block);
        stack.push(ScopeKind::Parameters);
        let s = Rc::new(TypeSymbol::Struct(StructType::new("p")));
        stack.declaration_scope_mut().add_type(tag_key("p"), s);
        stack.pop();
        assert!(stack.declaration_scope().lookup_type("struct p").is_some());
        assert!(stack.lookup_tag("p").is_some());
        stack.pop();
        assert!(stack.lookup_tag("p").is_none());
    }

    #[test]
    fn test_outermost_body_block_shares_parameter_names() {
        let mut stack = ScopeStack::new();
        let mut params = Scope::new(ScopeKind::Parameters);
        params.add_variable(int_variable("a"));
        stack.push_scope(params);
        stack.push(ScopeKind::Block);
        assert!(stack.redeclares_parameter("a"));
        assert!(!stack.redeclares_parameter("b"));

        stack.push(ScopeKind::Block);
        assert!(!stack.redeclares_parameter("a"));
    }

    #[test]
    fn test_unnamed_parameters_keep_order() {
        let mut scope = Scope::new(ScopeKind::Parameters);
        scope.add_variable(int_variable(""));
        scope.add_variable(int_variable("b"));
        assert_eq!(scope.len(), 2);
        assert!(scope.lookup_variable("").is_none());
    }
}
