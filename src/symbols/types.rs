//! Type symbols
//!
//! Types are shared: a struct or typedef is referenced from every declaration
//! that names it, so every type is handled through a [`TypeRef`]. The few
//! parts of a type that change after creation (struct completion, function
//! bodies) use interior mutability and are written exactly once by the
//! parser.
//!
//! # Sections
//!
//! - [`TypeSymbol`]: the closed set of type kinds
//! - Queries: predicates, sizes, and the `qualified_name` rendering
//! - [`is_compatible`]: structural compatibility used for redeclarations
//!   and assignments

use crate::parser::ast::Statement;
use crate::symbols::scope::{Scope, ScopeKind, Variable};
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// Shared handle to a type
pub type TypeRef = Rc<TypeSymbol>;

pub const POINTER_SIZE: usize = 8;

#[derive(Debug)]
pub enum TypeSymbol {
    Char,
    Int,
    Float,
    Void,
    Pointer(TypeRef),
    Array {
        element: TypeRef,
        size: Option<usize>,
    },
    Const(TypeRef),
    Typedef {
        name: String,
        target: TypeRef,
    },
    Struct(StructType),
    Function(FunctionType),
}

/// A struct type. Members live in a Structure scope that is filled while the
/// body is parsed; the struct is complete once its closing brace is seen.
pub struct StructType {
    pub tag: String,
    complete: Cell<bool>,
    members: RefCell<Scope>,
}

impl StructType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            complete: Cell::new(false),
            members: RefCell::new(Scope::new(ScopeKind::Structure)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete.get()
    }

    /// Install the parsed members and mark the struct complete.
    pub fn complete(&self, members: Scope) {
        *self.members.borrow_mut() = members;
        self.complete.set(true);
    }

    pub fn members(&self) -> Ref<'_, Scope> {
        self.members.borrow()
    }

    pub fn field(&self, name: &str) -> Option<Rc<Variable>> {
        self.members.borrow().lookup_variable(name)
    }

    /// Drop the member table. Members may point back at this struct.
    pub(crate) fn release_members(&self) {
        self.members.borrow_mut().clear();
    }
}

impl fmt::Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructType")
            .field("tag", &self.tag)
            .field("complete", &self.is_complete())
            .finish()
    }
}

/// A function type. The parameter table is replaced by the definition's own
/// when a prototyped declaration is later defined.
pub struct FunctionType {
    pub return_type: TypeRef,
    params: RefCell<Scope>,
    prototyped: Cell<bool>,
    body: RefCell<Option<Statement>>,
}

impl FunctionType {
    pub fn new(return_type: TypeRef, params: Scope, prototyped: bool) -> Self {
        Self {
            return_type,
            params: RefCell::new(params),
            prototyped: Cell::new(prototyped),
            body: RefCell::new(None),
        }
    }

    pub fn params(&self) -> Ref<'_, Scope> {
        self.params.borrow()
    }

    pub fn param_types(&self) -> Vec<TypeRef> {
        self.params
            .borrow()
            .variables()
            .map(|param| param.ty.clone())
            .collect()
    }

    pub fn is_prototyped(&self) -> bool {
        self.prototyped.get()
    }

    pub fn has_body(&self) -> bool {
        self.body.borrow().is_some()
    }

    pub fn body(&self) -> Option<Ref<'_, Statement>> {
        Ref::filter_map(self.body.borrow(), Option::as_ref).ok()
    }

    /// Attach a body. Fails if the function is already defined.
    pub fn define(&self, params: Scope, prototyped: bool, body: Statement) -> Result<(), Statement> {
        if self.has_body() {
            return Err(body);
        }
        *self.params.borrow_mut() = params;
        self.prototyped.set(prototyped);
        *self.body.borrow_mut() = Some(body);
        Ok(())
    }

    /// A bodiless copy of this signature for another declarator.
    pub fn redeclare(&self) -> FunctionType {
        let mut params = Scope::new(ScopeKind::Parameters);
        for param in self.params().variables() {
            params.add_variable(param.clone());
        }
        FunctionType::new(self.return_type.clone(), params, self.is_prototyped())
    }

    /// Drop the body. Calls inside it may point back at this function.
    pub(crate) fn release_body(&self) {
        // The borrow ends before the body drops; the body may release us again.
        let body = self.body.borrow_mut().take();
        drop(body);
    }
}

impl fmt::Debug for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionType")
            .field("return_type", &self.return_type)
            .field("params", &self.param_types())
            .field("prototyped", &self.is_prototyped())
            .field("defined", &self.has_body())
            .finish()
    }
}

impl TypeSymbol {
    /// Strip typedefs and const qualifiers from the outside of a type.
    pub fn unqualified(ty: &TypeRef) -> TypeRef {
        match &**ty {
            TypeSymbol::Const(inner) | TypeSymbol::Typedef { target: inner, .. } => {
                TypeSymbol::unqualified(inner)
            }
            _ => ty.clone(),
        }
    }

    /// The unqualified type with typedefs removed, borrowed.
    pub fn base(&self) -> &TypeSymbol {
        match self {
            TypeSymbol::Const(inner) | TypeSymbol::Typedef { target: inner, .. } => inner.base(),
            _ => self,
        }
    }

    pub fn is_const(&self) -> bool {
        match self {
            TypeSymbol::Const(_) => true,
            TypeSymbol::Typedef { target, .. } => target.is_const(),
            _ => false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.base(), TypeSymbol::Void)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.base(), TypeSymbol::Char | TypeSymbol::Int)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self.base(), TypeSymbol::Char | TypeSymbol::Int | TypeSymbol::Float)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.base(), TypeSymbol::Pointer(_))
    }

    pub fn is_scalar(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.base(), TypeSymbol::Array { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self.base(), TypeSymbol::Function(_))
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self.base() {
            TypeSymbol::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self.base() {
            TypeSymbol::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Target of a pointer, element of an array.
    pub fn pointee(&self) -> Option<&TypeRef> {
        match self.base() {
            TypeSymbol::Pointer(target) => Some(target),
            TypeSymbol::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Whether an object of this type has a known size.
    pub fn is_complete(&self) -> bool {
        match self.base() {
            TypeSymbol::Void | TypeSymbol::Function(_) => false,
            TypeSymbol::Struct(s) => s.is_complete(),
            TypeSymbol::Array { element, size } => size.is_some() && element.is_complete(),
            _ => true,
        }
    }

    /// Size in bytes. `None` for incomplete types and sizes past `usize`.
    pub fn size_of(&self) -> Option<usize> {
        match self.base() {
            TypeSymbol::Char => Some(1),
            TypeSymbol::Int => Some(4),
            TypeSymbol::Float => Some(8),
            TypeSymbol::Pointer(_) => Some(POINTER_SIZE),
            TypeSymbol::Array { element, size } => element.size_of()?.checked_mul((*size)?),
            TypeSymbol::Struct(s) if s.is_complete() => {
                let mut offset: usize = 0;
                let mut align: usize = 1;
                for field in s.members().variables() {
                    let field_align = field.ty.align_of()?;
                    offset = offset
                        .checked_next_multiple_of(field_align)?
                        .checked_add(field.ty.size_of()?)?;
                    align = align.max(field_align);
                }
                offset.checked_next_multiple_of(align)
            }
            _ => None,
        }
    }

    pub fn align_of(&self) -> Option<usize> {
        match self.base() {
            TypeSymbol::Array { element, .. } => element.align_of(),
            TypeSymbol::Struct(s) if s.is_complete() => s
                .members()
                .variables()
                .map(|field| field.ty.align_of())
                .try_fold(1, |acc, align| align.map(|a| acc.max(a))),
            other => other.size_of(),
        }
    }

    /// Human-readable rendering, e.g. `pointer to const char`.
    pub fn qualified_name(&self) -> String {
        match self {
            TypeSymbol::Char => "char".to_string(),
            TypeSymbol::Int => "int".to_string(),
            TypeSymbol::Float => "float".to_string(),
            TypeSymbol::Void => "void".to_string(),
            TypeSymbol::Pointer(target) => format!("pointer to {}", target.qualified_name()),
            TypeSymbol::Array {
                element,
                size: Some(size),
            } => format!("array of {} {}", size, element.qualified_name()),
            TypeSymbol::Array {
                element,
                size: None,
            } => format!("array of {}", element.qualified_name()),
            TypeSymbol::Const(inner) => format!("const {}", inner.qualified_name()),
            TypeSymbol::Typedef { name, .. } => name.clone(),
            TypeSymbol::Struct(s) => format!("struct {}", s.tag),
            TypeSymbol::Function(function) => {
                let params = if !function.is_prototyped() {
                    String::new()
                } else if function.params().is_empty() {
                    "void".to_string()
                } else {
                    function
                        .param_types()
                        .iter()
                        .map(|ty| ty.qualified_name())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!(
                    "function ({}) returning {}",
                    params,
                    function.return_type.qualified_name()
                )
            }
        }
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Structural compatibility. Typedefs are transparent; qualifiers must match.
pub fn is_compatible(a: &TypeSymbol, b: &TypeSymbol) -> bool {
    let a = skip_typedefs(a);
    let b = skip_typedefs(b);

    match (a, b) {
        (TypeSymbol::Char, TypeSymbol::Char)
        | (TypeSymbol::Int, TypeSymbol::Int)
        | (TypeSymbol::Float, TypeSymbol::Float)
        | (TypeSymbol::Void, TypeSymbol::Void) => true,
        (TypeSymbol::Pointer(x), TypeSymbol::Pointer(y)) => is_compatible(x, y),
        (TypeSymbol::Const(x), TypeSymbol::Const(y)) => is_compatible(x, y),
        (
            TypeSymbol::Array {
                element: x,
                size: size_x,
            },
            TypeSymbol::Array {
                element: y,
                size: size_y,
            },
        ) => {
            let sizes_agree = match (size_x, size_y) {
                (Some(m), Some(n)) => m == n,
                _ => true,
            };
            sizes_agree && is_compatible(x, y)
        }
        (TypeSymbol::Struct(x), TypeSymbol::Struct(y)) => std::ptr::eq(x, y),
        (TypeSymbol::Function(f), TypeSymbol::Function(g)) => {
            if !is_compatible(&f.return_type, &g.return_type) {
                return false;
            }
            if !f.is_prototyped() || !g.is_prototyped() {
                return true;
            }
            let (params_f, params_g) = (f.param_types(), g.param_types());
            params_f.len() == params_g.len()
                && params_f
                    .iter()
                    .zip(&params_g)
                    .all(|(x, y)| is_compatible(x.base(), y.base()))
        }
        _ => false,
    }
}

fn skip_typedefs(ty: &TypeSymbol) -> &TypeSymbol {
    match ty {
        TypeSymbol::Typedef { target, .. } => skip_typedefs(target),
        _ => ty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::SourceLocation;
    use crate::symbols::scope::VariableKind;

    fn int() -> TypeRef {
        Rc::new(TypeSymbol::Int)
    }

    fn field(name: &str, ty: TypeRef) -> Variable {
        Variable::new(name, ty, VariableKind::Field, SourceLocation::new(1, 1))
    }

    #[test]
    fn test_qualified_names() {
        let ptr = TypeSymbol::Pointer(Rc::new(TypeSymbol::Const(Rc::new(TypeSymbol::Char))));
        assert_eq!(ptr.qualified_name(), "pointer to const char");

        let array = TypeSymbol::Array {
            element: int(),
            size: Some(3),
        };
        assert_eq!(array.qualified_name(), "array of 3 int");

        let function = TypeSymbol::Function(FunctionType::new(
            int(),
            Scope::new(ScopeKind::Parameters),
            true,
        ));
        assert_eq!(function.qualified_name(), "function (void) returning int");
    }

    #[test]
    fn test_typedefs_are_transparent() {
        let alias = TypeSymbol::Typedef {
            name: "number".to_string(),
            target: int(),
        };
        assert!(alias.is_integer());
        assert!(is_compatible(&alias, &TypeSymbol::Int));
        assert!(!is_compatible(&alias, &TypeSymbol::Float));
    }

    #[test]
    fn test_const_must_match() {
        let const_int = TypeSymbol::Const(int());
        assert!(!is_compatible(&const_int, &TypeSymbol::Int));
        assert!(is_compatible(&const_int, &TypeSymbol::Const(int())));
        assert!(const_int.is_arithmetic());
    }

    #[test]
    fn test_struct_identity() {
        let a = Rc::new(TypeSymbol::Struct(StructType::new("a")));
        let b = Rc::new(TypeSymbol::Struct(StructType::new("a")));
        assert!(is_compatible(&a, &a.clone()));
        assert!(!is_compatible(&a, &b));
    }

    #[test]
    fn test_incomplete_types() {
        let s = TypeSymbol::Struct(StructType::new("s"));
        assert!(!s.is_complete());
        assert_eq!(s.size_of(), None);
        assert!(!TypeSymbol::Void.is_complete());
        assert!(TypeSymbol::Pointer(Rc::new(s)).is_complete());
    }

    #[test]
    fn test_sizes() {
        let array = TypeSymbol::Array {
            element: int(),
            size: Some(4),
        };
        assert_eq!(array.size_of(), Some(16));
        assert_eq!(TypeSymbol::Char.size_of(), Some(1));
    }

    #[test]
    fn test_oversized_array_has_no_size() {
        let rows = Rc::new(TypeSymbol::Array {
            element: int(),
            size: Some(usize::MAX / 2),
        });
        let table = TypeSymbol::Array {
            element: rows.clone(),
            size: Some(4),
        };
        assert_eq!(rows.size_of(), None);
        assert_eq!(table.size_of(), None);

        let huge = Rc::new(TypeSymbol::Array {
            element: Rc::new(TypeSymbol::Char),
            size: Some(usize::MAX),
        });
        let mut members = Scope::new(ScopeKind::Structure);
        members.add_variable(Rc::new(field("a", huge)));
        members.add_variable(Rc::new(field("b", int())));
        let s = StructType::new("big");
        s.complete(members);
        assert_eq!(TypeSymbol::Struct(s).size_of(), None);
    }

    #[test]
    fn test_redeclare_copies_signature_without_body() {
        let mut params = Scope::new(ScopeKind::Parameters);
        params.add_variable(Rc::new(Variable::new(
            "n",
            int(),
            VariableKind::Parameter,
            SourceLocation::new(1, 7),
        )));
        let original = FunctionType::new(int(), params, true);
        let copy = original.redeclare();
        assert_eq!(copy.param_types().len(), 1);
        assert!(copy.is_prototyped());
        assert!(!copy.has_body());
    }
}
