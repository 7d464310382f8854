//! Symbol and type system
//!
//! - [`types`]: shared type symbols and compatibility
//! - [`scope`]: symbol tables, variables, and the scope stack used by the parser

pub mod scope;
pub mod types;

pub use scope::{Binding, Scope, ScopeKind, ScopeStack, Variable, VariableKind};
pub use types::{is_compatible, FunctionType, StructType, TypeRef, TypeSymbol};
