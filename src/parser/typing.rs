//! Expression typing
//!
//! Every expression node is built together with its type. The checks here
//! follow the usual C rules for the supported subset: arrays and functions
//! decay to pointers in value contexts, `char` promotes to `int` in
//! arithmetic, and qualifiers are dropped from rvalues.
//!
//! [`Parser::const_value`] evaluates integer constant expressions for array
//! sizes.

use crate::lexer::token::{Token, TokenValue};
use crate::parser::ast::{AssignOp, BinaryOp, Expr, ExprKind, UnaryOp};
use crate::parser::parse::{ParseError, Parser};
use crate::symbols::scope::Variable;
use crate::symbols::types::{is_compatible, TypeRef, TypeSymbol};
use std::rc::Rc;

impl Parser {
    /// The type of an expression used as a value.
    pub(crate) fn value_type(&self, ty: &TypeRef) -> TypeRef {
        match ty.base() {
            TypeSymbol::Array { element, .. } => Rc::new(TypeSymbol::Pointer(element.clone())),
            TypeSymbol::Function(_) => Rc::new(TypeSymbol::Pointer(ty.clone())),
            _ => TypeSymbol::unqualified(ty),
        }
    }

    /// Usual arithmetic conversions.
    fn arithmetic_result(&self, a: &TypeSymbol, b: &TypeSymbol) -> TypeRef {
        if matches!(a.base(), TypeSymbol::Float) || matches!(b.base(), TypeSymbol::Float) {
            self.builtins.float_type.clone()
        } else {
            self.builtins.int_type.clone()
        }
    }

    pub(crate) fn binary_type(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        token: &Token,
    ) -> Result<TypeRef, ParseError> {
        let l = self.value_type(&lhs.ty);
        let r = self.value_type(&rhs.ty);
        let int = self.builtins.int_type.clone();

        let result = match op {
            BinaryOp::Mul | BinaryOp::Div if l.is_arithmetic() && r.is_arithmetic() => {
                Some(self.arithmetic_result(&l, &r))
            }
            BinaryOp::Mod
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::BitAnd
            | BinaryOp::BitXor
            | BinaryOp::BitOr
                if l.is_integer() && r.is_integer() =>
            {
                Some(int)
            }
            BinaryOp::Add => {
                if l.is_arithmetic() && r.is_arithmetic() {
                    Some(self.arithmetic_result(&l, &r))
                } else if is_object_pointer(&l) && r.is_integer() {
                    Some(l.clone())
                } else if l.is_integer() && is_object_pointer(&r) {
                    Some(r.clone())
                } else {
                    None
                }
            }
            BinaryOp::Sub => {
                if l.is_arithmetic() && r.is_arithmetic() {
                    Some(self.arithmetic_result(&l, &r))
                } else if is_object_pointer(&l) && r.is_integer() {
                    Some(l.clone())
                } else if is_object_pointer(&l) && is_object_pointer(&r) && pointees_compatible(&l, &r) {
                    Some(int)
                } else {
                    None
                }
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let comparable = (l.is_arithmetic() && r.is_arithmetic())
                    || (l.is_pointer() && r.is_pointer() && pointees_compatible(&l, &r));
                comparable.then_some(int)
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let comparable = (l.is_arithmetic() && r.is_arithmetic())
                    || (l.is_pointer()
                        && r.is_pointer()
                        && (pointees_compatible(&l, &r) || is_void_pointer(&l) || is_void_pointer(&r)))
                    || (l.is_pointer() && self.is_null_constant(rhs))
                    || (self.is_null_constant(lhs) && r.is_pointer());
                comparable.then_some(int)
            }
            BinaryOp::And | BinaryOp::Or if l.is_scalar() && r.is_scalar() => Some(int),
            _ => None,
        };

        result.ok_or_else(|| {
            ParseError::syntax(
                format!(
                    "invalid operands to binary {} (have '{}' and '{}')",
                    op.as_str(),
                    lhs.ty,
                    rhs.ty
                ),
                token.location,
            )
        })
    }

    pub(crate) fn unary_type(&self, op: UnaryOp, operand: &Expr, token: &Token) -> Result<TypeRef, ParseError> {
        let ty = self.value_type(&operand.ty);
        let invalid = || {
            ParseError::syntax(
                format!("invalid type argument of unary '{}' (have '{}')", op.as_str(), operand.ty),
                token.location,
            )
        };

        match op {
            UnaryOp::Plus | UnaryOp::Minus if ty.is_arithmetic() => Ok(self.arithmetic_result(&ty, &ty)),
            UnaryOp::Not if ty.is_scalar() => Ok(self.builtins.int_type.clone()),
            UnaryOp::BitNot if ty.is_integer() => Ok(self.builtins.int_type.clone()),
            UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Not | UnaryOp::BitNot => Err(invalid()),
            UnaryOp::AddressOf => {
                if !operand.is_lvalue() && !operand.ty.is_function() {
                    return Err(ParseError::syntax(
                        "lvalue required as unary '&' operand",
                        token.location,
                    ));
                }
                Ok(Rc::new(TypeSymbol::Pointer(operand.ty.clone())))
            }
            UnaryOp::Deref => match ty.base() {
                TypeSymbol::Pointer(target) if target.is_void() => Err(ParseError::syntax(
                    "dereferencing 'void *' pointer",
                    token.location,
                )),
                TypeSymbol::Pointer(target) => Ok(target.clone()),
                _ => Err(invalid()),
            },
            UnaryOp::PreIncrement | UnaryOp::PostIncrement | UnaryOp::PreDecrement | UnaryOp::PostDecrement => {
                let what = match op {
                    UnaryOp::PreIncrement | UnaryOp::PostIncrement => "increment operand",
                    _ => "decrement operand",
                };
                self.check_modifiable(operand, what, token)?;
                if ty.is_arithmetic() || is_object_pointer(&ty) {
                    Ok(ty)
                } else {
                    Err(invalid())
                }
            }
            UnaryOp::Sizeof => self.sizeof_type(&operand.ty, token),
        }
    }

    /// `sizeof` applies to complete object types only.
    pub(crate) fn sizeof_type(&self, ty: &TypeRef, token: &Token) -> Result<TypeRef, ParseError> {
        if ty.is_function() {
            return Err(ParseError::syntax(
                "invalid application of 'sizeof' to a function type",
                token.location,
            ));
        }
        if !ty.is_complete() {
            return Err(ParseError::syntax(
                format!("invalid application of 'sizeof' to incomplete type '{}'", ty),
                token.location,
            ));
        }
        Ok(self.builtins.int_type.clone())
    }

    /// The target of an assignment, increment, or decrement must be a
    /// modifiable lvalue.
    pub(crate) fn check_modifiable(&self, target: &Expr, what: &str, token: &Token) -> Result<(), ParseError> {
        if target.ty.is_array() {
            return Err(ParseError::syntax(
                "assignment to expression with array type",
                token.location,
            ));
        }
        if !target.is_lvalue() {
            return Err(ParseError::syntax(format!("lvalue required as {}", what), token.location));
        }
        if target.ty.is_const() || has_const_member(&target.ty) {
            let message = match &target.kind {
                ExprKind::Identifier(variable) => format!("assignment of read-only variable '{}'", variable.name),
                ExprKind::Member { member, .. } => format!("assignment of read-only member '{}'", member.name),
                _ => "assignment of read-only location".to_string(),
            };
            return Err(ParseError::syntax(message, token.location));
        }
        Ok(())
    }

    pub(crate) fn assignment_type(
        &self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        token: &Token,
    ) -> Result<TypeRef, ParseError> {
        self.check_modifiable(target, "left operand of assignment", token)?;

        match op {
            AssignOp::Assign => self.check_assignable(&target.ty, value, "assignment")?,
            AssignOp::Compound(binary) => {
                let result = self.binary_type(binary, target, value, token)?;
                self.check_conversion(&target.ty, &result, false, "assignment", token)?;
            }
        }

        Ok(self.value_type(&target.ty))
    }

    pub(crate) fn conditional_type(
        &self,
        condition: &Expr,
        then_branch: &Expr,
        else_branch: &Expr,
        token: &Token,
    ) -> Result<TypeRef, ParseError> {
        self.check_scalar(condition, "conditional expression")?;
        let t = self.value_type(&then_branch.ty);
        let e = self.value_type(&else_branch.ty);

        let result = if t.is_arithmetic() && e.is_arithmetic() {
            Some(self.arithmetic_result(&t, &e))
        } else if t.is_void() && e.is_void() {
            Some(t)
        } else if let (Some(a), Some(b)) = (t.as_struct(), e.as_struct()) {
            std::ptr::eq(a, b).then(|| t.clone())
        } else if t.is_pointer() && e.is_pointer() {
            if pointees_compatible(&t, &e) || is_void_pointer(&e) {
                Some(e)
            } else if is_void_pointer(&t) {
                Some(t)
            } else {
                None
            }
        } else if t.is_pointer() && self.is_null_constant(else_branch) {
            Some(t)
        } else if e.is_pointer() && self.is_null_constant(then_branch) {
            Some(e)
        } else {
            None
        };

        result.ok_or_else(|| {
            ParseError::syntax(
                format!(
                    "type mismatch in conditional expression (have '{}' and '{}')",
                    then_branch.ty, else_branch.ty
                ),
                token.location,
            )
        })
    }

    pub(crate) fn subscript_type(&self, array: &Expr, index: &Expr, token: &Token) -> Result<TypeRef, ParseError> {
        let a = self.value_type(&array.ty);
        let i = self.value_type(&index.ty);

        let (pointer, offset) = if a.is_pointer() {
            (a, i)
        } else if i.is_pointer() {
            (i, a)
        } else {
            return Err(ParseError::syntax(
                "subscripted value is neither array nor pointer",
                token.location,
            ));
        };
        if !offset.is_integer() {
            return Err(ParseError::syntax("array subscript is not an integer", token.location));
        }

        match pointer.pointee() {
            Some(element) if element.is_complete() => Ok(element.clone()),
            _ => Err(ParseError::syntax(
                format!("subscripted value has incomplete element type ('{}')", pointer),
                token.location,
            )),
        }
    }

    pub(crate) fn call_type(&self, callee: &Expr, arguments: &[Expr], token: &Token) -> Result<TypeRef, ParseError> {
        let ty = self.value_type(&callee.ty);
        let Some(function) = ty.pointee().and_then(|target| target.as_function()) else {
            return Err(ParseError::syntax(
                format!("called object '{}' is not a function", callee),
                token.location,
            ));
        };

        if function.is_prototyped() {
            let params = function.param_types();
            let name = &callee.token.text;
            if arguments.len() < params.len() {
                return Err(ParseError::syntax(
                    format!("too few arguments to function '{}'", name),
                    token.location,
                ));
            }
            if arguments.len() > params.len() {
                return Err(ParseError::syntax(
                    format!("too many arguments to function '{}'", name),
                    token.location,
                ));
            }
            for (index, (param, argument)) in params.iter().zip(arguments).enumerate() {
                let ctx = format!("argument {} of '{}'", index + 1, name);
                self.check_assignable(param, argument, &ctx)?;
            }
        }

        let return_type = &function.return_type;
        if !return_type.is_void() && !return_type.is_complete() {
            return Err(ParseError::syntax(
                format!("calling function with incomplete return type '{}'", return_type),
                token.location,
            ));
        }
        Ok(TypeSymbol::unqualified(return_type))
    }

    /// Look up the member named by `name` in the struct designated by
    /// `object`. The member is const if the struct object is.
    pub(crate) fn resolve_member(
        &self,
        object: &Expr,
        name: &Token,
        arrow: bool,
    ) -> Result<(Rc<Variable>, TypeRef), ParseError> {
        let container = if arrow {
            let ty = self.value_type(&object.ty);
            let target = ty
                .pointee()
                .filter(|target| ty.is_pointer() && target.as_struct().is_some())
                .cloned();
            target.ok_or_else(|| {
                ParseError::syntax(
                    format!("invalid type argument of '->' (have '{}')", object.ty),
                    name.location,
                )
            })?
        } else {
            object.ty.clone()
        };

        let Some(s) = container.as_struct() else {
            return Err(ParseError::syntax(
                format!("request for member '{}' in something not a structure", name.text),
                name.location,
            ));
        };
        if !s.is_complete() {
            return Err(ParseError::syntax(
                format!("invalid use of incomplete type 'struct {}'", s.tag),
                name.location,
            ));
        }
        let Some(field) = s.field(&name.text) else {
            return Err(ParseError::syntax(
                format!("'struct {}' has no member named '{}'", s.tag, name.text),
                name.location,
            ));
        };

        let ty = if container.is_const() && !field.ty.is_const() {
            Rc::new(TypeSymbol::Const(field.ty.clone()))
        } else {
            field.ty.clone()
        };
        Ok((field, ty))
    }

    pub(crate) fn cast_check(&self, target: &TypeRef, operand: &Expr, token: &Token) -> Result<(), ParseError> {
        if target.is_void() {
            return Ok(());
        }
        if !target.is_scalar() {
            return Err(ParseError::syntax(
                format!("conversion to non-scalar type '{}' requested", target),
                token.location,
            ));
        }

        let source = self.value_type(&operand.ty);
        let float_pointer = (source.is_pointer() && matches!(target.base(), TypeSymbol::Float))
            || (target.is_pointer() && matches!(source.base(), TypeSymbol::Float));
        if !source.is_scalar() || float_pointer {
            return Err(ParseError::syntax(
                format!("invalid cast from '{}' to '{}'", operand.ty, target),
                token.location,
            ));
        }
        Ok(())
    }

    /// Conditions of `if`, loops, `?:`, `!`, `&&`, and `||` must be scalar.
    pub(crate) fn check_scalar(&self, expr: &Expr, ctx: &str) -> Result<(), ParseError> {
        if self.value_type(&expr.ty).is_scalar() {
            Ok(())
        } else {
            Err(ParseError::syntax(
                format!("used '{}' where a scalar is required in {}", expr.ty, ctx),
                expr.location(),
            ))
        }
    }

    pub(crate) fn check_assignable(&self, target: &TypeRef, value: &Expr, ctx: &str) -> Result<(), ParseError> {
        self.check_conversion(target, &value.ty, self.is_null_constant(value), ctx, &value.token)
    }

    /// Whether a value of type `source` converts implicitly to `target`.
    pub(crate) fn check_conversion(
        &self,
        target: &TypeRef,
        source: &TypeRef,
        is_null: bool,
        ctx: &str,
        token: &Token,
    ) -> Result<(), ParseError> {
        let t = TypeSymbol::unqualified(target);
        let s = self.value_type(source);

        let allowed = if t.is_arithmetic() {
            s.is_arithmetic()
        } else if t.is_pointer() {
            (s.is_pointer() && (pointees_compatible(&t, &s) || is_void_pointer(&t) || is_void_pointer(&s)))
                || (s.is_integer() && is_null)
        } else if let Some(a) = t.as_struct() {
            s.as_struct().is_some_and(|b| std::ptr::eq(a, b))
        } else {
            false
        };

        if !allowed {
            return Err(ParseError::syntax(
                format!("incompatible types in {}: cannot convert '{}' to '{}'", ctx, source, target),
                token.location,
            ));
        }
        if t.is_pointer() && s.is_pointer() && discards_const(&t, &s) {
            return Err(ParseError::syntax(
                format!("{} discards 'const' qualifier from pointer target type", ctx),
                token.location,
            ));
        }
        Ok(())
    }

    /// An integer constant expression with value 0, or such a constant cast
    /// to `void *`.
    pub(crate) fn is_null_constant(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Cast { operand, .. } if is_void_pointer(&expr.ty) => self.is_null_constant(operand),
            _ => expr.ty.is_integer() && self.const_value(expr) == Some(0),
        }
    }

    /// Evaluate an integer constant expression.
    pub(crate) fn const_value(&self, expr: &Expr) -> Option<i64> {
        if !expr.ty.is_integer() {
            return None;
        }

        match &expr.kind {
            ExprKind::Literal => match expr.token.value {
                TokenValue::Integer(value) => Some(i64::from(value)),
                TokenValue::CodePoint(value) => Some(i64::from(value)),
                _ => None,
            },
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Sizeof => operand.ty.size_of().and_then(|size| i64::try_from(size).ok()),
                UnaryOp::Plus => self.const_value(operand),
                UnaryOp::Minus => self.const_value(operand)?.checked_neg(),
                UnaryOp::Not => Some(i64::from(self.const_value(operand)? == 0)),
                UnaryOp::BitNot => Some(!self.const_value(operand)?),
                _ => None,
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.const_value(lhs)?;
                // Logical operators short-circuit.
                match op {
                    BinaryOp::And if l == 0 => return Some(0),
                    BinaryOp::Or if l != 0 => return Some(1),
                    _ => {}
                }
                let r = self.const_value(rhs)?;
                match op {
                    BinaryOp::Mul => l.checked_mul(r),
                    BinaryOp::Div => l.checked_div(r),
                    BinaryOp::Mod => l.checked_rem(r),
                    BinaryOp::Add => l.checked_add(r),
                    BinaryOp::Sub => l.checked_sub(r),
                    BinaryOp::Shl => l.checked_shl(u32::try_from(r).ok()?),
                    BinaryOp::Shr => l.checked_shr(u32::try_from(r).ok()?),
                    BinaryOp::Lt => Some(i64::from(l < r)),
                    BinaryOp::Gt => Some(i64::from(l > r)),
                    BinaryOp::Le => Some(i64::from(l <= r)),
                    BinaryOp::Ge => Some(i64::from(l >= r)),
                    BinaryOp::Eq => Some(i64::from(l == r)),
                    BinaryOp::Ne => Some(i64::from(l != r)),
                    BinaryOp::BitAnd => Some(l & r),
                    BinaryOp::BitXor => Some(l ^ r),
                    BinaryOp::BitOr => Some(l | r),
                    BinaryOp::And | BinaryOp::Or => Some(i64::from(r != 0)),
                }
            }
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.const_value(condition)? != 0 {
                    self.const_value(then_branch)
                } else {
                    self.const_value(else_branch)
                }
            }
            ExprKind::Cast { operand, .. } => {
                let value = self.const_value(operand)?;
                Some(match expr.ty.base() {
                    TypeSymbol::Char => i64::from(value as i8),
                    _ => i64::from(value as i32),
                })
            }
            _ => None,
        }
    }
}

fn is_void_pointer(ty: &TypeSymbol) -> bool {
    ty.is_pointer() && ty.pointee().is_some_and(|target| target.is_void())
}

/// Pointer to a complete object type; only these support arithmetic.
fn is_object_pointer(ty: &TypeSymbol) -> bool {
    ty.is_pointer() && ty.pointee().is_some_and(|target| target.is_complete())
}

/// Whether two pointer types point at compatible types, ignoring qualifiers
/// on the pointees.
fn pointees_compatible(a: &TypeSymbol, b: &TypeSymbol) -> bool {
    match (a.pointee(), b.pointee()) {
        (Some(x), Some(y)) => is_compatible(&TypeSymbol::unqualified(x), &TypeSymbol::unqualified(y)),
        _ => false,
    }
}

/// Whether `source` points at const data that `target` would make writable.
fn discards_const(target: &TypeSymbol, source: &TypeSymbol) -> bool {
    let target_const = target.pointee().is_some_and(|ty| ty.is_const());
    let source_const = source.pointee().is_some_and(|ty| ty.is_const());
    source_const && !target_const
}

/// Structs with a const member cannot be assigned as a whole.
fn has_const_member(ty: &TypeSymbol) -> bool {
    match ty.as_struct() {
        Some(s) if s.is_complete() => s
            .members()
            .variables()
            .any(|field| field.ty.is_const() || has_const_member(&field.ty)),
        _ => false,
    }
}
