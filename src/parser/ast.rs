// AST (Abstract Syntax Tree) definitions for the C front end

use crate::lexer::token::{Punctuator, SourceLocation, Token};
use crate::symbols::scope::{Scope, Variable};
use crate::symbols::types::TypeRef;
use std::fmt;
use std::rc::Rc;

/// Identifies a loop statement so `break`/`continue` can refer back to it
/// without owning it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(pub usize);

/// Binary operators, in precedence-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Multiplicative
    Mul,
    Div,
    Mod,
    // Additive
    Add,
    Sub,
    // Shift
    Shl,
    Shr,
    // Relational
    Lt,
    Gt,
    Le,
    Ge,
    // Equality
    Eq,
    Ne,
    // Bitwise
    BitAnd,
    BitXor,
    BitOr,
    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn from_punctuator(punctuator: Punctuator) -> Option<BinaryOp> {
        let op = match punctuator {
            Punctuator::Star => BinaryOp::Mul,
            Punctuator::Slash => BinaryOp::Div,
            Punctuator::Percent => BinaryOp::Mod,
            Punctuator::Plus => BinaryOp::Add,
            Punctuator::Minus => BinaryOp::Sub,
            Punctuator::LtLt => BinaryOp::Shl,
            Punctuator::GtGt => BinaryOp::Shr,
            Punctuator::Lt => BinaryOp::Lt,
            Punctuator::Gt => BinaryOp::Gt,
            Punctuator::Le => BinaryOp::Le,
            Punctuator::Ge => BinaryOp::Ge,
            Punctuator::EqEq => BinaryOp::Eq,
            Punctuator::NotEq => BinaryOp::Ne,
            Punctuator::Amp => BinaryOp::BitAnd,
            Punctuator::Caret => BinaryOp::BitXor,
            Punctuator::Pipe => BinaryOp::BitOr,
            Punctuator::AndAnd => BinaryOp::And,
            Punctuator::OrOr => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Binding strength: multiplicative = 9 down to logical or = 0.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 9,
            BinaryOp::Add | BinaryOp::Sub => 8,
            BinaryOp::Shl | BinaryOp::Shr => 7,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 6,
            BinaryOp::Eq | BinaryOp::Ne => 5,
            BinaryOp::BitAnd => 4,
            BinaryOp::BitXor => 3,
            BinaryOp::BitOr => 2,
            BinaryOp::And => 1,
            BinaryOp::Or => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    PreIncrement,  // ++x
    PreDecrement,  // --x
    PostIncrement, // x++
    PostDecrement, // x--
    Plus,          // +x
    Minus,         // -x
    Not,           // !x
    BitNot,        // ~x
    AddressOf,     // &x
    Deref,         // *x
    Sizeof,        // sizeof x, sizeof(type)
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => "++",
            UnaryOp::PreDecrement | UnaryOp::PostDecrement => "--",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::AddressOf => "&",
            UnaryOp::Deref => "*",
            UnaryOp::Sizeof => "sizeof",
        }
    }
}

/// Assignment operators; compound forms carry their arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

impl AssignOp {
    pub fn from_punctuator(punctuator: Punctuator) -> Option<AssignOp> {
        let op = match punctuator {
            Punctuator::Eq => return Some(AssignOp::Assign),
            Punctuator::StarEq => BinaryOp::Mul,
            Punctuator::SlashEq => BinaryOp::Div,
            Punctuator::PercentEq => BinaryOp::Mod,
            Punctuator::PlusEq => BinaryOp::Add,
            Punctuator::MinusEq => BinaryOp::Sub,
            Punctuator::LtLtEq => BinaryOp::Shl,
            Punctuator::GtGtEq => BinaryOp::Shr,
            Punctuator::AmpEq => BinaryOp::BitAnd,
            Punctuator::CaretEq => BinaryOp::BitXor,
            Punctuator::PipeEq => BinaryOp::BitOr,
            _ => return None,
        };
        Some(AssignOp::Compound(op))
    }
}

/// An expression node annotated with its type
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    /// The token the node was built from (operator, literal, or name)
    pub token: Token,
    pub ty: TypeRef,
}

#[derive(Debug)]
pub enum ExprKind {
    Identifier(Rc<Variable>),
    Literal,
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Assignment {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Subscript {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        member: Rc<Variable>,
        arrow: bool,
    },
    /// Conversion to `ty`; the first child is the type name
    Cast {
        target: Box<Expr>,
        operand: Box<Expr>,
    },
    /// A parenthesized type name (`sizeof(T)`, casts); `ty` is the named type
    TypeName,
    Comma(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, token: Token, ty: TypeRef) -> Self {
        Self { kind, token, ty }
    }

    pub fn location(&self) -> SourceLocation {
        self.token.location
    }

    /// Child nodes in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Identifier(_) | ExprKind::Literal | ExprKind::TypeName => Vec::new(),
            ExprKind::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            ExprKind::Unary { operand, .. } => vec![&**operand],
            ExprKind::Assignment { target, value, .. } => vec![&**target, &**value],
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => vec![&**condition, &**then_branch, &**else_branch],
            ExprKind::Subscript { array, index } => vec![&**array, &**index],
            ExprKind::Call { callee, arguments } => {
                let mut children = vec![&**callee];
                children.extend(arguments.iter());
                children
            }
            ExprKind::Member { object, .. } => vec![&**object],
            ExprKind::Cast { target, operand } => vec![&**target, &**operand],
            ExprKind::Comma(items) => items.iter().collect(),
        }
    }

    /// Whether the expression designates an object.
    pub fn is_lvalue(&self) -> bool {
        match &self.kind {
            ExprKind::Identifier(variable) => !self.ty.is_function() && !variable.name.is_empty(),
            ExprKind::Unary {
                op: UnaryOp::Deref, ..
            }
            | ExprKind::Subscript { .. } => true,
            ExprKind::Member { object, arrow, .. } => *arrow || object.is_lvalue(),
            ExprKind::Literal => self.ty.is_array(),
            _ => false,
        }
    }
}

/// Renders the tree in prefix form, e.g. `(+ 1 (* 2 3))`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Identifier(variable) => write!(f, "{}", variable.name),
            ExprKind::Literal => write!(f, "{}", self.token.text),
            ExprKind::TypeName => write!(f, "<{}>", self.ty),
            ExprKind::Binary { op, lhs, rhs } => write!(f, "({} {} {})", op.as_str(), lhs, rhs),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                    write!(f, "(post{} {})", op.as_str(), operand)
                }
                _ => write!(f, "({} {})", op.as_str(), operand),
            },
            ExprKind::Assignment { target, value, .. } => {
                write!(f, "({} {} {})", self.token.text, target, value)
            }
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "(? {} {} {})", condition, then_branch, else_branch),
            ExprKind::Subscript { array, index } => write!(f, "([] {} {})", array, index),
            ExprKind::Call { callee, arguments } => {
                write!(f, "(call {}", callee)?;
                for argument in arguments {
                    write!(f, " {}", argument)?;
                }
                write!(f, ")")
            }
            ExprKind::Member {
                object,
                member,
                arrow,
            } => write!(f, "({} {} {})", if *arrow { "->" } else { "." }, object, member.name),
            ExprKind::Cast { operand, .. } => write!(f, "(cast <{}> {})", self.ty, operand),
            ExprKind::Comma(items) => {
                write!(f, "(,")?;
                for item in items {
                    write!(f, " {}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A statement node
#[derive(Debug)]
pub struct Statement {
    pub kind: StatementKind,
    /// The token that introduced the statement
    pub token: Token,
}

#[derive(Debug)]
pub enum StatementKind {
    Compound {
        scope: Scope,
        statements: Vec<Statement>,
    },
    /// Local declarations, kept in order with the surrounding statements
    Declaration(Vec<Rc<Variable>>),
    /// An expression statement; `None` for the empty statement `;`
    Expression(Option<Expr>),
    Selection {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    For {
        id: LoopId,
        scope: Scope,
        init: Option<Box<Statement>>,
        condition: Option<Expr>,
        step: Option<Expr>,
        body: Box<Statement>,
    },
    Do {
        id: LoopId,
        body: Box<Statement>,
        condition: Expr,
    },
    While {
        id: LoopId,
        condition: Expr,
        body: Box<Statement>,
    },
    Return(Option<Expr>),
    Break {
        target: LoopId,
    },
    Continue {
        target: LoopId,
    },
}

impl Statement {
    pub fn new(kind: StatementKind, token: Token) -> Self {
        Self { kind, token }
    }

    pub fn location(&self) -> SourceLocation {
        self.token.location
    }

    /// The id of this statement if it is a loop.
    pub fn loop_id(&self) -> Option<LoopId> {
        match &self.kind {
            StatementKind::For { id, .. }
            | StatementKind::Do { id, .. }
            | StatementKind::While { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Nested statements in source order.
    pub fn sub_statements(&self) -> Vec<&Statement> {
        match &self.kind {
            StatementKind::Compound { statements, .. } => statements.iter().collect(),
            StatementKind::Selection {
                then_branch,
                else_branch,
                ..
            } => {
                let mut children = vec![&**then_branch];
                children.extend(else_branch.as_deref());
                children
            }
            StatementKind::For { init, body, .. } => {
                let mut children: Vec<&Statement> = init.as_deref().into_iter().collect();
                children.push(body);
                children
            }
            StatementKind::Do { body, .. } | StatementKind::While { body, .. } => vec![&**body],
            _ => Vec::new(),
        }
    }

    /// Resolve a `break`/`continue` target within this statement tree.
    pub fn find_loop(&self, id: LoopId) -> Option<&Statement> {
        if self.loop_id() == Some(id) {
            return Some(self);
        }
        self.sub_statements()
            .into_iter()
            .find_map(|statement| statement.find_loop(id))
    }
}
