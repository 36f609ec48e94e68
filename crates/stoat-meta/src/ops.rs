//! Operation tags and the erased callable shapes stored in registry tables.

use crate::handle::Handle;
use crate::span::Span;
use crate::view::View;

/// Placement-constructs into the output view from the argument list.
pub type ConstructorFn = fn(View, &Span);

/// Destroys the value behind the view in place.
pub type DestructorFn = fn(View);

/// Mutates the target from the argument list, returning the target view.
pub type AssignerFn = fn(View, &Span) -> View;

/// Reinterprets the same bytes as another registered type.
pub type CasterFn = fn(View) -> View;

/// Materializes a fresh value of the destination type from the source.
pub type ConverterFn = fn(View) -> Handle;

/// Unary operator handler.
pub type UnaryFn = fn(View) -> Handle;

/// Binary operator handler.
pub type BinaryFn = fn(View, View) -> Handle;

/// Unary operation tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    Pos,
    Neg,
    BitNot,
    Not,
}

impl UnaryOp {
    pub const COUNT: usize = 8;

    pub const ALL: [UnaryOp; Self::COUNT] = [
        UnaryOp::PreInc,
        UnaryOp::PreDec,
        UnaryOp::PostInc,
        UnaryOp::PostDec,
        UnaryOp::Pos,
        UnaryOp::Neg,
        UnaryOp::BitNot,
        UnaryOp::Not,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Binary operation tags. Arithmetic and bitwise operations come in fresh and
/// in-place pairs; comparisons and logical operations always produce a fresh
/// bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Mul,
    MulAssign,
    Div,
    DivAssign,
    Rem,
    RemAssign,
    BitAnd,
    BitAndAssign,
    BitOr,
    BitOrAssign,
    BitXor,
    BitXorAssign,
    Shl,
    ShlAssign,
    Shr,
    ShrAssign,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub const COUNT: usize = 28;

    pub const ALL: [BinaryOp; Self::COUNT] = [
        BinaryOp::Add,
        BinaryOp::AddAssign,
        BinaryOp::Sub,
        BinaryOp::SubAssign,
        BinaryOp::Mul,
        BinaryOp::MulAssign,
        BinaryOp::Div,
        BinaryOp::DivAssign,
        BinaryOp::Rem,
        BinaryOp::RemAssign,
        BinaryOp::BitAnd,
        BinaryOp::BitAndAssign,
        BinaryOp::BitOr,
        BinaryOp::BitOrAssign,
        BinaryOp::BitXor,
        BinaryOp::BitXorAssign,
        BinaryOp::Shl,
        BinaryOp::ShlAssign,
        BinaryOp::Shr,
        BinaryOp::ShrAssign,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the operation mutates its left operand.
    pub fn is_in_place(self) -> bool {
        matches!(
            self,
            BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::RemAssign
                | BinaryOp::BitAndAssign
                | BinaryOp::BitOrAssign
                | BinaryOp::BitXorAssign
                | BinaryOp::ShlAssign
                | BinaryOp::ShrAssign
        )
    }
}
