// id.rs — Stable arena handles for syntax tree nodes
//
// The syntax tree is stored as three arenas (declarations, statements,
// expressions) owned by `ast::Program`. Every cross-reference (symbol table
// bindings, resolved-symbol annotations, the function-call stack) stores
// one of these handles instead of a pointer. Handles are the arena position
// of the node; they are allocated in insertion order and never reused.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle to a declaration node (`ast::Decl`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

/// Handle to a statement node (`ast::Stmt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtId(pub u32);

/// Handle to an expression node (`ast::Expr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub u32);

macro_rules! impl_handle {
    ($($ty:ident => $prefix:literal),*) => {
        $(
            impl $ty {
                /// Handle for the node at arena position `index`.
                pub fn from_index(index: usize) -> Self {
                    Self(index as u32)
                }

                /// Arena position of the node.
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}{}", $prefix, self.0)
                }
            }
        )*
    };
}

impl_handle!(DeclId => "d", StmtId => "s", ExprId => "e");
