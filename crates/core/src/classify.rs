//! Declaration classification: return-type voidness, constructor/destructor
//! detection, and the minimum-body guard.

use crate::types::Declaration;

/// Bodies with this many elements or fewer are left alone.
pub const MIN_BODY_ELEMENTS: usize = 2;

/// What the planner needs to know about one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_void_return: bool,
    pub is_ctor: bool,
    pub is_dtor: bool,
    pub body_too_small: bool,
}

impl Classification {
    /// Whether execution can leave the body through its closing brace
    /// without a value, so an exit marker belongs before that brace.
    pub fn may_fall_through(&self) -> bool {
        self.is_void_return || self.is_ctor || self.is_dtor
    }
}

pub fn classify(decl: &Declaration) -> Classification {
    Classification {
        is_void_return: decl.return_type.as_deref().is_some_and(is_void),
        is_ctor: decl.is_constructor(),
        is_dtor: decl.is_destructor(),
        body_too_small: decl.body.as_ref().is_some_and(|b| b.len() <= MIN_BODY_ELEMENTS),
    }
}

/// `void` exactly, ignoring surrounding whitespace. `void*` and `void&` are not void.
fn is_void(return_type: &str) -> bool {
    return_type.trim() == "void"
}
