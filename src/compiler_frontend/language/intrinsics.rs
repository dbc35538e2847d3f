//! The fixed catalogue of built-in functions.
//!
//! Every executor implements exactly these, with the same names and arities.
//! The native runtime exports one symbol per intrinsic.

use crate::compiler_frontend::language::ast_nodes::FunctionKey;
use crate::compiler_frontend::language::values::TypeTag;
use serde::Serialize;

/// The only exception type raised by the runtime itself
pub const INDEX_OUT_OF_BOUNDS: &str = "IndexOutOfBounds";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Intrinsic {
    Read,
    Write,
    StrMake,
    StrCmp,
    StrGet,
    StrDup,
    StrSet,
    StrCat,
    StrSub,
    StrLen,
    ArrMake,
    ArrMakeBoxed,
    ArrGet,
    ArrSet,
    ArrLen,
}

/// How the tag of an intrinsic's result is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTag {
    Static(TypeTag),

    // Elements of boxed arrays keep their own tag
    Dynamic,
}

impl Intrinsic {
    pub const ALL: [Intrinsic; 15] = [
        Intrinsic::Read,
        Intrinsic::Write,
        Intrinsic::StrMake,
        Intrinsic::StrCmp,
        Intrinsic::StrGet,
        Intrinsic::StrDup,
        Intrinsic::StrSet,
        Intrinsic::StrCat,
        Intrinsic::StrSub,
        Intrinsic::StrLen,
        Intrinsic::ArrMake,
        Intrinsic::ArrMakeBoxed,
        Intrinsic::ArrGet,
        Intrinsic::ArrSet,
        Intrinsic::ArrLen,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::Read => "read",
            Intrinsic::Write => "write",
            Intrinsic::StrMake => "strmake",
            Intrinsic::StrCmp => "strcmp",
            Intrinsic::StrGet => "strget",
            Intrinsic::StrDup => "strdup",
            Intrinsic::StrSet => "strset",
            Intrinsic::StrCat => "strcat",
            Intrinsic::StrSub => "strsub",
            Intrinsic::StrLen => "strlen",
            Intrinsic::ArrMake => "arrmake",
            Intrinsic::ArrMakeBoxed => "Arrmake",
            Intrinsic::ArrGet => "arrget",
            Intrinsic::ArrSet => "arrset",
            Intrinsic::ArrLen => "arrlen",
        }
    }

    /// The runtime symbol. Only `Arrmake` differs from its source name,
    /// since symbols are case-insensitive on some linkers.
    pub fn native_symbol(self) -> &'static str {
        match self {
            Intrinsic::ArrMakeBoxed => "arrmake_boxed",
            other => other.name(),
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Intrinsic::Read => 0,
            Intrinsic::Write | Intrinsic::StrDup | Intrinsic::StrLen | Intrinsic::ArrLen => 1,
            Intrinsic::StrMake
            | Intrinsic::StrCmp
            | Intrinsic::StrGet
            | Intrinsic::StrCat
            | Intrinsic::ArrMake
            | Intrinsic::ArrMakeBoxed
            | Intrinsic::ArrGet => 2,
            Intrinsic::StrSet | Intrinsic::StrSub | Intrinsic::ArrSet => 3,
        }
    }

    pub fn can_throw(self) -> bool {
        matches!(
            self,
            Intrinsic::StrGet
                | Intrinsic::StrSet
                | Intrinsic::StrSub
                | Intrinsic::ArrGet
                | Intrinsic::ArrSet
        )
    }

    pub fn result_tag(self) -> ResultTag {
        match self {
            Intrinsic::ArrMake => ResultTag::Static(TypeTag::ScalarArray),
            Intrinsic::ArrMakeBoxed => ResultTag::Static(TypeTag::BoxedArray),
            Intrinsic::ArrGet => ResultTag::Dynamic,
            _ => ResultTag::Static(TypeTag::Scalar),
        }
    }

    /// The result is a fresh array holding one reference the caller must release
    pub fn returns_owned(self) -> bool {
        matches!(self, Intrinsic::ArrMake | Intrinsic::ArrMakeBoxed)
    }

    /// The result can be an element its array still owns. Native code takes
    /// a reference of its own, since a later argument may overwrite the element.
    pub fn retains_result(self) -> bool {
        matches!(self, Intrinsic::ArrGet)
    }

    pub fn key(self) -> FunctionKey {
        FunctionKey::new(self.name(), self.arity())
    }

    pub fn lookup(name: &str, arity: usize) -> Option<Intrinsic> {
        Intrinsic::ALL
            .into_iter()
            .find(|intrinsic| intrinsic.name() == name && intrinsic.arity() == arity)
    }
}

impl std::fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
