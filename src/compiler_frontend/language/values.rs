use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Runtime type tag carried next to every value.
/// The numeric codes are part of the native ABI (the tag register / tag word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TypeTag {
    #[default]
    Scalar,
    ScalarArray,
    BoxedArray,
}

impl TypeTag {
    pub fn code(self) -> i32 {
        match self {
            TypeTag::Scalar => 0,
            TypeTag::ScalarArray => 1,
            TypeTag::BoxedArray => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<TypeTag> {
        match code {
            0 => Some(TypeTag::Scalar),
            1 => Some(TypeTag::ScalarArray),
            2 => Some(TypeTag::BoxedArray),
            _ => None,
        }
    }

    /// Only arrays are reference counted. Strings are scalar handles.
    pub fn is_counted(self) -> bool {
        matches!(self, TypeTag::ScalarArray | TypeTag::BoxedArray)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TaggedValue {
    pub value: i32,
    pub tag: TypeTag,
}

impl TaggedValue {
    pub fn new(value: i32, tag: TypeTag) -> Self {
        TaggedValue { value, tag }
    }

    pub fn scalar(value: i32) -> Self {
        TaggedValue {
            value,
            tag: TypeTag::Scalar,
        }
    }
}

impl Display for TaggedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.tag {
            TypeTag::Scalar => write!(f, "{}", self.value),
            TypeTag::ScalarArray => write!(f, "[#{}]", self.value),
            TypeTag::BoxedArray => write!(f, "{{#{}}}", self.value),
        }
    }
}
