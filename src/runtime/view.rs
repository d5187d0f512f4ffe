//! A "view" is a tagged byte snapshot moving across the expression stack:
//! it reads through the arena or constant pool without taking ownership.
//!
//! The specification models a view as a borrow into the arena; here it is
//! an owned snapshot instead. This is behaviorally identical as long as no
//! arena mutation can occur between a view's push and its consumption --
//! a straight-line guarantee the instruction set itself upholds, since
//! every statement's pushes are immediately drained by the store/call
//! that follows them.

use crate::tag::TypeTag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub tag: TypeTag,
    pub bytes: Vec<u8>,
}

impl View {
    pub fn new(tag: TypeTag, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.len(), tag.width());
        View { tag, bytes }
    }

    /// Interprets this view as an integer offset. Only {byte, short, int,
    /// long} are accepted as pointer offsets, per the pointer-alias rule
    /// that `bool`/`char`/`float`/`decimal` views are not valid offsets.
    pub fn as_i64(&self) -> Option<i64> {
        match self.tag {
            TypeTag::Byte => Some(self.bytes[0] as i64),
            TypeTag::Short => Some(i16::from_le_bytes(self.bytes.clone().try_into().ok()?) as i64),
            TypeTag::Int => Some(i32::from_le_bytes(self.bytes.clone().try_into().ok()?) as i64),
            TypeTag::Long => Some(i64::from_le_bytes(self.bytes.clone().try_into().ok()?)),
            TypeTag::Bool | TypeTag::Char | TypeTag::Float | TypeTag::Decimal => None,
        }
    }

    pub fn display(&self) -> String {
        match self.tag {
            TypeTag::Byte => self.bytes[0].to_string(),
            TypeTag::Short => i16::from_le_bytes(self.bytes.clone().try_into().unwrap()).to_string(),
            TypeTag::Int => i32::from_le_bytes(self.bytes.clone().try_into().unwrap()).to_string(),
            TypeTag::Long => i64::from_le_bytes(self.bytes.clone().try_into().unwrap()).to_string(),
            TypeTag::Float => f32::from_le_bytes(self.bytes.clone().try_into().unwrap()).to_string(),
            TypeTag::Decimal => {
                f64::from_le_bytes(self.bytes.clone().try_into().unwrap()).to_string()
            }
            TypeTag::Char => {
                let code = u32::from_le_bytes(self.bytes.clone().try_into().unwrap());
                char::from_u32(code).map(String::from).unwrap_or_default()
            }
            TypeTag::Bool => (self.bytes[0] != 0).to_string(),
        }
    }
}
