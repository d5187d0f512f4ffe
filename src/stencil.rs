//! Compile-time field layout for structurally typed composite values:
//! named structs and anonymous tuples.
//!
//! Offsets are cumulative packed sums of field widths in declaration
//! order -- no padding, no alignment. Stencils are immutable once
//! registered; the registry lives on the `Compiler`.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::tag::TypeTag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub offset: usize,
    pub tag: TypeTag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stencil {
    pub name: String,
    pub fields: Vec<FieldLayout>,
    pub total_size: usize,
}

impl Stencil {
    pub fn lookup_field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn lookup_index(&self, index: usize) -> Option<&FieldLayout> {
        self.lookup_field(&index.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StencilError {
    #[error("struct declaration requires a non-empty name")]
    EmptyName,
    #[error("unknown type name '{0}'")]
    UnknownTypeName(String),
    #[error("struct '{struct_name}' has a duplicate field '{field}'")]
    DuplicateField { struct_name: String, field: String },
    #[error("'{0}' is a reserved type name and cannot be used as a struct name")]
    ReservedTypeName(String),
}

pub struct StencilRegistry {
    stencils: HashMap<String, Rc<Stencil>>,
    next_anonymous_id: u64,
}

impl StencilRegistry {
    pub fn new() -> Self {
        StencilRegistry { stencils: HashMap::new(), next_anonymous_id: 0 }
    }

    /// Registers a named struct. Rejects an empty name, a name shadowing a
    /// primitive type name, an unknown field type, or a duplicate field
    /// name within the same struct.
    pub fn register(
        &mut self,
        name: &str,
        fields: &[(String, String)],
    ) -> Result<Rc<Stencil>, StencilError> {
        if name.is_empty() {
            return Err(StencilError::EmptyName);
        }
        if TypeTag::from_name(name).is_some() {
            return Err(StencilError::ReservedTypeName(name.to_string()));
        }
        let stencil = Rc::new(self.build(name, fields)?);
        self.stencils.insert(name.to_string(), stencil.clone());
        Ok(stencil)
    }

    /// Registers (or reuses, by element tag signature) an anonymous tuple
    /// stencil. Field names are synthesized as "0", "1", ....
    pub fn register_anonymous(&mut self, element_tags: &[TypeTag]) -> Rc<Stencil> {
        let mut offset = 0usize;
        let mut fields = Vec::with_capacity(element_tags.len());
        for (i, tag) in element_tags.iter().enumerate() {
            fields.push(FieldLayout { name: i.to_string(), offset, tag: *tag });
            offset += tag.width();
        }
        self.next_anonymous_id += 1;
        Rc::new(Stencil {
            name: format!("$tuple{}", self.next_anonymous_id),
            fields,
            total_size: offset,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Stencil>> {
        self.stencils.get(name).cloned()
    }

    fn build(&self, name: &str, fields: &[(String, String)]) -> Result<Stencil, StencilError> {
        let mut seen = std::collections::HashSet::new();
        let mut offset = 0usize;
        let mut layout = Vec::with_capacity(fields.len());
        for (field_name, type_name) in fields {
            if !seen.insert(field_name.clone()) {
                return Err(StencilError::DuplicateField {
                    struct_name: name.to_string(),
                    field: field_name.clone(),
                });
            }
            let tag = TypeTag::from_name(type_name)
                .ok_or_else(|| StencilError::UnknownTypeName(type_name.clone()))?;
            layout.push(FieldLayout { name: field_name.clone(), offset, tag });
            offset += tag.width();
        }
        Ok(Stencil { name: name.to_string(), fields: layout, total_size: offset })
    }
}

impl Default for StencilRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(name: &str, ty: &str) -> (String, String) {
        (name.to_string(), ty.to_string())
    }

    #[test]
    fn packs_fields_with_no_padding() {
        let mut reg = StencilRegistry::new();
        let s = reg
            .register("record", &[f("id", "int"), f("active", "bool"), f("score", "float")])
            .unwrap();
        assert_eq!(s.lookup_field("id").unwrap().offset, 0);
        assert_eq!(s.lookup_field("active").unwrap().offset, 4);
        assert_eq!(s.lookup_field("score").unwrap().offset, 5);
        assert_eq!(s.total_size, 9);
    }

    #[test]
    fn anonymous_tuple_synthesizes_numeric_names() {
        let mut reg = StencilRegistry::new();
        let s = reg.register_anonymous(&[TypeTag::Int, TypeTag::Bool]);
        assert_eq!(s.lookup_index(0).unwrap().tag, TypeTag::Int);
        assert_eq!(s.lookup_index(1).unwrap().tag, TypeTag::Bool);
        assert!(s.lookup_index(5).is_none());
    }

    #[test]
    fn rejects_unknown_field_type() {
        let mut reg = StencilRegistry::new();
        let err = reg.register("bad", &[f("x", "nope")]).unwrap_err();
        assert_eq!(err, StencilError::UnknownTypeName("nope".to_string()));
    }

    #[test]
    fn rejects_reserved_and_empty_names() {
        let mut reg = StencilRegistry::new();
        assert_eq!(reg.register("", &[]).unwrap_err(), StencilError::EmptyName);
        assert_eq!(
            reg.register("int", &[]).unwrap_err(),
            StencilError::ReservedTypeName("int".to_string())
        );
    }
}
