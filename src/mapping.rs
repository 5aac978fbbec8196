//! Field mappings: the scalar type of each sortable field and which object
//! paths are nested.
//!
//! The surrounding service owns the real mapping layer; the engine only needs
//! enough of it to validate sort requests (is the field mapped, what scalar
//! type does it compare as, is a path nested) and to coerce literal
//! missing-values before dispatch.

use std::collections::{HashMap, HashSet};

/// Scalar type a sortable field compares as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 64-bit signed integer values.
    Long,
    /// 64-bit floating point values.
    Double,
    /// Byte-comparable string values.
    Keyword,
    /// Latitude/longitude points, sortable through geo-distance only.
    GeoPoint,
}

impl FieldType {
    /// Request-surface name, used in error messages and `unmapped_type`.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Long => "long",
            FieldType::Double => "double",
            FieldType::Keyword => "keyword",
            FieldType::GeoPoint => "geo_point",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<FieldType> {
        match name {
            "long" => Some(FieldType::Long),
            "double" => Some(FieldType::Double),
            "keyword" => Some(FieldType::Keyword),
            "geo_point" => Some(FieldType::GeoPoint),
            _ => None,
        }
    }
}

/// Immutable lookup of field types and nested paths for one index.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    fields: HashMap<String, FieldType>,
    nested_paths: HashSet<String>,
}

impl Mapping {
    /// Starts building a mapping.
    pub fn builder() -> MappingBuilder {
        MappingBuilder::default()
    }

    /// Returns the scalar type of `field`, or `None` when unmapped.
    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.fields.get(field).copied()
    }

    /// True if `path` is declared as a nested object array.
    pub fn is_nested(&self, path: &str) -> bool {
        self.nested_paths.contains(path)
    }
}

/// Builder for [`Mapping`].
#[derive(Debug, Default)]
pub struct MappingBuilder {
    fields: HashMap<String, FieldType>,
    nested_paths: HashSet<String>,
}

impl MappingBuilder {
    /// Declares a sortable field.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> MappingBuilder {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Declares an object path as nested.
    pub fn nested(mut self, path: impl Into<String>) -> MappingBuilder {
        self.nested_paths.insert(path.into());
        self
    }

    /// Finalizes the mapping.
    pub fn build(self) -> Mapping {
        Mapping {
            fields: self.fields,
            nested_paths: self.nested_paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldType, Mapping};

    #[test]
    fn test_mapping_lookup() {
        let mapping = Mapping::builder()
            .field("price", FieldType::Double)
            .field("offer.price", FieldType::Double)
            .nested("offer")
            .build();
        assert_eq!(mapping.field_type("price"), Some(FieldType::Double));
        assert_eq!(mapping.field_type("missing"), None);
        assert!(mapping.is_nested("offer"));
        assert!(!mapping.is_nested("price"));
    }

    #[test]
    fn test_field_type_names_round_trip() {
        for field_type in [
            FieldType::Long,
            FieldType::Double,
            FieldType::Keyword,
            FieldType::GeoPoint,
        ] {
            assert_eq!(FieldType::from_name(field_type.name()), Some(field_type));
        }
    }
}
