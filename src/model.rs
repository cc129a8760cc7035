use std::collections::HashMap;
use std::fs;
use std::path::Path as FsPath;

use serde::Deserialize;

use crate::error::CompileError;

/// The shape of a single member of a model type: a name plus the
/// classification of the value it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub classification: Classification,
}

/// How a member's declared type resolves. `Record` defers to another entry
/// in the same catalog; the rest are built in and terminal except for the
/// container forms, which recurse into their element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    String,
    Number,
    Boolean,
    List(Box<Classification>),
    Array(Box<Classification>),
    Nullable(Box<Classification>),
    Map,
    Lambda,
    Record(String),
}

impl Classification {
    fn parse(raw: &str) -> Result<Self, CompileError> {
        let raw = raw.trim();
        if let Some(inner) = raw.strip_prefix("list<").and_then(|s| s.strip_suffix('>')) {
            return Ok(Classification::List(Box::new(Classification::parse(inner)?)));
        }
        if let Some(inner) = raw.strip_prefix("array<").and_then(|s| s.strip_suffix('>')) {
            return Ok(Classification::Array(Box::new(Classification::parse(inner)?)));
        }
        if let Some(inner) = raw.strip_prefix("nullable<").and_then(|s| s.strip_suffix('>')) {
            return Ok(Classification::Nullable(Box::new(Classification::parse(inner)?)));
        }
        match raw {
            "string" | "String" => Ok(Classification::String),
            "number" => Ok(Classification::Number),
            "boolean" => Ok(Classification::Boolean),
            "map" => Ok(Classification::Map),
            "lambda" => Ok(Classification::Lambda),
            "" => Err(CompileError::InvalidPathMapping {
                prefix: "(empty type string)".into(),
            }),
            name => Ok(Classification::Record(name.to_string())),
        }
    }

    /// Whether a value of this classification is Mustache-falsy when bare
    /// (null, false, or an empty list/array). Maps are deliberately excluded
    /// here: an empty map is still truthy, per this compiler's model.
    pub fn is_falsy_when_empty(&self) -> bool {
        matches!(self, Classification::List(_) | Classification::Array(_) | Classification::Nullable(_))
    }

    pub fn element(&self) -> Option<&Classification> {
        match self {
            Classification::List(inner) | Classification::Array(inner) | Classification::Nullable(inner) => {
                Some(inner)
            }
            _ => None,
        }
    }
}

/// The statically-known shape of one model type, with its own members
/// flattened together with whatever it classifies as "extends" via a record
/// reference cycle resolved at catalog-build time.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub members: HashMap<String, Classification>,
}

impl TypeDescriptor {
    pub fn member(&self, name: &str) -> Option<&Classification> {
        self.members.get(name)
    }
}

/// The full set of model types available to the resolver, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeCatalog {
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// Loads a catalog from a manifest TOML document.
    pub fn from_toml(source: &str) -> Result<Self, CompileError> {
        let manifest: Manifest = toml::from_str(source).map_err(|e| CompileError::Internal(e.to_string()))?;
        let mut types = HashMap::new();
        for raw in manifest.r#type {
            let mut members = HashMap::new();
            for member in raw.member {
                members.insert(member.name, Classification::parse(&member.r#type)?);
            }
            types.insert(
                raw.name.clone(),
                TypeDescriptor {
                    name: raw.name,
                    members,
                },
            );
        }
        Ok(TypeCatalog { types })
    }

    pub fn from_file(path: impl AsRef<FsPath>) -> Result<Self, CompileError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|_| CompileError::ResourceNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&text)
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "type")]
    r#type: Vec<RawType>,
}

#[derive(Debug, Deserialize)]
struct RawType {
    name: String,
    #[serde(default)]
    #[allow(dead_code)]
    classification: Option<String>,
    #[serde(default, rename = "member")]
    member: Vec<RawMember>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    name: String,
    r#type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_record_catalog() {
        let toml = r#"
            [[type]]
            name = "Person"
            classification = "record"
            [[type.member]]
            name = "name"
            type = "String"
            [[type.member]]
            name = "pets"
            type = "list<Pet>"
        "#;
        let catalog = TypeCatalog::from_toml(toml).unwrap();
        let person = catalog.get("Person").unwrap();
        assert_eq!(Some(&Classification::String), person.member("name"));
        assert_eq!(
            Some(&Classification::List(Box::new(Classification::Record("Pet".into())))),
            person.member("pets")
        );
    }

    #[test]
    fn lists_are_falsy_when_empty_but_maps_are_not() {
        assert!(Classification::List(Box::new(Classification::String)).is_falsy_when_empty());
        assert!(!Classification::Map.is_falsy_when_empty());
    }
}
