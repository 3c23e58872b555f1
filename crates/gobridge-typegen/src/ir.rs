//! Semantic model produced by the resolver and consumed by the backends.
//!
//! Every recursive pass in the crate is an exhaustive `match` over
//! [`FieldDef`], so adding a variant is a compile error everywhere it matters.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Globally unique struct key: package directory (relative to the project
/// root, `/`-separated, empty for the root package) plus the local name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct QualifiedName {
    pub package: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Package path segments, nearest directory last.
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.package.split('/').filter(|s| !s.is_empty())
    }

    /// Number of directories between the project root and the package.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// Go builtin types that map onto a validator primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Byte,
    Rune,
    String,
    Bool,
}

impl Primitive {
    pub fn from_ident(ident: &str) -> Option<Self> {
        Some(match ident {
            "int" => Self::Int,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint" => Self::Uint,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "uintptr" => Self::Uintptr,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "byte" => Self::Byte,
            "rune" => Self::Rune,
            "string" => Self::String,
            "bool" => Self::Bool,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::String | Self::Bool)
    }
}

/// Target of a [`FieldDef::Basic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum TypeRef {
    Primitive(Primitive),
    Struct(QualifiedName),
}

/// One resolved field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldDef {
    Basic {
        name: String,
        ty: TypeRef,
    },
    Array {
        name: String,
        element: Box<FieldDef>,
    },
    Map {
        name: String,
        key: String,
        value: Box<FieldDef>,
    },
    /// Inline `struct { ... }`.
    Anonymous {
        name: String,
        fields: Vec<FieldDef>,
    },
    /// A type outside the project, or one that is not a struct.
    Unknown {
        name: String,
        description: String,
    },
    /// Cross-package embedding waiting for the post-pass.
    Embedded(QualifiedName),
}

impl FieldDef {
    /// Output key of the field. For a placeholder this is the embedded
    /// struct's local name; placeholders never reach a backend.
    pub fn name(&self) -> &str {
        match self {
            Self::Basic { name, .. }
            | Self::Array { name, .. }
            | Self::Map { name, .. }
            | Self::Anonymous { name, .. }
            | Self::Unknown { name, .. } => name,
            Self::Embedded(target) => &target.name,
        }
    }

    /// True if an [`FieldDef::Embedded`] placeholder appears anywhere below.
    pub fn has_placeholder(&self) -> bool {
        match self {
            Self::Basic { .. } | Self::Unknown { .. } => false,
            Self::Array { element, .. } => element.has_placeholder(),
            Self::Map { value, .. } => value.has_placeholder(),
            Self::Anonymous { fields, .. } => fields.iter().any(FieldDef::has_placeholder),
            Self::Embedded(_) => true,
        }
    }
}

/// A resolved struct declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructDef {
    pub name: QualifiedName,
    /// Global discovery index, used for every deterministic tie-break.
    pub order: usize,
    pub fields: Vec<FieldDef>,
}

/// package path → (local name → struct).
#[derive(Debug, Default, Clone)]
pub struct Registry {
    packages: BTreeMap<String, BTreeMap<String, StructDef>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a struct. Returns `false` and leaves the registry untouched if
    /// the key is already taken.
    pub fn insert(&mut self, def: StructDef) -> bool {
        let package = self.packages.entry(def.name.package.clone()).or_default();
        if package.contains_key(&def.name.name) {
            return false;
        }
        package.insert(def.name.name.clone(), def);
        true
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&StructDef> {
        self.packages.get(&name.package)?.get(&name.name)
    }

    pub fn get_mut(&mut self, name: &QualifiedName) -> Option<&mut StructDef> {
        self.packages.get_mut(&name.package)?.get_mut(&name.name)
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.packages.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All structs, sorted by declaration order.
    pub fn structs(&self) -> Vec<&StructDef> {
        let mut all: Vec<&StructDef> = self.packages.values().flat_map(BTreeMap::values).collect();
        all.sort_by_key(|s| s.order);
        all
    }

    /// Qualified names, sorted by declaration order.
    pub fn names(&self) -> Vec<QualifiedName> {
        self.structs().into_iter().map(|s| s.name.clone()).collect()
    }
}
