//! Cross-package embedding post-pass.
//!
//! Replaces every [`FieldDef::Embedded`] placeholder with the fields of the
//! struct it points at. Targets are expanded before they are spliced in, so
//! chains like `a.A` embeds `b.B` embeds `c.C` close in one pass.

use crate::error::{Error, Result};
use crate::ir::{FieldDef, QualifiedName, Registry};
use std::collections::BTreeMap;

/// Expand all placeholders in `registry`. Structs without placeholders are
/// left untouched.
pub fn expand_embeddings(registry: &mut Registry) -> Result<()> {
    let pending: Vec<QualifiedName> = registry
        .structs()
        .into_iter()
        .filter(|s| s.fields.iter().any(FieldDef::has_placeholder))
        .map(|s| s.name.clone())
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let mut expander = Expander {
        registry,
        done: BTreeMap::new(),
        stack: Vec::new(),
    };
    for name in &pending {
        expander.expand_struct(name)?;
    }
    let done = expander.done;

    for (name, fields) in done {
        if let Some(def) = registry.get_mut(&name) {
            tracing::trace!(name = %name, fields = fields.len(), "expanded embeddings");
            def.fields = fields;
        }
    }
    Ok(())
}

struct Expander<'r> {
    registry: &'r Registry,
    /// Fully expanded field lists.
    done: BTreeMap<QualifiedName, Vec<FieldDef>>,
    /// Structs whose expansion is in progress.
    stack: Vec<QualifiedName>,
}

impl Expander<'_> {
    fn expand_struct(&mut self, name: &QualifiedName) -> Result<()> {
        if self.done.contains_key(name) {
            return Ok(());
        }
        if self.stack.contains(name) {
            return Err(Error::unsupported(
                name.to_string(),
                format!("embedding cycle through {name}"),
            ));
        }
        let registry = self.registry;
        let def = registry.get(name).ok_or_else(|| {
            Error::Ordering(format!("struct {name} disappeared from the registry"))
        })?;

        self.stack.push(name.clone());
        let fields = self.expand_fields(name, &def.fields);
        self.stack.pop();
        self.done.insert(name.clone(), fields?);
        Ok(())
    }

    fn expand_fields(&mut self, owner: &QualifiedName, fields: &[FieldDef]) -> Result<Vec<FieldDef>> {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            match field {
                FieldDef::Embedded(target) => {
                    if !self.registry.contains(target) {
                        return Err(Error::MissingEmbeddedStruct {
                            context: owner.to_string(),
                            target: target.to_string(),
                        });
                    }
                    self.expand_struct(target)?;
                    if let Some(expanded) = self.done.get(target) {
                        out.extend(expanded.iter().cloned());
                    }
                }
                other => out.push(self.expand_field(owner, other)?),
            }
        }
        Ok(out)
    }

    fn expand_field(&mut self, owner: &QualifiedName, field: &FieldDef) -> Result<FieldDef> {
        Ok(match field {
            FieldDef::Basic { .. } | FieldDef::Unknown { .. } => field.clone(),
            FieldDef::Array { name, element } => FieldDef::Array {
                name: name.clone(),
                element: Box::new(self.expand_field(owner, element)?),
            },
            FieldDef::Map { name, key, value } => FieldDef::Map {
                name: name.clone(),
                key: key.clone(),
                value: Box::new(self.expand_field(owner, value)?),
            },
            FieldDef::Anonymous { name, fields } => FieldDef::Anonymous {
                name: name.clone(),
                fields: self.expand_fields(owner, fields)?,
            },
            FieldDef::Embedded(target) => {
                return Err(Error::Ordering(format!(
                    "embedding of {target} in {owner} is not in a field list"
                )));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Primitive, StructDef, TypeRef};

    fn string_field(name: &str) -> FieldDef {
        FieldDef::Basic {
            name: name.into(),
            ty: TypeRef::Primitive(Primitive::String),
        }
    }

    fn registry(defs: Vec<(&str, &str, Vec<FieldDef>)>) -> Registry {
        let mut registry = Registry::new();
        for (order, (package, name, fields)) in defs.into_iter().enumerate() {
            registry.insert(StructDef {
                name: QualifiedName::new(package, name),
                order,
                fields,
            });
        }
        registry
    }

    fn fields(registry: &Registry, package: &str, name: &str) -> Vec<FieldDef> {
        registry
            .get(&QualifiedName::new(package, name))
            .unwrap()
            .fields
            .clone()
    }

    #[test]
    fn test_placeholder_is_replaced_in_position() {
        let mut reg = registry(vec![
            (
                "api",
                "Wrapper",
                vec![
                    string_field("Before"),
                    FieldDef::Embedded(QualifiedName::new("models", "Base")),
                    string_field("After"),
                ],
            ),
            ("models", "Base", vec![string_field("ID"), string_field("Created")]),
        ]);
        expand_embeddings(&mut reg).unwrap();
        assert_eq!(
            fields(&reg, "api", "Wrapper"),
            vec![
                string_field("Before"),
                string_field("ID"),
                string_field("Created"),
                string_field("After"),
            ]
        );
    }

    #[test]
    fn test_chained_embeddings_close_in_one_pass() {
        // Wrapper is expanded first, before Middle has been touched.
        let mut reg = registry(vec![
            (
                "a",
                "Wrapper",
                vec![FieldDef::Embedded(QualifiedName::new("b", "Middle"))],
            ),
            (
                "b",
                "Middle",
                vec![
                    FieldDef::Embedded(QualifiedName::new("c", "Base")),
                    string_field("Mid"),
                ],
            ),
            ("c", "Base", vec![string_field("Root")]),
        ]);
        expand_embeddings(&mut reg).unwrap();
        let expected = vec![string_field("Root"), string_field("Mid")];
        assert_eq!(fields(&reg, "a", "Wrapper"), expected);
        assert_eq!(fields(&reg, "b", "Middle"), expected);
    }

    #[test]
    fn test_placeholder_inside_anonymous_struct() {
        let mut reg = registry(vec![
            (
                "a",
                "Outer",
                vec![FieldDef::Array {
                    name: "Items".into(),
                    element: Box::new(FieldDef::Anonymous {
                        name: "Items".into(),
                        fields: vec![FieldDef::Embedded(QualifiedName::new("b", "Base"))],
                    }),
                }],
            ),
            ("b", "Base", vec![string_field("ID")]),
        ]);
        expand_embeddings(&mut reg).unwrap();
        assert_eq!(
            fields(&reg, "a", "Outer"),
            vec![FieldDef::Array {
                name: "Items".into(),
                element: Box::new(FieldDef::Anonymous {
                    name: "Items".into(),
                    fields: vec![string_field("ID")],
                }),
            }]
        );
    }

    #[test]
    fn test_missing_target() {
        let mut reg = registry(vec![(
            "a",
            "Outer",
            vec![FieldDef::Embedded(QualifiedName::new("b", "Ghost"))],
        )]);
        let err = expand_embeddings(&mut reg).unwrap_err();
        match err {
            Error::MissingEmbeddedStruct { context, target } => {
                assert_eq!(context, "a.Outer");
                assert_eq!(target, "b.Ghost");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_cross_package_cycle() {
        let mut reg = registry(vec![
            ("a", "A", vec![FieldDef::Embedded(QualifiedName::new("b", "B"))]),
            ("b", "B", vec![FieldDef::Embedded(QualifiedName::new("a", "A"))]),
        ]);
        let err = expand_embeddings(&mut reg).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { .. }), "{err}");
    }
}
