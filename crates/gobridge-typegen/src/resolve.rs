//! Field resolution: raw field declarations to [`FieldDef`]s.
//!
//! Same-package embeddings are flattened here. Cross-package embeddings only
//! leave an [`FieldDef::Embedded`] placeholder, because the target may not be
//! resolved yet; [`crate::embed`] closes them afterwards.

use crate::collector::Collector;
use crate::error::{Error, Result};
use crate::ir::{FieldDef, Primitive, QualifiedName, TypeRef};
use crate::syntax::{FieldDecl, ImportSpec, TypeExpr};
use std::rc::Rc;

/// Builtins that are valid field types but carry no structure.
const OPAQUE_BUILTINS: &[&str] = &["any", "error", "complex64", "complex128"];

/// Where a field is being resolved.
struct Scope {
    package: String,
    imports: Rc<[ImportSpec]>,
    /// `pkg.Struct.Field...`, for error messages.
    context: String,
}

impl Scope {
    fn nested(&self, field: &str) -> Scope {
        Scope {
            package: self.package.clone(),
            imports: Rc::clone(&self.imports),
            context: format!("{}.{}", self.context, field),
        }
    }
}

/// Outcome of resolving `pkg.Type`.
enum ImportTarget {
    /// Inside the project; the package has been loaded.
    Project(QualifiedName),
    /// Outside the project.
    External(String),
}

impl Collector<'_> {
    /// Resolve the fields of a parsed struct.
    pub(crate) fn resolve_struct(&mut self, name: &QualifiedName) -> Result<Vec<FieldDef>> {
        let parsed = self.parsed(name).ok_or_else(|| {
            Error::Ordering(format!("selected struct {name} is not in the parse cache"))
        })?;
        let scope = Scope {
            package: name.package.clone(),
            imports: parsed.imports,
            context: name.to_string(),
        };
        let mut embedding = vec![name.clone()];
        self.resolve_fields(&scope, &parsed.decl.fields, &mut embedding)
    }

    /// `embedding` is the chain of structs currently being flattened into
    /// each other; seeing a member again means an embedding cycle.
    fn resolve_fields(
        &mut self,
        scope: &Scope,
        fields: &[FieldDecl],
        embedding: &mut Vec<QualifiedName>,
    ) -> Result<Vec<FieldDef>> {
        let mut resolved = Vec::with_capacity(fields.len());
        for field in fields {
            match field.names.as_slice() {
                [] => self.resolve_embedded(scope, &field.ty, embedding, &mut resolved)?,
                [name] => {
                    tracing::trace!(context = %scope.context, field = %name, ty = %field.ty.describe(), "resolving field");
                    resolved.push(self.resolve_type(scope, name, &field.ty, embedding)?);
                }
                names => {
                    return Err(Error::unsupported(
                        &scope.context,
                        format!(
                            "field declaration `{} {}` declares more than one name",
                            names.join(", "),
                            field.ty.describe()
                        ),
                    ));
                }
            }
        }
        Ok(resolved)
    }

    fn resolve_embedded(
        &mut self,
        scope: &Scope,
        ty: &TypeExpr,
        embedding: &mut Vec<QualifiedName>,
        out: &mut Vec<FieldDef>,
    ) -> Result<()> {
        match ty {
            TypeExpr::Pointer(inner) | TypeExpr::Paren(inner) => {
                self.resolve_embedded(scope, inner, embedding, out)
            }

            TypeExpr::Ident(ident) => {
                let target = QualifiedName::new(scope.package.as_str(), ident.as_str());
                let Some(parsed) = self.parsed(&target) else {
                    return Err(Error::MissingEmbeddedStruct {
                        context: scope.context.clone(),
                        target: target.to_string(),
                    });
                };
                if embedding.contains(&target) {
                    return Err(Error::unsupported(
                        &scope.context,
                        format!("embedding cycle through {target}"),
                    ));
                }

                tracing::trace!(context = %scope.context, target = %target, "inlining embedded struct");
                // The embedded struct may live in another file of the package.
                let inner_scope = Scope {
                    package: scope.package.clone(),
                    imports: parsed.imports,
                    context: scope.context.clone(),
                };
                embedding.push(target);
                let fields = self.resolve_fields(&inner_scope, &parsed.decl.fields, embedding);
                embedding.pop();
                out.extend(fields?);
                Ok(())
            }

            TypeExpr::Qualified { package, name } => {
                match self.resolve_import(scope, package, name)? {
                    ImportTarget::Project(target) => {
                        if self.struct_exists(&target) {
                            self.select(&target);
                        }
                        // Missing targets are reported by the post-pass.
                        out.push(FieldDef::Embedded(target));
                    }
                    ImportTarget::External(description) => {
                        tracing::debug!(context = %scope.context, ty = %description, "embedded external type");
                        out.push(FieldDef::Unknown {
                            name: name.clone(),
                            description,
                        });
                    }
                }
                Ok(())
            }

            other => Err(Error::unsupported(
                &scope.context,
                format!("cannot embed `{}`", other.describe()),
            )),
        }
    }

    fn resolve_type(
        &mut self,
        scope: &Scope,
        name: &str,
        ty: &TypeExpr,
        embedding: &mut Vec<QualifiedName>,
    ) -> Result<FieldDef> {
        match ty {
            TypeExpr::Ident(ident) => Ok(self.resolve_ident(scope, name, ident)),

            TypeExpr::Qualified { package, name: ty_name } => {
                match self.resolve_import(scope, package, ty_name)? {
                    ImportTarget::Project(target) if self.struct_exists(&target) => {
                        self.select(&target);
                        Ok(FieldDef::Basic {
                            name: name.to_string(),
                            ty: TypeRef::Struct(target),
                        })
                    }
                    ImportTarget::Project(target) => {
                        tracing::warn!(context = %scope.context, field = %name, ty = %target, "not a struct, emitting any()");
                        Ok(FieldDef::Unknown {
                            name: name.to_string(),
                            description: format!("{package}.{ty_name}"),
                        })
                    }
                    ImportTarget::External(description) => Ok(FieldDef::Unknown {
                        name: name.to_string(),
                        description,
                    }),
                }
            }

            // No nullability modeling: a pointer is its pointee.
            TypeExpr::Pointer(inner) | TypeExpr::Paren(inner) => {
                self.resolve_type(scope, name, inner, embedding)
            }

            TypeExpr::Array(element) => Ok(FieldDef::Array {
                name: name.to_string(),
                element: Box::new(self.resolve_type(scope, name, element, embedding)?),
            }),

            TypeExpr::Map { key, value } => {
                let TypeExpr::Ident(key) = key.as_ref() else {
                    return Err(Error::unsupported(
                        format!("{}.{}", scope.context, name),
                        format!("map key `{}` is not a plain identifier", key.describe()),
                    ));
                };
                Ok(FieldDef::Map {
                    name: name.to_string(),
                    key: key.clone(),
                    value: Box::new(self.resolve_type(scope, name, value, embedding)?),
                })
            }

            TypeExpr::Struct(fields) => Ok(FieldDef::Anonymous {
                name: name.to_string(),
                fields: self.resolve_fields(&scope.nested(name), fields, embedding)?,
            }),

            TypeExpr::Other(kind) => Err(Error::unsupported(
                format!("{}.{}", scope.context, name),
                format!("`{kind}` fields are not supported"),
            )),
        }
    }

    fn resolve_ident(&mut self, scope: &Scope, name: &str, ident: &str) -> FieldDef {
        if let Some(primitive) = Primitive::from_ident(ident) {
            return FieldDef::Basic {
                name: name.to_string(),
                ty: TypeRef::Primitive(primitive),
            };
        }
        if OPAQUE_BUILTINS.contains(&ident) {
            return FieldDef::Unknown {
                name: name.to_string(),
                description: ident.to_string(),
            };
        }

        let target = QualifiedName::new(scope.package.as_str(), ident);
        if self.struct_exists(&target) {
            self.select(&target);
            FieldDef::Basic {
                name: name.to_string(),
                ty: TypeRef::Struct(target),
            }
        } else {
            tracing::warn!(context = %scope.context, field = %name, ty = %ident, "not a struct, emitting any()");
            FieldDef::Unknown {
                name: name.to_string(),
                description: ident.to_string(),
            }
        }
    }

    /// Match `alias` against the scope's imports and load the package if it
    /// belongs to the project.
    fn resolve_import(&mut self, scope: &Scope, alias: &str, name: &str) -> Result<ImportTarget> {
        let import = scope
            .imports
            .iter()
            .find(|import| import.local_name() == alias)
            .ok_or_else(|| {
                Error::unsupported(
                    &scope.context,
                    format!("no import matches package `{alias}` in `{alias}.{name}`"),
                )
            })?;

        let relative = self
            .project
            .module
            .as_ref()
            .and_then(|module| module.relative_dir(&import.path));
        let Some(relative) = relative else {
            tracing::debug!(import = %import.path, "external import");
            return Ok(ImportTarget::External(format!("{alias}.{name}")));
        };

        match self.load_package(&relative) {
            Ok(_) => Ok(ImportTarget::Project(QualifiedName::new(relative, name))),
            Err(Error::PackageLoad { dir, source })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::warn!(
                    import = %import.path,
                    dir = %dir.display(),
                    "package directory not found, treating import as external"
                );
                Ok(ImportTarget::External(format!("{alias}.{name}")))
            }
            Err(e) => Err(e),
        }
    }

    fn struct_exists(&self, name: &QualifiedName) -> bool {
        self.package(&name.package)
            .is_some_and(|package| package.contains(&name.name))
    }
}
