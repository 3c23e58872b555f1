//! Valibot schema generation.
//!
//! Every struct becomes one `const X = object({ ... });` declaration. Struct
//! references are emitted as the bare identifier, so declarations must come
//! in dependency order.

use super::Backend;
use crate::error::{Error, Result};
use crate::ir::{FieldDef, Primitive, QualifiedName, StructDef, TypeRef};
use crate::naming::NameMap;

/// Static instance with default options.
pub static VALIBOT_BACKEND: ValibotBackend = ValibotBackend {
    options: ValibotOptions::DEFAULT,
};

/// Options for Valibot generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValibotOptions {
    /// Module the validators are imported from.
    pub import_source: String,
    /// Prefix declarations with `export`.
    pub export: bool,
    /// Emit `export type X = InferOutput<typeof X>;` after each declaration.
    pub infer_types: bool,
}

impl ValibotOptions {
    const DEFAULT: Self = Self {
        import_source: String::new(),
        export: false,
        infer_types: false,
    };

    fn import_source(&self) -> &str {
        if self.import_source.is_empty() {
            "valibot"
        } else {
            &self.import_source
        }
    }
}

impl Default for ValibotOptions {
    fn default() -> Self {
        Self {
            import_source: "valibot".to_string(),
            ..Self::DEFAULT
        }
    }
}

/// Valibot backend implementing the [`Backend`] trait.
#[derive(Debug, Clone, Default)]
pub struct ValibotBackend {
    pub options: ValibotOptions,
}

impl ValibotBackend {
    pub fn new(options: ValibotOptions) -> Self {
        Self { options }
    }
}

impl Backend for ValibotBackend {
    fn name(&self) -> &'static str {
        "valibot"
    }

    fn extension(&self) -> &'static str {
        "ts"
    }

    fn reserved_names(&self) -> &'static [&'static str] {
        RESERVED_NAMES
    }

    fn generate(&self, structs: &[StructDef], names: &NameMap) -> Result<String> {
        generate_valibot(structs, names, &self.options)
    }
}

/// Names imported into every generated module: each [`Combinator`] plus the
/// `InferOutput` type.
pub const RESERVED_NAMES: &[&str] = &[
    "object",
    "array",
    "record",
    "string",
    "number",
    "boolean",
    "any",
    "InferOutput",
];

/// A Valibot function the output imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Object,
    Array,
    Record,
    String,
    Number,
    Boolean,
    Any,
}

impl Combinator {
    pub const ALL: [Self; 7] = [
        Self::Object,
        Self::Array,
        Self::Record,
        Self::String,
        Self::Number,
        Self::Boolean,
        Self::Any,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Record => "record",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Any => "any",
        }
    }

    fn for_primitive(primitive: Primitive) -> Self {
        match primitive {
            Primitive::String => Self::String,
            Primitive::Bool => Self::Boolean,
            _ => Self::Number,
        }
    }
}

/// Generate Valibot schemas for structs in dependency order.
pub fn generate_valibot(
    structs: &[StructDef],
    names: &NameMap,
    options: &ValibotOptions,
) -> Result<String> {
    let mut generator = ValibotGenerator::new(names);
    for def in structs {
        generator.write_struct(def, options)?;
    }
    Ok(generator.finish(options))
}

struct ValibotGenerator<'n> {
    names: &'n NameMap,
    /// Declarations, each preceded by a blank line.
    body: String,
    /// Imports in first-use order; `object` always comes first.
    used: Vec<Combinator>,
    indent: usize,
}

impl<'n> ValibotGenerator<'n> {
    fn new(names: &'n NameMap) -> Self {
        Self {
            names,
            body: String::new(),
            used: vec![Combinator::Object],
            indent: 0,
        }
    }

    fn finish(self, options: &ValibotOptions) -> String {
        let mut imports: Vec<&str> = self.used.iter().map(|c| c.as_str()).collect();
        if options.infer_types {
            imports.push("type InferOutput");
        }
        format!(
            "import {{ {} }} from '{}';\n{}",
            imports.join(", "),
            options.import_source(),
            self.body
        )
    }

    fn combinator(&mut self, combinator: Combinator) -> &'static str {
        if !self.used.contains(&combinator) {
            self.used.push(combinator);
        }
        combinator.as_str()
    }

    fn identifier(&self, name: &QualifiedName) -> Result<&'n str> {
        self.names
            .get(name)
            .ok_or_else(|| Error::Ordering(format!("no output name for {name}")))
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.body.push_str("  ");
        }
    }

    fn write_struct(&mut self, def: &StructDef, options: &ValibotOptions) -> Result<()> {
        let ident = self.identifier(&def.name)?;
        let export = if options.export { "export " } else { "" };

        self.body.push('\n');
        self.body.push_str(&format!("{export}const {ident} = object({{\n"));
        self.indent = 1;
        for field in &def.fields {
            self.write_field(&def.name, field)?;
        }
        self.indent = 0;
        self.body.push_str("});\n");

        if options.infer_types {
            self.body.push_str(&format!(
                "export type {ident} = InferOutput<typeof {ident}>;\n"
            ));
        }
        Ok(())
    }

    fn write_field(&mut self, owner: &QualifiedName, field: &FieldDef) -> Result<()> {
        self.write_indent();
        self.body.push_str(field.name());
        self.body.push_str(": ");
        self.write_expr(owner, field)?;
        self.body.push_str(",\n");
        Ok(())
    }

    fn write_expr(&mut self, owner: &QualifiedName, field: &FieldDef) -> Result<()> {
        match field {
            FieldDef::Basic {
                ty: TypeRef::Primitive(primitive),
                ..
            } => {
                let name = self.combinator(Combinator::for_primitive(*primitive));
                self.body.push_str(name);
                self.body.push_str("()");
            }

            FieldDef::Basic {
                ty: TypeRef::Struct(target),
                ..
            } => {
                let ident = self.identifier(target)?;
                self.body.push_str(ident);
            }

            FieldDef::Unknown { .. } => {
                self.combinator(Combinator::Any);
                self.body.push_str("any()");
            }

            FieldDef::Array { element, .. } => {
                self.combinator(Combinator::Array);
                self.body.push_str("array(");
                self.write_expr(owner, element)?;
                self.body.push(')');
            }

            // Keys are always strings on the TypeScript side.
            FieldDef::Map { value, .. } => {
                self.combinator(Combinator::Record);
                self.body.push_str("record(");
                self.write_expr(owner, value)?;
                self.body.push(')');
            }

            FieldDef::Anonymous { fields, .. } => {
                self.body.push_str("object({\n");
                self.indent += 1;
                for field in fields {
                    self.write_field(owner, field)?;
                }
                self.indent -= 1;
                self.write_indent();
                self.body.push_str("})");
            }

            FieldDef::Embedded(target) => {
                return Err(Error::MissingEmbeddedStruct {
                    context: owner.to_string(),
                    target: target.to_string(),
                });
            }
        }
        Ok(())
    }
}
