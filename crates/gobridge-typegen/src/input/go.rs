//! Go source reader.
//!
//! Extracts the package clause, imports, and struct type declarations from Go
//! source files into the [`syntax`](crate::syntax) model.

use crate::syntax::{FieldDecl, ImportSpec, ReadError, Reader, SourceFile, StructDecl, TypeExpr};
use tree_sitter::{Node, Parser};

/// Static instance of the Go reader.
pub static GO_READER: GoReader = GoReader;

/// Go reader implementing the [`Reader`] trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoReader;

impl Reader for GoReader {
    fn read(&self, source: &str) -> Result<SourceFile, ReadError> {
        read_go(source)
    }
}

/// Parse Go source and extract struct declarations.
pub fn read_go(source: &str) -> Result<SourceFile, ReadError> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_go::language().into())
        .map_err(|e| ReadError::Parse(format!("tree-sitter init: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ReadError::Parse("failed to parse Go".into()))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(ReadError::Parse(format!(
            "syntax error at line {}",
            first_error_line(root) + 1
        )));
    }

    let ctx = ExtractContext { source };
    ctx.extract_file(root)
}

fn first_error_line(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return node.start_position().row;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            return first_error_line(child);
        }
    }
    node.start_position().row
}

struct ExtractContext<'a> {
    source: &'a str,
}

impl<'a> ExtractContext<'a> {
    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn extract_file(&self, root: Node) -> Result<SourceFile, ReadError> {
        let mut file = SourceFile::default();

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "package_clause" => {
                    if let Some(name) = first_named_child(child) {
                        file.package = self.node_text(name).to_string();
                    }
                }
                "import_declaration" => self.extract_imports(child, &mut file.imports),
                "type_declaration" => self.extract_type_declaration(child, &mut file.structs)?,
                _ => {}
            }
        }

        Ok(file)
    }

    fn extract_imports(&self, node: Node, imports: &mut Vec<ImportSpec>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import_spec" => imports.extend(self.extract_import_spec(child)),
                "import_spec_list" => {
                    let mut list_cursor = child.walk();
                    for spec in child.children(&mut list_cursor) {
                        if spec.kind() == "import_spec" {
                            imports.extend(self.extract_import_spec(spec));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn extract_import_spec(&self, node: Node) -> Option<ImportSpec> {
        let path = node.child_by_field_name("path")?;
        let path = unquote(self.node_text(path)).to_string();
        let alias = node
            .child_by_field_name("name")
            .map(|n| self.node_text(n).to_string());
        Some(ImportSpec { path, alias })
    }

    fn extract_type_declaration(
        &self,
        node: Node,
        structs: &mut Vec<StructDecl>,
    ) -> Result<(), ReadError> {
        let mut cursor = node.walk();
        for spec in node.children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(ty) = spec.child_by_field_name("type") else {
                continue;
            };
            if ty.kind() != "struct_type" {
                continue;
            }
            let name = spec
                .child_by_field_name("name")
                .ok_or_else(|| ReadError::Unsupported("type spec missing name".into()))?;
            let name = self.node_text(name).to_string();

            if spec.child_by_field_name("type_parameters").is_some() {
                tracing::warn!(name = %name, "skipping generic struct");
                continue;
            }

            let fields = self.extract_struct_fields(ty)?;
            structs.push(StructDecl { name, fields });
        }
        Ok(())
    }

    fn extract_struct_fields(&self, struct_type: Node) -> Result<Vec<FieldDecl>, ReadError> {
        let mut fields = Vec::new();
        let mut cursor = struct_type.walk();
        let Some(list) = struct_type
            .named_children(&mut cursor)
            .find(|c| c.kind() == "field_declaration_list")
        else {
            return Ok(fields);
        };

        let mut list_cursor = list.walk();
        for decl in list.named_children(&mut list_cursor) {
            if decl.kind() == "field_declaration" {
                fields.push(self.extract_field_declaration(decl)?);
            }
        }
        Ok(fields)
    }

    fn extract_field_declaration(&self, node: Node) -> Result<FieldDecl, ReadError> {
        let mut cursor = node.walk();
        let names: Vec<String> = node
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.node_text(n).to_string())
            .collect();

        let ty_node = node
            .child_by_field_name("type")
            .ok_or_else(|| ReadError::Unsupported("field declaration missing type".into()))?;
        let mut ty = self.extract_type(ty_node)?;

        // `*Base` as an embedded field: the star is a bare token on the declaration.
        if names.is_empty() && self.has_star_token(node) {
            ty = TypeExpr::Pointer(Box::new(ty));
        }

        Ok(FieldDecl { names, ty })
    }

    fn has_star_token(&self, node: Node) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .any(|c| !c.is_named() && self.node_text(c) == "*")
    }

    fn extract_type(&self, node: Node) -> Result<TypeExpr, ReadError> {
        match node.kind() {
            "type_identifier" => Ok(TypeExpr::Ident(self.node_text(node).to_string())),

            "qualified_type" => {
                let package = node
                    .child_by_field_name("package")
                    .ok_or_else(|| ReadError::Unsupported("qualified type missing package".into()))?;
                let name = node
                    .child_by_field_name("name")
                    .ok_or_else(|| ReadError::Unsupported("qualified type missing name".into()))?;
                Ok(TypeExpr::qualified(
                    self.node_text(package),
                    self.node_text(name),
                ))
            }

            "pointer_type" => {
                let inner = first_named_child(node)
                    .ok_or_else(|| ReadError::Unsupported("pointer without type".into()))?;
                Ok(TypeExpr::Pointer(Box::new(self.extract_type(inner)?)))
            }

            "parenthesized_type" => {
                let inner = first_named_child(node)
                    .ok_or_else(|| ReadError::Unsupported("empty parenthesized type".into()))?;
                Ok(TypeExpr::Paren(Box::new(self.extract_type(inner)?)))
            }

            "slice_type" | "array_type" | "implicit_length_array_type" => {
                let element = node
                    .child_by_field_name("element")
                    .ok_or_else(|| ReadError::Unsupported("array without element type".into()))?;
                Ok(TypeExpr::Array(Box::new(self.extract_type(element)?)))
            }

            "map_type" => {
                let key = node
                    .child_by_field_name("key")
                    .ok_or_else(|| ReadError::Unsupported("map without key type".into()))?;
                let value = node
                    .child_by_field_name("value")
                    .ok_or_else(|| ReadError::Unsupported("map without value type".into()))?;
                Ok(TypeExpr::Map {
                    key: Box::new(self.extract_type(key)?),
                    value: Box::new(self.extract_type(value)?),
                })
            }

            "struct_type" => Ok(TypeExpr::Struct(self.extract_struct_fields(node)?)),

            other => Ok(TypeExpr::Other(other.to_string())),
        }
    }
}

fn first_named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).next()
}

fn unquote(literal: &str) -> &str {
    literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
        .unwrap_or(literal)
}
