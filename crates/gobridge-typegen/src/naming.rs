//! Output identifiers for structs.
//!
//! Go allows `models.User` and `api/models.User` side by side; a generated
//! module has one flat namespace. Shallower packages claim names first and
//! keep the bare struct name, deeper ones are qualified by as many trailing
//! package segments as it takes to be unique.

use crate::ir::{QualifiedName, StructDef};
use std::collections::{BTreeMap, BTreeSet};

/// Qualified name → output identifier.
#[derive(Debug, Default, Clone)]
pub struct NameMap {
    names: BTreeMap<QualifiedName, String>,
}

impl NameMap {
    pub fn build<'a>(structs: impl IntoIterator<Item = &'a StructDef>) -> Self {
        Self::with_reserved(structs, &[])
    }

    /// Like [`NameMap::build`], but no struct is given one of `reserved`.
    /// Backends pass the identifiers their output already binds.
    pub fn with_reserved<'a>(
        structs: impl IntoIterator<Item = &'a StructDef>,
        reserved: &[&str],
    ) -> Self {
        let mut structs: Vec<&StructDef> = structs.into_iter().collect();
        structs.sort_by_key(|s| (s.name.depth(), s.order));

        let mut taken: BTreeSet<String> = reserved.iter().map(|r| r.to_string()).collect();
        let mut names = BTreeMap::new();
        for def in structs {
            let name = unique_name(&def.name, &taken);
            if name != def.name.name {
                tracing::debug!(name = %def.name, identifier = %name, "qualified colliding struct name");
            }
            taken.insert(name.clone());
            names.insert(def.name.clone(), name);
        }
        Self { names }
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn unique_name(name: &QualifiedName, taken: &BTreeSet<String>) -> String {
    let mut candidate = name.name.clone();
    let mut segments = name
        .segments()
        .rev()
        .map(sanitize)
        .filter(|s| !s.is_empty());

    while taken.contains(&candidate) {
        match segments.next() {
            Some(segment) => candidate = segment + &candidate,
            None => {
                let mut n = 2;
                loop {
                    let numbered = format!("{candidate}{n}");
                    if !taken.contains(&numbered) {
                        return numbered;
                    }
                    n += 1;
                }
            }
        }
    }
    candidate
}

/// Keep identifier characters only. A leading digit gets a `_` prefix.
fn sanitize(segment: &str) -> String {
    let kept: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    if kept.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{kept}")
    } else {
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(package: &str, name: &str, order: usize) -> StructDef {
        StructDef {
            name: QualifiedName::new(package, name),
            order,
            fields: Vec::new(),
        }
    }

    fn name_of<'m>(map: &'m NameMap, package: &str, name: &str) -> &'m str {
        map.get(&QualifiedName::new(package, name)).unwrap()
    }

    #[test]
    fn test_unique_names_are_kept() {
        let defs = [def("", "A", 0), def("models", "B", 1)];
        let map = NameMap::build(&defs);
        assert_eq!(name_of(&map, "", "A"), "A");
        assert_eq!(name_of(&map, "models", "B"), "B");
    }

    #[test]
    fn test_shallower_package_keeps_bare_name() {
        // Declared deepest first; depth still decides who keeps `Nested`.
        let defs = [
            def("nested/morenested", "Nested", 0),
            def("nested", "Nested", 1),
        ];
        let map = NameMap::build(&defs);
        assert_eq!(name_of(&map, "nested", "Nested"), "Nested");
        assert_eq!(name_of(&map, "nested/morenested", "Nested"), "morenestedNested");
    }

    #[test]
    fn test_more_segments_until_unique() {
        let defs = [
            def("", "User", 0),
            def("models", "User", 1),
            def("v1/models", "User", 2),
        ];
        let map = NameMap::build(&defs);
        assert_eq!(name_of(&map, "", "User"), "User");
        assert_eq!(name_of(&map, "models", "User"), "modelsUser");
        assert_eq!(name_of(&map, "v1/models", "User"), "v1modelsUser");
    }

    #[test]
    fn test_same_depth_ties_follow_declaration_order() {
        let defs = [def("b", "Item", 1), def("a", "Item", 0)];
        let map = NameMap::build(&defs);
        assert_eq!(name_of(&map, "a", "Item"), "Item");
        assert_eq!(name_of(&map, "b", "Item"), "bItem");
    }

    #[test]
    fn test_segments_are_sanitized() {
        let defs = [def("", "Config", 0), def("go-kit", "Config", 1)];
        let map = NameMap::build(&defs);
        assert_eq!(name_of(&map, "go-kit", "Config"), "gokitConfig");
    }

    #[test]
    fn test_segment_with_leading_digit() {
        let defs = [def("", "User", 0), def("2fa", "User", 1)];
        let map = NameMap::build(&defs);
        assert_eq!(name_of(&map, "2fa", "User"), "_2faUser");
    }

    #[test]
    fn test_reserved_names_are_avoided() {
        let defs = [
            def("types", "object", 0),
            def("", "string", 1),
            def("types", "Plain", 2),
        ];
        let map = NameMap::with_reserved(&defs, &["object", "string"]);
        assert_eq!(name_of(&map, "types", "object"), "typesobject");
        assert_eq!(name_of(&map, "", "string"), "string2");
        assert_eq!(name_of(&map, "types", "Plain"), "Plain");
    }

    #[test]
    fn test_numeric_suffix_when_segments_run_out() {
        // `aB` in the root package collides with `a`.`B` qualified.
        let defs = [def("", "aB", 0), def("", "B", 1), def("a", "B", 2)];
        let map = NameMap::build(&defs);
        assert_eq!(name_of(&map, "", "B"), "B");
        assert_eq!(name_of(&map, "a", "B"), "aB2");
        assert_eq!(map.len(), 3);
    }
}
