use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::path::Path;

use gobridge_typegen::{
    GO_READER, GoModule, MemoryLoader, Options, Project, generate_from_source, generate_with,
};

/// `packages` model packages, each with `per_package` structs that reference
/// the previous struct, and an entry package referencing all of them.
fn synthetic_project(packages: usize, per_package: usize) -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    let mut entry = String::from("package api\n\nimport (\n");
    for p in 0..packages {
        entry.push_str(&format!("\t\"example.com/bench/models{p}\"\n"));
    }
    entry.push_str(")\n\ntype Request struct {\n");
    for p in 0..packages {
        entry.push_str(&format!("\tM{p} []models{p}.Model{}\n", per_package - 1));
    }
    entry.push_str("}\n");
    loader.insert("proj/api/api.go", entry);

    for p in 0..packages {
        let mut source = format!("package models{p}\n\n");
        for s in 0..per_package {
            source.push_str(&format!(
                "type Model{s} struct {{\n\tName string\n\tTags map[string][]int\n"
            ));
            if s > 0 {
                source.push_str(&format!("\tPrev *Model{}\n", s - 1));
            }
            source.push_str("}\n\n");
        }
        loader.insert(format!("proj/models{p}/models.go"), source);
    }
    loader
}

fn bench_single_file(c: &mut Criterion) {
    let source = r#"
package types

type Address struct {
	Street string
	Zip    uint32
}

type User struct {
	Name      string
	Addresses []Address
	Meta      map[string]struct {
		Key   string
		Value float64
	}
}
"#;
    let options = Options::default();
    c.bench_function("generate_from_source", |b| {
        b.iter(|| generate_from_source(black_box(source), &options).expect("generate"))
    });
}

fn bench_project(c: &mut Criterion) {
    let loader = synthetic_project(8, 16);
    let project = Project::new("proj", Some(GoModule::new("example.com/bench")));
    let options = Options::default();
    c.bench_function("generate_project_8x16", |b| {
        b.iter(|| {
            generate_with(
                Path::new("proj/api/api.go"),
                &project,
                &loader,
                &GO_READER,
                &options,
            )
            .expect("generate")
        })
    });
}

criterion_group!(benches, bench_single_file, bench_project);
criterion_main!(benches);
