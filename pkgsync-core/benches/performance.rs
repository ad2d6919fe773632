use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pkgsync_core::fields::FieldSet;
use pkgsync_core::manifest::Manifest;
use pkgsync_core::patch::{apply_patch, compute_patch};
use serde_json::{json, Map, Value};

fn generate_manifest(name: &str, keywords: usize, license: &str) -> Manifest {
    let mut fields = Map::new();
    fields.insert("name".to_string(), json!(name));
    fields.insert("version".to_string(), json!("1.0.0"));
    fields.insert(
        "keywords".to_string(),
        Value::Array((0..keywords).map(|i| json!(format!("kw-{}", i))).collect()),
    );
    fields.insert("author".to_string(), json!("Jane Doe <jane@example.com>"));
    fields.insert("license".to_string(), json!(license));
    fields.insert(
        "repository".to_string(),
        json!({"type": "git", "url": format!("https://example.com/{}.git", name)}),
    );
    fields.insert("engines".to_string(), json!({"node": ">=18"}));
    fields.insert(
        "scripts".to_string(),
        json!({"build": "tsc", "test": "jest", "lint": "eslint ."}),
    );
    Manifest::new(format!("packages/{}/package.json", name), fields)
}

fn benchmark_compute_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_patch");
    let fields = FieldSet::default();

    for keywords in [10, 100, 1000] {
        let source = generate_manifest("root", keywords, "MIT");
        let destination = generate_manifest("pkg", keywords / 2, "ISC");
        let source_view = source.restrict(&fields);
        let destination_view = destination.restrict(&fields);

        group.bench_function(format!("{}_keywords", keywords), |b| {
            b.iter(|| black_box(compute_patch(&destination_view, &source_view)));
        });
    }

    group.finish();
}

fn benchmark_apply_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_patch");
    let fields = FieldSet::default();

    for keywords in [10, 100, 1000] {
        let source = generate_manifest("root", keywords, "MIT");
        let destination = generate_manifest("pkg", keywords / 2, "ISC");
        let patch = compute_patch(&destination.restrict(&fields), &source.restrict(&fields));

        group.bench_function(format!("{}_keywords", keywords), |b| {
            b.iter(|| {
                black_box(
                    apply_patch(destination.path(), destination.fields(), &patch).unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn benchmark_render(c: &mut Criterion) {
    let manifest = generate_manifest("pkg", 100, "MIT");
    c.bench_function("render_manifest", |b| {
        b.iter(|| black_box(manifest.render().unwrap()));
    });
}

criterion_group!(
    benches,
    benchmark_compute_patch,
    benchmark_apply_patch,
    benchmark_render
);
criterion_main!(benches);
