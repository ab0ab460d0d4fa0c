use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use records::composer::{
    ComposerPackageTransformer, ComposerRepositoryTransformer, PackagesJsonWriter,
};
use records::config::IndexFormat;
use records::context::RequestContext;
use records::hashid::HashId;
use records::managed::{FileManagedStore, ManagedPackage};
use records::package::{DependencyEntry, PackageBuilder, PackageType, SourceType};
use records::release::ReleaseSource;
use records::repository::StaticRepository;
use records::version;
use std::sync::Arc;
use tempfile::TempDir;

/// `count` managed packages with five releases each
fn generate(count: u64) -> (StaticRepository, Arc<FileManagedStore>) {
    let mut packages = Vec::new();
    let mut entries = Vec::new();
    for id in 1..=count {
        let slug = format!("plugin-{}", id);
        let mut builder = PackageBuilder::new(PackageType::Plugin, SourceType::LocalManual);
        builder
            .set_slug(&slug)
            .set_managed_post_id(id)
            .set_required_packages(vec![DependencyEntry::new("acme/lib", "^1.0")]);
        for minor in 0..5 {
            builder.add_release(&format!("1.{}.0", minor), ReleaseSource::Stored);
        }
        packages.push(builder.build().unwrap());
        entries.push(ManagedPackage {
            id,
            slug,
            ..ManagedPackage::default()
        });
    }
    (
        StaticRepository::new(packages),
        Arc::new(FileManagedStore::from_packages(entries)),
    )
}

/// Benchmark repository transformation
fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    for count in [10u64, 100, 500] {
        let (repository, store) = generate(count);
        let transformer = ComposerRepositoryTransformer::new(
            ComposerPackageTransformer::new("pressody-records"),
            store,
            "https://records.test",
        );
        let context = RequestContext::anonymous();

        group.bench_with_input(BenchmarkId::new("packages", count), &count, |b, _| {
            b.iter(|| black_box(transformer.transform(&repository, &context).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark packages.json output
fn bench_write(c: &mut Criterion) {
    let (repository, store) = generate(100);
    let composer = ComposerRepositoryTransformer::new(
        ComposerPackageTransformer::new("pressody-records"),
        store,
        "https://records.test",
    )
    .transform(&repository, &RequestContext::anonymous())
    .unwrap();

    let temp = TempDir::new().unwrap();
    let writer = PackagesJsonWriter::new(temp.path(), IndexFormat::Includes, 2);

    c.bench_function("write_packages_json_100", |b| {
        b.iter(|| black_box(writer.write(&composer).unwrap()));
    });
}

/// Benchmark version handling and hashids
fn bench_identifiers(c: &mut Criterion) {
    let versions = ["1.0.0", "2.3", "v4.0.0-beta.2", "dev-main", "10.2.3.4-RC1"];
    c.bench_function("version_normalize", |b| {
        b.iter(|| {
            for v in &versions {
                black_box(version::normalize(v));
            }
        })
    });

    let hashid = HashId::new("pressody-records");
    c.bench_function("hashid_roundtrip", |b| {
        b.iter(|| {
            for id in [1u64, 42, 9_001, 1_000_000] {
                let encoded = hashid.encode(black_box(id));
                black_box(hashid.decode(&encoded));
            }
        })
    });
}

criterion_group!(benches, bench_transform, bench_write, bench_identifiers);
criterion_main!(benches);
