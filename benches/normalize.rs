use std::hint::black_box;

use admin_reconcile::config::PipelineConfig;
use admin_reconcile::corrections::{CorrectionTables, Source};
use admin_reconcile::dataset::Table;
use admin_reconcile::model::AdminLevel;
use admin_reconcile::normalize::normalize;
use admin_reconcile::pipeline;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

const SYLLABLES: [&str; 8] = ["Bình", "Tân", "Hòa", "Phú", "Long", "Mỹ", "An", "Thạnh"];

fn place(seed: usize) -> String {
    format!(
        "{} {} {}",
        SYLLABLES[seed % 8],
        SYLLABLES[(seed / 8) % 8],
        SYLLABLES[(seed / 64) % 8]
    )
}

// Boundary rows in camel-joined form, census rows with titles and spaces.
fn generate_tables(wards: usize) -> (Table, Table) {
    let boundary_headers = ["city", "district", "dist_id", "ward", "ward_id"];
    let census_headers = ["city", "district", "ward", "population"];
    let mut boundary = Vec::with_capacity(wards);
    let mut census = Vec::with_capacity(wards);
    for i in 0..wards {
        let city = format!("Tỉnh {}", i / 1000);
        let district = (i / 20) % 50;
        let ward = place(i);
        boundary.push(vec![
            city.replace(' ', ""),
            format!("Quận{district}"),
            format!("VNM.{}.{district}_1", i / 1000),
            ward.replace(' ', ""),
            format!("VNM.{}.{district}.{i}_1", i / 1000),
        ]);
        let census_ward = if i % 5 == 0 { format!("P.{}", i % 30 + 1) } else { format!("Phường {ward}") };
        census.push(vec![
            city,
            format!("Q.{district}"),
            census_ward,
            (i * 17 % 9000).to_string(),
        ]);
    }
    let to_headers = |names: &[&str]| names.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    (
        Table::new(to_headers(&boundary_headers), boundary),
        Table::new(to_headers(&census_headers), census),
    )
}

fn bench_normalize(c: &mut Criterion) {
    let names: Vec<String> = (0..512)
        .map(|i| match i % 4 {
            0 => format!("Phường {}", place(i)),
            1 => format!("P.{:02}", i % 30),
            2 => format!("CaoLãnh(Thànhphố) {}", place(i)),
            _ => format!("TP. {}", place(i)),
        })
        .collect();

    let mut group = c.benchmark_group("normalize");
    group.bench_function("ward_names", |b| {
        b.iter(|| {
            for name in &names {
                black_box(normalize(black_box(name), AdminLevel::Ward));
            }
        });
    });
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let (boundary, census) = generate_tables(10_000);
    let config = PipelineConfig::default();
    let tables = CorrectionTables::default();
    let reference = pipeline::build_reference(&boundary, AdminLevel::Ward, &config, &tables)
        .expect("build reference");

    let mut group = c.benchmark_group("resolve");
    group.sample_size(20);
    group.bench_function("build_reference", |b| {
        b.iter(|| {
            pipeline::build_reference(&boundary, AdminLevel::Ward, &config, &tables)
                .expect("build reference")
        });
    });
    group.bench_function("cascade_census", |b| {
        b.iter_batched(
            || (),
            |_| {
                pipeline::resolve_table(&census, &reference, Source::Census, &config, &tables)
                    .expect("resolve census")
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_resolve);
criterion_main!(benches);
