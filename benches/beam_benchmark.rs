use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sextant::attribute::{Attribute, AttributeKind, Dataset};
use sextant::beam::search;
use sextant::config::SearchConfig;
use sextant::heuristic::Heuristic;

const CATEGORIES: [&str; 4] = ["red", "green", "blue", "grey"];

/// Boolean, categorical and numeric columns with a noisy two-term target.
fn random_dataset(instances: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(0x5EED_BEA4 + seed);
    let mut attributes = Vec::new();
    for i in 0..3 {
        attributes.push(Attribute::new(attributes.len(), format!("flag{i}"), AttributeKind::Boolean));
    }
    for i in 0..2 {
        attributes.push(Attribute::new(attributes.len(), format!("colour{i}"), AttributeKind::Set));
    }
    for i in 0..2 {
        attributes.push(Attribute::new(attributes.len(), format!("level{i}"), AttributeKind::Numeric));
    }
    let target = attributes.len();
    attributes.push(Attribute::new(target, "class", AttributeKind::Boolean));

    let rows = (0..instances)
        .map(|_| {
            let mut row = Vec::with_capacity(target + 1);
            for _ in 0..3 {
                row.push(if rng.gen_bool(0.5) { "1" } else { "0" }.to_string());
            }
            for _ in 0..2 {
                row.push(CATEGORIES[rng.gen_range(0..CATEGORIES.len())].to_string());
            }
            for _ in 0..2 {
                if rng.gen_bool(0.02) {
                    row.push("?".to_string());
                } else {
                    row.push(rng.gen_range(0..20).to_string());
                }
            }
            let signal = row[0] == "1" && row[3] != "grey";
            let positive = signal ^ rng.gen_bool(0.1);
            row.push(if positive { "1" } else { "0" }.to_string());
            row
        })
        .collect();

    Dataset::new("random", attributes, rows, target).expect("valid benchmark dataset")
}

fn benchmark_beam_search(c: &mut Criterion) {
    let sizes = [250_usize, 1_000, 4_000];
    let datasets: Vec<_> = sizes
        .iter()
        .map(|&size| (size, random_dataset(size, size as u64)))
        .collect();

    let mut group = c.benchmark_group("beam_search");
    group.sample_size(10);
    for (size, dataset) in datasets.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        for (label, parallel, memoize) in [
            ("parallel", true, true),
            ("sequential", false, true),
            ("parallel_uncached", true, false),
        ] {
            let config = SearchConfig {
                width: 10,
                depth: 3,
                heuristic: Heuristic::Wracc,
                parallel,
                memoize,
                ..SearchConfig::default()
            };
            group.bench_with_input(BenchmarkId::new(label, size), dataset, |b, input| {
                b.iter(|| {
                    let result = search(black_box(input), &config).expect("search succeeds");
                    black_box(result);
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, benchmark_beam_search);
criterion_main!(benches);
