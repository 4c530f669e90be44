use approx::assert_abs_diff_eq;
use sextant::attribute::{Attribute, AttributeKind, Dataset};
use sextant::beam::{BeamSearch, CancellationToken, SearchError, SearchResult, search};
use sextant::config::{ConfigError, SearchConfig};
use sextant::group::DuplicatePolicy;
use sextant::heuristic::{Heuristic, QualityHeuristic};
use sextant::metric::Metric;
use sextant::progress::SearchProgressObserver;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
    values
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect()
}

/// Every combination of three boolean attributes; the target is `A AND B`.
fn conjunction_dataset() -> Dataset {
    let attributes = vec![
        Attribute::new(0, "A", AttributeKind::Boolean),
        Attribute::new(1, "B", AttributeKind::Boolean),
        Attribute::new(2, "C", AttributeKind::Boolean),
        Attribute::new(3, "target", AttributeKind::Boolean),
    ];
    let mut data = Vec::new();
    for a in 0..2 {
        for b in 0..2 {
            for c in 0..2 {
                let target = if a == 1 && b == 1 { "1" } else { "0" };
                data.push(vec![a.to_string(), b.to_string(), c.to_string(), target.to_string()]);
            }
        }
    }
    Dataset::new("conjunction", attributes, data, 3).unwrap()
}

/// A mixed-kind dataset where the positives are `smoker == 1 AND age >= 5`.
fn mixed_dataset() -> Dataset {
    let attributes = vec![
        Attribute::new(0, "smoker", AttributeKind::Boolean),
        Attribute::new(1, "region", AttributeKind::Set).with_domain(vec![
            "north".to_string(),
            "south".to_string(),
            "west".to_string(),
        ]),
        Attribute::new(2, "age", AttributeKind::Numeric),
        Attribute::new(3, "leak", AttributeKind::Boolean),
        Attribute::new(4, "sick", AttributeKind::Boolean),
    ];
    let regions = ["north", "south", "west"];
    let data = (0..48)
        .map(|i| {
            let smoker = i % 2;
            let age = (i * 7) % 11;
            let sick = smoker == 1 && age >= 5;
            let age_cell = if i % 13 == 0 { "?".to_string() } else { age.to_string() };
            vec![
                smoker.to_string(),
                regions[(i / 2) % 3].to_string(),
                age_cell,
                (sick as u8).to_string(),
                (sick as u8).to_string(),
            ]
        })
        .collect();
    Dataset::new("mixed", attributes, data, 4).unwrap()
}

fn config(width: usize, depth: usize, heuristic: Heuristic) -> SearchConfig {
    SearchConfig {
        width,
        depth,
        heuristic,
        ..SearchConfig::default()
    }
}

#[test]
fn single_attribute_recalls_every_positive_of_a_conjunction() {
    let data = conjunction_dataset();
    let result = search(&data, &config(2, 1, Heuristic::Sensitivity)).unwrap();

    assert_eq!(result.levels.len(), 1);
    let best = &result.level(0)[0];
    assert_eq!(best.len(), 1);
    let condition = &best.conditions[0];
    assert!(condition.attribute == "A" || condition.attribute == "B");
    assert_eq!(condition.metric, Metric::Eq);
    assert_eq!(condition.value, "1");

    let counts = best.counts();
    assert_eq!(counts.covered_positive, counts.positive_total);
    assert_abs_diff_eq!(
        counts.covered_positive as f64 / counts.positive_total as f64,
        1.0,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(best.score(), 1.0, epsilon = 1e-12);
    assert_eq!(result.level(0).len(), 2);
}

#[test]
fn level_k_groups_hold_k_plus_one_predicates() {
    let data = mixed_dataset();
    let result = search(&data, &config(4, 3, Heuristic::Wracc)).unwrap();
    assert_eq!(result.levels.len(), 3);
    for (level, groups) in result.levels.iter().enumerate() {
        assert!(!groups.is_empty(), "level {level} is empty");
        assert!(groups.len() <= 4);
        for group in groups {
            assert_eq!(group.len(), level + 1, "{group} at level {level}");
        }
        for pair in groups.windows(2) {
            assert!(pair[0].score() >= pair[1].score());
        }
    }
}

#[test]
fn chains_never_repeat_an_attribute_comparator_pair() {
    let data = mixed_dataset();
    let result = search(&data, &config(6, 3, Heuristic::ChiSquared)).unwrap();
    for group in result.levels.iter().flatten() {
        let pairs: BTreeSet<(usize, Metric)> = group
            .conditions
            .iter()
            .map(|c| (c.attribute_id, c.metric))
            .collect();
        assert_eq!(pairs.len(), group.len(), "{group}");
    }
}

#[test]
fn parallel_sequential_and_uncached_searches_agree() {
    let data = mixed_dataset();
    for heuristic in Heuristic::ALL {
        let base = config(5, 3, heuristic);
        let parallel = search(&data, &base).unwrap();
        let sequential = search(
            &data,
            &SearchConfig {
                parallel: false,
                ..base.clone()
            },
        )
        .unwrap();
        let uncached = search(
            &data,
            &SearchConfig {
                memoize: false,
                threads: Some(2),
                ..base.clone()
            },
        )
        .unwrap();
        assert_eq!(parallel, sequential, "{heuristic}");
        assert_eq!(parallel, uncached, "{heuristic}");
    }
}

#[test]
fn value_insensitive_policy_keeps_one_group_per_structure() {
    let data = mixed_dataset();
    let config = SearchConfig {
        compare_values: false,
        ..config(8, 2, Heuristic::Wracc)
    };
    assert_eq!(config.duplicate_policy(), DuplicatePolicy::IgnoreValues);
    let result = search(&data, &config).unwrap();
    for groups in &result.levels {
        let structures: BTreeSet<Vec<(usize, Metric)>> = groups
            .iter()
            .map(|g| {
                let mut terms: Vec<(usize, Metric)> =
                    g.conditions.iter().map(|c| (c.attribute_id, c.metric)).collect();
                terms.sort();
                terms
            })
            .collect();
        assert_eq!(structures.len(), groups.len());
    }
}

#[test]
fn unknown_values_are_never_covered() {
    let data = mixed_dataset();
    let unknown_rows = data
        .instances()
        .iter()
        .filter(|i| i.values()[2] == "?")
        .count();
    assert!(unknown_rows > 0);

    let result = search(&data, &config(10, 1, Heuristic::Sensitivity)).unwrap();
    let on_age: Vec<_> = result
        .level(0)
        .iter()
        .filter(|g| g.conditions[0].attribute == "age")
        .collect();
    assert!(!on_age.is_empty());
    for group in on_age {
        let counts = group.counts();
        assert_eq!(counts.unknown(), unknown_rows);
        assert!(counts.covered() + counts.unknown() <= counts.total());
        assert_eq!(counts.total(), data.instances().len());
    }
}

#[test]
fn cached_counts_match_uncached_counts_when_several_columns_are_missing() {
    let attributes = vec![
        Attribute::new(0, "a", AttributeKind::Boolean),
        Attribute::new(1, "x", AttributeKind::Numeric),
        Attribute::new(2, "class", AttributeKind::Boolean),
    ];
    let data = Dataset::new(
        "gaps",
        attributes,
        rows(&[
            &["1", "1", "1"],
            &["1", "2", "1"],
            &["1", "?", "0"],
            &["0", "4", "1"],
            &["0", "5", "0"],
            &["?", "6", "0"],
            &["?", "3", "1"],
            &["0", "?", "1"],
        ]),
        2,
    )
    .unwrap();

    let base = config(6, 2, Heuristic::Wracc);
    let cached = search(&data, &base).unwrap();
    let uncached = search(
        &data,
        &SearchConfig {
            memoize: false,
            ..base.clone()
        },
    )
    .unwrap();
    assert_eq!(cached, uncached);

    for group in cached.level(1) {
        let counts = group.counts();
        assert_eq!(
            counts.covered() + counts.not_covered_positive() + counts.not_covered_negative() + counts.unknown(),
            counts.total(),
            "{group}"
        );
    }
}

#[test]
fn blacklisted_and_target_columns_are_never_used() {
    let data = mixed_dataset();
    let unrestricted = search(&data, &config(3, 1, Heuristic::Wracc)).unwrap();
    // the leaked copy of the target is a perfect subgroup
    assert_eq!(unrestricted.level(0)[0].conditions[0].attribute, "leak");

    let config = SearchConfig {
        blacklist: vec!["leak".to_string(), "no-such-column".to_string()],
        ..config(3, 2, Heuristic::Wracc)
    };
    let result = search(&data, &config).unwrap();
    for group in result.levels.iter().flatten() {
        for condition in &group.conditions {
            assert_ne!(condition.attribute, "leak");
            assert_ne!(condition.attribute, "sick");
        }
    }
}

#[test]
fn invalid_configuration_fails_before_searching() {
    let data = conjunction_dataset();
    let err = search(&data, &config(0, 1, Heuristic::Wracc)).unwrap_err();
    assert!(matches!(err, SearchError::Config(ConfigError::ZeroWidth)));

    let err = search(
        &data,
        &SearchConfig {
            positive_label: "?".to_string(),
            ..config(2, 1, Heuristic::Wracc)
        },
    )
    .unwrap_err();
    assert!(matches!(err, SearchError::Config(ConfigError::UnknownPositiveLabel)));
}

#[test]
fn cancelled_searches_stop_with_an_error() {
    let data = mixed_dataset();
    let token = CancellationToken::new();
    token.cancel();
    for parallel in [true, false] {
        let err = BeamSearch::new(
            &data,
            SearchConfig {
                parallel,
                ..config(3, 2, Heuristic::Wracc)
            },
        )
        .with_cancellation(token.clone())
        .run()
        .unwrap_err();
        assert!(matches!(err, SearchError::Cancelled { level: 0 }));
    }
}

#[test]
fn levels_without_seeds_stay_empty() {
    // a constant attribute covers everything and is never kept
    let attributes = vec![
        Attribute::new(0, "constant", AttributeKind::Set),
        Attribute::new(1, "class", AttributeKind::Boolean),
    ];
    let data = Dataset::new(
        "flat",
        attributes,
        rows(&[&["x", "1"], &["x", "0"], &["x", "0"]]),
        1,
    )
    .unwrap();
    let result = search(&data, &config(3, 3, Heuristic::Wracc)).unwrap();
    assert_eq!(result.levels, vec![Vec::new(), Vec::new(), Vec::new()]);
    assert!(result.best().is_none());
}

#[test]
fn custom_heuristics_replace_the_configured_one() {
    struct Precision;
    impl QualityHeuristic for Precision {
        fn name(&self) -> &str {
            "precision"
        }
        #[allow(non_snake_case)]
        fn raw_score(&self, p: f64, n: f64, P: f64, N: f64) -> f64 {
            let _ = (P, N);
            p / (p + n)
        }
    }

    let data = conjunction_dataset();
    let result = BeamSearch::new(&data, config(1, 2, Heuristic::Wracc))
        .with_heuristic(Arc::new(Precision))
        .run()
        .unwrap();
    assert_eq!(result.heuristic, "precision");
    let best = &result.level(1)[0];
    assert_abs_diff_eq!(best.score(), 1.0, epsilon = 1e-12);
    assert_eq!(best.counts().covered_positive, 2);
}

#[test]
fn progress_observer_sees_every_attribute_of_every_level() {
    #[derive(Default)]
    struct Counter {
        levels: AtomicUsize,
        attributes: AtomicUsize,
        kept: AtomicUsize,
    }
    impl SearchProgressObserver for Counter {
        fn on_level_start(&self, level: usize, attributes: usize) {
            let _ = (level, attributes);
            self.levels.fetch_add(1, Ordering::Relaxed);
        }
        fn on_attribute_done(&self, level: usize, attribute: usize) {
            let _ = (level, attribute);
            self.attributes.fetch_add(1, Ordering::Relaxed);
        }
        fn on_level_finish(&self, level: usize, kept: usize) {
            let _ = level;
            self.kept.fetch_add(kept, Ordering::Relaxed);
        }
    }

    let data = conjunction_dataset();
    let counter = Arc::new(Counter::default());
    let result: SearchResult = BeamSearch::new(&data, config(2, 2, Heuristic::Wracc))
        .with_progress(counter.clone())
        .run()
        .unwrap();

    assert_eq!(counter.levels.load(Ordering::Relaxed), 2);
    assert_eq!(counter.attributes.load(Ordering::Relaxed), 2 * 3);
    let reported: usize = result.levels.iter().map(Vec::len).sum();
    assert_eq!(counter.kept.load(Ordering::Relaxed), reported);
}

#[test]
fn results_serialize_to_json() {
    let data = conjunction_dataset();
    let result = search(&data, &config(2, 2, Heuristic::Sensitivity)).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["heuristic"], "Sensitivity quality measure");
    assert_eq!(json["levels"][0][0]["conditions"][0]["metric"], "eq");
    assert_eq!(json["levels"][0][0]["result"]["counts"]["positive_total"], 2);
}
