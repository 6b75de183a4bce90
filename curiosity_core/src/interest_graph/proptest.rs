//! Property-based tests for the interest graph.
//!
//! These verify that keyword similarity is a bounded symmetric measure, that
//! decay never raises or negates a weight, and that the core tier always
//! agrees with the weight, whatever the input topics.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    use crate::interest_graph::{extract_keywords, jaccard, normalize_topic, InterestGraph};
    use crate::snapshot::GraphSnapshot;
    use interest_model::{GraphConfig, MemoryType};

    const POOL: &[&str] = &[
        "quantum computing",
        "quantum physics",
        "machine learning",
        "deep learning",
        "jazz music",
        "music theory",
    ];

    fn topic() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z]{3,8}", 1..4).prop_map(|words| words.join(" "))
    }

    #[derive(Debug, Clone)]
    enum Step {
        Reinforce(usize, f64),
        Boost(usize, f64),
        Decay(i64),
        Restore,
        /// Restore after marking every node core in the snapshot.
        RestoreAllCore,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0..POOL.len(), 0.0..0.5f64).prop_map(|(i, s)| Step::Reinforce(i, s)),
            (0..POOL.len(), 0.0..0.6f64).prop_map(|(i, a)| Step::Boost(i, a)),
            (0i64..200).prop_map(Step::Decay),
            Just(Step::Restore),
            Just(Step::RestoreAllCore),
        ]
    }

    proptest! {
        /// Similarity is symmetric and stays in [0, 1].
        #[test]
        fn similarity_is_symmetric_and_bounded(a in topic(), b in topic()) {
            let ka = extract_keywords(&a);
            let kb = extract_keywords(&b);
            let ab = jaccard(&ka, &kb);
            prop_assert_eq!(ab, jaccard(&kb, &ka));
            prop_assert!((0.0..=1.0).contains(&ab));
        }

        /// A non-empty keyword set is fully similar to itself.
        #[test]
        fn similarity_is_reflexive(a in topic()) {
            let ka = extract_keywords(&a);
            prop_assume!(!ka.is_empty());
            prop_assert_eq!(jaccard(&ka, &ka), 1.0);
        }

        /// Normalization is idempotent.
        #[test]
        fn normalization_is_idempotent(raw in "[ A-Za-z]{0,24}") {
            let once = normalize_topic(&raw);
            prop_assert_eq!(normalize_topic(&once), once);
        }

        /// A decay tick never raises a weight and never drives one negative.
        #[test]
        fn decay_is_monotone_and_non_negative(
            topics in prop::collection::vec(topic(), 1..12),
            hours in 0i64..2000,
        ) {
            let config = GraphConfig { min_weight: 0.0, ..GraphConfig::default() };
            let mut graph = InterestGraph::new(config);
            let start = Utc::now();
            for t in &topics {
                graph.add_or_reinforce(t, 0.15, start);
            }
            let before: Vec<(String, f64)> = graph
                .get_interests_sorted()
                .into_iter()
                .map(|n| (n.topic, n.weight))
                .collect();

            graph.decay_tick(start + Duration::hours(hours));

            for (topic, weight) in before {
                let after = graph.get(&topic).map(|n| n.weight).unwrap_or(0.0);
                prop_assert!(after <= weight);
                prop_assert!(after >= 0.0);
            }
        }

        /// After every mutation, a node is core exactly when its weight is at
        /// or above the core threshold.
        #[test]
        fn core_tier_tracks_weight(steps in prop::collection::vec(step(), 1..40)) {
            let config = GraphConfig { min_weight: 0.0, ..GraphConfig::default() };
            let threshold = config.core_threshold;
            let mut graph = InterestGraph::new(config.clone());
            let mut now = Utc::now();

            for step in steps {
                match step {
                    Step::Reinforce(i, strength) => {
                        graph.add_or_reinforce(POOL[i], strength, now);
                    }
                    Step::Boost(i, amount) => {
                        graph.boost(POOL[i], amount);
                    }
                    Step::Decay(hours) => {
                        now = now + Duration::hours(hours);
                        graph.decay_tick(now);
                    }
                    Step::Restore => {
                        graph = GraphSnapshot::capture(&graph)
                            .restore(config.clone())
                            .expect("current version");
                    }
                    Step::RestoreAllCore => {
                        let mut snapshot = GraphSnapshot::capture(&graph);
                        for view in snapshot.nodes.values_mut() {
                            view.memory_type = MemoryType::Core;
                        }
                        graph = snapshot.restore(config.clone()).expect("current version");
                    }
                }

                for node in graph.get_interests_sorted() {
                    prop_assert_eq!(node.is_core, node.memory_type == MemoryType::Core);
                    if node.is_core {
                        prop_assert!(node.weight >= threshold, "{} core at {}", node.topic, node.weight);
                    } else {
                        prop_assert!(node.weight < threshold, "{} not core at {}", node.topic, node.weight);
                    }
                }
            }
        }

        /// Every link is present on both endpoints.
        #[test]
        fn links_are_symmetric(topics in prop::collection::vec(topic(), 1..16)) {
            let mut graph = InterestGraph::default();
            let now = Utc::now();
            for t in &topics {
                graph.add_or_reinforce(t, 0.1, now);
            }
            for node in graph.get_interests_sorted() {
                for neighbor in &node.connections {
                    prop_assert!(graph.neighbors(neighbor).contains(&node.topic));
                }
            }
        }
    }
}
