//! Property-based tests for strategy evolution.
//!
//! Whatever the seed and rates, genes never leave `[0, 1]` and a generation
//! step never changes the population size.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::evolution::{Genes, StrategyEvolution};
    use interest_model::{EvolutionConfig, ExplorationOutcome};

    fn sources() -> Vec<String> {
        vec!["wikipedia".into(), "hackernews".into(), "reddit".into()]
    }

    proptest! {
        /// Crossover followed by mutation stays inside the unit interval.
        #[test]
        fn bred_genes_stay_in_bounds(
            seed in any::<u64>(),
            rate in 0.0f64..=1.0,
            strength in 0.0f64..=1.0,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let a = Genes::random(&sources(), &mut rng);
            let b = Genes::random(&sources(), &mut rng);
            let mut child = Genes::crossover(&a, &b, &mut rng);
            child.mutate(rate, strength, &mut rng);
            prop_assert!(child.in_bounds());
        }

        /// Population size is invariant across generations.
        #[test]
        fn evolve_preserves_population_size(
            seed in any::<u64>(),
            size in 2usize..16,
            rewards in prop::collection::vec(0u32..5, 16),
            generations in 1usize..4,
        ) {
            let config = EvolutionConfig {
                population_size: size,
                elitism_count: 2.min(size),
                ..EvolutionConfig::default()
            };
            let mut rng = StdRng::seed_from_u64(seed);
            let mut evolution = StrategyEvolution::new(config);
            evolution.initialize(&mut rng);

            for _ in 0..generations {
                let ids: Vec<_> = evolution.population().iter().map(|g| g.id).collect();
                for (id, clicks) in ids.into_iter().zip(&rewards) {
                    let outcome = ExplorationOutcome::default().with_user_clicks(*clicks);
                    evolution.record_outcome(id, &outcome);
                }
                evolution.evolve(&mut rng).unwrap();
                prop_assert_eq!(evolution.population().len(), size);
                prop_assert!(evolution.population().iter().all(|g| g.genes.in_bounds()));
            }
            prop_assert_eq!(evolution.generation() as usize, generations);
        }
    }
}
