//! Strategy genomes - evolvable exploration behavior.
//!
//! Every gene is a real in `[0, 1]`. Crossover and mutation always clamp back
//! into that range.

use interest_model::{ExplorationOutcome, GenomeId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ExplorationParameters;

/// Number of scalar genes.
pub const SCALAR_GENES: usize = 9;

/// The evolvable parameters of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genes {
    /// Appetite for exploring at all.
    pub exploration_bias: f64,
    /// How many topics to chase per exploration.
    pub breadth_preference: f64,
    pub recency_weight: f64,
    /// Preference for topics close to existing interests.
    pub connection_affinity: f64,
    pub novelty_seeking: f64,
    /// Preferred time of day, as a fraction of 24 hours.
    pub time_preference: f64,
    pub risk_tolerance: f64,
    /// How strongly long-term memory steers topic choice.
    pub memory_influence: f64,
    pub serendipity_factor: f64,
    /// Content source name to preference.
    pub api_preferences: BTreeMap<String, f64>,
}

impl Genes {
    /// Uniformly random genes with a preference for every source.
    pub fn random<R: Rng + ?Sized>(sources: &[String], rng: &mut R) -> Self {
        let mut genes = Self {
            exploration_bias: rng.gen(),
            breadth_preference: rng.gen(),
            recency_weight: rng.gen(),
            connection_affinity: rng.gen(),
            novelty_seeking: rng.gen(),
            time_preference: rng.gen(),
            risk_tolerance: rng.gen(),
            memory_influence: rng.gen(),
            serendipity_factor: rng.gen(),
            api_preferences: BTreeMap::new(),
        };
        for source in sources {
            genes.api_preferences.insert(source.clone(), rng.gen());
        }
        genes
    }

    /// Named scalar genes in declaration order.
    pub fn scalars(&self) -> [(&'static str, f64); SCALAR_GENES] {
        [
            ("exploration_bias", self.exploration_bias),
            ("breadth_preference", self.breadth_preference),
            ("recency_weight", self.recency_weight),
            ("connection_affinity", self.connection_affinity),
            ("novelty_seeking", self.novelty_seeking),
            ("time_preference", self.time_preference),
            ("risk_tolerance", self.risk_tolerance),
            ("memory_influence", self.memory_influence),
            ("serendipity_factor", self.serendipity_factor),
        ]
    }

    fn scalars_mut(&mut self) -> [&mut f64; SCALAR_GENES] {
        [
            &mut self.exploration_bias,
            &mut self.breadth_preference,
            &mut self.recency_weight,
            &mut self.connection_affinity,
            &mut self.novelty_seeking,
            &mut self.time_preference,
            &mut self.risk_tolerance,
            &mut self.memory_influence,
            &mut self.serendipity_factor,
        ]
    }

    /// Uniform crossover: every scalar gene and every source preference is
    /// inherited from either parent with equal probability.
    pub fn crossover<R: Rng + ?Sized>(first: &Genes, second: &Genes, rng: &mut R) -> Genes {
        let mut child = first.clone();
        let donor = second.scalars();
        for (gene, (_, value)) in child.scalars_mut().into_iter().zip(donor) {
            if rng.gen_bool(0.5) {
                *gene = value;
            }
        }

        for (source, &value) in &second.api_preferences {
            match child.api_preferences.get_mut(source) {
                Some(pref) => {
                    if rng.gen_bool(0.5) {
                        *pref = value;
                    }
                }
                None => {
                    child.api_preferences.insert(source.clone(), value);
                }
            }
        }
        child
    }

    /// Mutate each gene with probability `rate`.
    ///
    /// Scalars move by uniform noise in `[-strength, strength]`; a mutated
    /// source preference is redrawn outright.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, strength: f64, rng: &mut R) {
        for gene in self.scalars_mut() {
            if rng.gen::<f64>() < rate {
                let noise = if strength > 0.0 {
                    rng.gen_range(-strength..=strength)
                } else {
                    0.0
                };
                *gene += noise;
            }
        }
        for pref in self.api_preferences.values_mut() {
            if rng.gen::<f64>() < rate {
                *pref = rng.gen();
            }
        }
        self.clamp();
    }

    /// Force every gene into `[0, 1]`.
    pub fn clamp(&mut self) {
        for gene in self.scalars_mut() {
            *gene = gene.clamp(0.0, 1.0);
        }
        for pref in self.api_preferences.values_mut() {
            *pref = pref.clamp(0.0, 1.0);
        }
    }

    /// Euclidean distance between the scalar genes, scaled into `[0, 1]`.
    pub fn distance(&self, other: &Genes) -> f64 {
        let sum_sq: f64 = self
            .scalars()
            .iter()
            .zip(other.scalars())
            .map(|((_, a), (_, b))| (a - b).powi(2))
            .sum();
        (sum_sq / SCALAR_GENES as f64).sqrt()
    }

    pub fn in_bounds(&self) -> bool {
        self.scalars().iter().all(|(_, v)| (0.0..=1.0).contains(v))
            && self.api_preferences.values().all(|v| (0.0..=1.0).contains(v))
    }
}

/// One candidate strategy and its running fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyGenome {
    pub id: GenomeId,
    pub generation: u32,
    /// Exponentially weighted reward; may go negative.
    pub fitness: f64,
    pub explorations: u32,
    pub discoveries: u32,
    pub genes: Genes,
}

impl StrategyGenome {
    /// A fresh genome with zero fitness.
    pub fn new(id: GenomeId, generation: u32, genes: Genes) -> Self {
        Self {
            id,
            generation,
            fitness: 0.0,
            explorations: 0,
            discoveries: 0,
            genes,
        }
    }

    pub fn random<R: Rng + ?Sized>(sources: &[String], rng: &mut R) -> Self {
        let genes = Genes::random(sources, rng);
        Self::new(GenomeId::from_rng(rng), 0, genes)
    }

    /// Behavior this genome asks of the explorer.
    pub fn parameters(&self) -> ExplorationParameters {
        ExplorationParameters::from_genes(&self.genes)
    }

    /// Fold one outcome into the fitness. Returns the new fitness.
    pub fn record(&mut self, outcome: &ExplorationOutcome, fitness_decay: f64) -> f64 {
        self.fitness = self.fitness * fitness_decay + outcome.reward();
        self.explorations = self.explorations.saturating_add(1);
        self.discoveries = self.discoveries.saturating_add(outcome.discoveries);
        self.fitness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sources() -> Vec<String> {
        vec!["wikipedia".into(), "hackernews".into()]
    }

    #[test]
    fn test_random_genes_in_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let genes = Genes::random(&sources(), &mut rng);
            assert!(genes.in_bounds());
            assert_eq!(genes.api_preferences.len(), 2);
        }
    }

    #[test]
    fn test_crossover_takes_each_gene_from_a_parent() {
        let mut rng = StdRng::seed_from_u64(2);
        let a = Genes::random(&sources(), &mut rng);
        let b = Genes::random(&sources(), &mut rng);

        for _ in 0..20 {
            let child = Genes::crossover(&a, &b, &mut rng);
            for ((_, c), ((_, x), (_, y))) in child
                .scalars()
                .into_iter()
                .zip(a.scalars().into_iter().zip(b.scalars()))
            {
                assert!(c == x || c == y);
            }
            for (source, value) in &child.api_preferences {
                assert!(*value == a.api_preferences[source] || *value == b.api_preferences[source]);
            }
        }
    }

    #[test]
    fn test_mutation_rate_zero_is_identity() {
        let mut rng = StdRng::seed_from_u64(3);
        let genes = Genes::random(&sources(), &mut rng);
        let mut copy = genes.clone();
        copy.mutate(0.0, 0.15, &mut rng);
        assert_eq!(copy, genes);
    }

    #[test]
    fn test_mutation_is_bounded() {
        let mut rng = StdRng::seed_from_u64(4);
        let genes = Genes::random(&sources(), &mut rng);
        let mut mutated = genes.clone();
        mutated.mutate(1.0, 0.15, &mut rng);

        for ((_, before), (_, after)) in genes.scalars().into_iter().zip(mutated.scalars()) {
            assert!((after - before).abs() <= 0.15 + 1e-12);
        }
        assert!(mutated.in_bounds());
    }

    #[test]
    fn test_clamp() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut genes = Genes::random(&sources(), &mut rng);
        genes.exploration_bias = 1.4;
        genes.risk_tolerance = -0.2;
        genes.api_preferences.insert("reddit".into(), 3.0);
        genes.clamp();
        assert_eq!(genes.exploration_bias, 1.0);
        assert_eq!(genes.risk_tolerance, 0.0);
        assert_eq!(genes.api_preferences["reddit"], 1.0);
    }

    #[test]
    fn test_distance() {
        let mut rng = StdRng::seed_from_u64(6);
        let a = Genes::random(&sources(), &mut rng);
        assert_eq!(a.distance(&a), 0.0);

        let mut zero = a.clone();
        let mut one = a.clone();
        for gene in zero.scalars_mut() {
            *gene = 0.0;
        }
        for gene in one.scalars_mut() {
            *gene = 1.0;
        }
        assert!((zero.distance(&one) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_record_outcome_is_exponentially_weighted() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut genome = StrategyGenome::random(&sources(), &mut rng);

        let outcome = ExplorationOutcome::default().with_discoveries(2);
        genome.record(&outcome, 0.95);
        assert!((genome.fitness - 0.6).abs() < 1e-12);

        let outcome = ExplorationOutcome::default().with_failures(1);
        genome.record(&outcome, 0.95);
        assert!((genome.fitness - (0.6 * 0.95 - 0.2)).abs() < 1e-12);

        assert_eq!(genome.explorations, 2);
        assert_eq!(genome.discoveries, 2);
    }
}
