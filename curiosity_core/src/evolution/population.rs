//! The strategy population and its generational loop.

use interest_model::{EvolutionConfig, ExplorationOutcome, GenomeId};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

use super::{Genes, StrategyGenome};
use crate::error::EvolutionError;

/// Probability of picking the best, second and third tournament entrant.
const TOURNAMENT_RANK_ODDS: [f64; 3] = [0.7, 0.2, 0.1];

/// Summary of a population right before it was replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: u32,
    pub best_fitness: f64,
    pub average_fitness: f64,
    pub best_strategy_id: GenomeId,
}

/// Population overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStats {
    pub generation: u32,
    pub population: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
    /// Mean pairwise gene distance, 0 when every genome is identical.
    pub diversity: f64,
}

/// A small genetic algorithm over exploration strategies.
#[derive(Debug, Clone, Default)]
pub struct StrategyEvolution {
    config: EvolutionConfig,
    population: Vec<StrategyGenome>,
    generation: u32,
    history: Vec<GenerationRecord>,
}

impl StrategyEvolution {
    /// An empty population. Genomes are drawn on first use.
    pub fn new(config: EvolutionConfig) -> Self {
        Self {
            config,
            population: Vec::new(),
            generation: 0,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Fill an empty population with random genomes.
    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.population.is_empty() {
            return;
        }
        self.population = (0..self.config.population_size)
            .map(|_| StrategyGenome::random(&self.config.api_sources, rng))
            .collect();
        debug!(size = self.population.len(), "strategy population initialized");
    }

    /// Drop every genome and the history.
    pub fn reset(&mut self) {
        self.population.clear();
        self.history.clear();
        self.generation = 0;
    }

    /// Pick a strategy by tournament.
    ///
    /// Entrants are drawn with replacement and ranked by fitness. The best
    /// wins 70% of the time, the runner-up 20%, the third 10%; a rank the
    /// tournament does not have falls back to the best.
    pub fn select_strategy<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&StrategyGenome> {
        self.initialize(rng);
        if self.population.is_empty() {
            return None;
        }

        let mut entrants: Vec<usize> = (0..self.config.tournament_size.max(1))
            .map(|_| rng.gen_range(0..self.population.len()))
            .collect();
        entrants.sort_unstable();
        entrants.dedup();
        entrants.sort_by(|&a, &b| by_fitness_desc(&self.population[a], &self.population[b]));

        let roll: f64 = rng.gen();
        let mut cumulative = 0.0;
        let mut rank = 0;
        for (i, odds) in TOURNAMENT_RANK_ODDS.iter().enumerate() {
            cumulative += odds;
            if roll < cumulative {
                rank = i;
                break;
            }
        }
        let winner = entrants.get(rank).or_else(|| entrants.first()).copied()?;
        self.population.get(winner)
    }

    /// Fold an outcome into the fitness of genome `id`.
    ///
    /// Returns false when no such genome is alive.
    pub fn record_outcome(&mut self, id: GenomeId, outcome: &ExplorationOutcome) -> bool {
        let decay = self.config.fitness_decay;
        match self.population.iter_mut().find(|g| g.id == id) {
            Some(genome) => {
                let fitness = genome.record(outcome, decay);
                debug!(%id, fitness, "outcome recorded");
                true
            }
            None => false,
        }
    }

    /// Replace the population with the next generation.
    ///
    /// Elites survive unchanged; the rest are offspring of roulette-selected
    /// parents. The population size never changes.
    pub fn evolve<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<GenerationRecord, EvolutionError> {
        let size = self.population.len();
        if size < 2 {
            return Err(EvolutionError::PopulationTooSmall { size });
        }

        self.population.sort_by(by_fitness_desc);
        let record = GenerationRecord {
            generation: self.generation,
            best_fitness: self.population[0].fitness,
            average_fitness: average_fitness(&self.population),
            best_strategy_id: self.population[0].id,
        };
        self.history.push(record.clone());

        let min_fitness = self
            .population
            .iter()
            .map(|g| g.fitness)
            .fold(f64::INFINITY, f64::min);
        let weights: Vec<f64> = self
            .population
            .iter()
            .map(|g| g.fitness - min_fitness + 1.0)
            .collect();
        let wheel = WeightedIndex::new(&weights).ok();

        let mut next: Vec<StrategyGenome> = self
            .population
            .iter()
            .take(self.config.elitism_count.min(size))
            .cloned()
            .collect();

        while next.len() < size {
            let first = &self.population[spin(wheel.as_ref(), size, rng)];
            let second = &self.population[spin(wheel.as_ref(), size, rng)];

            let mut genes = if rng.gen::<f64>() < self.config.crossover_rate {
                Genes::crossover(&first.genes, &second.genes, rng)
            } else {
                first.genes.clone()
            };
            genes.mutate(self.config.mutation_rate, self.config.mutation_strength, rng);

            next.push(StrategyGenome::new(
                GenomeId::from_rng(rng),
                first.generation + 1,
                genes,
            ));
        }

        self.population = next;
        self.generation += 1;

        info!(
            generation = self.generation,
            best_fitness = record.best_fitness,
            average_fitness = record.average_fitness,
            "new strategy generation"
        );
        Ok(record)
    }

    pub fn population(&self) -> &[StrategyGenome] {
        &self.population
    }

    /// Number of completed `evolve` calls.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn history(&self) -> &[GenerationRecord] {
        &self.history
    }

    pub fn get(&self, id: GenomeId) -> Option<&StrategyGenome> {
        self.population.iter().find(|g| g.id == id)
    }

    /// Fittest living genome.
    pub fn best(&self) -> Option<&StrategyGenome> {
        self.population
            .iter()
            .min_by(|a, b| by_fitness_desc(a, b))
    }

    pub fn get_stats(&self) -> EvolutionStats {
        let pairs = self.population.len() * self.population.len().saturating_sub(1) / 2;
        let mut distance = 0.0;
        for (i, a) in self.population.iter().enumerate() {
            for b in &self.population[i + 1..] {
                distance += a.genes.distance(&b.genes);
            }
        }

        EvolutionStats {
            generation: self.generation,
            population: self.population.len(),
            best_fitness: self.best().map_or(0.0, |g| g.fitness),
            average_fitness: average_fitness(&self.population),
            diversity: if pairs == 0 { 0.0 } else { distance / pairs as f64 },
        }
    }

    pub(crate) fn from_parts(
        config: EvolutionConfig,
        population: Vec<StrategyGenome>,
        generation: u32,
        history: Vec<GenerationRecord>,
    ) -> Self {
        Self {
            config,
            population,
            generation,
            history,
        }
    }
}

fn by_fitness_desc(a: &StrategyGenome, b: &StrategyGenome) -> Ordering {
    b.fitness.total_cmp(&a.fitness)
}

fn average_fitness(population: &[StrategyGenome]) -> f64 {
    if population.is_empty() {
        return 0.0;
    }
    population.iter().map(|g| g.fitness).sum::<f64>() / population.len() as f64
}

/// Roulette pick; uniform when the weights were unusable.
fn spin<R: Rng + ?Sized>(wheel: Option<&WeightedIndex<f64>>, len: usize, rng: &mut R) -> usize {
    match wheel {
        Some(wheel) => wheel.sample(rng),
        None => rng.gen_range(0..len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn evolution(config: EvolutionConfig, seed: u64) -> (StrategyEvolution, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut evolution = StrategyEvolution::new(config);
        evolution.initialize(&mut rng);
        (evolution, rng)
    }

    fn spread_fitness(evolution: &mut StrategyEvolution) {
        let ids: Vec<GenomeId> = evolution.population().iter().map(|g| g.id).collect();
        for (i, id) in ids.into_iter().enumerate() {
            let outcome = ExplorationOutcome::default().with_discoveries(i as u32);
            evolution.record_outcome(id, &outcome);
        }
    }

    #[test]
    fn test_initialize_fills_once() {
        let (mut evolution, mut rng) = evolution(EvolutionConfig::default(), 1);
        assert_eq!(evolution.population().len(), 10);
        let first = evolution.population()[0].id;
        evolution.initialize(&mut rng);
        assert_eq!(evolution.population()[0].id, first);
        assert!(evolution.population().iter().all(|g| g.genes.in_bounds()));
        assert!(evolution
            .population()
            .iter()
            .all(|g| g.genes.api_preferences.len() == 4));
    }

    #[test]
    fn test_select_initializes_empty_population() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut evolution = StrategyEvolution::default();
        assert!(evolution.select_strategy(&mut rng).is_some());
        assert_eq!(evolution.population().len(), 10);
    }

    #[test]
    fn test_select_favors_fitter_genomes() {
        let (mut evolution, mut rng) = evolution(EvolutionConfig::default(), 3);
        spread_fitness(&mut evolution);
        let best = evolution.best().unwrap().id;

        let mut wins = 0;
        for _ in 0..1000 {
            if evolution.select_strategy(&mut rng).unwrap().id == best {
                wins += 1;
            }
        }
        // Uniform choice would give roughly 100.
        assert!(wins > 150, "best genome won only {} times", wins);
    }

    #[test]
    fn test_single_entrant_tournament_falls_back_to_it() {
        let config = EvolutionConfig {
            population_size: 1,
            ..EvolutionConfig::default()
        };
        let (mut evolution, mut rng) = evolution(config, 4);
        let only = evolution.population()[0].id;
        for _ in 0..20 {
            assert_eq!(evolution.select_strategy(&mut rng).unwrap().id, only);
        }
    }

    #[test]
    fn test_record_outcome_unknown_genome() {
        let (mut evolution, _) = evolution(EvolutionConfig::default(), 5);
        assert!(!evolution.record_outcome(GenomeId::nil(), &ExplorationOutcome::default()));
    }

    #[test]
    fn test_evolve_keeps_size_and_elites() {
        let (mut evolution, mut rng) = evolution(EvolutionConfig::default(), 6);
        spread_fitness(&mut evolution);

        let mut ranked = evolution.population().to_vec();
        ranked.sort_by(by_fitness_desc);
        let elites = &ranked[..2];

        let record = evolution.evolve(&mut rng).unwrap();

        assert_eq!(record.generation, 0);
        assert_eq!(record.best_strategy_id, elites[0].id);
        assert_eq!(record.best_fitness, elites[0].fitness);
        assert_eq!(evolution.generation(), 1);
        assert_eq!(evolution.population().len(), 10);
        assert_eq!(&evolution.population()[..2], elites);
        assert_eq!(evolution.history(), &[record]);

        for child in &evolution.population()[2..] {
            assert_eq!(child.fitness, 0.0);
            assert_eq!(child.explorations, 0);
            assert_eq!(child.discoveries, 0);
            assert_eq!(child.generation, 1);
            assert!(child.genes.in_bounds());
        }
    }

    #[test]
    fn test_offspring_without_mutation_are_pure_crossovers() {
        let config = EvolutionConfig {
            mutation_rate: 0.0,
            ..EvolutionConfig::default()
        };
        let (mut evolution, mut rng) = evolution(config, 7);
        spread_fitness(&mut evolution);
        let prior = evolution.population().to_vec();

        evolution.evolve(&mut rng).unwrap();

        for child in &evolution.population()[2..] {
            let scalars = child.genes.scalars();
            let explained = prior.iter().any(|a| {
                prior.iter().any(|b| {
                    scalars
                        .iter()
                        .zip(a.genes.scalars().iter().zip(b.genes.scalars().iter()))
                        .all(|((_, c), ((_, x), (_, y)))| c == x || c == y)
                        && child.genes.api_preferences.iter().all(|(source, value)| {
                            a.genes.api_preferences.get(source) == Some(value)
                                || b.genes.api_preferences.get(source) == Some(value)
                        })
                })
            });
            assert!(explained, "offspring {} is not a crossover of two parents", child.id);
        }
    }

    #[test]
    fn test_evolve_needs_two_genomes() {
        let config = EvolutionConfig {
            population_size: 1,
            ..EvolutionConfig::default()
        };
        let (mut evolution, mut rng) = evolution(config, 8);
        let before = evolution.population().to_vec();

        let err = evolution.evolve(&mut rng).unwrap_err();

        assert_eq!(err, EvolutionError::PopulationTooSmall { size: 1 });
        assert_eq!(evolution.population(), &before[..]);
        assert_eq!(evolution.generation(), 0);
        assert!(evolution.history().is_empty());
    }

    #[test]
    fn test_ids_are_unique_across_generations() {
        let (mut evolution, mut rng) = evolution(EvolutionConfig::default(), 9);
        let mut seen: HashSet<GenomeId> = evolution.population().iter().map(|g| g.id).collect();
        for _ in 0..5 {
            evolution.evolve(&mut rng).unwrap();
            for genome in &evolution.population()[2..] {
                assert!(seen.insert(genome.id));
            }
        }
        assert_eq!(evolution.generation(), 5);
    }

    #[test]
    fn test_stats() {
        let (mut evolution, _) = evolution(EvolutionConfig::default(), 10);
        spread_fitness(&mut evolution);

        let stats = evolution.get_stats();
        assert_eq!(stats.population, 10);
        assert!((stats.best_fitness - 2.7).abs() < 1e-9);
        assert!((stats.average_fitness - 1.35).abs() < 1e-9);
        assert!(stats.diversity > 0.0 && stats.diversity <= 1.0);
    }

    #[test]
    fn test_reset() {
        let (mut evolution, mut rng) = evolution(EvolutionConfig::default(), 11);
        evolution.evolve(&mut rng).unwrap();
        evolution.reset();
        assert!(evolution.population().is_empty());
        assert!(evolution.history().is_empty());
        assert_eq!(evolution.generation(), 0);
    }
}
