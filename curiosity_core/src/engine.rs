//! The curiosity engine - one owner for every subsystem.
//!
//! All mutation goes through `&mut self`, so each operation is applied as a
//! whole before the next one starts. Events are emitted only after the
//! mutation they describe has been committed.

use interest_model::{ConnectionOrigin, CuriosityConfig, ExplorationOutcome, GenomeId, Timestamp};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

use crate::dream::{DreamReplayEngine, DreamSession};
use crate::error::{DreamError, EvolutionError, Result};
use crate::events::{CuriosityEvent, EventBus, EventListener};
use crate::evolution::{EvolutionStats, GenerationRecord, StrategyEvolution, StrategyGenome};
use crate::interest_graph::{DecayReport, GraphStats, InterestGraph, InterestUpdate, NodeView};
use crate::memory::{ConsolidationReport, MemoryConsolidator, MemoryStats};
use crate::snapshot::{
    restore_engine, EngineSnapshot, EvolutionSnapshot, GraphSnapshot, MemorySnapshot,
    SNAPSHOT_VERSION,
};

/// Combined statistics of every subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub graph: GraphStats,
    pub memory: MemoryStats,
    pub evolution: EvolutionStats,
    pub dreams: usize,
    pub dream_connections: usize,
}

/// Owns the interest graph, the long-term memory, the dreamer and the
/// strategy population.
#[derive(Debug)]
pub struct CuriosityEngine {
    config: CuriosityConfig,
    graph: InterestGraph,
    memory: MemoryConsolidator,
    dreamer: DreamReplayEngine,
    evolution: StrategyEvolution,
    rng: StdRng,
    events: EventBus,
}

impl CuriosityEngine {
    /// Create an engine seeded from OS entropy.
    pub fn new(config: CuriosityConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an engine whose every random choice is reproducible.
    pub fn with_seed(config: CuriosityConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Load and validate a TOML configuration, then build an engine.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(CuriosityConfig::load(path)?))
    }

    fn with_rng(config: CuriosityConfig, mut rng: StdRng) -> Self {
        let mut evolution = StrategyEvolution::new(config.evolution.clone());
        evolution.initialize(&mut rng);
        Self {
            graph: InterestGraph::new(config.graph.clone()),
            memory: MemoryConsolidator::new(config.memory.clone()),
            dreamer: DreamReplayEngine::new(config.dream.clone()),
            evolution,
            config,
            rng,
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &CuriosityConfig {
        &self.config
    }

    pub fn graph(&self) -> &InterestGraph {
        &self.graph
    }

    pub fn memory(&self) -> &MemoryConsolidator {
        &self.memory
    }

    pub fn dreamer(&self) -> &DreamReplayEngine {
        &self.dreamer
    }

    pub fn evolution(&self) -> &StrategyEvolution {
        &self.evolution
    }

    /// Register a listener for every future event.
    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: EventListener + Send + 'static,
    {
        self.events.subscribe(listener);
    }

    // ---- interests ---------------------------------------------------------

    /// Add a topic or reinforce it. `None` for a blank topic.
    pub fn add_or_reinforce(
        &mut self,
        topic: &str,
        strength: f64,
        now: Timestamp,
    ) -> Option<NodeView> {
        let update = self.graph.add_or_reinforce(topic, strength, now)?;
        self.events.emit_all(&update_events(&update));
        Some(update.node)
    }

    /// Add or reinforce every topic found in one piece of content.
    pub fn record_discovery<I, S>(
        &mut self,
        topics: I,
        source: &str,
        strength: f64,
        now: Timestamp,
    ) -> Vec<NodeView>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let updates = self.graph.record_discovery(topics, source, strength, now);
        updates
            .into_iter()
            .map(|update| {
                self.events.emit_all(&update_events(&update));
                update.node
            })
            .collect()
    }

    /// Apply time decay up to `now`.
    pub fn tick(&mut self, now: Timestamp) -> DecayReport {
        let report = self.graph.decay_tick(now);
        for topic in &report.evicted {
            self.events.emit(&CuriosityEvent::InterestEvicted {
                topic: topic.clone(),
            });
        }
        for topic in &report.became_core {
            self.events.emit(&CuriosityEvent::BecameCore {
                topic: topic.clone(),
            });
        }
        report
    }

    pub fn get(&self, topic: &str) -> Option<NodeView> {
        self.graph.get(topic)
    }

    pub fn get_top_interests(&self, n: usize) -> Vec<NodeView> {
        self.graph.get_top_interests(n)
    }

    pub fn get_interests_sorted(&self) -> Vec<NodeView> {
        self.graph.get_interests_sorted()
    }

    // ---- memory ------------------------------------------------------------

    /// Promote lasting interests and rebuild clusters.
    pub fn consolidate(&mut self, now: Timestamp) -> ConsolidationReport {
        let report = self.memory.consolidate(&mut self.graph, now);
        self.events.emit(&CuriosityEvent::MemoriesConsolidated {
            promoted: report.promoted.clone(),
            clusters: report.clusters,
        });
        report
    }

    // ---- dreaming ----------------------------------------------------------

    /// Run one dream session. Refused sessions leave everything untouched.
    pub fn dream(&mut self, now: Timestamp) -> std::result::Result<DreamSession, DreamError> {
        let core_before = core_topics(&self.graph);
        let session = self.dreamer.dream(&mut self.graph, &mut self.rng, now)?;

        for link in &session.new_connections {
            self.events.emit(&CuriosityEvent::ConnectionFormed {
                from: link.from.clone(),
                to: link.to.clone(),
                origin: ConnectionOrigin::Dream,
            });
        }
        for topic in core_topics(&self.graph).difference(&core_before) {
            self.events.emit(&CuriosityEvent::BecameCore {
                topic: topic.clone(),
            });
        }
        self.events.emit(&CuriosityEvent::DreamCompleted {
            session: session.id,
            new_connections: session.new_connections.len(),
            insights: session.insights.len(),
        });
        Ok(session)
    }

    // ---- strategies --------------------------------------------------------

    /// Pick the strategy for the next exploration.
    pub fn select_strategy(&mut self) -> Option<&StrategyGenome> {
        self.evolution.select_strategy(&mut self.rng)
    }

    /// Report how an exploration run by genome `id` went.
    pub fn record_outcome(&mut self, id: GenomeId, outcome: &ExplorationOutcome) -> bool {
        if !self.evolution.record_outcome(id, outcome) {
            return false;
        }
        if let Some(genome) = self.evolution.get(id) {
            self.events.emit(&CuriosityEvent::OutcomeRecorded {
                genome: id,
                fitness: genome.fitness,
            });
        }
        true
    }

    /// Breed the next generation of strategies.
    pub fn evolve(&mut self) -> std::result::Result<GenerationRecord, EvolutionError> {
        let record = self.evolution.evolve(&mut self.rng)?;
        self.events.emit(&CuriosityEvent::NewGeneration {
            record: record.clone(),
        });
        Ok(record)
    }

    // ---- state -------------------------------------------------------------

    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            graph: self.graph.get_stats(),
            memory: self.memory.get_stats(),
            evolution: self.evolution.get_stats(),
            dreams: self.dreamer.history().len(),
            dream_connections: self.dreamer.total_dream_connections(),
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            graph: GraphSnapshot::capture(&self.graph),
            memory: MemorySnapshot::capture(&self.memory),
            evolution: EvolutionSnapshot::capture(&self.evolution),
            dreams: self.dreamer.history().to_vec(),
        }
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(self.snapshot().to_json()?)
    }

    /// Replace all state with a JSON snapshot.
    ///
    /// A version mismatch fails and leaves the engine as it was. A malformed
    /// subsystem section restores empty while the others are kept.
    /// Unparseable input resets the engine to an empty state.
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        match restore_engine(json, &self.config)? {
            Some(restored) => {
                self.graph = restored.graph;
                self.memory = restored.memory;
                self.dreamer = restored.dreamer;
                self.evolution = restored.evolution;
                if self.evolution.population().is_empty() {
                    self.evolution.initialize(&mut self.rng);
                }
            }
            None => {
                warn!("engine import fell back to an empty state");
                self.reset();
            }
        }
        Ok(())
    }

    /// Forget everything and start over with a fresh population.
    /// Subscriptions are kept.
    pub fn reset(&mut self) {
        self.graph.reset();
        self.memory.reset();
        self.dreamer.reset();
        self.evolution.reset();
        self.evolution.initialize(&mut self.rng);
    }
}

fn update_events(update: &InterestUpdate) -> Vec<CuriosityEvent> {
    let mut events = Vec::new();
    if let Some(topic) = &update.evicted {
        events.push(CuriosityEvent::InterestEvicted {
            topic: topic.clone(),
        });
    }
    let topic = update.node.topic.clone();
    events.push(if update.created {
        CuriosityEvent::InterestAdded {
            topic: topic.clone(),
            weight: update.node.weight,
        }
    } else {
        CuriosityEvent::InterestReinforced {
            topic: topic.clone(),
            weight: update.node.weight,
        }
    });
    for other in &update.linked {
        events.push(CuriosityEvent::ConnectionFormed {
            from: topic.clone(),
            to: other.clone(),
            origin: ConnectionOrigin::Organic,
        });
    }
    for core in &update.became_core {
        events.push(CuriosityEvent::BecameCore {
            topic: core.clone(),
        });
    }
    events
}

fn core_topics(graph: &InterestGraph) -> BTreeSet<String> {
    graph
        .get_interests_sorted()
        .into_iter()
        .filter(|node| node.is_core)
        .map(|node| node.topic)
        .collect()
}
