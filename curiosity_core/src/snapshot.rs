//! Versioned snapshots of every subsystem.
//!
//! A snapshot written by another format version is refused before anything
//! is built. A subsystem whose data cannot be parsed is logged and replaced
//! by an empty state, without affecting the subsystems around it.

use interest_model::{CuriosityConfig, EvolutionConfig, GraphConfig, MemoryConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::dream::{DreamReplayEngine, DreamSession};
use crate::error::SnapshotError;
use crate::evolution::{GenerationRecord, StrategyEvolution, StrategyGenome};
use crate::interest_graph::{normalize_topic, Connection, InterestGraph, InterestNode, NodeView};
use crate::memory::{Cluster, LongTermEntry, MemoryConsolidator};

/// Format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Node table and connection log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u32,
    /// Topic -> node.
    pub nodes: BTreeMap<String, NodeView>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// Long-term store and cluster assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub version: u32,
    pub long_term: Vec<LongTermEntry>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

/// Genome population, generation counter and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSnapshot {
    pub version: u32,
    pub generation: u32,
    pub population: Vec<StrategyGenome>,
    #[serde(default)]
    pub history: Vec<GenerationRecord>,
}

/// Everything an engine needs to resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub graph: GraphSnapshot,
    pub memory: MemorySnapshot,
    pub evolution: EvolutionSnapshot,
    #[serde(default)]
    pub dreams: Vec<DreamSession>,
}

#[derive(Deserialize)]
struct Header {
    version: u32,
}

/// An engine snapshot with its sections left undecoded, so each one can
/// degrade on its own.
#[derive(Deserialize)]
struct EngineEnvelope {
    #[serde(default)]
    graph: Value,
    #[serde(default)]
    memory: Value,
    #[serde(default)]
    evolution: Value,
    #[serde(default)]
    dreams: Value,
}

impl GraphSnapshot {
    pub fn capture(graph: &InterestGraph) -> Self {
        let nodes = graph
            .node_ids()
            .into_iter()
            .filter_map(|id| graph.view(id))
            .map(|view| (view.topic.clone(), view))
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            nodes,
            connections: graph.connection_log().to_vec(),
        }
    }

    /// Rebuild a graph. Adjacency is made symmetric again, links or log
    /// entries naming unknown topics are dropped, and each node's tier is
    /// re-derived from its clamped weight.
    pub fn restore(self, config: GraphConfig) -> Result<InterestGraph, SnapshotError> {
        check_version("graph", self.version)?;

        let max_weight = config.max_weight;
        let core_threshold = config.core_threshold;
        let mut graph = InterestGraph::new(config);
        for (key, view) in &self.nodes {
            let topic = node_topic(key, view);
            if topic.is_empty() || graph.contains(&topic) {
                continue;
            }
            let mut node = InterestNode::new(topic, view.weight.clamp(0.0, max_weight), view.created_at);
            if !view.keywords.is_empty() {
                node.keywords = view.keywords.clone();
            }
            node.discovered_in = view.discovered_in.clone();
            node.last_active = view.last_active;
            node.access_count = view.access_count.max(1);
            node.memory_type = view.memory_type;
            node.refresh_tier(core_threshold);
            graph.insert_node(node);
        }

        for (key, view) in &self.nodes {
            let Some(a) = graph.id_of(&node_topic(key, view)) else {
                continue;
            };
            for neighbor in &view.connections {
                if let Some(b) = graph.id_of(neighbor) {
                    graph.attach(a, b);
                }
            }
        }

        for connection in self.connections {
            if graph.contains(&connection.from) && graph.contains(&connection.to) {
                graph.push_log(connection);
            }
        }
        Ok(graph)
    }
}

fn node_topic(key: &str, view: &NodeView) -> String {
    normalize_topic(if view.topic.is_empty() { key } else { &view.topic })
}

impl MemorySnapshot {
    pub fn capture(memory: &MemoryConsolidator) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            long_term: memory.long_term_entries().to_vec(),
            clusters: memory.clusters().to_vec(),
        }
    }

    pub fn restore(self, config: MemoryConfig) -> Result<MemoryConsolidator, SnapshotError> {
        check_version("memory", self.version)?;
        Ok(MemoryConsolidator::from_parts(
            config,
            self.long_term,
            self.clusters,
        ))
    }
}

impl EvolutionSnapshot {
    pub fn capture(evolution: &StrategyEvolution) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            generation: evolution.generation(),
            population: evolution.population().to_vec(),
            history: evolution.history().to_vec(),
        }
    }

    /// Rebuild the population. Out-of-range genes are clamped.
    pub fn restore(self, config: EvolutionConfig) -> Result<StrategyEvolution, SnapshotError> {
        check_version("evolution", self.version)?;
        let population = self
            .population
            .into_iter()
            .map(|mut genome| {
                genome.genes.clamp();
                genome
            })
            .collect();
        Ok(StrategyEvolution::from_parts(
            config,
            population,
            self.generation,
            self.history,
        ))
    }
}

/// Restored services, ready to be swapped into an engine.
#[derive(Debug)]
pub struct RestoredEngine {
    pub graph: InterestGraph,
    pub memory: MemoryConsolidator,
    pub dreamer: DreamReplayEngine,
    pub evolution: StrategyEvolution,
}

impl EngineSnapshot {
    /// Rebuild every service. Any version mismatch fails the whole restore.
    pub fn restore(self, config: &CuriosityConfig) -> Result<RestoredEngine, SnapshotError> {
        check_version("engine", self.version)?;
        check_version("graph", self.graph.version)?;
        check_version("memory", self.memory.version)?;
        check_version("evolution", self.evolution.version)?;

        Ok(RestoredEngine {
            graph: self.graph.restore(config.graph.clone())?,
            memory: self.memory.restore(config.memory.clone())?,
            dreamer: DreamReplayEngine::from_parts(config.dream.clone(), self.dreams),
            evolution: self.evolution.restore(config.evolution.clone())?,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse a snapshot, checking its version before the body.
pub fn decode<T: DeserializeOwned>(json: &str, subsystem: &'static str) -> Result<T, SnapshotError> {
    let header: Header =
        serde_json::from_str(json).map_err(|source| SnapshotError::Malformed { subsystem, source })?;
    check_version(subsystem, header.version)?;
    serde_json::from_str(json).map_err(|source| SnapshotError::Malformed { subsystem, source })
}

/// Restore a graph from JSON, degrading to an empty graph when unparseable.
pub fn restore_graph(json: &str, config: GraphConfig) -> Result<InterestGraph, SnapshotError> {
    match decode::<GraphSnapshot>(json, "graph") {
        Ok(snapshot) => snapshot.restore(config),
        Err(err) => degrade(err, || InterestGraph::new(config)),
    }
}

/// Restore the long-term store from JSON, degrading to an empty store.
pub fn restore_memory(json: &str, config: MemoryConfig) -> Result<MemoryConsolidator, SnapshotError> {
    match decode::<MemorySnapshot>(json, "memory") {
        Ok(snapshot) => snapshot.restore(config),
        Err(err) => degrade(err, || MemoryConsolidator::new(config)),
    }
}

/// Restore a population from JSON, degrading to an empty population.
pub fn restore_evolution(
    json: &str,
    config: EvolutionConfig,
) -> Result<StrategyEvolution, SnapshotError> {
    match decode::<EvolutionSnapshot>(json, "evolution") {
        Ok(snapshot) => snapshot.restore(config),
        Err(err) => degrade(err, || StrategyEvolution::new(config)),
    }
}

/// Restore a whole engine from JSON.
///
/// Every section's version is checked before any service is built, so a
/// mismatch anywhere fails the whole restore. A malformed section restores
/// empty on its own. `Ok(None)` means the envelope itself was unparseable
/// and the caller should start empty.
pub fn restore_engine(
    json: &str,
    config: &CuriosityConfig,
) -> Result<Option<RestoredEngine>, SnapshotError> {
    let envelope = match decode::<EngineEnvelope>(json, "engine") {
        Ok(envelope) => envelope,
        Err(err) => return degrade(err, || None),
    };

    let graph = section::<GraphSnapshot>(envelope.graph, "graph")?;
    let memory = section::<MemorySnapshot>(envelope.memory, "memory")?;
    let evolution = section::<EvolutionSnapshot>(envelope.evolution, "evolution")?;
    let dreams = match envelope.dreams {
        Value::Null => Vec::new(),
        value => serde_json::from_value(value)
            .map_err(|source| SnapshotError::Malformed {
                subsystem: "dreams",
                source,
            })
            .or_else(|err| degrade(err, Vec::new))?,
    };

    Ok(Some(RestoredEngine {
        graph: match graph {
            Some(snapshot) => snapshot.restore(config.graph.clone())?,
            None => InterestGraph::new(config.graph.clone()),
        },
        memory: match memory {
            Some(snapshot) => snapshot.restore(config.memory.clone())?,
            None => MemoryConsolidator::new(config.memory.clone()),
        },
        dreamer: DreamReplayEngine::from_parts(config.dream.clone(), dreams),
        evolution: match evolution {
            Some(snapshot) => snapshot.restore(config.evolution.clone())?,
            None => StrategyEvolution::new(config.evolution.clone()),
        },
    }))
}

/// Decode one engine section. `Ok(None)` when it is malformed.
fn section<T: DeserializeOwned>(
    value: Value,
    subsystem: &'static str,
) -> Result<Option<T>, SnapshotError> {
    let decoded = Header::deserialize(&value)
        .map_err(|source| SnapshotError::Malformed { subsystem, source })
        .and_then(|header| check_version(subsystem, header.version))
        .and_then(|()| {
            serde_json::from_value(value)
                .map_err(|source| SnapshotError::Malformed { subsystem, source })
        });
    match decoded {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(err) => degrade(err, || None),
    }
}

fn degrade<T>(err: SnapshotError, empty: impl FnOnce() -> T) -> Result<T, SnapshotError> {
    match err {
        SnapshotError::Malformed { subsystem, source } => {
            warn!(subsystem, error = %source, "malformed snapshot, starting from an empty state");
            Ok(empty())
        }
        other => Err(other),
    }
}

fn check_version(subsystem: &'static str, found: u32) -> Result<(), SnapshotError> {
    if found == SNAPSHOT_VERSION {
        Ok(())
    } else {
        Err(SnapshotError::IncompatibleVersion {
            subsystem,
            found,
            expected: SNAPSHOT_VERSION,
        })
    }
}
