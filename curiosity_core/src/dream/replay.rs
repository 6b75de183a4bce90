//! The dream replay engine.

use chrono::Duration;
use interest_model::{ConnectionOrigin, DreamConfig, DreamSessionId, Timestamp};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

use super::{derive_insights, dream_similarity, replay_chain, DreamLink, DreamSession};
use crate::error::DreamError;
use crate::interest_graph::{InterestGraph, LinkResult, NodeId};

/// Replays random walks over the interest graph and links topics that turn
/// out to be related despite not being adjacent in the walk.
///
/// Within one owner, `dream` taking `&mut self` already rules out overlapping
/// sessions. The `dreaming` flag carries the same guarantee to hosts that
/// share the engine behind interior mutability.
#[derive(Debug, Default)]
pub struct DreamReplayEngine {
    config: DreamConfig,
    dreaming: AtomicBool,
    history: Vec<DreamSession>,
}

/// Holds the dreaming flag for the duration of a session.
struct SessionGuard<'a>(&'a AtomicBool);

impl<'a> SessionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, DreamError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| DreamError::AlreadyDreaming)
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DreamReplayEngine {
    pub fn new(config: DreamConfig) -> Self {
        Self {
            config,
            dreaming: AtomicBool::new(false),
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &DreamConfig {
        &self.config
    }

    /// Forget every recorded session.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Run one dream session against the graph.
    ///
    /// Fails without touching the graph when fewer than `min_interests`
    /// topics exist or another session holds the flag.
    pub fn dream<R: Rng + ?Sized>(
        &mut self,
        graph: &mut InterestGraph,
        rng: &mut R,
        now: Timestamp,
    ) -> Result<DreamSession, DreamError> {
        let nodes = graph.node_ids();
        if nodes.len() < self.config.min_interests {
            warn!(
                available = nodes.len(),
                required = self.config.min_interests,
                "dream refused: not enough interests"
            );
            return Err(DreamError::NotEnoughInterests {
                available: nodes.len(),
                required: self.config.min_interests,
            });
        }

        let _guard = SessionGuard::acquire(&self.dreaming).map_err(|err| {
            warn!("dream refused: a session is already running");
            err
        })?;

        let started = Instant::now();
        let config = &self.config;
        let mut session = DreamSession::new(DreamSessionId::from_rng(rng), now);

        for _ in 0..config.chains_per_dream {
            let chain = replay_chain(
                graph,
                &nodes,
                config.replay_chain_length,
                config.follow_connection_probability,
                rng,
            );

            for i in 0..chain.len() {
                for j in (i + 2)..chain.len() {
                    let (a, b) = (chain[i], chain[j]);
                    let score = dream_similarity(graph, a, b, rng);
                    if score < config.connection_threshold {
                        continue;
                    }

                    match graph.link(a, b, score, ConnectionOrigin::Dream, now) {
                        LinkResult::Created => {
                            let boost = config.serendipity_boost * 0.5;
                            graph.boost_node(a, boost);
                            graph.boost_node(b, boost);
                            session.new_connections.push(dream_link(graph, a, b, score));
                        }
                        LinkResult::AlreadyLinked => {
                            graph.boost_node(a, config.existing_link_reinforcement);
                            graph.boost_node(b, config.existing_link_reinforcement);
                            session
                                .strengthened_connections
                                .push(dream_link(graph, a, b, score));
                        }
                        LinkResult::Invalid => {}
                    }
                }
            }

            session.chains.push(
                chain
                    .iter()
                    .filter_map(|&id| graph.node(id).map(|node| node.topic.clone()))
                    .collect(),
            );
        }

        session.insights = derive_insights(&session.chains, config.max_insights);
        session.ended_at = now
            + Duration::from_std(started.elapsed()).unwrap_or_else(|_| Duration::zero());

        info!(
            chains = session.chains.len(),
            new_connections = session.new_connections.len(),
            strengthened = session.strengthened_connections.len(),
            insights = session.insights.len(),
            "dream session complete"
        );

        self.history.push(session.clone());
        Ok(session)
    }

    /// True while a session holds the flag.
    pub fn is_dreaming(&self) -> bool {
        self.dreaming.load(Ordering::Acquire)
    }

    /// Completed sessions, oldest first.
    pub fn history(&self) -> &[DreamSession] {
        &self.history
    }

    pub fn last_session(&self) -> Option<&DreamSession> {
        self.history.last()
    }

    /// Links created by all recorded sessions.
    pub fn total_dream_connections(&self) -> usize {
        self.history.iter().map(|s| s.new_connections.len()).sum()
    }

    pub(crate) fn from_parts(config: DreamConfig, history: Vec<DreamSession>) -> Self {
        Self {
            config,
            dreaming: AtomicBool::new(false),
            history,
        }
    }
}

fn dream_link(graph: &InterestGraph, a: NodeId, b: NodeId, score: f64) -> DreamLink {
    let topic = |id: NodeId| graph.node(id).map(|n| n.topic.clone()).unwrap_or_default();
    DreamLink {
        from: topic(a),
        to: topic(b),
        score,
    }
}
