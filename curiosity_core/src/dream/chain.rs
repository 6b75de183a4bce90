//! Replay chains and the dream similarity used to judge chain pairs.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::interest_graph::{jaccard, InterestGraph, NodeId};

/// Weight of the keyword Jaccard index in dream similarity.
const KEYWORD_WEIGHT: f64 = 0.4;
/// Weight of the shared-neighbor ratio.
const SHARED_CONNECTION_WEIGHT: f64 = 0.3;
/// Weight of the common-source bonus.
const SOURCE_WEIGHT: f64 = 0.2;
/// Bonus applied when two topics were surfaced by a common source.
const SOURCE_BONUS: f64 = 0.3;
/// Weight of the random jitter.
const NOISE_WEIGHT: f64 = 0.1;

/// Walk the graph from a random start.
///
/// Each step follows an unused neighbor with probability `follow_probability`,
/// otherwise (or when no neighbor is left) jumps to any unused node. The chain
/// ends early once every node has been visited.
pub fn replay_chain<R: Rng + ?Sized>(
    graph: &InterestGraph,
    nodes: &[NodeId],
    length: usize,
    follow_probability: f64,
    rng: &mut R,
) -> Vec<NodeId> {
    let Some(&start) = nodes.choose(rng) else {
        return Vec::new();
    };

    let mut chain = vec![start];
    let mut used: HashSet<NodeId> = HashSet::from([start]);
    let mut current = start;

    while chain.len() < length {
        let mut next = None;

        if rng.gen::<f64>() < follow_probability {
            let neighbors: Vec<NodeId> = graph
                .node(current)
                .map(|node| {
                    node.connections
                        .iter()
                        .copied()
                        .filter(|id| !used.contains(id))
                        .collect()
                })
                .unwrap_or_default();
            next = neighbors.choose(rng).copied();
        }

        if next.is_none() {
            let unused: Vec<NodeId> = nodes
                .iter()
                .copied()
                .filter(|id| !used.contains(id))
                .collect();
            next = unused.choose(rng).copied();
        }

        match next {
            Some(id) => {
                used.insert(id);
                chain.push(id);
                current = id;
            }
            None => break,
        }
    }

    chain
}

/// Fraction of neighbors two nodes share, relative to the smaller
/// neighborhood.
///
/// The denominator is `max(min(|A|, |B|), 1)`: a node without neighbors
/// divides by one, so the ratio stays in `[0, 1]` and is zero rather than
/// undefined.
pub fn shared_connection_ratio(graph: &InterestGraph, a: NodeId, b: NodeId) -> f64 {
    match (graph.node(a), graph.node(b)) {
        (Some(a), Some(b)) => {
            let shared = a.connections.intersection(&b.connections).count();
            let smaller = a.connections.len().min(b.connections.len()).max(1);
            shared as f64 / smaller as f64
        }
        _ => 0.0,
    }
}

/// Dream similarity of two nodes.
///
/// Always draws one random number so a seeded session replays identically.
pub fn dream_similarity<R: Rng + ?Sized>(
    graph: &InterestGraph,
    a: NodeId,
    b: NodeId,
    rng: &mut R,
) -> f64 {
    let noise: f64 = rng.gen();
    let (Some(node_a), Some(node_b)) = (graph.node(a), graph.node(b)) else {
        return 0.0;
    };

    let keyword = jaccard(&node_a.keywords, &node_b.keywords);
    let shared = shared_connection_ratio(graph, a, b);
    let source = if node_a.discovered_in.is_disjoint(&node_b.discovered_in) {
        0.0
    } else {
        SOURCE_BONUS
    };

    KEYWORD_WEIGHT * keyword
        + SHARED_CONNECTION_WEIGHT * shared
        + SOURCE_WEIGHT * source
        + NOISE_WEIGHT * noise
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use interest_model::GraphConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn unlinked_graph(topics: &[&str]) -> InterestGraph {
        let mut graph = InterestGraph::new(GraphConfig {
            connection_threshold: 1.0,
            ..GraphConfig::default()
        });
        let now = Utc::now();
        for topic in topics {
            graph.add_or_reinforce(topic, 0.0, now);
        }
        graph
    }

    #[test]
    fn test_chain_has_no_repeats_and_respects_length() {
        let graph = unlinked_graph(&["alpha", "beta", "gamma", "delta", "epsilon", "zeta", "theta"]);
        let nodes = graph.node_ids();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let chain = replay_chain(&graph, &nodes, 5, 0.6, &mut rng);
            assert_eq!(chain.len(), 5);
            let unique: HashSet<_> = chain.iter().collect();
            assert_eq!(unique.len(), chain.len());
        }
    }

    #[test]
    fn test_chain_stops_when_graph_exhausted() {
        let graph = unlinked_graph(&["alpha", "beta", "gamma"]);
        let nodes = graph.node_ids();
        let mut rng = StdRng::seed_from_u64(1);

        let chain = replay_chain(&graph, &nodes, 5, 0.6, &mut rng);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_chain_follows_links_when_always_asked_to() {
        let mut graph = InterestGraph::default();
        let now = Utc::now();
        graph.add_or_reinforce("quantum physics", 0.0, now);
        graph.add_or_reinforce("quantum computing", 0.0, now);
        let nodes = graph.node_ids();
        let mut rng = StdRng::seed_from_u64(3);

        let chain = replay_chain(&graph, &nodes, 2, 1.0, &mut rng);
        assert_eq!(chain.len(), 2);
        assert!(graph.node(chain[0]).unwrap().is_linked_to(chain[1]));
    }

    #[test]
    fn test_empty_node_list_gives_empty_chain() {
        let graph = InterestGraph::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(replay_chain(&graph, &[], 5, 0.6, &mut rng).is_empty());
    }

    #[test]
    fn test_shared_ratio_uses_smaller_neighborhood() {
        let mut graph = unlinked_graph(&["sun", "mercury", "venus", "mars", "pluto"]);
        let id = |g: &InterestGraph, t: &str| g.id_of(t).unwrap();
        let hub = id(&graph, "sun");
        let one = id(&graph, "mercury");
        let two = id(&graph, "venus");
        let three = id(&graph, "mars");
        graph.attach(one, hub);
        graph.attach(two, hub);
        graph.attach(two, three);

        // mercury: {sun}, venus: {sun, mars}
        assert_eq!(shared_connection_ratio(&graph, one, two), 1.0);
        // mercury: {sun}, mars: {venus}
        assert_eq!(shared_connection_ratio(&graph, one, three), 0.0);
        // sun: {mercury, venus}, mars: {venus}
        assert_eq!(shared_connection_ratio(&graph, hub, three), 1.0);
        // pluto has no neighbors, so the denominator floors at one
        let lone = id(&graph, "pluto");
        assert_eq!(shared_connection_ratio(&graph, lone, hub), 0.0);
        assert_eq!(shared_connection_ratio(&graph, lone, lone), 0.0);
    }

    #[test]
    fn test_dream_similarity_bounds() {
        let mut graph = unlinked_graph(&["jazz music", "jazz history"]);
        let now = Utc::now();
        graph.record_discovery(["jazz music", "jazz history"], "wikipedia", 0.0, now);
        let a = graph.id_of("jazz music").unwrap();
        let b = graph.id_of("jazz history").unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..20 {
            let score = dream_similarity(&graph, a, b, &mut rng);
            // jaccard 1/3, no shared links, common source
            let floor = 0.4 / 3.0 + 0.2 * 0.3;
            assert!(score >= floor - 1e-9);
            assert!(score <= floor + 0.1 + 1e-9);
        }
    }
}
