//! Dream session records and the insights derived from replay chains.

use interest_model::{DreamSessionId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A pair of topics a dream linked or strengthened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamLink {
    pub from: String,
    pub to: String,
    /// Dream similarity that qualified the pair.
    pub score: f64,
}

/// Patterns noticed across the chains of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Insight {
    /// A topic that recurred in several chains.
    Theme { topic: String, frequency: usize },
    /// A topic sitting midway between the two ends of a long chain.
    Bridge { via: String, from: String, to: String },
}

impl Insight {
    /// One-line human-readable form.
    pub fn describe(&self) -> String {
        match self {
            Insight::Theme { topic, frequency } => {
                format!("'{}' keeps coming back ({} dreams)", topic, frequency)
            }
            Insight::Bridge { via, from, to } => {
                format!("'{}' may bridge '{}' and '{}'", via, from, to)
            }
        }
    }
}

/// The record of one dream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamSession {
    pub id: DreamSessionId,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
    /// Replayed topic sequences, in generation order.
    pub chains: Vec<Vec<String>>,
    pub new_connections: Vec<DreamLink>,
    pub strengthened_connections: Vec<DreamLink>,
    pub insights: Vec<Insight>,
}

impl DreamSession {
    pub fn new(id: DreamSessionId, started_at: Timestamp) -> Self {
        Self {
            id,
            started_at,
            ended_at: started_at,
            chains: Vec::new(),
            new_connections: Vec::new(),
            strengthened_connections: Vec::new(),
            insights: Vec::new(),
        }
    }
}

/// Derive themes, then bridges, keeping at most `limit` insights overall.
pub fn derive_insights(chains: &[Vec<String>], limit: usize) -> Vec<Insight> {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for chain in chains {
        for topic in chain {
            let count = frequency.entry(topic.as_str()).or_insert(0);
            if *count == 0 {
                first_seen.push(topic.as_str());
            }
            *count += 1;
        }
    }

    let themes = first_seen.into_iter().filter_map(|topic| {
        let count = frequency.get(topic).copied().unwrap_or(0);
        (count >= 2).then(|| Insight::Theme {
            topic: topic.to_string(),
            frequency: count,
        })
    });

    let bridges = chains
        .iter()
        .filter(|chain| chain.len() >= 4)
        .filter_map(|chain| {
            Some(Insight::Bridge {
                via: chain.get(chain.len() / 2)?.clone(),
                from: chain.first()?.clone(),
                to: chain.last()?.clone(),
            })
        });

    themes.chain(bridges).take(limit).collect()
}
