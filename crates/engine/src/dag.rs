//! Graph validation — run this before registering or executing nodes.
//!
//! Rules enforced:
//! 1. Node names must be unique.
//! 2. Every upstream edge must reference an existing node.
//! 3. The directed graph must be acyclic (topological sort must succeed).
//!
//! Returns node names in topological order on success.  Ties are broken by
//! the order nodes were given in, so the result is deterministic.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{models::Node, EngineError};

/// Validate the node graph and return names in execution order.
///
/// # Errors
/// - [`EngineError::DuplicateName`] if two nodes share a name.
/// - [`EngineError::UnknownUpstream`] if an edge references a missing node.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn validate_graph(nodes: &[Node]) -> Result<Vec<String>, EngineError> {
    // -----------------------------------------------------------------------
    // 1. Ensure names are unique
    // -----------------------------------------------------------------------
    let mut seen: HashSet<&str> = HashSet::new();
    for node in nodes {
        if !seen.insert(node.name.as_str()) {
            return Err(EngineError::DuplicateName(node.name.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Validate edge endpoints
    // -----------------------------------------------------------------------
    for node in nodes {
        if let Some(missing) = node.upstreams.iter().find(|u| !seen.contains(u.as_str())) {
            return Err(EngineError::UnknownUpstream {
                node: node.name.clone(),
                upstream: missing.clone(),
            });
        }
    }

    // -----------------------------------------------------------------------
    // 3. Topological sort (Kahn's algorithm)
    // -----------------------------------------------------------------------
    let mut downstreams: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();

    for node in nodes {
        in_degree.insert(node.name.as_str(), node.upstreams.len());
        for upstream in &node.upstreams {
            downstreams
                .entry(upstream.as_str())
                .or_default()
                .push(node.name.as_str());
        }
    }

    // Seed the queue with nodes that have no upstreams, in input order.
    let mut queue: VecDeque<&str> = nodes
        .iter()
        .filter(|n| n.upstreams.is_empty())
        .map(|n| n.name.as_str())
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(nodes.len());

    while let Some(name) = queue.pop_front() {
        sorted.push(name.to_owned());

        for &downstream in downstreams.get(name).into_iter().flatten() {
            if let Some(deg) = in_degree.get_mut(downstream) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(downstream);
                }
            }
        }
    }

    // Anything left with a positive in-degree sits on or behind a cycle.
    if sorted.len() != nodes.len() {
        let stuck = nodes
            .iter()
            .filter(|n| in_degree.get(n.name.as_str()).is_some_and(|&d| d > 0))
            .map(|n| n.name.clone())
            .collect();
        return Err(EngineError::CycleDetected { nodes: stuck });
    }

    Ok(sorted)
}
