use std::collections::{HashMap, HashSet, VecDeque};
use crate::core::types::MetadataRecord;

/// Directed adjacency list built from `related_ids`.
///
/// Targets are kept even when no record with that id exists; resolving them
/// is left to the caller.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    pub edges: HashMap<String, Vec<String>>,
    edge_count: usize,
}

impl RelationshipGraph {
    pub fn build(records: &[MetadataRecord]) -> Self {
        let mut graph = RelationshipGraph::default();
        for record in records {
            if record.related_ids.is_empty() {
                continue;
            }
            graph.edge_count += record.related_ids.len();
            graph
                .edges
                .insert(record.id.clone(), record.related_ids.clone());
        }
        graph
    }

    pub fn neighbors(&self, id: &str) -> &[String] {
        self.edges.get(id).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    /// Breadth-first walk up to `max_depth` hops, excluding `id` itself.
    pub fn reachable(&self, id: &str, max_depth: usize) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::from([id]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(id, 0)]);
        let mut reached = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth == max_depth {
                continue;
            }
            for next in self.neighbors(current) {
                if visited.insert(next.as_str()) {
                    reached.push(next.clone());
                    queue.push_back((next.as_str(), depth + 1));
                }
            }
        }

        reached
    }

    /// Number of records with at least one outgoing edge
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}
