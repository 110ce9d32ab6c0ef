use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::warn;

use super::types::{GraphEdge, GraphFragment, GraphNode, MergedGraph};

/// Node types that carry no information; any concrete incoming type replaces
/// them during reconciliation.
const GENERIC_NODE_TYPES: &[&str] = &["", "unknown", "other", "node", "concept"];

fn is_generic_type(node_type: &str) -> bool {
    GENERIC_NODE_TYPES
        .iter()
        .any(|generic| node_type.eq_ignore_ascii_case(generic))
}

/// Reduce many graph fragments into one deduplicated graph.
///
/// Nodes merge on trimmed, case-sensitive `id` with a richest-value-wins
/// rule per field; edges merge on the trimmed `(from, to, relationship)`
/// tuple with the relationship compared case-insensitively. All ties break
/// lexicographically, so the output is independent of fragment order.
/// Malformed nodes and edges are dropped with a warning; this function
/// never fails.
pub fn merge_fragments(fragments: &[GraphFragment]) -> MergedGraph {
    let mut nodes: BTreeMap<String, GraphNode> = BTreeMap::new();
    let mut edges: BTreeMap<(String, String, String), GraphEdge> = BTreeMap::new();

    for fragment in fragments {
        for node in &fragment.nodes {
            let id = node.id.trim();
            if id.is_empty() {
                warn!("dropping graph node without an id");
                continue;
            }
            match nodes.entry(id.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(normalized(id, node));
                }
                Entry::Occupied(mut slot) => reconcile(slot.get_mut(), node),
            }
        }

        for edge in &fragment.edges {
            let from = edge.from.trim();
            let to = edge.to.trim();
            let relationship = edge.relationship.trim();
            if from.is_empty() || to.is_empty() || relationship.is_empty() {
                warn!(from = %edge.from, to = %edge.to, relationship = %edge.relationship,
                    "dropping malformed graph edge");
                continue;
            }
            let key = (
                from.to_string(),
                to.to_string(),
                relationship.to_ascii_lowercase(),
            );
            match edges.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(GraphEdge {
                        from: from.to_string(),
                        to: to.to_string(),
                        relationship: relationship.to_string(),
                    });
                }
                Entry::Occupied(mut slot) => {
                    // Case-only duplicates keep the lexicographically smaller
                    // label so arrival order cannot change the result.
                    if relationship < slot.get().relationship.as_str() {
                        slot.get_mut().relationship = relationship.to_string();
                    }
                }
            }
        }
    }

    MergedGraph {
        nodes: nodes.into_values().collect(),
        edges: edges.into_values().collect(),
    }
}

fn normalized(id: &str, node: &GraphNode) -> GraphNode {
    GraphNode {
        id: id.to_string(),
        node_type: node.node_type.trim().to_string(),
        parent: trimmed_parent(node),
        description: node.description.clone(),
    }
}

fn trimmed_parent(node: &GraphNode) -> Option<String> {
    node.parent
        .as_deref()
        .map(str::trim)
        .filter(|parent| !parent.is_empty())
        .map(str::to_string)
}

/// Richest value wins, field by field. Longer descriptions replace shorter
/// ones; a concrete type replaces a generic one; a parent fills an empty
/// slot. Ties break lexicographically.
fn reconcile(existing: &mut GraphNode, incoming: &GraphNode) {
    let description = &incoming.description;
    let richer = description.len() > existing.description.len()
        || (description.len() == existing.description.len()
            && *description < existing.description);
    if richer {
        existing.description = description.clone();
    }

    let incoming_type = incoming.node_type.trim();
    if !is_generic_type(incoming_type) {
        if is_generic_type(&existing.node_type)
            || incoming_type < existing.node_type.as_str()
        {
            existing.node_type = incoming_type.to_string();
        }
    }

    if let Some(parent) = trimmed_parent(incoming) {
        match &existing.parent {
            None => existing.parent = Some(parent),
            Some(current) if parent < *current => existing.parent = Some(parent),
            Some(_) => {}
        }
    }
}
