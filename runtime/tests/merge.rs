use studygraph_runtime::pipeline::{
    GraphEdge, GraphFragment, GraphNode, merge_fragments,
};

fn node(id: &str, node_type: &str, description: &str) -> GraphNode {
    GraphNode {
        id: id.to_string(),
        node_type: node_type.to_string(),
        parent: None,
        description: description.to_string(),
    }
}

fn edge(from: &str, to: &str, relationship: &str) -> GraphEdge {
    GraphEdge {
        from: from.to_string(),
        to: to.to_string(),
        relationship: relationship.to_string(),
    }
}

fn fragment(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> GraphFragment {
    GraphFragment { nodes, edges }
}

#[test]
fn longer_description_wins_regardless_of_order() {
    let short = fragment(vec![node("ml", "topic", "short")], vec![]);
    let long = fragment(
        vec![node("ml", "topic", "a considerably longer description")],
        vec![],
    );

    let forward = merge_fragments(&[short.clone(), long.clone()]);
    let backward = merge_fragments(&[long, short]);

    assert_eq!(
        forward.nodes[0].description,
        "a considerably longer description"
    );
    assert_eq!(
        backward.nodes[0].description,
        "a considerably longer description"
    );
}

#[test]
fn duplicate_edges_collapse_and_distinct_labels_survive() {
    let duplicated = merge_fragments(&[
        fragment(vec![], vec![edge("A", "B", "subtopic_of")]),
        fragment(vec![], vec![edge("A", "B", "subtopic_of")]),
    ]);
    assert_eq!(duplicated.edges.len(), 1);

    let distinct = merge_fragments(&[
        fragment(vec![], vec![edge("A", "B", "subtopic_of")]),
        fragment(vec![], vec![edge("A", "B", "related_to")]),
    ]);
    assert_eq!(distinct.edges.len(), 2);
}

#[test]
fn relationship_comparison_is_case_insensitive() {
    let merged = merge_fragments(&[
        fragment(vec![], vec![edge("A", "B", "Subtopic_Of")]),
        fragment(vec![], vec![edge("A", "B", "subtopic_of")]),
    ]);
    assert_eq!(merged.edges.len(), 1);
}

#[test]
fn generic_type_is_replaced_by_concrete_type() {
    let vague = fragment(vec![node("rust", "unknown", "a language")], vec![]);
    let typed = fragment(vec![node("rust", "language", "a language")], vec![]);

    let forward = merge_fragments(&[vague.clone(), typed.clone()]);
    let backward = merge_fragments(&[typed, vague]);

    assert_eq!(forward.nodes[0].node_type, "language");
    assert_eq!(backward.nodes[0].node_type, "language");
}

#[test]
fn parent_fills_empty_slot_only() {
    let orphan = fragment(vec![node("borrowing", "topic", "desc")], vec![]);
    let mut with_parent = node("borrowing", "topic", "desc");
    with_parent.parent = Some("ownership".to_string());
    let parented = fragment(vec![with_parent], vec![]);

    let merged = merge_fragments(&[orphan, parented]);
    assert_eq!(merged.nodes[0].parent.as_deref(), Some("ownership"));
}

#[test]
fn malformed_nodes_and_edges_are_dropped() {
    let merged = merge_fragments(&[fragment(
        vec![node("", "topic", "no id"), node("ok", "topic", "fine")],
        vec![
            edge("A", "", "subtopic_of"),
            edge("", "B", "subtopic_of"),
            edge("A", "B", ""),
            edge("A", "B", "kept"),
        ],
    )]);

    assert_eq!(merged.nodes.len(), 1);
    assert_eq!(merged.nodes[0].id, "ok");
    assert_eq!(merged.edges.len(), 1);
    assert_eq!(merged.edges[0].relationship, "kept");
}

#[test]
fn node_ids_are_trimmed_and_case_sensitive() {
    let merged = merge_fragments(&[
        fragment(vec![node("  Rust ", "topic", "padded")], vec![]),
        fragment(vec![node("Rust", "topic", "exact match")], vec![]),
        fragment(vec![node("rust", "topic", "different node")], vec![]),
    ]);
    assert_eq!(merged.nodes.len(), 2);
}

#[test]
fn merge_is_independent_of_fragment_order() {
    let fragments = vec![
        fragment(
            vec![node("a", "topic", "alpha"), node("b", "", "beta long desc")],
            vec![edge("a", "b", "related_to")],
        ),
        fragment(
            vec![node("b", "subject", "beta"), node("c", "topic", "gamma")],
            vec![edge("a", "b", "Related_To"), edge("b", "c", "subtopic_of")],
        ),
        fragment(
            vec![node("a", "topic", "alpha with a longer description")],
            vec![edge("c", "a", "example_of")],
        ),
    ];

    let mut reversed = fragments.clone();
    reversed.reverse();
    let mut rotated = fragments.clone();
    rotated.rotate_left(1);

    let baseline = serde_json::to_string(&merge_fragments(&fragments)).unwrap();
    assert_eq!(
        baseline,
        serde_json::to_string(&merge_fragments(&reversed)).unwrap()
    );
    assert_eq!(
        baseline,
        serde_json::to_string(&merge_fragments(&rotated)).unwrap()
    );
}

#[test]
fn empty_input_merges_to_empty_graph() {
    let merged = merge_fragments(&[]);
    assert!(merged.nodes.is_empty());
    assert!(merged.edges.is_empty());
}
