//! Concept links in authored text
//!
//! Topic and section bodies reference other entries as `[[Term]]`, or as an already
//! rendered `[Term](/concept/...)` link. Each distinct term becomes a `mentions` edge
//! from the page's node to the node carrying that label. Terms that match nothing are
//! promoted to new undated topics in the mathematical physics field.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::GraphResult;
use crate::graph_types::{Edge, EdgeKind, GraphModel, Node, NodeDetail, NodeKind};
use crate::store::{GraphStore, StoredEdge, StoredNode};
use crate::taxonomy::PROMOTION_FIELD;

/// `[[Term]]`, possibly spanning lines, or a rendered `[Term](/concept/...)` link
static CONCEPT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([\s\S]*?)\]\]|\[([^\[\]]+)\]\(/concept/[^)]*\)")
        .expect("concept reference pattern is valid")
});

/// Edges and nodes produced by linking one text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MentionLinks {
    /// One `mentions` edge per distinct term
    pub edges: Vec<Edge>,
    /// Topics created for terms no existing node carries
    pub new_nodes: Vec<Node>,
}

/// Distinct referenced terms, trimmed, in the order they first appear in `text`
///
/// Both reference forms are scanned in a single left-to-right pass. Empty terms are
/// skipped.
pub fn extract_concept_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    CONCEPT_REFERENCE
        .captures_iter(text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim())
        .filter(|term| !term.is_empty())
        .filter(|term| seen.insert(term.to_string()))
        .map(str::to_string)
        .collect()
}

/// URL slug of a term: lowercase ASCII alphanumerics joined by single dashes
pub fn slugify(term: &str) -> String {
    let mut slug = String::with_capacity(term.len());
    for c in term.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.len() < 2 {
        let mut hasher = DefaultHasher::new();
        term.hash(&mut hasher);
        slug = format!("topic-{:08x}", hasher.finish() as u32);
    }
    slug
}

/// Resolve the terms referenced by `text` against `model`.
///
/// Labels match case-insensitively, concepts taking precedence over other kinds. An
/// unmatched term becomes a new topic in the promotion field with unknown time; its id
/// is the term's slug, suffixed if that id is taken.
pub fn link_mentions(model: &GraphModel, source_id: &str, text: &str) -> MentionLinks {
    let mut by_label: HashMap<String, &str> = HashMap::new();
    for node in model.nodes.iter().filter(|n| n.kind() == NodeKind::Concept) {
        by_label
            .entry(node.label.to_lowercase())
            .or_insert(node.id.as_str());
    }
    for node in model.nodes.iter().filter(|n| n.kind() != NodeKind::Concept) {
        by_label
            .entry(node.label.to_lowercase())
            .or_insert(node.id.as_str());
    }
    let mut taken: HashSet<String> = model.nodes.iter().map(|n| n.id.clone()).collect();

    let mut links = MentionLinks::default();
    for term in extract_concept_terms(text) {
        let key = term.to_lowercase();
        let target = match by_label.get(&key) {
            Some(&id) => id.to_string(),
            None => {
                let slug = slugify(&term);
                let id = unique_id(&slug, &taken);
                tracing::debug!(
                    term = %term,
                    id = %id,
                    field = PROMOTION_FIELD,
                    "promoting unmatched term to topic"
                );

                let mut topic = Node::topic(id.clone(), term.clone(), Some(PROMOTION_FIELD), None);
                if let NodeDetail::Topic { slug: topic_slug, .. } = &mut topic.detail {
                    *topic_slug = Some(slug);
                }
                taken.insert(id.clone());
                links.new_nodes.push(topic);
                id
            }
        };
        if target != source_id {
            links
                .edges
                .push(Edge::new(source_id, target, EdgeKind::Mentions));
        }
    }
    links
}

fn unique_id(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Link `text` and persist the result: new topics are upserted by id, mentions edges
/// inserted unless already stored.
pub async fn sync_mentions<S: GraphStore>(
    store: &S,
    model: &GraphModel,
    source_id: &str,
    text: &str,
) -> GraphResult<MentionLinks> {
    let links = link_mentions(model, source_id, text);

    if !links.new_nodes.is_empty() {
        store
            .upsert_nodes(links.new_nodes.iter().map(StoredNode::from_node).collect())
            .await?;
    }
    store
        .upsert_edges(links.edges.iter().map(StoredEdge::from_edge).collect())
        .await?;

    tracing::info!(
        source = source_id,
        edges = links.edges.len(),
        promoted = links.new_nodes.len(),
        "synced concept mentions"
    );
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build_default_model;
    use crate::store::MemoryStore;

    #[test]
    fn extracts_trimmed_distinct_terms_in_order() {
        let text = "See [[ Entropy ]] and [[Gauge Theory]], then [[Entropy]] again.\n\
                    A [[multi\nline]] term, an empty [[  ]] one and a [Lagrangian](/concept/Lagrangian).";
        assert_eq!(
            extract_concept_terms(text),
            vec!["Entropy", "Gauge Theory", "multi\nline", "Lagrangian"]
        );
    }

    #[test]
    fn mixed_reference_forms_keep_text_order() {
        let text = "[Lagrangian](/concept/lagrangian) leads to [[Noether Theorem]], \
                    then [Hamiltonian](/concept/hamiltonian) and [[lagrangian]].";
        assert_eq!(
            extract_concept_terms(text),
            vec!["Lagrangian", "Noether Theorem", "Hamiltonian", "lagrangian"]
        );
    }

    #[test]
    fn text_without_references_has_no_terms() {
        assert!(extract_concept_terms("plain [link](https://example.org) text").is_empty());
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Schrödinger's Equation!"), "schr-dinger-s-equation");
        assert_eq!(slugify("  Gauge   Theory "), "gauge-theory");
        assert!(slugify("α").starts_with("topic-"));
    }

    #[test]
    fn links_resolve_by_label_case_insensitively() {
        let mut model = build_default_model();
        model.nodes.push(Node::concept("entropy-concept", "Entropy"));
        model.nodes.push(Node::topic("entropy-topic", "Entropy", Some("statistical"), None));

        let links = link_mentions(&model, "s1", "[[entropy]] and [[QUANTUM MECHANICS]]");

        assert!(links.new_nodes.is_empty());
        let targets: Vec<&str> = links.edges.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["entropy-concept", "quantum"]);
        assert!(links.edges.iter().all(|e| e.kind == EdgeKind::Mentions && e.source == "s1"));
    }

    #[test]
    fn unmatched_terms_become_promoted_topics() {
        let model = build_default_model();
        let links = link_mentions(&model, "q3", "The [[Path Integral]] formulation");

        assert_eq!(links.new_nodes.len(), 1);
        let topic = &links.new_nodes[0];
        assert_eq!(topic.id, "path-integral");
        assert_eq!(topic.label, "Path Integral");
        assert_eq!(topic.group_key(), Some(PROMOTION_FIELD));
        assert_eq!(topic.time_value(), None);
        assert_eq!(links.edges[0].target, "path-integral");
    }

    #[test]
    fn promoted_ids_do_not_collide() {
        let mut model = build_default_model();
        model.nodes.push(Node::concept("spin", "Intrinsic angular momentum"));

        let links = link_mentions(&model, "q3", "[[Spin]]");
        assert_eq!(links.new_nodes[0].id, "spin-2");
    }

    #[test]
    fn self_mentions_are_skipped() {
        let model = build_default_model();
        let links = link_mentions(&model, "quantum", "[[Quantum Mechanics]]");
        assert!(links.edges.is_empty());
    }

    #[tokio::test]
    async fn sync_writes_topics_and_edges_once() {
        let store = MemoryStore::default();
        let model = build_default_model();

        sync_mentions(&store, &model, "q3", "[[Path Integral]]").await.unwrap();
        sync_mentions(&store, &model, "q3", "[[Path Integral]]").await.unwrap();

        let nodes = store.fetch_nodes().await.unwrap();
        let edges = store.fetch_edges().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, "topic");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].label, "mentions");
    }
}
