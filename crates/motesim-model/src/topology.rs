//! Radio topology files.
//!
//! ```text
//! 3
//! 1 2 -54.0
//! 2 1 -55.0
//! 2 3 -60.5
//! ```
//!
//! The first line declares a node count. It is informational only: the set
//! of participating nodes is whatever appears as a link endpoint.

use crate::{read_input, ModelError};
use indexmap::IndexSet;
use motesim_common::NodeId;
use std::path::Path;

/// A directed radio link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// Transmitting node.
    pub src: NodeId,
    /// Receiving node.
    pub dst: NodeId,
    /// Link gain in dB.
    pub gain_db: f64,
}

/// Links plus the insertion-ordered set of nodes they touch.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    declared_nodes: usize,
    links: Vec<Link>,
    node_ids: IndexSet<NodeId>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse topology text.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let mut lines = text.lines().enumerate();

        let (_, first) = lines.next().ok_or(ModelError::MissingNodeCount)?;
        let declared_nodes = first
            .trim()
            .parse::<usize>()
            .map_err(|_| ModelError::parse(1, format!("invalid node count '{}'", first.trim())))?;

        let mut topology = Topology {
            declared_nodes,
            ..Topology::default()
        };

        for (index, line) in lines {
            let line_no = index + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() < 3 {
                return Err(ModelError::parse(
                    line_no,
                    format!("expected 'src dst gain', got '{}'", line.trim()),
                ));
            }
            let src = parse_node_id(tokens[0], line_no)?;
            let dst = parse_node_id(tokens[1], line_no)?;
            let gain_db = tokens[2]
                .parse::<f64>()
                .map_err(|_| ModelError::parse(line_no, format!("invalid gain '{}'", tokens[2])))?;
            topology.insert_link(Link { src, dst, gain_db });
        }

        Ok(topology)
    }

    /// Append a link, registering both endpoints.
    pub fn insert_link(&mut self, link: Link) {
        self.node_ids.insert(link.src);
        self.node_ids.insert(link.dst);
        self.links.push(link);
    }

    /// Fold another topology into this one.
    ///
    /// Links accumulate, node IDs stay deduplicated, and the declared count
    /// is taken from `other`.
    pub fn merge(&mut self, other: Topology) {
        self.declared_nodes = other.declared_nodes;
        for link in other.links {
            self.insert_link(link);
        }
    }

    /// Node count from the first line of the file.
    pub fn declared_nodes(&self) -> usize {
        self.declared_nodes
    }

    /// All links in file order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Participating nodes in order of first appearance.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids.iter().copied()
    }

    /// Whether `id` is a link endpoint.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node_ids.contains(&id)
    }

    /// Number of distinct participating nodes.
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// True if no node has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }
}

fn parse_node_id(token: &str, line_no: usize) -> Result<NodeId, ModelError> {
    token
        .parse::<u16>()
        .map(NodeId)
        .map_err(|_| ModelError::parse(line_no, format!("invalid node id '{}'", token)))
}

/// Load a topology file.
pub fn load_topology(path: &Path) -> Result<Topology, ModelError> {
    let text = read_input(path)?;
    let topology = Topology::parse(&text)?;
    tracing::debug!(
        path = %path.display(),
        declared = topology.declared_nodes(),
        nodes = topology.node_count(),
        links = topology.links().len(),
        "Loaded topology"
    );
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_example() {
        let topo = Topology::parse("3\n1 2 -54.0\n2 1 -55.0\n\n2 3 -60.5\n").unwrap();
        assert_eq!(topo.declared_nodes(), 3);
        assert_eq!(topo.links().len(), 3);
        assert_eq!(
            topo.node_ids().collect::<Vec<_>>(),
            vec![NodeId(1), NodeId(2), NodeId(3)]
        );
        assert_eq!(topo.links()[2].gain_db, -60.5);
    }

    #[test]
    fn test_declared_count_is_informational() {
        let topo = Topology::parse("19\n5 7 -50.0\n").unwrap();
        assert_eq!(topo.declared_nodes(), 19);
        assert_eq!(topo.node_count(), 2);
    }

    #[test]
    fn test_extra_tokens_ignored() {
        let topo = Topology::parse("2\n1 2 -50.0 trailing\n").unwrap();
        assert_eq!(topo.links().len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            Topology::parse(""),
            Err(ModelError::MissingNodeCount)
        ));
    }

    #[test]
    fn test_bad_node_count() {
        let err = Topology::parse("nine\n1 2 -50\n").unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_bad_link_line_reports_line_number() {
        let err = Topology::parse("2\n1 2 -50\n\n1 x -50\n").unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 4, .. }));

        let err = Topology::parse("2\n1 2\n").unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 2, .. }));

        let err = Topology::parse("2\n-1 2 -50\n").unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_merge_keeps_ids_unique() {
        let mut topo = Topology::parse("2\n1 2 -50\n").unwrap();
        topo.merge(Topology::parse("3\n2 3 -50\n3 1 -40\n").unwrap());
        assert_eq!(topo.declared_nodes(), 3);
        assert_eq!(topo.links().len(), 3);
        assert_eq!(
            topo.node_ids().collect::<Vec<_>>(),
            vec![NodeId(1), NodeId(2), NodeId(3)]
        );
        assert!(topo.contains(NodeId(3)));
        assert!(!topo.contains(NodeId(4)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_topology(Path::new("does/not/exist.topo")).unwrap_err();
        assert!(matches!(err, ModelError::FileNotFound(p) if p.ends_with("exist.topo")));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("line.topo");
        std::fs::write(&path, "2\n1 2 -53.0\n2 1 -53.0\n").unwrap();
        let topo = load_topology(&path).unwrap();
        assert_eq!(topo.node_count(), 2);
    }

    proptest! {
        #[test]
        fn prop_node_ids_are_distinct_endpoints(
            declared in 0usize..64,
            edges in proptest::collection::vec((0u16..40, 0u16..40, -110.0f64..0.0), 0..60),
        ) {
            let mut text = format!("{}\n", declared);
            for (src, dst, gain) in &edges {
                text.push_str(&format!("{} {} {}\n", src, dst, gain));
            }
            let topo = Topology::parse(&text).unwrap();

            let mut expected = Vec::new();
            let mut seen = HashSet::new();
            for (src, dst, _) in &edges {
                for id in [*src, *dst] {
                    if seen.insert(id) {
                        expected.push(NodeId(id));
                    }
                }
            }

            prop_assert_eq!(topo.node_count(), seen.len());
            prop_assert_eq!(topo.node_ids().collect::<Vec<_>>(), expected);
            prop_assert_eq!(topo.links().len(), edges.len());
            prop_assert_eq!(topo.declared_nodes(), declared);
        }
    }
}
