use std::collections::{BTreeMap, BTreeSet};

/// Read-only view of unit adjacency supplied by the caller.
pub trait AdjacencyGraph {
    /// Every unit in the graph, including isolated ones.
    fn units(&self) -> Vec<&str>;

    /// Direct neighbors of `unit_id`. Unknown units have none.
    fn neighbors(&self, unit_id: &str) -> Vec<&str>;

    fn degree(&self, unit_id: &str) -> usize {
        self.neighbors(unit_id).len()
    }
}

/// Undirected adjacency list keyed by unit id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyList {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl AdjacencyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<I, A, B>(edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut graph = Self::new();
        for (a, b) in edges {
            graph.add_edge(a, b);
        }
        graph
    }

    pub fn add_unit(&mut self, unit_id: impl Into<String>) {
        self.adjacency.entry(unit_id.into()).or_default();
    }

    /// Add an undirected edge. Self-loops only register the unit.
    pub fn add_edge(&mut self, a: impl Into<String>, b: impl Into<String>) {
        let (a, b) = (a.into(), b.into());
        if a == b {
            self.add_unit(a);
            return;
        }
        self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b).or_default().insert(a);
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }
}

impl AdjacencyGraph for AdjacencyList {
    fn units(&self) -> Vec<&str> {
        self.adjacency.keys().map(String::as_str).collect()
    }

    fn neighbors(&self, unit_id: &str) -> Vec<&str> {
        self.adjacency
            .get(unit_id)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_undirected() {
        let g = AdjacencyList::from_edges([("1", "2"), ("2", "3")]);
        assert_eq!(g.neighbors("2"), vec!["1", "3"]);
        assert_eq!(g.neighbors("1"), vec!["2"]);
        assert_eq!(g.degree("2"), 2);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn isolated_and_unknown_units() {
        let mut g = AdjacencyList::new();
        g.add_unit("a");
        g.add_edge("b", "b");
        assert_eq!(g.units(), vec!["a", "b"]);
        assert!(g.neighbors("a").is_empty());
        assert!(g.neighbors("b").is_empty());
        assert!(g.neighbors("zzz").is_empty());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let g = AdjacencyList::from_edges([("1", "2"), ("2", "1"), ("1", "2")]);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.len(), 2);
    }
}
