use bitvec::prelude::*;

/// An undirected graph over dense integer node ids, built by connecting pairs of nodes and
/// consumed by draining it into connected components.
///
/// Nodes only exist once they have been connected to another node, so isolated nodes are
/// never yielded. Draining is destructive: a node is removed from the graph as soon as the
/// component containing it has been popped.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    edges: Vec<Vec<usize>>,
    linked: BitVec,
    nb_linked: usize,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with room for node ids in `0..nb_nodes` without reallocating.
    #[must_use]
    pub fn with_capacity(nb_nodes: usize) -> Self {
        Self {
            edges: vec![vec![]; nb_nodes],
            linked: bitvec![0; nb_nodes],
            nb_linked: 0,
        }
    }

    fn ensure_node(&mut self, node: usize) {
        if node >= self.edges.len() {
            self.edges.resize(node + 1, vec![]);
            self.linked.resize(node + 1, false);
        }
    }

    fn mark_linked(&mut self, node: usize) {
        if !self.linked[node] {
            self.linked.set(node, true);
            self.nb_linked += 1;
        }
    }

    /// Add an undirected edge between `a` and `b`. Connecting an already connected pair is a
    /// no-op, and so is connecting a node to itself.
    pub fn connect(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }

        self.ensure_node(a.max(b));
        if self.edges[a].contains(&b) {
            return;
        }

        self.edges[a].push(b);
        self.edges[b].push(a);
        self.mark_linked(a);
        self.mark_linked(b);
    }

    /// The number of nodes that have at least one edge and have not been drained yet.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nb_linked
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nb_linked == 0
    }

    #[must_use]
    pub fn contains(&self, node: usize) -> bool {
        self.linked.get(node).is_some_and(|bit| *bit)
    }

    #[must_use]
    pub fn neighbours(&self, node: usize) -> &[usize] {
        self.edges.get(node).map_or(&[], Vec::as_slice)
    }

    /// Remove the component containing `seed` from the graph and return its nodes in ascending
    /// order. Returns `None` if `seed` is not (or no longer) in the graph.
    pub fn pop_component(&mut self, seed: usize) -> Option<Vec<usize>> {
        if !self.contains(seed) {
            return None;
        }

        self.linked.set(seed, false);
        let mut component = vec![seed];
        let mut stack = vec![seed];

        while let Some(node) = stack.pop() {
            for next in std::mem::take(&mut self.edges[node]) {
                if self.linked[next] {
                    self.linked.set(next, false);
                    component.push(next);
                    stack.push(next);
                }
            }
        }

        self.nb_linked -= component.len();
        component.sort_unstable();
        Some(component)
    }

    /// Drain the graph into its connected components. Components are yielded in order of
    /// their smallest node, each sorted ascending. Once the iterator is exhausted the graph
    /// is empty.
    pub fn pop_groups(&mut self) -> PopGroups<'_> {
        PopGroups {
            graph: self,
            cursor: 0,
        }
    }

    /// Drain the whole graph. See [`Graph::pop_groups`].
    #[must_use]
    pub fn into_groups(mut self) -> Vec<Vec<usize>> {
        self.pop_groups().collect()
    }
}

/// Iterator returned by [`Graph::pop_groups`].
pub struct PopGroups<'a> {
    graph: &'a mut Graph,
    cursor: usize,
}

impl Iterator for PopGroups<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let seed = self.cursor + self.graph.linked[self.cursor..].first_one()?;
        self.cursor = seed + 1;
        self.graph.pop_component(seed)
    }
}
