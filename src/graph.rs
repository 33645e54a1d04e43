//! Relative graph accessor.
//!
//! A read-only view over the edges of one import. Edges are undirected, so
//! a citizen's relatives are collected from both endpoints and the citizen
//! itself never appears in its own list.

use std::collections::{BTreeMap, BTreeSet};

use crate::store::CitizenStore;
use crate::types::{CitizenId, ImportId, RelativeEdge, RelativesMap};

/// Members and edges of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportGraph {
    members: BTreeSet<CitizenId>,
    neighbours: BTreeMap<CitizenId, BTreeSet<CitizenId>>,
    edges: BTreeSet<RelativeEdge>,
}

impl ImportGraph {
    /// Build a graph from a member set and canonical edges.
    pub fn new(members: BTreeSet<CitizenId>, edges: impl IntoIterator<Item = RelativeEdge>) -> Self {
        let mut graph = Self {
            members,
            ..Self::default()
        };
        for edge in edges {
            graph.insert_edge(edge);
        }
        graph
    }

    /// Build a graph from a raw adjacency map, as returned by
    /// [`CitizenStore::get_relatives_map`].
    pub fn from_relatives_map(members: BTreeSet<CitizenId>, map: &RelativesMap) -> Self {
        let edges = map.iter().flat_map(|(citizen, relatives)| {
            relatives
                .iter()
                .filter_map(move |relative| RelativeEdge::new(*citizen, *relative))
        });
        Self::new(members, edges)
    }

    /// Load the graph of an import from a store.
    ///
    /// Returns `None` if the import is unknown.
    pub async fn load<S: CitizenStore + ?Sized>(
        store: &S,
        import_id: ImportId,
    ) -> Result<Option<Self>, S::Error> {
        let Some(members) = store.citizen_ids(import_id).await? else {
            return Ok(None);
        };
        let Some(map) = store.get_relatives_map(import_id).await? else {
            return Ok(None);
        };
        Ok(Some(Self::from_relatives_map(members, &map)))
    }

    fn insert_edge(&mut self, edge: RelativeEdge) {
        if !self.edges.insert(edge) {
            return;
        }
        self.neighbours.entry(edge.low()).or_default().insert(edge.high());
        self.neighbours.entry(edge.high()).or_default().insert(edge.low());
    }

    /// Whether `id` is a citizen of the import.
    pub fn contains(&self, id: CitizenId) -> bool {
        self.members.contains(&id)
    }

    /// Citizen ids of the import.
    pub fn members(&self) -> &BTreeSet<CitizenId> {
        &self.members
    }

    /// Sorted relatives of `id`, from either side of every edge.
    pub fn relatives_of(&self, id: CitizenId) -> Vec<CitizenId> {
        self.neighbours
            .get(&id)
            .map(|set| set.iter().copied().filter(|other| *other != id).collect())
            .unwrap_or_default()
    }

    /// One-directional adjacency: each edge appears once, under its
    /// smaller endpoint.
    pub fn adjacency(&self) -> RelativesMap {
        let mut map = RelativesMap::new();
        for edge in &self.edges {
            map.entry(edge.low()).or_default().push(edge.high());
        }
        map
    }

    /// Canonical edges, in order.
    pub fn edges(&self) -> impl Iterator<Item = &RelativeEdge> {
        self.edges.iter()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Relatives of `citizen` in a raw adjacency map, looking at both the
/// citizen's own entry and every entry that lists it.
pub fn expand_relatives(map: &RelativesMap, citizen: CitizenId) -> Vec<CitizenId> {
    let mut found = BTreeSet::new();
    for (owner, relatives) in map {
        if *owner == citizen {
            found.extend(relatives.iter().copied());
        } else if relatives.contains(&citizen) {
            found.insert(*owner);
        }
    }
    found.remove(&citizen);
    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> CitizenId {
        CitizenId::new(raw)
    }

    fn members(ids: &[i64]) -> BTreeSet<CitizenId> {
        ids.iter().copied().map(id).collect()
    }

    #[test]
    fn test_one_sided_listing_is_bidirectional() {
        let mut map = RelativesMap::new();
        map.insert(id(1), vec![id(2), id(3)]);
        let graph = ImportGraph::from_relatives_map(members(&[1, 2, 3]), &map);

        assert_eq!(graph.relatives_of(id(1)), vec![id(2), id(3)]);
        assert_eq!(graph.relatives_of(id(2)), vec![id(1)]);
        assert_eq!(graph.relatives_of(id(3)), vec![id(1)]);
    }

    #[test]
    fn test_both_sides_collapse_to_one_edge() {
        let mut map = RelativesMap::new();
        map.insert(id(1), vec![id(2)]);
        map.insert(id(2), vec![id(1)]);
        let graph = ImportGraph::from_relatives_map(members(&[1, 2]), &map);

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.relatives_of(id(1)), vec![id(2)]);
        assert_eq!(graph.adjacency().get(&id(1)), Some(&vec![id(2)]));
        assert!(graph.adjacency().get(&id(2)).is_none());
    }

    #[test]
    fn test_self_pairs_ignored() {
        let mut map = RelativesMap::new();
        map.insert(id(4), vec![id(4), id(5)]);
        let graph = ImportGraph::from_relatives_map(members(&[4, 5]), &map);

        assert_eq!(graph.relatives_of(id(4)), vec![id(5)]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_isolated_member() {
        let graph = ImportGraph::new(members(&[9]), Vec::new());
        assert!(graph.contains(id(9)));
        assert!(graph.relatives_of(id(9)).is_empty());
        assert!(!graph.contains(id(10)));
    }

    #[test]
    fn test_expand_relatives_raw_map() {
        let mut map = RelativesMap::new();
        map.insert(id(1), vec![id(2)]);
        map.insert(id(3), vec![id(1), id(1)]);
        map.insert(id(2), vec![id(2)]);

        assert_eq!(expand_relatives(&map, id(1)), vec![id(2), id(3)]);
        assert_eq!(expand_relatives(&map, id(2)), vec![id(1)]);
        assert!(expand_relatives(&map, id(7)).is_empty());
    }
}
