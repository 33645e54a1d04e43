//! Relative edge types for the registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::citizen::CitizenId;

/// Raw adjacency of one import: citizen -> relatives, as stored.
///
/// One-directional; callers expand both sides when they need the
/// symmetric view.
pub type RelativesMap = BTreeMap<CitizenId, Vec<CitizenId>>;

/// Undirected "is relative of" edge between two citizens of one import.
///
/// Stored canonically as `(low, high)` so that `(a, b)` and `(b, a)` are
/// the same edge. Implements `Ord` for deterministic ordering: (low, high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelativeEdge {
    low: CitizenId,
    high: CitizenId,
}

impl RelativeEdge {
    /// Create an edge between two distinct citizens.
    ///
    /// Returns `None` for a self-pair.
    pub fn new(a: CitizenId, b: CitizenId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Smaller endpoint.
    pub fn low(&self) -> CitizenId {
        self.low
    }

    /// Larger endpoint.
    pub fn high(&self) -> CitizenId {
        self.high
    }

    /// True if `id` is one of the endpoints.
    pub fn touches(&self, id: CitizenId) -> bool {
        self.low == id || self.high == id
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint.
    pub fn other(&self, id: CitizenId) -> Option<CitizenId> {
        if self.low == id {
            Some(self.high)
        } else if self.high == id {
            Some(self.low)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> CitizenId {
        CitizenId::new(raw)
    }

    #[test]
    fn test_edge_is_canonical() {
        let e1 = RelativeEdge::new(id(3), id(1)).unwrap();
        let e2 = RelativeEdge::new(id(1), id(3)).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(e1.low(), id(1));
        assert_eq!(e1.high(), id(3));
    }

    #[test]
    fn test_self_pair_rejected() {
        assert!(RelativeEdge::new(id(7), id(7)).is_none());
    }

    #[test]
    fn test_other_endpoint() {
        let e = RelativeEdge::new(id(2), id(5)).unwrap();
        assert_eq!(e.other(id(2)), Some(id(5)));
        assert_eq!(e.other(id(5)), Some(id(2)));
        assert_eq!(e.other(id(9)), None);
        assert!(e.touches(id(5)));
    }

    #[test]
    fn test_edge_ordering() {
        let e1 = RelativeEdge::new(id(1), id(2)).unwrap();
        let e2 = RelativeEdge::new(id(1), id(3)).unwrap();
        let e3 = RelativeEdge::new(id(2), id(3)).unwrap();
        assert!(e1 < e2);
        assert!(e2 < e3);
    }
}
