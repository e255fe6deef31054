//! Link edge model - the record-to-primary association.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Association from one record to its group's primary record.
///
/// Every record has at most one outgoing edge. A designated primary carries
/// a self-edge; a never-linked record carries no edge at all and resolves to
/// itself. Edges always point directly at the group root, never at an
/// intermediate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEdge {
    pub record_id: Uuid,
    pub primary_id: Uuid,
}

impl LinkEdge {
    pub fn new(record_id: Uuid, primary_id: Uuid) -> Self {
        Self {
            record_id,
            primary_id,
        }
    }

    /// Self-edge marking a record as a designated group root.
    pub fn root(record_id: Uuid) -> Self {
        Self {
            record_id,
            primary_id: record_id,
        }
    }

    /// Whether this edge designates its record as a group root.
    pub fn is_root(&self) -> bool {
        self.record_id == self.primary_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_self_edges_designate_roots() {
        let id = Uuid::new_v4();
        assert!(LinkEdge::root(id).is_root());
        assert!(!LinkEdge::new(id, Uuid::new_v4()).is_root());
    }
}
