//! Element identifiers for the in-memory graph

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Internal numeric ID
pub type InternalId = u64;

/// Identifier of a vertex
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(InternalId);

impl VertexId {
    /// Create from internal numeric ID
    pub fn from_internal(id: InternalId) -> Self {
        Self(id)
    }

    /// Get the internal numeric representation
    pub fn as_internal(&self) -> InternalId {
        self.0
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VertexId({})", self.0)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an edge
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(InternalId);

impl EdgeId {
    /// Create from internal numeric ID
    pub fn from_internal(id: InternalId) -> Self {
        Self(id)
    }

    /// Get the internal numeric representation
    pub fn as_internal(&self) -> InternalId {
        self.0
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential identifier generator for one graph
#[derive(Debug)]
pub struct IdGenerator {
    next_vertex_id: AtomicU64,
    next_edge_id: AtomicU64,
}

impl IdGenerator {
    /// Create a new ID generator
    pub fn new() -> Self {
        Self::with_start(1, 1)
    }

    /// Create with starting values
    pub fn with_start(vertex_start: u64, edge_start: u64) -> Self {
        Self {
            next_vertex_id: AtomicU64::new(vertex_start),
            next_edge_id: AtomicU64::new(edge_start),
        }
    }

    /// Generate the next vertex ID
    pub fn next_vertex_id(&self) -> VertexId {
        VertexId(self.next_vertex_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Generate the next edge ID
    pub fn next_edge_id(&self) -> EdgeId {
        EdgeId(self.next_edge_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generator() {
        let id_gen = IdGenerator::new();

        let v1 = id_gen.next_vertex_id();
        let v2 = id_gen.next_vertex_id();
        assert_eq!(v1.as_internal() + 1, v2.as_internal());

        let e1 = id_gen.next_edge_id();
        assert_eq!(e1, EdgeId::from_internal(1));
    }

    #[test]
    fn test_id_generator_with_start() {
        let id_gen = IdGenerator::with_start(100, 200);
        assert_eq!(id_gen.next_vertex_id().as_internal(), 100);
        assert_eq!(id_gen.next_edge_id().as_internal(), 200);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", VertexId::from_internal(7)), "VertexId(7)");
        assert_eq!(EdgeId::from_internal(3).to_string(), "3");
    }
}
