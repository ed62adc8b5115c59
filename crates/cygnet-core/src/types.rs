//! Graph element types: vertices, edges and traversal directions

use crate::id::{EdgeId, VertexId};
use crate::value::{Properties, Value};
use serde::{Deserialize, Serialize};

/// Direction of an edge traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Outgoing edge (->)
    Outgoing,
    /// Incoming edge (<-)
    Incoming,
    /// Both directions (--)
    Both,
}

impl Direction {
    /// Returns the opposite direction
    pub fn reverse(self) -> Self {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
            Direction::Both => Direction::Both,
        }
    }
}

/// A vertex in the property graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Unique identifier
    pub id: VertexId,

    /// Vertex label
    pub label: String,

    /// Properties of this vertex
    pub properties: Properties,
}

impl Vertex {
    /// Create a vertex with a label and properties
    pub fn new<L: Into<String>>(id: VertexId, label: L, properties: Properties) -> Self {
        Self {
            id,
            label: label.into(),
            properties,
        }
    }

    /// Get a property
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A directed edge between two vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier
    pub id: EdgeId,

    /// The edge label (relationship type)
    pub label: String,

    /// Source vertex
    pub out_vertex: VertexId,

    /// Target vertex
    pub in_vertex: VertexId,

    /// Properties of this edge
    pub properties: Properties,
}

impl Edge {
    /// Create an edge with properties
    pub fn new<L: Into<String>>(
        id: EdgeId,
        label: L,
        out_vertex: VertexId,
        in_vertex: VertexId,
        properties: Properties,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            out_vertex,
            in_vertex,
            properties,
        }
    }

    /// Get the vertex at the other end of the edge
    pub fn other(&self, vertex: VertexId) -> Option<VertexId> {
        if self.out_vertex == vertex {
            Some(self.in_vertex)
        } else if self.in_vertex == vertex {
            Some(self.out_vertex)
        } else {
            None
        }
    }

    /// Get a property
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_reverse() {
        assert_eq!(Direction::Outgoing.reverse(), Direction::Incoming);
        assert_eq!(Direction::Both.reverse(), Direction::Both);
    }

    #[test]
    fn test_edge_other_end() {
        let a = VertexId::from_internal(1);
        let b = VertexId::from_internal(2);
        let edge = Edge::new(EdgeId::from_internal(9), "knows", a, b, Properties::new());

        assert_eq!(edge.other(a), Some(b));
        assert_eq!(edge.other(b), Some(a));
        assert_eq!(edge.other(VertexId::from_internal(3)), None);
    }
}
