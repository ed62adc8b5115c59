//! In-memory property graph
//!
//! Elements are kept in insertion order so that every scan, and therefore
//! every traversal result, is deterministic.

use cygnet_core::{
    Direction, Edge, EdgeId, Error, IdGenerator, Properties, Result, Value, Vertex, VertexId,
};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// A graph instance held entirely in memory
pub struct Graph {
    /// Name of the graph
    name: String,

    /// ID generator for this graph
    id_gen: IdGenerator,

    /// Vertices in insertion order
    vertices: RwLock<Vec<Vertex>>,

    /// Edges in insertion order
    edges: RwLock<Vec<Edge>>,
}

impl Graph {
    /// Create an empty graph
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            id_gen: IdGenerator::new(),
            vertices: RwLock::new(Vec::new()),
            edges: RwLock::new(Vec::new()),
        }
    }

    /// Get the graph name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn read_vertices(&self) -> Result<RwLockReadGuard<'_, Vec<Vertex>>> {
        self.vertices
            .read()
            .map_err(|_| Error::Internal("vertex table lock poisoned".to_string()))
    }

    fn write_vertices(&self) -> Result<RwLockWriteGuard<'_, Vec<Vertex>>> {
        self.vertices
            .write()
            .map_err(|_| Error::Internal("vertex table lock poisoned".to_string()))
    }

    fn read_edges(&self) -> Result<RwLockReadGuard<'_, Vec<Edge>>> {
        self.edges
            .read()
            .map_err(|_| Error::Internal("edge table lock poisoned".to_string()))
    }

    fn write_edges(&self) -> Result<RwLockWriteGuard<'_, Vec<Edge>>> {
        self.edges
            .write()
            .map_err(|_| Error::Internal("edge table lock poisoned".to_string()))
    }

    // ========== Vertex Operations ==========

    /// Create a new vertex with a label and properties
    pub fn add_vertex<L: Into<String>>(&self, label: L, properties: Properties) -> Result<Vertex> {
        let vertex = Vertex::new(self.id_gen.next_vertex_id(), label, properties);
        self.write_vertices()?.push(vertex.clone());
        debug!("Created vertex {:?} in graph {}", vertex.id, self.name);
        Ok(vertex)
    }

    /// Get a vertex by ID
    pub fn vertex(&self, id: VertexId) -> Result<Option<Vertex>> {
        Ok(self.read_vertices()?.iter().find(|v| v.id == id).cloned())
    }

    /// Get all vertices in insertion order
    pub fn vertices(&self) -> Result<Vec<Vertex>> {
        Ok(self.read_vertices()?.clone())
    }

    /// Find vertices carrying a label
    pub fn vertices_by_label(&self, label: &str) -> Result<Vec<Vertex>> {
        Ok(self
            .read_vertices()?
            .iter()
            .filter(|v| v.label == label)
            .cloned()
            .collect())
    }

    /// Set (or with null, remove) a vertex property
    pub fn set_vertex_property(&self, id: VertexId, key: &str, value: Value) -> Result<()> {
        let mut vertices = self.write_vertices()?;
        let vertex = vertices
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| Error::ElementNotFound(format!("{:?}", id)))?;
        vertex.properties.set(key, value);
        debug!("Set property {} on vertex {:?}", key, id);
        Ok(())
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> Result<usize> {
        Ok(self.read_vertices()?.len())
    }

    // ========== Edge Operations ==========

    /// Create a new edge between two existing vertices
    pub fn add_edge<L: Into<String>>(
        &self,
        label: L,
        out_vertex: VertexId,
        in_vertex: VertexId,
        properties: Properties,
    ) -> Result<Edge> {
        {
            let vertices = self.read_vertices()?;
            for id in [out_vertex, in_vertex] {
                if !vertices.iter().any(|v| v.id == id) {
                    return Err(Error::ElementNotFound(format!("{:?}", id)));
                }
            }
        }

        let edge = Edge::new(self.id_gen.next_edge_id(), label, out_vertex, in_vertex, properties);
        self.write_edges()?.push(edge.clone());
        debug!(
            "Created edge {:?} ({:?} -> {:?}) in graph {}",
            edge.id, out_vertex, in_vertex, self.name
        );
        Ok(edge)
    }

    /// Get an edge by ID
    pub fn edge(&self, id: EdgeId) -> Result<Option<Edge>> {
        Ok(self.read_edges()?.iter().find(|e| e.id == id).cloned())
    }

    /// Get all edges in insertion order
    pub fn edges(&self) -> Result<Vec<Edge>> {
        Ok(self.read_edges()?.clone())
    }

    /// Set (or with null, remove) an edge property
    pub fn set_edge_property(&self, id: EdgeId, key: &str, value: Value) -> Result<()> {
        let mut edges = self.write_edges()?;
        let edge = edges
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::ElementNotFound(format!("{:?}", id)))?;
        edge.properties.set(key, value);
        debug!("Set property {} on edge {:?}", key, id);
        Ok(())
    }

    /// Edges incident to a vertex in a direction, optionally restricted to labels
    pub fn incident_edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        labels: &[String],
    ) -> Result<Vec<Edge>> {
        Ok(self
            .read_edges()?
            .iter()
            .filter(|e| labels.is_empty() || labels.iter().any(|l| *l == e.label))
            .filter(|e| match direction {
                Direction::Outgoing => e.out_vertex == vertex,
                Direction::Incoming => e.in_vertex == vertex,
                Direction::Both => e.out_vertex == vertex || e.in_vertex == vertex,
            })
            .cloned()
            .collect())
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> Result<usize> {
        Ok(self.read_edges()?.len())
    }

    // ========== Sample Graphs ==========

    /// The TinkerPop "modern" toy graph: four people and two pieces of software
    pub fn modern() -> Result<Self> {
        let graph = Graph::new("modern");

        let person = |name: &str, age: i64| {
            let mut props = Properties::with("name", name);
            props.set("age", age);
            props
        };
        let software = |name: &str| {
            let mut props = Properties::with("name", name);
            props.set("lang", "java");
            props
        };

        let marko = graph.add_vertex("person", person("marko", 29))?.id;
        let vadas = graph.add_vertex("person", person("vadas", 27))?.id;
        let lop = graph.add_vertex("software", software("lop"))?.id;
        let josh = graph.add_vertex("person", person("josh", 32))?.id;
        let ripple = graph.add_vertex("software", software("ripple"))?.id;
        let peter = graph.add_vertex("person", person("peter", 35))?.id;

        let weight = |w: f64| Properties::with("weight", w);
        graph.add_edge("knows", marko, vadas, weight(0.5))?;
        graph.add_edge("knows", marko, josh, weight(1.0))?;
        graph.add_edge("created", marko, lop, weight(0.4))?;
        graph.add_edge("created", josh, ripple, weight(1.0))?;
        graph.add_edge("created", josh, lop, weight(0.4))?;
        graph.add_edge("created", peter, lop, weight(0.2))?;

        Ok(graph)
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get_vertex() {
        let graph = Graph::new("test");
        let vertex = graph
            .add_vertex("person", Properties::with("name", "Alice"))
            .unwrap();

        let found = graph.vertex(vertex.id).unwrap().unwrap();
        assert_eq!(found.label, "person");
        assert_eq!(found.property("name"), Some(&Value::from("Alice")));
        assert_eq!(graph.vertex_count().unwrap(), 1);
    }

    #[test]
    fn test_add_edge_requires_vertices() {
        let graph = Graph::new("test");
        let a = graph.add_vertex("person", Properties::new()).unwrap();

        let result = graph.add_edge("knows", a.id, VertexId::from_internal(99), Properties::new());
        assert!(matches!(result, Err(Error::ElementNotFound(_))));
    }

    #[test]
    fn test_modern_graph_shape() {
        let graph = Graph::modern().unwrap();
        assert_eq!(graph.vertex_count().unwrap(), 6);
        assert_eq!(graph.edge_count().unwrap(), 6);
        assert_eq!(graph.vertices_by_label("software").unwrap().len(), 2);

        let marko = &graph.vertices_by_label("person").unwrap()[0];
        let knows = graph
            .incident_edges(marko.id, Direction::Outgoing, &["knows".to_string()])
            .unwrap();
        assert_eq!(knows.len(), 2);

        let all = graph.incident_edges(marko.id, Direction::Both, &[]).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_set_property_null_removes() {
        let graph = Graph::modern().unwrap();
        let lop = graph.vertices_by_label("software").unwrap()[0].id;
        graph.set_vertex_property(lop, "lang", Value::Null).unwrap();
        assert!(graph.vertex(lop).unwrap().unwrap().property("lang").is_none());
    }
}
