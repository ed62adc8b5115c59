//! Cygnet Core Library
//!
//! Fundamental types shared by every Cygnet crate: the error hierarchy,
//! the Cypher value model and the graph element types used by the
//! embedded executor.
//!
//! # Modules
//!
//! - `error` - Error types and result aliases
//! - `value` - Values, properties and parameter maps
//! - `id` - Vertex and edge identifiers
//! - `types` - Vertices, edges and directions

pub mod error;
pub mod id;
pub mod types;
pub mod value;

pub use error::{Error, IdentifierKind, Result};
pub use id::{EdgeId, IdGenerator, VertexId};
pub use types::{Direction, Edge, Vertex};
pub use value::{ParameterMap, Properties, Value};
