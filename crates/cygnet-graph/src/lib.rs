//! Cygnet Graph
//!
//! A small in-memory property graph. It stands in for a remote Gremlin
//! server so translated traversals can be executed and checked locally.

pub mod graph;

pub use graph::Graph;
