//! Cygnet Query Engine
//!
//! Translates Cypher queries into Gremlin traversals.
//!
//! # Overview
//!
//! The pipeline has four stages:
//! - `lexer`/`parser`: Cypher text to AST
//! - `builder`: AST to a scope-resolved IR
//! - `lower`/`expression`: IR to a flavor-neutral traversal
//! - `flavor`: the traversal rendered for a Gremlin endpoint
//!
//! `executor` runs neutral traversals against the in-memory graph.

pub mod ast;
pub mod builder;
pub mod executor;
pub mod expression;
pub mod flavor;
pub mod ir;
pub mod lexer;
pub mod lower;
pub mod params;
pub mod parser;
pub mod predicate;
pub mod step;
pub mod translator;

pub use ast::Query;
pub use builder::build;
pub use executor::TraversalExecutor;
pub use flavor::{Flavor, FlavorEmitter, TraversalProgram};
pub use ir::QueryIr;
pub use lexer::{Token, tokenize};
pub use lower::{LoweredQuery, lower_neutral};
pub use params::{is_valid_identifier, validate_parameter_name};
pub use parser::parse;
pub use predicate::{GremlinPredicates, Operand, Predicate};
pub use step::{GremlinSteps, Step, Traversal};
pub use translator::{Translator, translate};

/// Lexer over Cypher tokens
pub type CypherLexer<'a> = logos::Lexer<'a, Token>;

/// Lower a resolved query and emit it in one flavor
pub fn lower(
    ir: &QueryIr,
    flavor: Flavor,
    parameters: &cygnet_core::ParameterMap,
) -> cygnet_core::Result<TraversalProgram> {
    flavor.emitter().emit(lower_neutral(ir, parameters)?, parameters)
}
