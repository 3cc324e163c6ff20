//! Graph-driven state machine generation for Rust sources.
//!
//! A DOT graph is turned into a [`StateMachineModel`] and merged into an
//! existing [`SyntaxTree`](switchyard_syntax::SyntaxTree): a state union and a
//! trigger union, per-state transition methods, an extension trait with
//! `apply` / `do_transition` dispatch, and the transition result types.
//! Running the generator again on its own output changes nothing, and code
//! written by hand around or inside the generated declarations survives.
//!
//! # Example
//! ```
//! use switchyard_codegen::{generate_from_source, GraphSource};
//! use switchyard_syntax::{emit, EmitOptions, SyntaxTree};
//! use switchyard_types::GeneratorConfig;
//!
//! let graph = GraphSource {
//!     file_name: "DoorState.dot".into(),
//!     text: r#"digraph { Open -> Closed [label="Close"] }"#.into(),
//! };
//! let config = GeneratorConfig::default();
//! let tree = generate_from_source(&SyntaxTree::empty_file(), &graph, &config).unwrap();
//! let text = emit(&tree, &EmitOptions::default());
//! assert!(text.contains("pub enum DoorState {"));
//! assert!(text.contains("pub fn close_with(self, _trigger: door_trigger::Close_) -> Closed_ {"));
//! ```

pub mod dispatch;
pub mod generator;
pub mod graph;
pub mod host;
pub mod merge;
pub mod model;
pub mod naming;
mod render;
pub mod transition_result;
pub mod transitions;
pub mod union;
pub mod validation;
pub mod with_helpers;

pub use generator::{encode_union_by_name, generate_from_source, generate_state_machine};
pub use graph::{build_model, model_from_source};
pub use host::{run_generation, write_source, DocumentHost, FileDocumentHost, GraphSource};
pub use model::{StateMachineModel, TransitionMethod, TriggerCase, VertexClass};
pub use union::{encode_union, UnionParts, UnionSpec};
pub use validation::{validate_graph, validate_or_raise, Diagnostic, LintRule, Severity};
pub use with_helpers::generate_with_helpers;
