//! Top-level entry points: model + tree in, merged tree out.

use switchyard_syntax::{NodeId, SyntaxTree};
use switchyard_types::{GeneratorConfig, Result, SwitchyardError};

use crate::dispatch::sync_dispatch;
use crate::graph::model_from_source;
use crate::host::GraphSource;
use crate::merge::enum_named;
use crate::model::StateMachineModel;
use crate::transition_result::sync_transition_results;
use crate::transitions::sync_transitions;
use crate::union::{self, encode_union, UnionSpec};

/// The unique enum called `name` anywhere in the tree, if any.
fn find_enum(tree: &SyntaxTree, name: &str) -> Result<Option<NodeId>> {
    let hits = tree.find_descendants(tree.root(), enum_named(name));
    match hits.as_slice() {
        [] => Ok(None),
        [id] => Ok(Some(*id)),
        _ => Err(SwitchyardError::MergeAmbiguity {
            container: tree.get(tree.root()).describe(),
            what: format!("enum {name}"),
            count: hits.len(),
        }),
    }
}

/// Generated code goes next to an existing state union, or at the top level.
fn container_for(tree: &SyntaxTree, model: &StateMachineModel) -> Result<NodeId> {
    Ok(find_enum(tree, &model.state_type_name)?
        .and_then(|id| tree.parent(id))
        .unwrap_or_else(|| tree.root()))
}

/// Merge the state machine described by `model` into a copy of `tree`.
///
/// The input tree is never modified; on error nothing is returned and the
/// caller's document stays as it was.
pub fn generate_state_machine(
    tree: &SyntaxTree,
    model: &StateMachineModel,
    config: &GeneratorConfig,
) -> Result<SyntaxTree> {
    config.validate()?;
    let mut tree = tree.clone();
    let container = container_for(&tree, model)?;

    let mut state_spec = UnionSpec::new(&model.state_type_name, model.state_cases());
    if config.header_comment {
        if let Some(file) = &model.graph_file {
            state_spec = state_spec.with_header(format!("// Generated by switchyard from {file}."));
        }
    }
    let states = encode_union(&mut tree, container, &state_spec, config)?;
    let triggers = encode_union(
        &mut tree,
        container,
        &UnionSpec::new(&model.trigger_type_name, model.trigger_cases()),
        config,
    )?;
    sync_transitions(&mut tree, model, &states, &triggers)?;
    sync_dispatch(&mut tree, container, model, config)?;
    sync_transition_results(&mut tree, container, model, config)?;

    tracing::info!(
        state = %model.state_type_name,
        states = model.vertex_classes.len(),
        triggers = model.triggers.len(),
        transitions = model.transition_count(),
        created = states.created,
        "generated state machine"
    );
    Ok(tree)
}

/// Parse `graph`, derive the model from its file name and generate.
pub fn generate_from_source(
    tree: &SyntaxTree,
    graph: &GraphSource,
    config: &GeneratorConfig,
) -> Result<SyntaxTree> {
    let model = model_from_source(&graph.file_name, &graph.text)?;
    generate_state_machine(tree, &model, config)
}

/// Encode the enum called `name` as a union, whether it is still a plain
/// fieldless enum or was encoded before.
pub fn encode_union_by_name(tree: &SyntaxTree, name: &str, config: &GeneratorConfig) -> Result<SyntaxTree> {
    config.validate()?;
    let mut tree = tree.clone();
    let id = find_enum(&tree, name)?.ok_or_else(|| SwitchyardError::MissingDeclaration {
        what: format!("enum {name}"),
    })?;
    let container = tree.parent(id).unwrap_or_else(|| tree.root());
    let cases = union::current_cases(&tree, container, name)?;
    let parts = encode_union(&mut tree, container, &UnionSpec::new(name, cases), config)?;
    tracing::info!(union = name, created = parts.created, "encoded union");
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_syntax::{emit, parse_document, EmitOptions};

    const DOOR: &str = r#"digraph Door { Open -> Closed [label="Close"]; Closed -> Open [label="Open"]; }"#;

    fn source() -> GraphSource {
        GraphSource {
            file_name: "DoorState.dot".into(),
            text: DOOR.into(),
        }
    }

    fn generate(src: &str, config: &GeneratorConfig) -> Result<String> {
        let tree = parse_document(src)?;
        let out = generate_from_source(&tree, &source(), config)?;
        Ok(emit(&out, &EmitOptions::from_config(config)))
    }

    #[test]
    fn header_names_the_graph_file_once() {
        let config = GeneratorConfig::default();
        let first = generate("", &config).unwrap();
        assert!(first.starts_with("// Generated by switchyard from DoorState.dot.\n#[derive(Debug, Clone)]\npub enum DoorState {"), "{first}");
        let second = generate(&first, &config).unwrap();
        assert_eq!(second, first);
        assert_eq!(second.matches("// Generated by switchyard").count(), 1);
    }

    #[test]
    fn header_can_be_disabled() {
        let config = GeneratorConfig {
            header_comment: false,
            ..GeneratorConfig::default()
        };
        let text = generate("", &config).unwrap();
        assert!(text.starts_with("#[derive(Debug, Clone)]\npub enum DoorState {"));
    }

    #[test]
    fn output_order_is_states_triggers_dispatch_results() {
        let text = generate("", &GeneratorConfig::default()).unwrap();
        let pos = |needle: &str| text.find(needle).unwrap();
        assert!(pos("pub enum DoorState") < pos("pub mod door_state"));
        assert!(pos("pub mod door_state") < pos("pub enum DoorTrigger"));
        assert!(pos("pub enum DoorTrigger") < pos("pub trait DoorExtension"));
        assert!(pos("impl DoorExtension for DoorState") < pos("pub enum DoorTransitionResult"));
    }

    #[test]
    fn existing_union_in_a_module_is_updated_in_place() {
        let first = generate("", &GeneratorConfig::default()).unwrap();
        let indented: String = first
            .lines()
            .map(|l| if l.is_empty() { "\n".to_string() } else { format!("    {l}\n") })
            .collect();
        let wrapped = format!("use std::fmt;\n\npub mod machine {{\n{indented}}}\n");
        let text = generate(&wrapped, &GeneratorConfig::default()).unwrap();
        assert_eq!(text, wrapped);
    }

    #[test]
    fn invalid_config_is_rejected_before_work() {
        let config = GeneratorConfig {
            indent_width: 0,
            ..GeneratorConfig::default()
        };
        assert!(matches!(generate("", &config), Err(SwitchyardError::Config(_))));
    }

    #[test]
    fn encode_union_by_name_promotes_plain_enums() {
        let tree = parse_document("mod lights {\n    pub enum Light {\n        On,\n        Off,\n    }\n}\n").unwrap();
        let out = encode_union_by_name(&tree, "Light", &GeneratorConfig::default()).unwrap();
        let text = emit(&out, &EmitOptions::default());
        assert!(text.contains("    pub enum Light {\n        On(light::On_),\n        Off(light::Off_),\n    }\n"), "{text}");
        let again = encode_union_by_name(&out, "Light", &GeneratorConfig::default()).unwrap();
        assert_eq!(emit(&again, &EmitOptions::default()), text);
    }

    #[test]
    fn encode_union_by_name_needs_the_enum() {
        let tree = parse_document("").unwrap();
        assert!(matches!(
            encode_union_by_name(&tree, "Light", &GeneratorConfig::default()),
            Err(SwitchyardError::MissingDeclaration { .. })
        ));
    }
}
