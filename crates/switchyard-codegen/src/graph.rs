//! Graph model adapter: parsed DOT graph + base name -> [`StateMachineModel`].

use std::collections::HashSet;

use switchyard_dot::DotGraph;
use switchyard_types::{Result, SwitchyardError};

use crate::model::{StateMachineModel, TransitionMethod, TriggerCase, VertexClass};
use crate::naming::{self, Scope, TypeNames};

fn derivation(message: impl Into<String>) -> SwitchyardError {
    SwitchyardError::ModelDerivation {
        message: message.into(),
    }
}

/// Display name of vertex `id`: its non-empty label, otherwise the id.
pub(crate) fn vertex_name(graph: &DotGraph, id: &str) -> String {
    graph
        .node(id)
        .and_then(|n| n.label())
        .filter(|l| !l.is_empty())
        .unwrap_or(id)
        .to_string()
}

/// Build the model for `graph` under `base_name`.
///
/// Fails without side effects on empty graphs, unlabeled edges, edges that
/// name unknown vertices, invalid identifiers and name collisions.
pub fn build_model(base_name: &str, graph: &DotGraph, graph_file: Option<&str>) -> Result<StateMachineModel> {
    let names = TypeNames::new(base_name)?;
    if graph.nodes.is_empty() {
        return Err(derivation("the graph declares no vertices"));
    }
    let mut model = StateMachineModel::new(names, graph_file.map(str::to_string));

    for edge in &graph.edges {
        for end in [&edge.from, &edge.to] {
            if !graph.contains_node(end) {
                return Err(derivation(format!(
                    "edge {} -> {} references unknown vertex '{}'",
                    edge.from, edge.to, end
                )));
            }
        }
        match edge.label() {
            Some(label) if !label.trim().is_empty() => {
                naming::validate_identifier(label, "trigger label")?;
            }
            _ => {
                return Err(derivation(format!(
                    "edge {} -> {} has no label",
                    edge.from, edge.to
                )))
            }
        }
    }

    let state_names: Vec<String> = graph.nodes.iter().map(|n| vertex_name(graph, &n.id)).collect();
    for state_name in &state_names {
        naming::validate_identifier(state_name, "state name")?;
    }
    naming::check_union_cases(&model.state_type_name, &state_names)?;

    let mut seen_triggers: HashSet<String> = HashSet::new();

    for node in &graph.nodes {
        let state_name = vertex_name(graph, &node.id);
        let case_type_name = naming::case_struct(&state_name);
        let mut methods = Scope::new(format!("transitions of {state_name}"));
        let mut transitions: Vec<TransitionMethod> = Vec::new();

        for edge in graph.outgoing(&node.id) {
            let label = edge.label().unwrap_or_default().to_string();
            let target_state = vertex_name(graph, &edge.to);

            if let Some(existing) = transitions.iter().find(|t| t.trigger == label) {
                if existing.target_state == target_state {
                    tracing::debug!(state = %state_name, trigger = %label, "consolidated duplicate edge");
                    continue;
                }
                return Err(SwitchyardError::NamingCollision {
                    scope: format!("transitions of {state_name}"),
                    identifier: existing.method_name.clone(),
                });
            }

            let method_name = naming::transition_method(&label);
            let boxed_method_name = naming::boxed_transition_method(&label);
            methods.claim(&method_name)?;
            methods.claim(&boxed_method_name)?;

            if seen_triggers.insert(label.clone()) {
                model.triggers.push(TriggerCase {
                    name: label.clone(),
                    case_type_name: naming::case_struct(&label),
                    qualified_case_type_name: format!(
                        "{}::{}",
                        model.trigger_module,
                        naming::case_struct(&label)
                    ),
                });
            }

            let nested = naming::case_struct(&label);
            transitions.push(TransitionMethod {
                source_state: state_name.clone(),
                return_type_name: naming::case_struct(&target_state),
                target_state,
                trigger: label,
                method_name,
                boxed_method_name,
                full_parameter_type_name: format!("{}::{}", model.trigger_module, nested),
                nested_parameter_type_name: nested,
            });
        }

        model.vertex_classes.push(VertexClass {
            vertex_id: node.id.clone(),
            qualified_case_type_name: format!("{}::{}", model.state_module, case_type_name),
            case_type_name,
            state_name,
            transitions,
        });
    }

    naming::check_union_cases(&model.trigger_type_name, &model.trigger_cases())?;

    tracing::debug!(
        base = %model.base_name,
        states = model.vertex_classes.len(),
        triggers = model.triggers.len(),
        transitions = model.transition_count(),
        "derived state machine model"
    );
    Ok(model)
}

/// Parse graph text and derive its model, taking the base name from the file name.
pub fn model_from_source(file_name: &str, text: &str) -> Result<StateMachineModel> {
    let graph = switchyard_dot::parse(text)?;
    let base = naming::base_name_from_file(file_name)?;
    build_model(&base, &graph, Some(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LICENSE: &str = r#"digraph LicenseFlow {
        NoLicense;
        NotRegistered_NoDisplayName [label="NotRegistered"];
        DemoRegistered;
        CommunityRegistered;
        Full;
        NoLicense -> NotRegistered_NoDisplayName [label="DemoLicenseFound"];
        NoLicense -> Full [label="FullLicenseFound"];
        NotRegistered_NoDisplayName -> DemoRegistered [label="DemoRegistered"];
        NotRegistered_NoDisplayName -> CommunityRegistered [label="CommunityRegistered"];
        NotRegistered_NoDisplayName -> Full [label="FullLicenseFound"];
        DemoRegistered -> Full [label="FullLicenseFound"];
        CommunityRegistered -> Full [label="FullLicenseFound"];
    }"#;

    fn model(dot: &str) -> Result<StateMachineModel> {
        let graph = switchyard_dot::parse(dot)?;
        build_model("Door", &graph, None)
    }

    #[test]
    fn license_graph_naming() {
        let model = model_from_source("LicenseState.dot", LICENSE).unwrap();
        assert_eq!(model.base_name, "License");
        assert_eq!(model.state_type_name, "LicenseState");
        assert_eq!(model.trigger_type_name, "LicenseTrigger");
        let full = model.vertex("Full").unwrap();
        assert_eq!(full.qualified_case_type_name, "license_state::Full_");

        let found = model
            .triggers
            .iter()
            .find(|t| t.name == "FullLicenseFound")
            .unwrap();
        assert_eq!(found.qualified_case_type_name, "license_trigger::FullLicenseFound_");

        let no_license = model.vertex("NoLicense").unwrap();
        let method = &no_license.transitions[1];
        assert_eq!(method.method_name, "full_license_found");
        assert_eq!(method.boxed_method_name, "full_license_found_with");
        assert_eq!(method.return_type_name, "Full_");
        assert_eq!(method.full_parameter_type_name, "license_trigger::FullLicenseFound_");
    }

    #[test]
    fn labels_override_state_names() {
        let model = model_from_source("LicenseState.dot", LICENSE).unwrap();
        assert_eq!(
            model.state_cases(),
            vec!["NoLicense", "NotRegistered", "DemoRegistered", "CommunityRegistered", "Full"]
        );
        let not_registered = model.vertex("NotRegistered").unwrap();
        assert_eq!(not_registered.vertex_id, "NotRegistered_NoDisplayName");
        assert_eq!(model.vertex("NoLicense").unwrap().transitions[0].target_state, "NotRegistered");
    }

    #[test]
    fn triggers_in_first_occurrence_order() {
        let model = model_from_source("LicenseState.dot", LICENSE).unwrap();
        assert_eq!(
            model.trigger_cases(),
            vec!["DemoLicenseFound", "FullLicenseFound", "DemoRegistered", "CommunityRegistered"]
        );
    }

    #[test]
    fn edge_to_undeclared_vertex_is_rejected() {
        // The DOT parser declares every edge endpoint, so only a graph
        // assembled by hand can get here.
        let mut graph = switchyard_dot::parse("digraph { Open -> Closed [label=\"Close\"]; }").unwrap();
        graph.edges[0].to = "Missing".into();
        let err = build_model("Door", &graph, None).unwrap_err();
        match err {
            SwitchyardError::ModelDerivation { message } => {
                assert_eq!(message, "edge Open -> Missing references unknown vertex 'Missing'");
            }
            other => panic!("expected ModelDerivation, got {other:?}"),
        }
    }

    #[test]
    fn vertices_keep_graph_order() {
        let model = model("digraph { Zeta -> Alpha [label=\"Go\"]; Mid; }").unwrap();
        assert_eq!(model.state_cases(), vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn duplicate_edges_consolidate() {
        let model = model(
            "digraph { Open -> Closed [label=\"Close\"]; Open -> Closed [label=\"Close\"]; }",
        )
        .unwrap();
        assert_eq!(model.vertex("Open").unwrap().transitions.len(), 1);
    }

    #[test]
    fn same_label_to_different_targets_collides() {
        let err = model(
            "digraph { Open -> Closed [label=\"Go\"]; Open -> Locked [label=\"Go\"]; }",
        )
        .unwrap_err();
        assert!(matches!(err, SwitchyardError::NamingCollision { .. }));
    }

    #[test]
    fn labels_with_same_method_name_collide() {
        let err = model(
            "digraph { Open -> Closed [label=\"CloseDoor\"]; Open -> Locked [label=\"Close_Door\"]; }",
        )
        .unwrap_err();
        assert!(
            matches!(err, SwitchyardError::NamingCollision { ref identifier, .. } if identifier == "close_door")
        );
    }

    #[test]
    fn boxed_name_clash_is_detected() {
        let err = model(
            "digraph { Open -> Closed [label=\"Close\"]; Open -> Locked [label=\"CloseWith\"]; }",
        )
        .unwrap_err();
        assert!(matches!(err, SwitchyardError::NamingCollision { .. }));
    }

    #[test]
    fn states_with_same_accessor_collide() {
        let err = model("digraph { OpenDoor; Open_Door; }").unwrap_err();
        match err {
            SwitchyardError::NamingCollision { scope, identifier } => {
                assert_eq!(scope, "DoorState accessors");
                assert_eq!(identifier, "OPEN_DOOR");
            }
            other => panic!("expected NamingCollision, got {other:?}"),
        }
    }

    #[test]
    fn handler_named_deferred_is_reserved() {
        let err = model("digraph { Deferred; }").unwrap_err();
        assert!(matches!(err, SwitchyardError::NamingCollision { ref identifier, .. } if identifier == "deferred"));
    }

    #[test]
    fn unlabeled_edge_fails() {
        let err = model("digraph { Open -> Closed }").unwrap_err();
        assert!(matches!(err, SwitchyardError::ModelDerivation { .. }));
    }

    #[test]
    fn invalid_label_fails() {
        let err = model("digraph { Open -> Closed [label=\"Close It\"] }").unwrap_err();
        assert!(matches!(err, SwitchyardError::InvalidIdentifier { .. }));
    }

    #[test]
    fn empty_graph_fails() {
        let err = model("digraph { }").unwrap_err();
        assert!(matches!(err, SwitchyardError::ModelDerivation { .. }));
    }

    #[test]
    fn model_serializes_to_json() {
        let model = model("digraph { Open -> Closed [label=\"Close\"] }").unwrap();
        let json = model.to_json().unwrap();
        assert!(json.contains("\"state_type_name\": \"DoorState\""));
        assert!(json.contains("\"method_name\": \"close\""));
    }
}
