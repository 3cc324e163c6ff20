use serde::Serialize;

use crate::naming::TypeNames;

/// Everything the generator needs to know about one state machine, derived
/// from a graph and rebuilt on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateMachineModel {
    pub base_name: String,
    /// Graph file the model came from, when known.
    pub graph_file: Option<String>,
    pub state_type_name: String,
    pub trigger_type_name: String,
    pub extension_type_name: String,
    pub transition_result_type_name: String,
    pub transition_result_transition_type_name: String,
    pub transition_result_invalid_trigger_type_name: String,
    pub state_module: String,
    pub trigger_module: String,
    /// One entry per vertex, in graph order.
    pub vertex_classes: Vec<VertexClass>,
    /// Distinct trigger labels, in first-occurrence order.
    pub triggers: Vec<TriggerCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VertexClass {
    pub vertex_id: String,
    /// Case name: the vertex `label` attribute, or the vertex id.
    pub state_name: String,
    /// Case struct inside the state module, e.g. `Open_`.
    pub case_type_name: String,
    /// Case struct with its module, e.g. `door_state::Open_`.
    pub qualified_case_type_name: String,
    pub transitions: Vec<TransitionMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionMethod {
    pub source_state: String,
    pub target_state: String,
    /// The edge label.
    pub trigger: String,
    pub method_name: String,
    pub boxed_method_name: String,
    /// Destination case struct, e.g. `Closed_`.
    pub return_type_name: String,
    /// Trigger case struct with its module, e.g. `door_trigger::Close_`.
    pub full_parameter_type_name: String,
    /// Trigger case struct, e.g. `Close_`.
    pub nested_parameter_type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerCase {
    pub name: String,
    pub case_type_name: String,
    pub qualified_case_type_name: String,
}

impl StateMachineModel {
    pub(crate) fn new(names: TypeNames, graph_file: Option<String>) -> Self {
        Self {
            base_name: names.base_name,
            graph_file,
            state_type_name: names.state_type,
            trigger_type_name: names.trigger_type,
            extension_type_name: names.extension_type,
            transition_result_type_name: names.transition_result_type,
            transition_result_transition_type_name: names.transition_type,
            transition_result_invalid_trigger_type_name: names.invalid_trigger_type,
            state_module: names.state_module,
            trigger_module: names.trigger_module,
            vertex_classes: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// State case names in vertex order.
    pub fn state_cases(&self) -> Vec<String> {
        self.vertex_classes.iter().map(|v| v.state_name.clone()).collect()
    }

    /// Trigger case names in first-occurrence order.
    pub fn trigger_cases(&self) -> Vec<String> {
        self.triggers.iter().map(|t| t.name.clone()).collect()
    }

    pub fn vertex(&self, state_name: &str) -> Option<&VertexClass> {
        self.vertex_classes.iter().find(|v| v.state_name == state_name)
    }

    pub fn transition_count(&self) -> usize {
        self.vertex_classes.iter().map(|v| v.transitions.len()).sum()
    }

    /// Pretty JSON for inspection.
    pub fn to_json(&self) -> switchyard_types::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
