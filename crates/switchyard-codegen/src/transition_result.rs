//! The result type returned by `do_transition` and its two payload structs.
//!
//! These declarations are created once and then only completed: missing
//! variants and fields are added, anything written by hand is left alone.

use switchyard_syntax::{
    EnumDecl, FieldDecl, FnDecl, Fragment, ImplDecl, NodeId, NodeKind, StructDecl, StructShape, SyntaxTree,
    VariantDecl,
};
use switchyard_types::{GeneratorConfig, Result, SwitchyardError};

use crate::merge::{
    self, declares_any, enum_named, field_named, fn_named, struct_named, variant_named, Placement,
};
use crate::model::StateMachineModel;
use crate::render;

/// One payload struct: its name and the fields it must carry.
struct Payload<'a> {
    name: &'a str,
    fields: Vec<(&'static str, &'a str)>,
}

fn payloads(model: &StateMachineModel) -> [Payload<'_>; 2] {
    let state = model.state_type_name.as_str();
    let trigger = model.trigger_type_name.as_str();
    [
        Payload {
            name: &model.transition_result_transition_type_name,
            fields: vec![("source", state), ("destination", state), ("trigger", trigger)],
        },
        Payload {
            name: &model.transition_result_invalid_trigger_type_name,
            fields: vec![("source", state), ("trigger", trigger)],
        },
    ]
}

/// Ensure the result enum, both payload structs and their constructors.
///
/// A missing declaration is recreated after the machine's declarations that
/// precede it in a generated file, so it lands before any code that follows.
pub fn sync_transition_results(
    tree: &mut SyntaxTree,
    container: NodeId,
    model: &StateMachineModel,
    config: &GeneratorConfig,
) -> Result<()> {
    let result = model.transition_result_type_name.as_str();
    let mut preceding = vec![
        model.state_type_name.as_str(),
        model.trigger_type_name.as_str(),
        model.extension_type_name.as_str(),
    ];
    let enum_id = merge::ensure(
        tree,
        container,
        &format!("enum {result}"),
        enum_named(result),
        || render::derives(render::enum_node(EnumDecl::new(result).with_vis("pub")), &config.result_derives),
        Placement::AfterLastOrEnd(&declares_any(&preceding)),
    )?
    .id;
    preceding.push(result);
    let variants = [
        ("Transition", model.transition_result_transition_type_name.as_str()),
        ("InvalidTrigger", model.transition_result_invalid_trigger_type_name.as_str()),
    ];
    for (variant, payload) in variants {
        let enum_id = tree.resolve(enum_id);
        merge::ensure(
            tree,
            enum_id,
            &format!("variant {result}::{variant}"),
            variant_named(variant),
            || render::variant_node(VariantDecl::tuple(variant, payload)),
            Placement::End,
        )?;
    }

    for payload in payloads(model) {
        sync_payload(tree, container, &payload, &preceding, config)?;
        preceding.push(payload.name);
    }
    tracing::debug!(result, "synchronized transition result types");
    Ok(())
}

fn sync_payload(
    tree: &mut SyntaxTree,
    container: NodeId,
    payload: &Payload<'_>,
    preceding: &[&str],
    config: &GeneratorConfig,
) -> Result<()> {
    let name = payload.name;
    let upserted = merge::ensure(
        tree,
        container,
        &format!("struct {name}"),
        struct_named(name),
        || render::derives(render::struct_node(StructDecl::named(name).with_vis("pub")), &config.result_derives),
        Placement::AfterLastOrEnd(&declares_any(preceding)),
    )?;
    let node = tree.get(upserted.id);
    if node.as_struct().map(|s| &s.shape) != Some(&StructShape::Named) {
        return Err(SwitchyardError::UnsupportedShape {
            what: node.describe(),
            reason: "transition result payloads must use named fields".into(),
        });
    }

    for &(field, ty) in &payload.fields {
        let id = tree.resolve(upserted.id);
        merge::ensure(
            tree,
            id,
            &format!("field {name}.{field}"),
            field_named(field),
            || Fragment::new(NodeKind::Field(FieldDecl::named("pub", field, ty))),
            Placement::End,
        )?;
    }

    let struct_id = tree.resolve(upserted.id);
    let impls = merge::inherent_impls(tree, container, name);
    let has_new = impls
        .iter()
        .any(|&imp| !merge::matching(tree, imp, fn_named("new")).is_empty());
    if has_new {
        return Ok(());
    }
    let declared = tree
        .children(struct_id)
        .iter()
        .filter(|&&c| tree.get(c).as_field().is_some())
        .count();
    if declared != payload.fields.len() {
        tracing::debug!(
            name,
            declared,
            "payload has extra fields, not generating a constructor"
        );
        return Ok(());
    }

    let constructor = render::fn_node(constructor(payload));
    match impls.first() {
        Some(&imp) => {
            merge::insert(tree, imp, constructor, Placement::Start)?;
        }
        None => {
            let imp = merge::insert(
                tree,
                container,
                render::impl_node(ImplDecl::inherent(name)),
                Placement::After(struct_id),
            )?;
            merge::insert(tree, imp, constructor, Placement::End)?;
        }
    }
    Ok(())
}

fn constructor(payload: &Payload<'_>) -> FnDecl {
    let mut decl = FnDecl::new("new").with_vis("pub");
    for &(field, ty) in &payload.fields {
        decl = decl.param(field, ty);
    }
    let names: Vec<&str> = payload.fields.iter().map(|(f, _)| *f).collect();
    decl.returns("Self")
        .body([format!("Self {{ {} }}", names.join(", "))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_model;
    use switchyard_syntax::{emit, parse_document, EmitOptions};

    fn run(src: &str) -> Result<String> {
        let graph = switchyard_dot::parse(r#"digraph { Open -> Closed [label="Close"]; }"#).unwrap();
        let model = build_model("Door", &graph, None).unwrap();
        let mut tree = parse_document(src).unwrap();
        let root = tree.root();
        sync_transition_results(&mut tree, root, &model, &GeneratorConfig::default())?;
        Ok(emit(&tree, &EmitOptions::default()))
    }

    #[test]
    fn creates_result_enum_and_payloads() {
        let text = run("").unwrap();
        assert!(text.contains(
            "#[derive(Debug, Clone, PartialEq, Eq)]\npub enum DoorTransitionResult {\n    Transition(DoorTransition),\n    InvalidTrigger(DoorInvalidTrigger),\n}\n"
        ), "{text}");
        assert!(text.contains(
            "pub struct DoorTransition {\n    pub source: DoorState,\n    pub destination: DoorState,\n    pub trigger: DoorTrigger,\n}\n\nimpl DoorTransition {\n"
        ));
        assert!(text.contains(
            "    pub fn new(source: DoorState, trigger: DoorTrigger) -> Self {\n        Self { source, trigger }\n    }\n"
        ));
        assert_eq!(run(&text).unwrap(), text);
    }

    #[test]
    fn missing_fields_and_variants_are_completed() {
        let src = "pub enum DoorTransitionResult {\n    Transition(DoorTransition),\n}\n\npub struct DoorInvalidTrigger {\n    pub source: DoorState,\n}\n";
        let text = run(src).unwrap();
        assert!(text.contains("    Transition(DoorTransition),\n    InvalidTrigger(DoorInvalidTrigger),\n"));
        assert!(text.contains("pub struct DoorInvalidTrigger {\n    pub source: DoorState,\n    pub trigger: DoorTrigger,\n}"));
        assert!(!text.contains("#[derive(Debug, Clone, PartialEq, Eq)]\npub enum"));
    }

    #[test]
    fn existing_constructor_is_respected() {
        let src = "pub struct DoorTransition {\n    pub source: DoorState,\n    pub destination: DoorState,\n    pub trigger: DoorTrigger,\n}\n\nimpl DoorTransition {\n    pub fn new(source: DoorState, destination: DoorState, trigger: DoorTrigger) -> Self {\n        tracing::debug!(\"transition\");\n        Self { source, destination, trigger }\n    }\n}\n";
        let text = run(src).unwrap();
        assert!(text.starts_with(src));
        assert_eq!(text.matches("impl DoorTransition {").count(), 1);
    }

    #[test]
    fn extra_fields_suppress_the_constructor() {
        let src = "pub struct DoorInvalidTrigger {\n    pub source: DoorState,\n    pub trigger: DoorTrigger,\n    pub at: u64,\n}\n";
        let text = run(src).unwrap();
        assert!(!text.contains("impl DoorInvalidTrigger"));
    }

    #[test]
    fn tuple_payload_is_unsupported() {
        let err = run("pub struct DoorTransition(u8);\n").unwrap_err();
        assert!(matches!(err, SwitchyardError::UnsupportedShape { .. }));
    }
}
