//! The extension trait with the two-level `apply` / `do_transition` dispatch.

use switchyard_syntax::{FnDecl, Fragment, ImplDecl, NodeId, NodeKind, SyntaxTree, TraitDecl};
use switchyard_types::{GeneratorConfig, Result};

use crate::merge::{self, declares_any, fn_named, trait_impl_of, trait_named, Placement};
use crate::model::{StateMachineModel, VertexClass};
use crate::naming;
use crate::render::{self, Code};

/// Unmatched triggers fall through to `_`, which is unreachable when a state
/// handles every trigger; states without transitions match on `_` alone.
const DISPATCH_ALLOW: &str = "#[allow(unreachable_patterns, clippy::match_single_binding)]";

fn apply_signature(model: &StateMachineModel) -> FnDecl {
    FnDecl::new("apply")
        .receiver("self")
        .param("trigger", &model.trigger_type_name)
        .returns(&model.state_type_name)
}

fn do_transition_signature(model: &StateMachineModel) -> FnDecl {
    FnDecl::new("do_transition")
        .receiver("self")
        .param("trigger", &model.trigger_type_name)
        .returns(&model.transition_result_type_name)
}

fn state_arm(model: &StateMachineModel, vertex: &VertexClass, binding: &str) -> String {
    format!(
        "{}::{}({binding}) => match trigger {{",
        model.state_type_name,
        naming::variant(&vertex.state_name)
    )
}

/// `apply`: matched triggers move to the destination, anything else leaves
/// the state as it was.
fn apply_body(model: &StateMachineModel, config: &GeneratorConfig) -> Vec<String> {
    let state = &model.state_type_name;
    let mut code = Code::new(config);
    code.open("match self {");
    for vertex in &model.vertex_classes {
        code.open(state_arm(model, vertex, "state"));
        for t in &vertex.transitions {
            code.line(format!(
                "{}::{}(trigger) => {state}::{}(state.{}(trigger)),",
                model.trigger_type_name,
                naming::variant(&t.trigger),
                naming::variant(&t.target_state),
                t.boxed_method_name
            ));
        }
        code.line(format!(
            "_ => {state}::{}(state),",
            naming::variant(&vertex.state_name)
        ));
        code.close("},");
    }
    code.close("}");
    code.finish()
}

/// `do_transition`: like `apply`, but reports what happened, including
/// triggers the current state does not accept.
fn do_transition_body(model: &StateMachineModel, config: &GeneratorConfig) -> Vec<String> {
    let state = &model.state_type_name;
    let result = &model.transition_result_type_name;
    let invalid = format!(
        "_ => {result}::InvalidTrigger({}::new(source, fired)),",
        model.transition_result_invalid_trigger_type_name
    );
    let mut code = Code::new(config);
    code.line("let source = self.clone();");
    code.line("let fired = trigger.clone();");
    code.open("match self {");
    for vertex in &model.vertex_classes {
        let binding = if vertex.transitions.is_empty() { "_" } else { "state" };
        code.open(state_arm(model, vertex, binding));
        for t in &vertex.transitions {
            code.line(format!(
                "{}::{}(case) => {result}::Transition({}::new(source, {state}::{}(state.{}(case)), fired)),",
                model.trigger_type_name,
                naming::variant(&t.trigger),
                model.transition_result_transition_type_name,
                naming::variant(&t.target_state),
                t.boxed_method_name
            ));
        }
        code.line(&invalid);
        code.close("},");
    }
    code.close("}");
    code.finish()
}

/// Upsert the extension trait and its impl for the state union. Returns the impl.
pub fn sync_dispatch(
    tree: &mut SyntaxTree,
    container: NodeId,
    model: &StateMachineModel,
    config: &GeneratorConfig,
) -> Result<NodeId> {
    let extension = model.extension_type_name.as_str();
    let state = model.state_type_name.as_str();
    let owned = [state, model.trigger_type_name.as_str(), extension];

    let declaration = merge::ensure(
        tree,
        container,
        &format!("trait {extension}"),
        trait_named(extension),
        || Fragment::new(NodeKind::Trait(TraitDecl::new(extension).with_vis("pub"))),
        Placement::AfterLastOrEnd(&declares_any(&owned[..2])),
    )?;
    for signature in [apply_signature(model), do_transition_signature(model)] {
        let name = signature.name.clone();
        merge::upsert_generated(
            tree,
            declaration.id,
            &format!("fn {name}"),
            fn_named(&name),
            render::fn_node(signature.signature_only()),
            Placement::End,
        )?;
    }

    let imp = merge::ensure(
        tree,
        container,
        &format!("impl {extension} for {state}"),
        trait_impl_of(extension, state),
        || render::impl_node(ImplDecl::of_trait(extension, state)),
        Placement::AfterLastOrEnd(&declares_any(&owned)),
    )?;
    let bodies = [
        apply_signature(model).body(apply_body(model, config)),
        do_transition_signature(model).body(do_transition_body(model, config)),
    ];
    for decl in bodies {
        let name = decl.name.clone();
        merge::upsert_generated(
            tree,
            imp.id,
            &format!("fn {name}"),
            fn_named(&name),
            render::fn_node(decl).with_attr(DISPATCH_ALLOW),
            Placement::End,
        )?;
    }
    tracing::debug!(
        extension,
        arms = model.vertex_classes.len(),
        created = imp.created,
        "synchronized dispatch"
    );
    Ok(tree.resolve(imp.id))
}
