//! Per-vertex transition methods on the state case structs.
//!
//! Each transition gets a flattened method taking the trigger fields one by
//! one, and a boxed `_with` method taking the trigger case struct. The
//! flattened method is created once with a placeholder body and then belongs
//! to the user: later runs only bring its parameter list in line with the
//! trigger fields. The boxed method is pure delegation and is rebuilt every
//! time.

use std::collections::HashSet;

use switchyard_syntax::{FnDecl, Fragment, Node, NodeId, NodeKind, Param, SyntaxTree};
use switchyard_types::{Result, SwitchyardError};

use crate::merge::{self, fn_named, struct_named, Placement};
use crate::model::{StateMachineModel, TransitionMethod, VertexClass};
use crate::render;
use crate::union::{self, UnionParts};

const ENDREGION: &str = "// endregion";

fn region_marker(t: &TransitionMethod) -> String {
    format!(
        "// region: {} -> {} [label=\"{}\"]",
        t.source_state, t.target_state, t.trigger
    )
}

fn is_inherent_impl(n: &Node) -> bool {
    n.as_impl().is_some_and(|i| i.trait_ref.is_none())
}

/// A `_with` method taking one trigger case struct of `trigger_module`.
fn is_boxed_transition(n: &Node, trigger_module: &str) -> bool {
    let Some(f) = n.as_fn() else {
        return false;
    };
    let prefix = format!("{trigger_module}::");
    f.name.ends_with("_with")
        && f.has_receiver()
        && f.value_params().len() == 1
        && f.value_params()[0]
            .ty
            .as_deref()
            .is_some_and(|ty| ty.starts_with(&prefix))
}

/// Bring every vertex's case struct impl in line with its transitions.
pub fn sync_transitions(
    tree: &mut SyntaxTree,
    model: &StateMachineModel,
    states: &UnionParts,
    triggers: &UnionParts,
) -> Result<()> {
    let state_module = tree.resolve(states.module);
    let trigger_module = tree.resolve(triggers.module);
    for vertex in &model.vertex_classes {
        sync_vertex(tree, model, state_module, trigger_module, vertex)?;
    }
    Ok(())
}

fn sync_vertex(
    tree: &mut SyntaxTree,
    model: &StateMachineModel,
    state_module: NodeId,
    trigger_module: NodeId,
    vertex: &VertexClass,
) -> Result<()> {
    let self_ty = vertex.case_type_name.as_str();

    // Stale boxed methods go first, from every inherent impl of the case.
    let wanted: HashSet<&str> = vertex
        .transitions
        .iter()
        .map(|t| t.boxed_method_name.as_str())
        .collect();
    for imp in merge::inherent_impls(tree, state_module, self_ty) {
        let removed = merge::remove_where(tree, imp, |n| {
            is_boxed_transition(n, &model.trigger_module)
                && n.name().is_some_and(|name| !wanted.contains(name))
        })?;
        if removed > 0 {
            tracing::debug!(state = %vertex.state_name, removed, "removed stale transition methods");
        }
    }

    if vertex.transitions.is_empty() {
        return Ok(());
    }

    let markers: Vec<&str> = vertex
        .transitions
        .iter()
        .flat_map(|t| [t.method_name.as_str(), t.boxed_method_name.as_str()])
        .collect();
    let imp = match merge::find_impl_declaring(tree, state_module, self_ty, &markers)? {
        Some(id) => id,
        None => match merge::inherent_impls(tree, state_module, self_ty).first() {
            Some(&id) => id,
            None => merge::insert(
                tree,
                state_module,
                render::impl_node(switchyard_syntax::ImplDecl::inherent(self_ty)),
                Placement::AfterLastOrEnd(&is_inherent_impl),
            )?,
        },
    };

    for transition in &vertex.transitions {
        sync_transition(tree, imp, trigger_module, transition)?;
    }
    tracing::debug!(
        state = %vertex.state_name,
        transitions = vertex.transitions.len(),
        "synchronized transition methods"
    );
    Ok(())
}

fn sync_transition(
    tree: &mut SyntaxTree,
    imp: NodeId,
    trigger_module: NodeId,
    t: &TransitionMethod,
) -> Result<()> {
    let trigger_struct = merge::require(
        tree,
        trigger_module,
        &format!("struct {}", t.nested_parameter_type_name),
        struct_named(&t.nested_parameter_type_name),
    )?;
    let fields = union::named_fields(tree, trigger_struct)?;
    let value_params: Vec<Param> = fields
        .iter()
        .map(|(name, ty)| Param {
            pattern: name.clone(),
            ty: Some(ty.clone()),
        })
        .collect();

    let flattened = merge::find_unique(tree, imp, &format!("fn {}", t.method_name), fn_named(&t.method_name))?;
    let boxed = merge::find_unique(
        tree,
        imp,
        &format!("fn {}", t.boxed_method_name),
        fn_named(&t.boxed_method_name),
    )?;

    let (flattened, created) = match flattened {
        Some(id) => {
            let id = tree.update(id, |n| {
                if let NodeKind::Fn(f) = &mut n.kind {
                    let receiver = f.params.first().filter(|p| p.is_receiver()).cloned();
                    f.params = receiver.into_iter().chain(value_params).collect();
                }
            })?;
            (id, false)
        }
        None => {
            let mut decl = FnDecl::new(&t.method_name).with_vis("pub").receiver("self");
            decl.params.extend(value_params);
            let fragment = render::fn_node(
                decl.returns(&t.return_type_name)
                    .body([format!("{}::default()", t.return_type_name)]),
            )
            .with_comment(region_marker(t));
            let placement = match boxed {
                Some(b) => Placement::Before(b),
                None => Placement::End,
            };
            tracing::debug!(method = %t.method_name, source = %t.source_state, "created transition placeholder");
            (merge::insert(tree, imp, fragment, placement)?, true)
        }
    };

    let boxed_fragment = boxed_method(tree.get(flattened), t, &fields)?;
    match boxed {
        Some(id) => {
            let id = merge::regenerate(tree, id, boxed_fragment)?;
            if created && !tree.get(id).decor.trailing.iter().any(|c| c == ENDREGION) {
                tree.update(id, |n| n.decor.trailing.push(ENDREGION.to_string()))?;
            }
        }
        None => {
            let fragment = if created {
                boxed_fragment.with_trailing(ENDREGION)
            } else {
                boxed_fragment
            };
            merge::insert(tree, imp, fragment, Placement::After(flattened))?;
        }
    }
    Ok(())
}

/// The `_with` method delegating to the flattened one as it now stands.
fn boxed_method(flattened: &Node, t: &TransitionMethod, fields: &[(String, String)]) -> Result<Fragment> {
    let f = flattened.as_fn().ok_or_else(|| SwitchyardError::MissingDeclaration {
        what: format!("fn {}", t.method_name),
    })?;
    let receiver = f
        .params
        .first()
        .filter(|p| p.is_receiver())
        .map(|p| p.pattern.clone());
    let param = if fields.is_empty() { "_trigger" } else { "trigger" };
    let args: Vec<String> = fields.iter().map(|(name, _)| format!("trigger.{name}")).collect();
    let call = match &receiver {
        Some(_) => format!("self.{}({})", t.method_name, args.join(", ")),
        None => format!("Self::{}({})", t.method_name, args.join(", ")),
    };
    let ret = f.ret.clone().unwrap_or_else(|| t.return_type_name.clone());
    Ok(render::fn_node(
        FnDecl::new(&t.boxed_method_name)
            .with_vis("pub")
            .receiver(receiver.unwrap_or_else(|| "self".to_string()))
            .param(param, &t.full_parameter_type_name)
            .returns(ret)
            .body([call]),
    ))
}
