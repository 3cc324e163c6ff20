//! `with_<field>` builder helpers for plain structs.

use std::collections::HashSet;

use switchyard_syntax::{FnDecl, ImplDecl, Node, NodeId, StructShape, SyntaxTree};
use switchyard_types::{Result, SwitchyardError};

use crate::merge::{self, fn_named, struct_named, Placement};
use crate::naming;
use crate::render;

const PREFIX: &str = "with_";

/// `fn with_x(self, ..) -> Self`.
fn is_with_helper(n: &Node) -> bool {
    n.as_fn().is_some_and(|f| {
        f.name.starts_with(PREFIX) && f.has_receiver() && f.ret.as_deref() == Some("Self")
    })
}

fn helper(field: &str, ty: &str) -> FnDecl {
    FnDecl::new(format!("{PREFIX}{}", naming::unescape(field)))
        .with_vis("pub")
        .receiver("self")
        .param(field, ty)
        .returns("Self")
        .body([format!("Self {{ {field}, ..self }}")])
}

fn find_struct(tree: &SyntaxTree, name: &str) -> Result<NodeId> {
    let hits = tree.find_descendants(tree.root(), struct_named(name));
    match hits.as_slice() {
        [] => Err(SwitchyardError::MissingDeclaration {
            what: format!("struct {name}"),
        }),
        [id] => Ok(*id),
        _ => Err(SwitchyardError::MergeAmbiguity {
            container: tree.get(tree.root()).describe(),
            what: format!("struct {name}"),
            count: hits.len(),
        }),
    }
}

/// Give `struct_name` one `with_` helper per named field, dropping helpers
/// for fields that no longer exist.
pub fn generate_with_helpers(tree: &SyntaxTree, struct_name: &str) -> Result<SyntaxTree> {
    let mut tree = tree.clone();
    let struct_id = find_struct(&tree, struct_name)?;
    let node = tree.get(struct_id);
    let Some(decl) = node.as_struct() else {
        return Err(SwitchyardError::MissingDeclaration {
            what: format!("struct {struct_name}"),
        });
    };
    if decl.shape != StructShape::Named {
        return Err(SwitchyardError::UnsupportedShape {
            what: node.describe(),
            reason: "with-helpers need named fields".into(),
        });
    }
    if !decl.generics.is_empty() {
        return Err(SwitchyardError::UnsupportedShape {
            what: node.describe(),
            reason: "generic structs are not supported".into(),
        });
    }
    let fields: Vec<(String, String)> = tree
        .children(struct_id)
        .iter()
        .filter_map(|&c| tree.get(c).as_field())
        .filter_map(|f| f.name.clone().map(|n| (n, f.ty.clone())))
        .collect();
    let container = tree
        .parent(struct_id)
        .ok_or_else(|| SwitchyardError::MissingDeclaration {
            what: format!("container of struct {struct_name}"),
        })?;

    let impls = merge::inherent_impls(&tree, container, struct_name);
    let with_impl = impls
        .iter()
        .copied()
        .find(|&imp| !merge::matching(&tree, imp, is_with_helper).is_empty());
    let imp = match with_impl.or_else(|| impls.first().copied()) {
        Some(imp) => imp,
        None => {
            if fields.is_empty() {
                return Ok(tree);
            }
            merge::insert(
                &mut tree,
                container,
                render::impl_node(ImplDecl::inherent(struct_name)),
                Placement::After(struct_id),
            )?
        }
    };

    let wanted: HashSet<String> = fields
        .iter()
        .map(|(name, _)| format!("{PREFIX}{}", naming::unescape(name)))
        .collect();
    let removed = merge::remove_where(&mut tree, imp, |n| {
        is_with_helper(n) && n.name().is_some_and(|name| !wanted.contains(name))
    })?;

    for (field, ty) in &fields {
        let decl = helper(field, ty);
        let name = decl.name.clone();
        let imp = tree.resolve(imp);
        merge::upsert_generated(
            &mut tree,
            imp,
            &format!("fn {name}"),
            fn_named(&name),
            render::fn_node(decl),
            Placement::AfterLastOrEnd(&is_with_helper),
        )?;
    }
    tracing::info!(
        name = struct_name,
        helpers = fields.len(),
        removed,
        "generated with-helpers"
    );
    Ok(tree)
}
