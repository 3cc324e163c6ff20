//! Identity-keyed merge primitives.
//!
//! Generated declarations are never written from scratch. Each one is looked
//! up in its container by an identity predicate: zero matches inserts a new
//! node, one match is updated in place, and more than one match fails with
//! [`SwitchyardError::MergeAmbiguity`] instead of guessing.

use switchyard_syntax::{Decor, Fragment, Node, NodeId, NodeKind, SyntaxTree};
use switchyard_types::{Result, SwitchyardError};

/// Where a newly built declaration goes inside its container.
#[derive(Clone, Copy)]
pub enum Placement<'a> {
    /// After the last child matching the predicate, or first.
    AfterLastOrStart(&'a dyn Fn(&Node) -> bool),
    /// After the last child matching the predicate, or last.
    AfterLastOrEnd(&'a dyn Fn(&Node) -> bool),
    After(NodeId),
    Before(NodeId),
    Start,
    End,
}

/// Outcome of [`upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub id: NodeId,
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Identity predicates
// ---------------------------------------------------------------------------

pub fn enum_named(name: &str) -> impl Fn(&Node) -> bool + '_ {
    move |n| n.as_enum().is_some_and(|e| e.name == name)
}

/// Inline modules only; `mod name;` declarations cannot be merged into.
pub fn module_named(name: &str) -> impl Fn(&Node) -> bool + '_ {
    move |n| n.as_module().is_some_and(|m| m.inline && m.name == name)
}

pub fn struct_named(name: &str) -> impl Fn(&Node) -> bool + '_ {
    move |n| n.as_struct().is_some_and(|s| s.name == name)
}

pub fn fn_named(name: &str) -> impl Fn(&Node) -> bool + '_ {
    move |n| n.as_fn().is_some_and(|f| f.name == name)
}

pub fn variant_named(name: &str) -> impl Fn(&Node) -> bool + '_ {
    move |n| n.as_variant().is_some_and(|v| v.name == name)
}

pub fn field_named(name: &str) -> impl Fn(&Node) -> bool + '_ {
    move |n| n.as_field().is_some_and(|f| f.name.as_deref() == Some(name))
}

pub fn trait_named(name: &str) -> impl Fn(&Node) -> bool + '_ {
    move |n| n.as_trait().is_some_and(|t| t.name == name)
}

/// `impl <trait_name> for <self_ty>`, matching the trait by its last path segment.
pub fn trait_impl_of<'a>(trait_name: &'a str, self_ty: &'a str) -> impl Fn(&Node) -> bool + 'a {
    move |n| {
        n.as_impl()
            .is_some_and(|i| i.self_ty == self_ty && i.trait_name() == Some(trait_name))
    }
}

// ---------------------------------------------------------------------------
// Lookup and insertion
// ---------------------------------------------------------------------------

/// One of `types`, a trait of that name, or any impl for one of them.
pub fn declares_any<'a>(types: &'a [&'a str]) -> impl Fn(&Node) -> bool + 'a {
    move |n| match &n.kind {
        NodeKind::Impl(i) => types.contains(&i.self_ty.as_str()),
        NodeKind::Enum(_) | NodeKind::Struct(_) | NodeKind::Trait(_) => {
            n.name().is_some_and(|name| types.contains(&name))
        }
        _ => false,
    }
}

/// Children of `container` that match `identity`.
pub fn matching(tree: &SyntaxTree, container: NodeId, identity: impl Fn(&Node) -> bool) -> Vec<NodeId> {
    tree.find_children(container, identity)
}

/// The single child matching `identity`, if any.
pub fn find_unique(
    tree: &SyntaxTree,
    container: NodeId,
    what: &str,
    identity: impl Fn(&Node) -> bool,
) -> Result<Option<NodeId>> {
    let found = matching(tree, container, identity);
    match found.len() {
        0 => Ok(None),
        1 => Ok(Some(found[0])),
        count => Err(SwitchyardError::MergeAmbiguity {
            container: tree.get(container).describe(),
            what: what.to_string(),
            count,
        }),
    }
}

/// Like [`find_unique`], but absence is an error.
pub fn require(
    tree: &SyntaxTree,
    container: NodeId,
    what: &str,
    identity: impl Fn(&Node) -> bool,
) -> Result<NodeId> {
    find_unique(tree, container, what, identity)?.ok_or_else(|| SwitchyardError::MissingDeclaration {
        what: format!("{} in {}", what, tree.get(container).describe()),
    })
}

fn position(tree: &SyntaxTree, container: NodeId, placement: Placement<'_>) -> Result<usize> {
    let children = tree.children(container);
    let after_last = |pred: &dyn Fn(&Node) -> bool| {
        children
            .iter()
            .rposition(|&c| pred(tree.get(c)))
            .map(|i| i + 1)
    };
    let sibling = |id: NodeId| {
        tree.index_of(container, id)
            .ok_or_else(|| SwitchyardError::MissingDeclaration {
                what: format!("{} in {}", tree.get(id).describe(), tree.get(container).describe()),
            })
    };
    Ok(match placement {
        Placement::AfterLastOrStart(pred) => after_last(pred).unwrap_or(0),
        Placement::AfterLastOrEnd(pred) => after_last(pred).unwrap_or(children.len()),
        Placement::After(id) => sibling(id)? + 1,
        Placement::Before(id) => sibling(id)?,
        Placement::Start => 0,
        Placement::End => children.len(),
    })
}

/// Graft `fragment` into `container`.
pub fn insert(
    tree: &mut SyntaxTree,
    container: NodeId,
    fragment: Fragment,
    placement: Placement<'_>,
) -> Result<NodeId> {
    let index = position(tree, container, placement)?;
    let what = Node {
        kind: fragment.kind.clone(),
        decor: Decor::default(),
        children: Vec::new(),
        kept: None,
    }
    .describe();
    let id = tree.insert_child(container, index, fragment)?;
    tracing::debug!(container = %tree.get(container).describe(), %what, index, "inserted declaration");
    Ok(id)
}

/// Insert-if-absent, else update the unique match.
pub fn upsert(
    tree: &mut SyntaxTree,
    container: NodeId,
    what: &str,
    identity: impl Fn(&Node) -> bool,
    build: impl FnOnce() -> Fragment,
    update: impl FnOnce(&mut SyntaxTree, NodeId) -> Result<NodeId>,
    placement: Placement<'_>,
) -> Result<Upserted> {
    match find_unique(tree, container, what, identity)? {
        Some(existing) => {
            let id = update(tree, existing)?;
            Ok(Upserted { id, created: false })
        }
        None => {
            let id = insert(tree, container, build(), placement)?;
            Ok(Upserted { id, created: true })
        }
    }
}

/// Upsert where the update regenerates the match from the same fragment.
pub fn upsert_generated(
    tree: &mut SyntaxTree,
    container: NodeId,
    what: &str,
    identity: impl Fn(&Node) -> bool,
    fragment: Fragment,
    placement: Placement<'_>,
) -> Result<Upserted> {
    let built = fragment.clone();
    upsert(
        tree,
        container,
        what,
        identity,
        move || built,
        move |tree, id| regenerate(tree, id, fragment),
        placement,
    )
}

/// Insert `fragment` only when nothing matches `identity`.
pub fn ensure(
    tree: &mut SyntaxTree,
    container: NodeId,
    what: &str,
    identity: impl Fn(&Node) -> bool,
    build: impl FnOnce() -> Fragment,
    placement: Placement<'_>,
) -> Result<Upserted> {
    upsert(tree, container, what, identity, build, |tree, id| Ok(tree.resolve(id)), placement)
}

/// Replace a generator-owned node with a fresh rendering.
///
/// Comments written around the old node stay. Generated attributes replace
/// the old ones; when the fragment has none, the old attributes stay.
pub fn regenerate(tree: &mut SyntaxTree, id: NodeId, mut fragment: Fragment) -> Result<NodeId> {
    let old = tree.get(id).decor.clone();
    fragment.decor.comments = old.comments;
    fragment.decor.trailing = old.trailing;
    if fragment.decor.attrs.is_empty() {
        fragment.decor.attrs = old.attrs;
    }
    if tree.fragment(id) == fragment {
        tracing::debug!(what = %tree.get(id).describe(), "declaration already up to date");
        return Ok(tree.resolve(id));
    }
    tracing::debug!(what = %tree.get(id).describe(), "regenerated declaration");
    tree.replace(id, fragment)
}

/// Swap the children of `id` for freshly built ones, keeping the node itself.
pub fn replace_children(tree: &mut SyntaxTree, id: NodeId, children: Vec<Fragment>) -> Result<NodeId> {
    let current = tree.fragment(id);
    if current.children == children {
        return Ok(tree.resolve(id));
    }
    tracing::debug!(what = %tree.get(id).describe(), members = children.len(), "rewrote members");
    tree.replace(
        id,
        Fragment {
            children,
            ..current
        },
    )
}

/// Inherent impls of `self_ty` directly inside `container`.
pub fn inherent_impls(tree: &SyntaxTree, container: NodeId, self_ty: &str) -> Vec<NodeId> {
    matching(tree, container, |n| {
        n.as_impl()
            .is_some_and(|i| i.trait_ref.is_none() && i.self_ty == self_ty)
    })
}

/// The inherent impl of `self_ty` that declares one of the `markers` fns.
pub fn find_impl_declaring(
    tree: &SyntaxTree,
    container: NodeId,
    self_ty: &str,
    markers: &[&str],
) -> Result<Option<NodeId>> {
    let hits: Vec<NodeId> = inherent_impls(tree, container, self_ty)
        .into_iter()
        .filter(|&imp| {
            tree.children(imp).iter().any(|&c| {
                tree.get(c)
                    .as_fn()
                    .is_some_and(|f| markers.contains(&f.name.as_str()))
            })
        })
        .collect();
    match hits.len() {
        0 => Ok(None),
        1 => Ok(Some(hits[0])),
        count => Err(SwitchyardError::MergeAmbiguity {
            container: tree.get(container).describe(),
            what: format!("impl {} declaring {}", self_ty, markers.join(" or ")),
            count,
        }),
    }
}

/// Remove every child of `container` matching `pred`. Comments trailing a
/// removed node move to its previous sibling so region markers stay balanced.
pub fn remove_where(tree: &mut SyntaxTree, container: NodeId, pred: impl Fn(&Node) -> bool) -> Result<usize> {
    let doomed = matching(tree, container, pred);
    for &id in &doomed {
        let trailing = tree.get(id).decor.trailing.clone();
        let index = tree.index_of(container, id).unwrap_or(0);
        let what = tree.get(id).describe();
        tree.remove_child(container, id)?;
        tracing::debug!(container = %tree.get(container).describe(), %what, "removed stale declaration");
        if trailing.is_empty() {
            continue;
        }
        let children = tree.children(container);
        if let Some(&prev) = index.checked_sub(1).and_then(|i| children.get(i)) {
            tree.update(prev, |n| n.decor.trailing.extend(trailing))?;
        } else if let Some(&next) = children.get(index) {
            tree.update(next, |n| {
                let mut comments = trailing;
                comments.append(&mut n.decor.comments);
                n.decor.comments = comments;
            })?;
        }
    }
    Ok(doomed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_syntax::{emit, parse_document, EmitOptions, FnDecl, NodeKind};

    fn new_fn(name: &str, body: &str) -> Fragment {
        Fragment::new(NodeKind::Fn(FnDecl::new(name).body([body])))
    }

    fn text(tree: &SyntaxTree) -> String {
        emit(tree, &EmitOptions::default())
    }

    #[test]
    fn upsert_inserts_after_last_match() {
        let mut tree = parse_document("use a::b;\n\nfn one() {}\n\nstruct S;\n").unwrap();
        let root = tree.root();
        let result = upsert_generated(
            &mut tree,
            root,
            "fn two",
            fn_named("two"),
            new_fn("two", "2"),
            Placement::AfterLastOrEnd(&fn_named("one")),
        )
        .unwrap();
        assert!(result.created);
        assert_eq!(
            text(&tree),
            "use a::b;\n\nfn one() {}\n\nfn two() {\n    2\n}\n\nstruct S;\n"
        );
    }

    #[test]
    fn declares_any_covers_types_traits_and_impls() {
        let tree = parse_document(
            "struct A;\n\nimpl Clone for A {}\n\ntrait T {}\n\nimpl B {}\n\nfn A() {}\n\nenum C {}\n",
        )
        .unwrap();
        let names = ["A", "T"];
        let owned = declares_any(&names);
        let hits: Vec<bool> = tree.children(tree.root()).iter().map(|&c| owned(tree.get(c))).collect();
        assert_eq!(hits, vec![true, true, true, false, false, false]);
    }

    #[test]
    fn upsert_updates_the_unique_match() {
        let mut tree = parse_document("// keep me\nfn one() { 1 }\n").unwrap();
        let root = tree.root();
        let result = upsert_generated(
            &mut tree,
            root,
            "fn one",
            fn_named("one"),
            new_fn("one", "11"),
            Placement::End,
        )
        .unwrap();
        assert!(!result.created);
        assert_eq!(text(&tree), "// keep me\nfn one() {\n    11\n}\n");
    }

    #[test]
    fn ambiguous_identity_fails() {
        let mut tree = parse_document("fn one() {}\nfn one() {}\n").unwrap();
        let root = tree.root();
        let err = upsert_generated(&mut tree, root, "fn one", fn_named("one"), new_fn("one", "1"), Placement::End)
            .unwrap_err();
        match err {
            SwitchyardError::MergeAmbiguity { container, count, .. } => {
                assert_eq!(container, "file");
                assert_eq!(count, 2);
            }
            other => panic!("expected MergeAmbiguity, got {other:?}"),
        }
    }

    #[test]
    fn require_reports_missing() {
        let tree = parse_document("fn one() {}\n").unwrap();
        let err = require(&tree, tree.root(), "fn two", fn_named("two")).unwrap_err();
        assert!(matches!(err, SwitchyardError::MissingDeclaration { .. }));
        assert!(find_unique(&tree, tree.root(), "fn two", fn_named("two")).unwrap().is_none());
    }

    #[test]
    fn placement_relative_to_sibling() {
        let mut tree = parse_document("fn a() {}\n\nfn c() {}\n").unwrap();
        let root = tree.root();
        let c = require(&tree, root, "fn c", fn_named("c")).unwrap();
        insert(&mut tree, root, new_fn("b", "2"), Placement::Before(c)).unwrap();
        insert(&mut tree, root, new_fn("d", "4"), Placement::After(c)).unwrap();
        insert(&mut tree, root, new_fn("z", "0"), Placement::Start).unwrap();
        let names: Vec<_> = tree
            .children(tree.root())
            .iter()
            .filter_map(|&c| tree.get(c).name().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["z", "a", "b", "c", "d"]);
    }

    #[test]
    fn regenerate_keeps_comments_and_unchanged_nodes() {
        let mut tree = parse_document("// lead\n#[inline]\nfn one() {\n    1\n}\n// trail\n").unwrap();
        let id = tree.children(tree.root())[0];
        let before = tree.arena_len();
        let same = regenerate(&mut tree, id, new_fn("one", "1")).unwrap();
        assert_eq!(tree.arena_len(), before);
        assert_eq!(same, tree.resolve(id));
        assert_eq!(text(&tree), "// lead\n#[inline]\nfn one() {\n    1\n}\n// trail\n");
    }

    #[test]
    fn remove_hands_trailing_comments_back() {
        let mut tree = parse_document("fn a() {}\n\nfn b() {}\n// endregion\n\nfn c() {}\n").unwrap();
        let root = tree.root();
        let removed = remove_where(&mut tree, root, fn_named("b")).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(text(&tree), "fn a() {}\n// endregion\n\nfn c() {}\n");
    }

    #[test]
    fn snapshots_survive_merges() {
        let mut tree = parse_document("fn a() {}\n").unwrap();
        let snapshot = tree.clone();
        let root = tree.root();
        insert(&mut tree, root, new_fn("b", "2"), Placement::End).unwrap();
        assert_eq!(text(&snapshot), "fn a() {}\n");
        assert_ne!(text(&tree), text(&snapshot));
    }
}
