//! Persistent syntax tree.
//!
//! Nodes live in an append-only arena and are never mutated once allocated.
//! An edit allocates replacement nodes for the edited node and every ancestor
//! up to the root, so a root id taken before an edit still describes the tree
//! as it was. Handles held by callers are forwarded to the newest version of
//! the node they named, which lets merge code keep using ids across edits.

use std::collections::HashMap;

use switchyard_types::{Result, SwitchyardError};

use crate::decl::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Comments and attributes attached to a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decor {
    /// Plain comment lines directly above the declaration.
    pub comments: Vec<String>,
    /// Outer attributes and doc comments, in source order.
    pub attrs: Vec<String>,
    /// Plain comment lines glued underneath the declaration.
    pub trailing: Vec<String>,
}

impl Decor {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.attrs.is_empty() && self.trailing.is_empty()
    }

    /// Returns `true` if an attribute starting with `prefix` is present.
    pub fn has_attr(&self, prefix: &str) -> bool {
        self.attrs.iter().any(|a| a.starts_with(prefix))
    }
}

/// Coarse declaration kind, used for "same kind" placement decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    File,
    Module,
    Use,
    Enum,
    Variant,
    Struct,
    Field,
    Impl,
    Trait,
    Fn,
    Const,
    Comment,
    Verbatim,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File(FileDecl),
    Module(ModuleDecl),
    Use(UseDecl),
    Enum(EnumDecl),
    Variant(VariantDecl),
    Struct(StructDecl),
    Field(FieldDecl),
    Impl(ImplDecl),
    Trait(TraitDecl),
    Fn(FnDecl),
    Const(ConstDecl),
    /// A comment block that is not attached to any declaration.
    Comment(Vec<String>),
    /// Any item the outline parser does not model, kept as source text.
    Verbatim(Block),
}

impl NodeKind {
    pub fn tag(&self) -> KindTag {
        match self {
            NodeKind::File(_) => KindTag::File,
            NodeKind::Module(_) => KindTag::Module,
            NodeKind::Use(_) => KindTag::Use,
            NodeKind::Enum(_) => KindTag::Enum,
            NodeKind::Variant(_) => KindTag::Variant,
            NodeKind::Struct(_) => KindTag::Struct,
            NodeKind::Field(_) => KindTag::Field,
            NodeKind::Impl(_) => KindTag::Impl,
            NodeKind::Trait(_) => KindTag::Trait,
            NodeKind::Fn(_) => KindTag::Fn,
            NodeKind::Const(_) => KindTag::Const,
            NodeKind::Comment(_) => KindTag::Comment,
            NodeKind::Verbatim(_) => KindTag::Verbatim,
        }
    }
}

/// Source text of a declaration whose canonical form would lose comments
/// written inside it, such as between parameters or where predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeptSource {
    /// The declaration as written, without its decor.
    pub text: Block,
    /// Canonical rendering when the declaration was parsed. `text` is
    /// emitted only while the declaration still renders this way.
    pub fingerprint: String,
}

/// An arena node. Children are ids of other arena nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub decor: Decor,
    pub children: Vec<NodeId>,
    pub kept: Option<KeptSource>,
}

macro_rules! accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Option<&$ty> {
            match &self.kind {
                NodeKind::$variant(d) => Some(d),
                _ => None,
            }
        }
    };
}

impl Node {
    accessor!(as_module, Module, ModuleDecl);
    accessor!(as_use, Use, UseDecl);
    accessor!(as_enum, Enum, EnumDecl);
    accessor!(as_variant, Variant, VariantDecl);
    accessor!(as_struct, Struct, StructDecl);
    accessor!(as_field, Field, FieldDecl);
    accessor!(as_impl, Impl, ImplDecl);
    accessor!(as_trait, Trait, TraitDecl);
    accessor!(as_fn, Fn, FnDecl);
    accessor!(as_const, Const, ConstDecl);

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    /// The declared name, for kinds that have one.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Module(d) => Some(&d.name),
            NodeKind::Enum(d) => Some(&d.name),
            NodeKind::Variant(d) => Some(&d.name),
            NodeKind::Struct(d) => Some(&d.name),
            NodeKind::Field(d) => d.name.as_deref(),
            NodeKind::Trait(d) => Some(&d.name),
            NodeKind::Fn(d) => Some(&d.name),
            NodeKind::Const(d) => Some(&d.name),
            _ => None,
        }
    }

    /// Human-readable label used in error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            NodeKind::File(_) => "file".to_string(),
            NodeKind::Impl(d) => match &d.trait_ref {
                Some(t) => format!("impl {} for {}", t, d.self_ty),
                None => format!("impl {}", d.self_ty),
            },
            NodeKind::Comment(_) => "comment".to_string(),
            NodeKind::Use(_) => "use".to_string(),
            NodeKind::Verbatim(_) => "item".to_string(),
            kind => {
                let word = match kind.tag() {
                    KindTag::Module => "mod",
                    KindTag::Enum => "enum",
                    KindTag::Variant => "variant",
                    KindTag::Struct => "struct",
                    KindTag::Field => "field",
                    KindTag::Trait => "trait",
                    KindTag::Fn => "fn",
                    _ => "const",
                };
                format!("{} {}", word, self.name().unwrap_or("_"))
            }
        }
    }
}

/// An owned subtree, used to build new declarations before they are grafted
/// into a [`SyntaxTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: NodeKind,
    pub decor: Decor,
    pub children: Vec<Fragment>,
    pub kept: Option<KeptSource>,
}

impl Fragment {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            decor: Decor::default(),
            children: Vec::new(),
            kept: None,
        }
    }

    pub fn with_attr(mut self, attr: impl Into<String>) -> Self {
        self.decor.attrs.push(attr.into());
        self
    }

    pub fn with_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.decor.attrs.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.decor.comments.push(comment.into());
        self
    }

    pub fn with_trailing(mut self, comment: impl Into<String>) -> Self {
        self.decor.trailing.push(comment.into());
        self
    }

    pub fn with_decor(mut self, decor: Decor) -> Self {
        self.decor = decor;
        self
    }

    pub fn with_child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Fragment>) -> Self {
        self.children.extend(children);
        self
    }
}

// ---------------------------------------------------------------------------
// SyntaxTree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
    forward: HashMap<NodeId, NodeId>,
}

impl SyntaxTree {
    /// Build a tree whose root is `root`.
    pub fn from_fragment(root: Fragment) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            forward: HashMap::new(),
        };
        tree.root = tree.alloc(root);
        tree
    }

    /// An empty source file.
    pub fn empty_file() -> Self {
        Self::from_fragment(Fragment::new(NodeKind::File(FileDecl::default())))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Follow replacement links to the newest version of `id`.
    pub fn resolve(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(&next) = self.forward.get(&current) {
            current = next;
        }
        current
    }

    /// The newest version of the node named by `id`.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[self.resolve(id).index()]
    }

    /// A node exactly as allocated, without following replacements.
    pub fn get_version(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.get(id).children
    }

    /// Number of allocated node versions, live or not.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Allocate a fragment as a detached subtree.
    pub fn alloc(&mut self, fragment: Fragment) -> NodeId {
        let children = fragment
            .children
            .into_iter()
            .map(|child| self.alloc(child))
            .collect();
        self.push(Node {
            kind: fragment.kind,
            decor: fragment.decor,
            children,
            kept: fragment.kept,
        })
    }

    /// Copy a subtree out as an owned fragment.
    pub fn fragment(&self, id: NodeId) -> Fragment {
        let node = self.get(id);
        Fragment {
            kind: node.kind.clone(),
            decor: node.decor.clone(),
            children: node.children.iter().map(|&c| self.fragment(c)).collect(),
            kept: node.kept.clone(),
        }
    }

    /// Ids from the root down to `id`, inclusive, in the current tree.
    pub fn path_to(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let target = self.resolve(id);
        let mut path = vec![self.root];
        if self.find_path(self.root, target, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn find_path(&self, from: NodeId, target: NodeId, path: &mut Vec<NodeId>) -> bool {
        if from == target {
            return true;
        }
        for &child in &self.nodes[from.index()].children {
            path.push(child);
            if self.find_path(child, target, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let path = self.path_to(id)?;
        if path.len() >= 2 {
            Some(path[path.len() - 2])
        } else {
            None
        }
    }

    /// Returns `true` if `id` is reachable from the current root.
    pub fn contains(&self, id: NodeId) -> bool {
        self.path_to(id).is_some()
    }

    /// All nodes below `id` in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.index()].children.iter().rev().copied());
        }
        out
    }

    /// Direct children of `container` matching `pred`.
    pub fn find_children(&self, container: NodeId, pred: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.children(container)
            .iter()
            .copied()
            .filter(|&c| pred(self.get(c)))
            .collect()
    }

    /// Descendants of `root` matching `pred`, in pre-order.
    pub fn find_descendants(&self, root: NodeId, pred: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&c| pred(self.get(c)))
            .collect()
    }

    fn detached(&self, id: NodeId) -> SwitchyardError {
        SwitchyardError::MissingDeclaration {
            what: format!("{} (no longer in the tree)", self.get(id).describe()),
        }
    }

    /// Rebuild the ancestors of `old` so that it is replaced by `new`, or
    /// removed when `new` is `None`.
    fn splice(&mut self, old: NodeId, new: Option<NodeId>) -> Result<()> {
        let path = self.path_to(old).ok_or_else(|| self.detached(old))?;
        let old = self.resolve(old);
        let mut replacement = new;
        let mut replaced = old;
        for &ancestor in path[..path.len() - 1].iter().rev() {
            let mut node = self.nodes[ancestor.index()].clone();
            match replacement {
                Some(r) => {
                    for child in node.children.iter_mut() {
                        if *child == replaced {
                            *child = r;
                        }
                    }
                }
                None => node.children.retain(|&c| c != replaced),
            }
            let rebuilt = self.push(node);
            self.forward.insert(ancestor, rebuilt);
            replacement = Some(rebuilt);
            replaced = ancestor;
        }
        match replacement {
            Some(new_root) => self.root = new_root,
            None => {
                return Err(SwitchyardError::Other("cannot remove the root node".into()));
            }
        }
        if let Some(new) = new {
            self.forward.insert(old, new);
        }
        Ok(())
    }

    /// Replace a subtree with a freshly built one. Returns the new id.
    pub fn replace(&mut self, old: NodeId, fragment: Fragment) -> Result<NodeId> {
        let new = self.alloc(fragment);
        self.splice(old, Some(new))?;
        Ok(new)
    }

    /// Replace a node with an edited copy of itself. Children are shared.
    pub fn update(&mut self, id: NodeId, edit: impl FnOnce(&mut Node)) -> Result<NodeId> {
        let mut node = self.get(id).clone();
        edit(&mut node);
        if node == *self.get(id) {
            return Ok(self.resolve(id));
        }
        let new = self.push(node);
        self.splice(id, Some(new))?;
        Ok(new)
    }

    /// Insert a fragment as the `index`-th child of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, fragment: Fragment) -> Result<NodeId> {
        let child = self.alloc(fragment);
        self.update(parent, |node| {
            let at = index.min(node.children.len());
            node.children.insert(at, child);
        })?;
        Ok(child)
    }

    /// Detach `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let child = self.resolve(child);
        if !self.children(parent).contains(&child) {
            return Err(self.detached(child));
        }
        self.splice(child, None)
    }

    /// Position of `child` among the children of `parent`.
    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        let child = self.resolve(child);
        self.children(parent).iter().position(|&c| c == child)
    }
}
