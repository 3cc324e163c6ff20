//! Closed-union encoding.
//!
//! A union `DoorState` with cases `Open` and `Closed` is a native enum whose
//! variants wrap case structs declared in the `door_state` module:
//!
//! ```text
//! pub enum DoorState { Open(door_state::Open_), Closed(door_state::Closed_) }
//! pub mod door_state { pub(crate) enum UnionCases { Open, Closed } pub struct Open_ {} ... }
//! impl DoorState { accessors, union_case(), match_with family }
//! impl Display / PartialEq / Eq / Hash for DoorState   // keyed on union_case()
//! ```
//!
//! [`encode_union`] creates whatever is missing, promotes a plain fieldless
//! enum into this shape, and then synchronizes the members with the wanted
//! case list.

use std::collections::{HashMap, HashSet};

use switchyard_syntax::{
    Block, ConstDecl, Decor, EnumDecl, FnDecl, Fragment, ImplDecl, ModuleDecl, Node, NodeId, NodeKind,
    StructDecl, StructShape, SyntaxTree, UseDecl, VariantDecl, VariantPayload,
};
use switchyard_types::{GeneratorConfig, Result, SwitchyardError};

use crate::merge::{self, enum_named, fn_named, module_named, struct_named, trait_impl_of, Placement};
use crate::naming::{self, CASE_BINDING, DEFERRED_PARAM, UNION_CASES, UNION_CASE_FN};
use crate::render::{self, Code};

/// Derives of the discriminator enum. `Display`, `PartialEq` and `Hash` on
/// the union rely on all of them.
const UNION_CASES_DERIVES: &str = "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]";

/// What to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionSpec {
    pub name: String,
    pub module: String,
    pub cases: Vec<String>,
    /// Comment placed above the union when it is created.
    pub header: Option<String>,
}

impl UnionSpec {
    pub fn new(name: impl Into<String>, cases: Vec<String>) -> Self {
        let name = name.into();
        Self {
            module: naming::union_module(&name),
            name,
            cases,
            header: None,
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

/// Nodes making up an encoded union, valid after [`encode_union`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionParts {
    pub union: NodeId,
    pub module: NodeId,
    pub cases_enum: NodeId,
    pub plumbing: NodeId,
    /// Last top-level item belonging to the union.
    pub last: NodeId,
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Identity predicates
// ---------------------------------------------------------------------------

fn is_use(n: &Node) -> bool {
    n.as_use().is_some()
}

fn is_case_struct(n: &Node) -> bool {
    n.as_struct().is_some_and(|s| s.name.ends_with('_'))
}

/// Associated const or constructor fn yielding `Self`.
fn is_accessor(n: &Node) -> bool {
    match &n.kind {
        NodeKind::Const(c) => c.ty == "Self",
        NodeKind::Fn(f) => !f.has_receiver() && f.ret.as_deref() == Some("Self"),
        _ => false,
    }
}

fn unsupported(what: impl Into<String>, reason: impl Into<String>) -> SwitchyardError {
    SwitchyardError::UnsupportedShape {
        what: what.into(),
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

fn variant_fragments(tree: &SyntaxTree, id: NodeId) -> Vec<(String, Fragment)> {
    tree.children(id)
        .iter()
        .filter_map(|&c| {
            let node = tree.get(c);
            node.as_variant()
                .map(|v| (naming::unescape(&v.name).to_string(), tree.fragment(c)))
        })
        .collect()
}

fn check_fieldless(tree: &SyntaxTree, id: NodeId) -> Result<()> {
    let node = tree.get(id);
    let Some(decl) = node.as_enum() else {
        return Err(unsupported(node.describe(), "not an enum"));
    };
    if !decl.generics.is_empty() {
        return Err(unsupported(node.describe(), "generic enums cannot become unions"));
    }
    let with_fields = tree
        .children(id)
        .iter()
        .filter_map(|&c| tree.get(c).as_variant())
        .find(|v| !v.is_unit());
    match with_fields {
        Some(v) => Err(unsupported(
            node.describe(),
            format!("variant {} carries data; only fieldless enums can be promoted", v.name),
        )),
        None => Ok(()),
    }
}

/// Case names of the union `name` in `container`: the discriminator enum
/// when the union is already encoded, otherwise the variants of the plain
/// fieldless enum.
pub fn current_cases(tree: &SyntaxTree, container: NodeId, name: &str) -> Result<Vec<String>> {
    let module_name = naming::union_module(name);
    let module = merge::find_unique(tree, container, &format!("mod {module_name}"), module_named(&module_name))?;
    if let Some(module) = module {
        if let Some(cases) =
            merge::find_unique(tree, module, &format!("enum {UNION_CASES}"), enum_named(UNION_CASES))?
        {
            return Ok(variant_fragments(tree, cases).into_iter().map(|(n, _)| n).collect());
        }
    }
    let union = merge::require(tree, container, &format!("enum {name}"), enum_named(name))?;
    check_fieldless(tree, union)?;
    Ok(variant_fragments(tree, union).into_iter().map(|(n, _)| n).collect())
}

/// Named fields of the case struct `id`.
pub(crate) fn named_fields(tree: &SyntaxTree, id: NodeId) -> Result<Vec<(String, String)>> {
    let node = tree.get(id);
    let Some(decl) = node.as_struct() else {
        return Err(unsupported(node.describe(), "not a struct"));
    };
    if decl.shape != StructShape::Named {
        return Err(unsupported(node.describe(), "case structs must use named fields"));
    }
    if !decl.generics.is_empty() {
        return Err(unsupported(node.describe(), "case structs cannot be generic"));
    }
    Ok(tree
        .children(id)
        .iter()
        .filter_map(|&c| tree.get(c).as_field())
        .filter_map(|f| f.name.clone().map(|n| (n, f.ty.clone())))
        .collect())
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn accessor(spec: &UnionSpec, case: &str, fields: &[(String, String)]) -> Fragment {
    let variant = naming::variant(case);
    let qualified = format!("{}::{}", spec.module, naming::case_struct(case));
    if fields.is_empty() {
        return render::const_node(
            ConstDecl::new(
                naming::const_accessor(case),
                "Self",
                format!("Self::{variant}({qualified} {{}})"),
            )
            .with_vis("pub"),
        );
    }
    let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
    let mut decl = FnDecl::new(naming::fn_accessor(case)).with_vis("pub");
    for (name, ty) in fields {
        decl = decl.param(name.clone(), ty.clone());
    }
    render::fn_node(
        decl.returns("Self")
            .body([format!("Self::{variant}({qualified} {{ {} }})", names.join(", "))]),
    )
}

fn union_case_fn(spec: &UnionSpec, config: &GeneratorConfig) -> Fragment {
    let mut code = Code::new(config);
    if spec.cases.is_empty() {
        code.line("match self {}");
    } else {
        code.open("match self {");
        for case in &spec.cases {
            code.line(format!(
                "Self::{}(_) => {}::{UNION_CASES}::{},",
                naming::variant(case),
                spec.module,
                naming::variant(case)
            ));
        }
        code.close("}");
    }
    render::fn_node(
        FnDecl::new(UNION_CASE_FN)
            .with_vis("pub(crate)")
            .receiver("&self")
            .returns(format!("{}::{UNION_CASES}", spec.module))
            .body(code.finish()),
    )
}

fn handler_ty(spec: &UnionSpec, case: &str, output: &str) -> String {
    format!(
        "impl FnOnce({}::{}) -> {output}",
        spec.module,
        naming::case_struct(case)
    )
}

fn handler_names(spec: &UnionSpec) -> Vec<String> {
    spec.cases.iter().map(|c| naming::handler(c)).collect()
}

fn async_generics(spec: &UnionSpec) -> String {
    let mut params = vec!["T".to_string()];
    params.extend((0..spec.cases.len()).map(|i| format!("F{i}")));
    format!("<{}>", params.join(", "))
}

fn future_bounds(decl: FnDecl, spec: &UnionSpec) -> FnDecl {
    (0..spec.cases.len()).fold(decl, |d, i| {
        d.where_pred(format!("F{i}: std::future::Future<Output = T>"))
    })
}

fn dispatch_body(spec: &UnionSpec, config: &GeneratorConfig, suffix: &str) -> Vec<String> {
    let mut code = Code::new(config);
    if spec.cases.is_empty() {
        code.line("match self {}");
        return code.finish();
    }
    code.open("match self {");
    for case in &spec.cases {
        code.line(format!(
            "Self::{}({CASE_BINDING}) => {}({CASE_BINDING}){suffix},",
            naming::variant(case),
            naming::handler(case)
        ));
    }
    code.close("}");
    code.finish()
}

/// `match_with`, `match_with_async`, `match_deferred`, `match_deferred_async`.
fn match_family(spec: &UnionSpec, config: &GeneratorConfig) -> Vec<Fragment> {
    let handlers = handler_names(spec);

    let mut sync = FnDecl::new("match_with")
        .with_vis("pub")
        .with_generics("<T>")
        .receiver("self");
    for case in &spec.cases {
        sync = sync.param(naming::handler(case), handler_ty(spec, case, "T"));
    }
    let sync = sync.returns("T").body(dispatch_body(spec, config, ""));

    let mut asynchronous = FnDecl::new("match_with_async")
        .with_vis("pub")
        .with_qualifiers("async")
        .with_generics(async_generics(spec))
        .receiver("self");
    for (i, case) in spec.cases.iter().enumerate() {
        asynchronous = asynchronous.param(naming::handler(case), handler_ty(spec, case, &format!("F{i}")));
    }
    let asynchronous = future_bounds(asynchronous.returns("T"), spec).body(dispatch_body(spec, config, ".await"));

    let deferred_ty = "impl std::future::Future<Output = Self>";
    let mut deferred = FnDecl::new("match_deferred")
        .with_vis("pub")
        .with_qualifiers("async")
        .with_generics("<T>")
        .param(DEFERRED_PARAM, deferred_ty);
    for case in &spec.cases {
        deferred = deferred.param(naming::handler(case), handler_ty(spec, case, "T"));
    }
    let deferred = deferred.returns("T").body([format!(
        "{DEFERRED_PARAM}.await.match_with({})",
        handlers.join(", ")
    )]);

    let mut deferred_async = FnDecl::new("match_deferred_async")
        .with_vis("pub")
        .with_qualifiers("async")
        .with_generics(async_generics(spec))
        .param(DEFERRED_PARAM, deferred_ty);
    for (i, case) in spec.cases.iter().enumerate() {
        deferred_async = deferred_async.param(naming::handler(case), handler_ty(spec, case, &format!("F{i}")));
    }
    let deferred_async = future_bounds(deferred_async.returns("T"), spec).body([format!(
        "{DEFERRED_PARAM}.await.match_with_async({}).await",
        handlers.join(", ")
    )]);

    vec![
        render::fn_node(sync),
        render::fn_node(asynchronous),
        render::fn_node(deferred),
        render::fn_node(deferred_async),
    ]
}

/// `Display`, `PartialEq`, `Eq` and `Hash`, all keyed on the discriminator.
fn trait_impls(spec: &UnionSpec) -> Vec<(&'static str, Fragment)> {
    let name = spec.name.as_str();
    let display = render::impl_node(ImplDecl::of_trait("std::fmt::Display", name)).with_child(
        render::fn_node(
            FnDecl::new("fmt")
                .receiver("&self")
                .param("f", "&mut std::fmt::Formatter<'_>")
                .returns("std::fmt::Result")
                .body([r#"write!(f, "{:?}", self.union_case())"#]),
        ),
    );
    let eq = render::impl_node(ImplDecl::of_trait("PartialEq", name)).with_child(render::fn_node(
        FnDecl::new("eq")
            .receiver("&self")
            .param("other", "&Self")
            .returns("bool")
            .body(["self.union_case() == other.union_case()"]),
    ));
    let total = render::impl_node(ImplDecl::of_trait("Eq", name));
    let hash = render::impl_node(ImplDecl::of_trait("std::hash::Hash", name)).with_child(render::fn_node(
        FnDecl::new("hash")
            .with_generics("<H: std::hash::Hasher>")
            .receiver("&self")
            .param("state", "&mut H")
            .body(["std::hash::Hash::hash(&self.union_case(), state);"]),
    ));
    vec![
        ("Display", display),
        ("PartialEq", eq),
        ("Eq", total),
        ("Hash", hash),
    ]
}

/// Put the configured derive first among the attributes, after docs, and
/// drop any derive already there.
fn with_union_derives(decor: &Decor, config: &GeneratorConfig) -> Decor {
    let is_doc = |a: &String| a.starts_with("///") || a.starts_with("#[doc");
    let mut attrs: Vec<String> = decor.attrs.iter().filter(|a| is_doc(a)).cloned().collect();
    attrs.extend(GeneratorConfig::derive_attr(&config.union_derives));
    attrs.extend(
        decor
            .attrs
            .iter()
            .filter(|a| !is_doc(a) && !a.starts_with("#[derive"))
            .cloned(),
    );
    Decor {
        attrs,
        ..decor.clone()
    }
}

// ---------------------------------------------------------------------------
// EncodeUnion
// ---------------------------------------------------------------------------

/// Encode or re-synchronize the union described by `spec` in `container`.
pub fn encode_union(
    tree: &mut SyntaxTree,
    container: NodeId,
    spec: &UnionSpec,
    config: &GeneratorConfig,
) -> Result<UnionParts> {
    naming::check_union_cases(&spec.name, &spec.cases)?;

    let union = merge::find_unique(tree, container, &format!("enum {}", spec.name), enum_named(&spec.name))?;
    let module = merge::find_unique(tree, container, &format!("mod {}", spec.module), module_named(&spec.module))?;
    let cases_enum = match module {
        Some(m) => merge::find_unique(tree, m, &format!("enum {UNION_CASES}"), enum_named(UNION_CASES))?,
        None => None,
    };

    // Everything that has ever been a case here, for stale accessor cleanup.
    let mut previous: HashSet<String> = HashSet::new();
    // Known discriminator variants, kept whole so their docs survive.
    let mut known: HashMap<String, Fragment> = HashMap::new();
    if let Some(id) = cases_enum {
        for (name, fragment) in variant_fragments(tree, id) {
            previous.insert(name.clone());
            known.insert(name, fragment);
        }
    }
    if let Some(m) = module {
        for id in merge::matching(tree, m, is_case_struct) {
            if let Some(name) = tree.get(id).name().and_then(|n| n.strip_suffix('_')) {
                previous.insert(name.to_string());
            }
        }
    }

    let mut union_variant_decor: HashMap<String, Decor> = HashMap::new();
    let created = union.is_none();
    let union = match union {
        Some(id) if cases_enum.is_none() => {
            check_fieldless(tree, id)?;
            tracing::debug!(union = %spec.name, "promoting fieldless enum to a union");
            for (name, fragment) in variant_fragments(tree, id) {
                previous.insert(name.clone());
                known.entry(name).or_insert(fragment);
            }
            let decor = with_union_derives(&tree.get(id).decor, config);
            tree.update(id, |n| n.decor = decor)?
        }
        Some(id) => {
            for &c in tree.children(id) {
                let node = tree.get(c);
                if let Some(v) = node.as_variant() {
                    let name = naming::unescape(&v.name).to_string();
                    previous.insert(name.clone());
                    union_variant_decor.insert(name, node.decor.clone());
                }
            }
            id
        }
        None => {
            let mut fragment = render::derives(
                render::enum_node(EnumDecl::new(&spec.name).with_vis("pub")),
                &config.union_derives,
            );
            if let Some(header) = &spec.header {
                fragment = fragment.with_comment(header.clone());
            }
            let placement = match module {
                Some(m) => Placement::Before(m),
                None => Placement::End,
            };
            merge::insert(tree, container, fragment, placement)?
        }
    };

    let module = match module {
        Some(id) => id,
        None => {
            let vis = tree.get(union).as_enum().map(|e| e.vis.clone()).unwrap_or_default();
            let fragment = Fragment::new(NodeKind::Module(ModuleDecl::inline(&spec.module).with_vis(vis)))
                .with_attr("#[allow(non_camel_case_types)]")
                .with_child(Fragment::new(NodeKind::Use(UseDecl::new("super::*"))));
            merge::insert(tree, container, fragment, Placement::After(union))?
        }
    };

    let cases_enum = match cases_enum {
        Some(id) => id,
        None => {
            let fragment = render::enum_node(EnumDecl::new(UNION_CASES).with_vis("pub(crate)"))
                .with_attr(UNION_CASES_DERIVES);
            merge::insert(tree, module, fragment, Placement::AfterLastOrStart(&is_use))?
        }
    };
    let discriminators = spec
        .cases
        .iter()
        .map(|case| {
            known
                .get(case.as_str())
                .cloned()
                .filter(|f| matches!(&f.kind, NodeKind::Variant(v) if v.is_unit()))
                .unwrap_or_else(|| render::variant_node(VariantDecl::unit(naming::variant(case))))
        })
        .collect();
    let cases_enum = merge::replace_children(tree, cases_enum, discriminators)?;

    let parts = sync_members(
        tree,
        container,
        spec,
        config,
        Members {
            union,
            module,
            cases_enum,
            previous,
            union_variant_decor,
        },
    )?;
    tracing::debug!(union = %spec.name, cases = spec.cases.len(), created, "encoded union");
    Ok(UnionParts { created, ..parts })
}

struct Members {
    union: NodeId,
    module: NodeId,
    cases_enum: NodeId,
    previous: HashSet<String>,
    union_variant_decor: HashMap<String, Decor>,
}

fn sync_members(
    tree: &mut SyntaxTree,
    container: NodeId,
    spec: &UnionSpec,
    config: &GeneratorConfig,
    members: Members,
) -> Result<UnionParts> {
    let Members {
        union,
        module,
        cases_enum,
        previous,
        union_variant_decor,
    } = members;

    // Case structs: keep existing ones verbatim, add missing ones.
    let mut case_structs = Vec::with_capacity(spec.cases.len());
    for case in &spec.cases {
        let struct_name = naming::case_struct(case);
        let built = render::derives(
            render::struct_node(StructDecl::named(&struct_name).with_vis("pub")),
            &config.case_derives,
        );
        let placement = Placement::AfterLastOrEnd(&is_case_struct);
        let upserted = merge::ensure(
            tree,
            module,
            &format!("struct {struct_name}"),
            struct_named(&struct_name),
            move || built,
            placement,
        )?;
        case_structs.push(upserted.id);
    }

    // Stale case structs go together with their inherent impls.
    let wanted: HashSet<String> = spec.cases.iter().map(|c| naming::case_struct(c)).collect();
    let stale: Vec<String> = merge::matching(tree, module, is_case_struct)
        .into_iter()
        .filter_map(|id| tree.get(id).name().map(str::to_string))
        .filter(|name| !wanted.contains(name))
        .collect();
    for name in &stale {
        merge::remove_where(tree, module, |n| {
            n.as_struct().is_some_and(|s| &s.name == name)
                || n.as_impl().is_some_and(|i| i.trait_ref.is_none() && &i.self_ty == name)
        })?;
    }

    // Union variants in case order.
    let variants = spec
        .cases
        .iter()
        .map(|case| {
            let fragment = render::variant_node(VariantDecl {
                name: naming::variant(case),
                payload: VariantPayload::Tuple(Block::single(format!(
                    "{}::{}",
                    spec.module,
                    naming::case_struct(case)
                ))),
                discriminant: None,
            });
            match union_variant_decor.get(case.as_str()) {
                Some(decor) => fragment.with_decor(decor.clone()),
                None => fragment,
            }
        })
        .collect();
    let union = merge::replace_children(tree, union, variants)?;

    // Plumbing impl.
    let plumbing = match merge::find_impl_declaring(tree, container, &spec.name, &[UNION_CASE_FN])? {
        Some(id) => id,
        None => merge::insert(
            tree,
            container,
            render::impl_node(ImplDecl::inherent(&spec.name)),
            Placement::After(module),
        )?,
    };

    // Accessors.
    let mut wanted_accessors: HashSet<String> = HashSet::new();
    for (case, &struct_id) in spec.cases.iter().zip(&case_structs) {
        let fields = named_fields(tree, struct_id)?;
        let const_name = naming::const_accessor(case);
        let fn_name = naming::fn_accessor(case);
        wanted_accessors.insert(if fields.is_empty() { const_name.clone() } else { fn_name.clone() });
        let identity = |n: &Node| match &n.kind {
            NodeKind::Const(c) => c.name == const_name,
            NodeKind::Fn(f) => f.name == fn_name && is_accessor(n),
            _ => false,
        };
        merge::upsert_generated(
            tree,
            plumbing,
            &format!("accessor of {case}"),
            identity,
            accessor(spec, case, &fields),
            Placement::AfterLastOrStart(&is_accessor),
        )?;
    }
    let stale_accessors: HashSet<String> = previous
        .iter()
        .filter(|p| !spec.cases.contains(p))
        .flat_map(|p| [naming::const_accessor(p), naming::fn_accessor(p)])
        .filter(|name| !wanted_accessors.contains(name))
        .collect();
    if !stale_accessors.is_empty() {
        merge::remove_where(tree, plumbing, |n| {
            is_accessor(n) && n.name().is_some_and(|name| stale_accessors.contains(name))
        })?;
    }

    // Discriminator accessor and the Match family.
    let mut generated = vec![union_case_fn(spec, config)];
    if config.match_methods {
        generated.extend(match_family(spec, config));
    }
    let mut prev: Option<NodeId> = None;
    for fragment in generated {
        let name = match &fragment.kind {
            NodeKind::Fn(f) => f.name.clone(),
            _ => continue,
        };
        let placement = match prev {
            Some(id) => Placement::After(id),
            None => Placement::AfterLastOrStart(&is_accessor),
        };
        let upserted = merge::upsert_generated(tree, plumbing, &format!("fn {name}"), fn_named(&name), fragment, placement)?;
        prev = Some(upserted.id);
    }

    // Trait impls, left alone when present.
    let mut last = plumbing;
    for (trait_name, fragment) in trait_impls(spec) {
        let upserted = merge::ensure(
            tree,
            container,
            &format!("impl {trait_name} for {}", spec.name),
            trait_impl_of(trait_name, &spec.name),
            move || fragment,
            Placement::After(last),
        )?;
        last = upserted.id;
    }

    Ok(UnionParts {
        union: tree.resolve(union),
        module: tree.resolve(module),
        cases_enum: tree.resolve(cases_enum),
        plumbing: tree.resolve(plumbing),
        last: tree.resolve(last),
        created: false,
    })
}
