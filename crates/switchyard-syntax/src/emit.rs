//! Deterministic source emitter.
//!
//! Emission is canonical: indentation, blank lines between items and the
//! layout of signatures are decided here, not taken from the parsed source.
//! Re-parsing emitted text and emitting it again yields the same text.
//!
//! The one exception is a declaration with comments the canonical layout has
//! no place for, such as one after a parameter. Such a declaration is printed
//! as written until an edit changes its canonical form.

use switchyard_types::GeneratorConfig;

use crate::decl::*;
use crate::tree::{Decor, KindTag, Node, NodeId, NodeKind, SyntaxTree};

/// Signatures longer than this are split one parameter per line.
const MAX_WIDTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    pub indent_width: usize,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

impl EmitOptions {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            indent_width: config.indent_width,
        }
    }
}

/// Canonical rendering of the declaration `id` without its decor, at a fixed
/// indent width. Source text kept for a declaration is ignored.
pub(crate) fn fingerprint(tree: &SyntaxTree, id: NodeId) -> String {
    let mut printer = Printer {
        tree,
        unit: " ".repeat(EmitOptions::default().indent_width),
        level: 0,
        out: String::new(),
    };
    printer.declaration(tree.get(id));
    printer.out
}

/// Render the whole tree as source text.
pub fn emit(tree: &SyntaxTree, options: &EmitOptions) -> String {
    let mut printer = Printer {
        tree,
        unit: " ".repeat(options.indent_width),
        level: 0,
        out: String::new(),
    };
    printer.node(tree.root());
    printer.out
}

fn with_vis(vis: &str) -> String {
    if vis.is_empty() {
        String::new()
    } else {
        format!("{vis} ")
    }
}

fn param_text(param: &Param) -> String {
    match &param.ty {
        Some(ty) => format!("{}: {}", param.pattern, ty),
        None => param.pattern.clone(),
    }
}

/// Whether a blank line separates two neighbouring items.
fn blank_between(prev: &Node, next: &Node) -> bool {
    match (prev.tag(), next.tag()) {
        (KindTag::Use, KindTag::Use) => false,
        (KindTag::Const, KindTag::Const) => !(prev.decor.is_empty() && next.decor.is_empty()),
        _ => true,
    }
}

struct Printer<'t> {
    tree: &'t SyntaxTree,
    unit: String,
    level: usize,
    out: String,
}

impl Printer<'_> {
    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.level {
                self.out.push_str(&self.unit);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn code_line(&mut self, line: &CodeLine) {
        if line.literal {
            self.out.push_str(&line.text);
            self.out.push('\n');
        } else {
            self.line(&line.text);
        }
    }

    fn block(&mut self, block: &Block) {
        for line in &block.lines {
            self.code_line(line);
        }
    }

    /// `prefix` glued to the first line of `block` and `suffix` to its last.
    fn wrapped(&mut self, prefix: &str, block: &Block, suffix: &str) {
        let lines = &block.lines;
        match lines.len() {
            0 => self.line(&format!("{prefix}{suffix}")),
            1 => self.line(&format!("{prefix}{}{suffix}", lines[0].text)),
            n => {
                self.line(&format!("{prefix}{}", lines[0].text));
                for line in &lines[1..n - 1] {
                    self.code_line(line);
                }
                let last = &lines[n - 1];
                self.code_line(&CodeLine {
                    text: format!("{}{suffix}", last.text),
                    literal: last.literal,
                });
            }
        }
    }

    /// A braced body: `head {}` when empty, otherwise indented contents.
    fn braced(&mut self, head: &str, empty: bool, body: impl FnOnce(&mut Self)) {
        if empty {
            self.line(&format!("{head} {{}}"));
        } else {
            self.line(&format!("{head} {{"));
            self.level += 1;
            body(self);
            self.level -= 1;
            self.line("}");
        }
    }

    fn decor_before(&mut self, decor: &Decor) {
        for comment in &decor.comments {
            self.line(comment);
        }
        for attr in &decor.attrs {
            self.line(attr);
        }
    }

    fn decor_after(&mut self, decor: &Decor) {
        for comment in &decor.trailing {
            self.line(comment);
        }
    }

    fn inner_and_items(&mut self, inner: &[String], children: &[NodeId]) {
        for line in inner {
            self.line(line);
        }
        if !inner.is_empty() && !children.is_empty() {
            self.line("");
        }
        self.items(children);
    }

    fn items(&mut self, children: &[NodeId]) {
        let tree = self.tree;
        let mut prev: Option<&Node> = None;
        for &child in children {
            let node = tree.get(child);
            if prev.is_some_and(|p| blank_between(p, node)) {
                self.line("");
            }
            self.node(child);
            prev = Some(node);
        }
    }

    fn members(&mut self, children: &[NodeId]) {
        for &child in children {
            self.node(child);
        }
    }

    fn node(&mut self, id: NodeId) {
        let tree = self.tree;
        let node = tree.get(id);
        if let NodeKind::File(d) = &node.kind {
            self.inner_and_items(&d.inner, &node.children);
            return;
        }
        self.decor_before(&node.decor);
        match node.kept.as_ref().filter(|k| fingerprint(tree, id) == k.fingerprint) {
            Some(kept) => {
                // Members are written without their separating comma.
                let suffix = match node.tag() {
                    KindTag::Variant | KindTag::Field => ",",
                    _ => "",
                };
                self.wrapped("", &kept.text, suffix);
            }
            None => self.declaration(node),
        }
        self.decor_after(&node.decor);
    }

    fn declaration(&mut self, node: &Node) {
        let children = node.children.as_slice();
        match &node.kind {
            NodeKind::File(d) => self.inner_and_items(&d.inner, children),
            NodeKind::Module(d) => {
                let head = format!("{}mod {}", with_vis(&d.vis), d.name);
                if d.inline {
                    let empty = d.inner.is_empty() && children.is_empty();
                    self.braced(&head, empty, |p| p.inner_and_items(&d.inner, children));
                } else {
                    self.line(&format!("{head};"));
                }
            }
            NodeKind::Use(d) => self.wrapped(&format!("{}use ", with_vis(&d.vis)), &d.tree, ";"),
            NodeKind::Enum(d) => {
                let mut head = format!("{}enum {}{}", with_vis(&d.vis), d.name, d.generics);
                if let Some(w) = &d.where_clause {
                    head = format!("{head} where {w}");
                }
                self.braced(&head, children.is_empty(), |p| p.members(children));
            }
            NodeKind::Variant(d) => self.variant(d),
            NodeKind::Struct(d) => self.structure(d, children),
            NodeKind::Field(d) => {
                let name = d.name.as_deref().unwrap_or("_");
                self.line(&format!("{}{}: {},", with_vis(&d.vis), name, d.ty));
            }
            NodeKind::Impl(d) => {
                let mut head = String::new();
                if d.unsafety {
                    head.push_str("unsafe ");
                }
                head.push_str("impl");
                head.push_str(&d.generics);
                head.push(' ');
                if let Some(t) = &d.trait_ref {
                    head.push_str(&format!("{t} for "));
                }
                head.push_str(&d.self_ty);
                if let Some(w) = &d.where_clause {
                    head.push_str(&format!(" where {w}"));
                }
                self.braced(&head, children.is_empty(), |p| p.items(children));
            }
            NodeKind::Trait(d) => {
                let unsafety = if d.unsafety { "unsafe " } else { "" };
                let mut head = format!("{}{}trait {}{}", with_vis(&d.vis), unsafety, d.name, d.tail);
                if let Some(w) = &d.where_clause {
                    head = format!("{head} where {w}");
                }
                self.braced(&head, children.is_empty(), |p| p.items(children));
            }
            NodeKind::Fn(d) => self.function(d),
            NodeKind::Const(d) => {
                let head = format!("{}{} {}: {}", with_vis(&d.vis), d.keyword, d.name, d.ty);
                match &d.value {
                    Some(value) => self.wrapped(&format!("{head} = "), value, ";"),
                    None => self.line(&format!("{head};")),
                }
            }
            NodeKind::Comment(lines) => {
                for line in lines {
                    self.line(line);
                }
            }
            NodeKind::Verbatim(block) => self.block(block),
        }
    }

    fn variant(&mut self, d: &VariantDecl) {
        let tail = match &d.discriminant {
            Some(value) => format!(" = {value},"),
            None => ",".to_string(),
        };
        let (open, close, block) = match &d.payload {
            VariantPayload::Unit => {
                self.line(&format!("{}{tail}", d.name));
                return;
            }
            VariantPayload::Tuple(block) => ("(", ")", block),
            VariantPayload::Named(block) => (" {", "}", block),
        };
        if block.lines.len() <= 1 {
            let text = block.first_line().unwrap_or("");
            let line = match (&d.payload, text.is_empty()) {
                (VariantPayload::Named(_), true) => format!("{} {{}}{tail}", d.name),
                (VariantPayload::Named(_), false) => format!("{} {{ {text} }}{tail}", d.name),
                _ => format!("{}({text}){tail}", d.name),
            };
            self.line(&line);
        } else {
            self.line(&format!("{}{open}", d.name));
            self.level += 1;
            self.block(block);
            self.level -= 1;
            self.line(&format!("{close}{tail}"));
        }
    }

    fn structure(&mut self, d: &StructDecl, children: &[NodeId]) {
        let head = format!("{}struct {}{}", with_vis(&d.vis), d.name, d.generics);
        let where_tail = d
            .where_clause
            .as_ref()
            .map(|w| format!(" where {w}"))
            .unwrap_or_default();
        match d.shape {
            StructShape::Unit => self.line(&format!("{head}{where_tail};")),
            StructShape::Tuple => {
                let tree = self.tree;
                let fields: Vec<String> = children
                    .iter()
                    .map(|&c| {
                        let node = tree.get(c);
                        let mut text: Vec<String> = node.decor.attrs.clone();
                        if let Some(f) = node.as_field() {
                            text.push(format!("{}{}", with_vis(&f.vis), f.ty));
                        }
                        text.join(" ")
                    })
                    .collect();
                self.line(&format!("{head}({}){where_tail};", fields.join(", ")));
            }
            StructShape::Named => {
                let head = format!("{head}{where_tail}");
                self.braced(&head, children.is_empty(), |p| p.members(children));
            }
        }
    }

    fn function(&mut self, d: &FnDecl) {
        let qualifiers = if d.qualifiers.is_empty() {
            String::new()
        } else {
            format!("{} ", d.qualifiers)
        };
        let head = format!("{}{}fn {}{}", with_vis(&d.vis), qualifiers, d.name, d.generics);
        let ret = d
            .ret
            .as_ref()
            .map(|r| format!(" -> {r}"))
            .unwrap_or_default();
        let params: Vec<String> = d.params.iter().map(param_text).collect();
        let one_line = format!("{head}({}){ret}", params.join(", "));
        let indent = self.level * self.unit.len();
        let terminator = match &d.body {
            None => ";",
            Some(body) if body.is_empty() => " {}",
            Some(_) => " {",
        };

        let has_where = !d.where_clause.is_empty();
        let tail = if has_where { "" } else { terminator };
        if params.is_empty() || indent + one_line.chars().count() + tail.len() <= MAX_WIDTH {
            self.line(&format!("{one_line}{tail}"));
        } else {
            self.line(&format!("{head}("));
            self.level += 1;
            for param in &params {
                self.line(&format!("{param},"));
            }
            self.level -= 1;
            self.line(&format!("){ret}{tail}"));
        }

        if has_where {
            self.line("where");
            self.level += 1;
            for pred in &d.where_clause {
                self.line(&format!("{pred},"));
            }
            self.level -= 1;
            self.line(terminator.trim_start());
        }

        if let Some(body) = &d.body {
            if !body.is_empty() {
                self.level += 1;
                self.block(body);
                self.level -= 1;
                self.line("}");
            }
        }
    }
}
