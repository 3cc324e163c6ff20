//! Small builders for generated declarations.

use switchyard_syntax::{ConstDecl, EnumDecl, FnDecl, Fragment, ImplDecl, NodeKind, StructDecl, VariantDecl};
use switchyard_types::GeneratorConfig;

/// Indented body lines, relative to the enclosing item.
pub(crate) struct Code {
    unit: String,
    depth: usize,
    lines: Vec<String>,
}

impl Code {
    pub(crate) fn new(config: &GeneratorConfig) -> Self {
        Self {
            unit: " ".repeat(config.indent_width),
            depth: 0,
            lines: Vec::new(),
        }
    }

    pub(crate) fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        self.lines.push(format!("{}{}", self.unit.repeat(self.depth), text));
        self
    }

    /// Write `text` and indent what follows.
    pub(crate) fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text);
        self.depth += 1;
        self
    }

    /// Dedent and write `text`.
    pub(crate) fn close(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.line(text)
    }

    pub(crate) fn finish(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

pub(crate) fn fn_node(decl: FnDecl) -> Fragment {
    Fragment::new(NodeKind::Fn(decl))
}

pub(crate) fn const_node(decl: ConstDecl) -> Fragment {
    Fragment::new(NodeKind::Const(decl))
}

pub(crate) fn impl_node(decl: ImplDecl) -> Fragment {
    Fragment::new(NodeKind::Impl(decl))
}

pub(crate) fn enum_node(decl: EnumDecl) -> Fragment {
    Fragment::new(NodeKind::Enum(decl))
}

pub(crate) fn struct_node(decl: StructDecl) -> Fragment {
    Fragment::new(NodeKind::Struct(decl))
}

pub(crate) fn variant_node(decl: VariantDecl) -> Fragment {
    Fragment::new(NodeKind::Variant(decl))
}

/// `#[derive(..)]` from a configured list, when it is not empty.
pub(crate) fn derives(fragment: Fragment, list: &[String]) -> Fragment {
    match GeneratorConfig::derive_attr(list) {
        Some(attr) => fragment.with_attr(attr),
        None => fragment,
    }
}
