//! Declaration payloads carried by tree nodes.
//!
//! Signatures are modelled structurally; expressions and statement bodies are
//! kept as [`Block`]s of source lines with their common indentation removed.

/// One line of source text inside a [`Block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    pub text: String,
    /// The line begins inside a multi-line string literal and must be
    /// reproduced byte for byte, without indentation.
    pub literal: bool,
}

/// Source lines relative to the indentation of their owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub lines: Vec<CodeLine>,
}

impl Block {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines
                .into_iter()
                .map(|l| CodeLine {
                    text: l.into(),
                    literal: false,
                })
                .collect(),
        }
    }

    pub fn single(line: impl Into<String>) -> Self {
        Self::from_lines([line])
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn first_line(&self) -> Option<&str> {
        self.lines.first().map(|l| l.text.as_str())
    }

    /// All lines joined with `\n`, without indentation.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDecl {
    /// Inner attributes and `//!` docs at the top of the file.
    pub inner: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDecl {
    pub vis: String,
    pub name: String,
    /// `mod name { ... }` rather than `mod name;`.
    pub inline: bool,
    pub inner: Vec<String>,
}

impl ModuleDecl {
    pub fn inline(name: impl Into<String>) -> Self {
        Self {
            vis: String::new(),
            name: name.into(),
            inline: true,
            inner: Vec::new(),
        }
    }

    pub fn with_vis(mut self, vis: impl Into<String>) -> Self {
        self.vis = vis.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseDecl {
    pub vis: String,
    /// Everything between `use` and `;`.
    pub tree: Block,
}

impl UseDecl {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            vis: String::new(),
            tree: Block::single(path),
        }
    }

    /// The use tree with whitespace removed, for comparisons.
    pub fn compact(&self) -> String {
        self.tree.text().split_whitespace().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub vis: String,
    pub name: String,
    pub generics: String,
    pub where_clause: Option<String>,
}

impl EnumDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            vis: String::new(),
            name: name.into(),
            generics: String::new(),
            where_clause: None,
        }
    }

    pub fn with_vis(mut self, vis: impl Into<String>) -> Self {
        self.vis = vis.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantPayload {
    Unit,
    /// Text between the parentheses.
    Tuple(Block),
    /// Text between the braces.
    Named(Block),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDecl {
    pub name: String,
    pub payload: VariantPayload,
    pub discriminant: Option<String>,
}

impl VariantDecl {
    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: VariantPayload::Unit,
            discriminant: None,
        }
    }

    pub fn tuple(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: VariantPayload::Tuple(Block::single(ty)),
            discriminant: None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.payload, VariantPayload::Unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructShape {
    Unit,
    Tuple,
    Named,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    pub vis: String,
    pub name: String,
    pub generics: String,
    pub shape: StructShape,
    pub where_clause: Option<String>,
}

impl StructDecl {
    /// A struct with named fields (possibly none).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            vis: String::new(),
            name: name.into(),
            generics: String::new(),
            shape: StructShape::Named,
            where_clause: None,
        }
    }

    pub fn with_vis(mut self, vis: impl Into<String>) -> Self {
        self.vis = vis.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub vis: String,
    /// `None` for tuple struct fields.
    pub name: Option<String>,
    pub ty: String,
}

impl FieldDecl {
    pub fn named(vis: impl Into<String>, name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            vis: vis.into(),
            name: Some(name.into()),
            ty: ty.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplDecl {
    pub unsafety: bool,
    /// `<...>` after `impl`, or empty.
    pub generics: String,
    pub trait_ref: Option<String>,
    pub self_ty: String,
    pub where_clause: Option<String>,
}

impl ImplDecl {
    pub fn inherent(self_ty: impl Into<String>) -> Self {
        Self {
            unsafety: false,
            generics: String::new(),
            trait_ref: None,
            self_ty: self_ty.into(),
            where_clause: None,
        }
    }

    pub fn of_trait(trait_ref: impl Into<String>, self_ty: impl Into<String>) -> Self {
        Self {
            trait_ref: Some(trait_ref.into()),
            ..Self::inherent(self_ty)
        }
    }

    /// Last path segment of the implemented trait, without generic arguments.
    pub fn trait_name(&self) -> Option<&str> {
        let t = self.trait_ref.as_deref()?;
        let t = t.split('<').next().unwrap_or(t);
        Some(t.rsplit("::").next().unwrap_or(t).trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitDecl {
    pub vis: String,
    pub unsafety: bool,
    pub name: String,
    /// Generics and supertrait bounds following the name.
    pub tail: String,
    pub where_clause: Option<String>,
}

impl TraitDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            vis: String::new(),
            unsafety: false,
            name: name.into(),
            tail: String::new(),
            where_clause: None,
        }
    }

    pub fn with_vis(mut self, vis: impl Into<String>) -> Self {
        self.vis = vis.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub pattern: String,
    /// `None` for receivers such as `self` or `&mut self`.
    pub ty: Option<String>,
}

impl Param {
    pub fn is_receiver(&self) -> bool {
        self.ty.is_none() || self.pattern == "self" || self.pattern == "mut self"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnDecl {
    pub vis: String,
    /// `const`, `async`, `unsafe`, `extern "C"` in source order.
    pub qualifiers: String,
    pub name: String,
    pub generics: String,
    pub params: Vec<Param>,
    pub ret: Option<String>,
    pub where_clause: Vec<String>,
    /// `None` for a signature ending in `;`.
    pub body: Option<Block>,
}

impl FnDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            vis: String::new(),
            qualifiers: String::new(),
            name: name.into(),
            generics: String::new(),
            params: Vec::new(),
            ret: None,
            where_clause: Vec::new(),
            body: Some(Block::default()),
        }
    }

    pub fn with_vis(mut self, vis: impl Into<String>) -> Self {
        self.vis = vis.into();
        self
    }

    pub fn with_qualifiers(mut self, qualifiers: impl Into<String>) -> Self {
        self.qualifiers = qualifiers.into();
        self
    }

    pub fn with_generics(mut self, generics: impl Into<String>) -> Self {
        self.generics = generics.into();
        self
    }

    pub fn receiver(mut self, pattern: impl Into<String>) -> Self {
        self.params.push(Param {
            pattern: pattern.into(),
            ty: None,
        });
        self
    }

    pub fn param(mut self, pattern: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push(Param {
            pattern: pattern.into(),
            ty: Some(ty.into()),
        });
        self
    }

    pub fn returns(mut self, ty: impl Into<String>) -> Self {
        self.ret = Some(ty.into());
        self
    }

    pub fn where_pred(mut self, pred: impl Into<String>) -> Self {
        self.where_clause.push(pred.into());
        self
    }

    pub fn body<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body = Some(Block::from_lines(lines));
        self
    }

    pub fn signature_only(mut self) -> Self {
        self.body = None;
        self
    }

    pub fn has_receiver(&self) -> bool {
        self.params.first().is_some_and(Param::is_receiver)
    }

    /// Parameters other than the receiver.
    pub fn value_params(&self) -> &[Param] {
        if self.has_receiver() {
            &self.params[1..]
        } else {
            &self.params
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstDecl {
    pub vis: String,
    /// `const`, `static` or `static mut`.
    pub keyword: String,
    pub name: String,
    pub ty: String,
    pub value: Option<Block>,
}

impl ConstDecl {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            vis: String::new(),
            keyword: "const".into(),
            name: name.into(),
            ty: ty.into(),
            value: Some(Block::single(value)),
        }
    }

    pub fn with_vis(mut self, vis: impl Into<String>) -> Self {
        self.vis = vis.into();
        self
    }
}
