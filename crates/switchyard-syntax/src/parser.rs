//! Outline parser: recognizes item structure and keeps everything else as text.
//!
//! Declarations that code generation edits (modules, enums, structs, impls,
//! traits, functions, constants) are parsed into their structured form.
//! Function bodies, expressions and items the parser does not model are kept
//! as [`Block`]s so that re-emitting an untouched file reproduces it.
//!
//! Comment placement follows one rule: a comment group directly below an item
//! (at most one line break away) belongs to that item if a blank line or the
//! end of the enclosing container follows the group. Any other comment group
//! leads the next item, and groups left over at the end of a container become
//! standalone [`NodeKind::Comment`] nodes.

use winnow::combinator::{cut_err, opt};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::token::{literal, take_while};
use winnow::{ModalResult, Parser};

use switchyard_types::{Result, SwitchyardError};

use crate::decl::*;
use crate::emit::fingerprint;
use crate::scan::{self, Opaque};
use crate::tree::{Decor, Fragment, KeptSource, NodeKind, SyntaxTree};

fn make_cut_error(desc: &'static str) -> ErrMode<ContextError<StrContext>> {
    let mut e = ContextError::new();
    e.push(StrContext::Expected(StrContextValue::Description(desc)));
    ErrMode::Cut(e)
}

// ---------------------------------------------------------------------------
// Token helpers
// ---------------------------------------------------------------------------

/// Skip whitespace and comments inside a declaration header.
fn blank(input: &mut &str) {
    loop {
        *input = input.trim_start();
        match scan::opaque_at(input, None) {
            Some((len, Opaque::LineComment | Opaque::BlockComment)) => *input = &input[len..],
            _ => break,
        }
    }
}

fn identifier<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (
        opt("r#"),
        take_while(1, |c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn name(input: &mut &str) -> ModalResult<String> {
    blank(input);
    let ident = cut_err(identifier)
        .context(StrContext::Expected(StrContextValue::Description("identifier")))
        .parse_next(input)?;
    Ok(ident.to_string())
}

fn expect(input: &mut &str, token: &'static str, desc: &'static str) -> ModalResult<()> {
    blank(input);
    cut_err(literal(token))
        .context(StrContext::Expected(StrContextValue::Description(desc)))
        .void()
        .parse_next(input)
}

fn keyword(input: &mut &str, word: &'static str) -> ModalResult<()> {
    expect(input, word, word)?;
    blank(input);
    Ok(())
}

/// Consume a separating comma. Comments are left in place when none follows.
fn skip_comma(input: &mut &str) {
    let mut rest = *input;
    blank(&mut rest);
    if rest.starts_with(',') {
        *input = &rest[1..];
    }
}

fn peek_word(input: &str) -> &str {
    let end = input
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(input.len());
    &input[..end]
}

/// Whole-word check on the word that follows the first one.
fn second_word_is(input: &str, word: &str) -> bool {
    let mut rest = &input[peek_word(input).len()..];
    blank(&mut rest);
    scan::starts_with_word(rest, word)
}

/// `const`, `async`, `unsafe` and `extern "abi"` qualifiers up to `fn`.
fn fn_qualifiers(input: &mut &str) -> Option<String> {
    let mut rest = *input;
    let mut parts: Vec<String> = Vec::new();
    loop {
        blank(&mut rest);
        if scan::starts_with_word(rest, "fn") {
            *input = rest;
            return Some(parts.join(" "));
        }
        let word = peek_word(rest);
        match word {
            "const" | "async" | "unsafe" => {
                parts.push(word.to_string());
                rest = &rest[word.len()..];
            }
            "extern" => {
                rest = &rest[word.len()..];
                blank(&mut rest);
                match scan::opaque_at(rest, None) {
                    Some((len, Opaque::Str)) => {
                        parts.push(format!("extern {}", &rest[..len]));
                        rest = &rest[len..];
                    }
                    _ => parts.push("extern".to_string()),
                }
            }
            _ => return None,
        }
    }
}

fn visibility(input: &mut &str) -> ModalResult<String> {
    if !scan::starts_with_word(input, "pub") {
        return Ok(String::new());
    }
    *input = &input[3..];
    let mut rest = *input;
    blank(&mut rest);
    let mut vis = "pub".to_string();
    if rest.starts_with('(') {
        let len = scan::group_end(rest).ok_or_else(|| make_cut_error("closing `)`"))?;
        let inner = rest[1..len - 1].trim();
        let restricted = matches!(inner, "crate" | "super" | "self")
            || scan::starts_with_word(inner, "in");
        if restricted {
            vis = format!("pub({})", scan::normalize(inner));
            rest = &rest[len..];
        }
    }
    *input = rest;
    blank(input);
    Ok(vis)
}

fn generics(input: &mut &str) -> ModalResult<String> {
    blank(input);
    if !input.starts_with('<') {
        return Ok(String::new());
    }
    let len = scan::angle_group_end(input).ok_or_else(|| make_cut_error("closing `>`"))?;
    let text = scan::normalize(&input[..len]);
    *input = &input[len..];
    blank(input);
    Ok(text)
}

/// A `where` clause running up to the next top-level `{` or `;`.
fn where_clause(input: &mut &str) -> Option<String> {
    blank(input);
    if !scan::starts_with_word(input, "where") {
        return None;
    }
    *input = &input[5..];
    let end = scan::find_top_level(input, true, |_, r| r.starts_with('{') || r.starts_with(';'));
    let text = scan::normalize(&input[..end]);
    *input = &input[end..];
    Some(text.trim_end_matches(',').to_string())
}

/// Attribute text, collapsed to one line when it spans several.
fn attr_text(raw: &str) -> String {
    if raw.contains('\n') {
        scan::normalize(raw)
    } else {
        raw.trim_end().to_string()
    }
}

fn is_plain_line_comment(s: &str) -> bool {
    s.starts_with("//") && !is_outer_doc_line(s) && !s.starts_with("//!")
}

fn is_plain_block_comment(s: &str) -> bool {
    s.starts_with("/*") && !is_outer_doc_block(s) && !s.starts_with("/*!")
}

fn is_outer_doc_line(s: &str) -> bool {
    s.starts_with("///") && !s.starts_with("////")
}

fn is_outer_doc_block(s: &str) -> bool {
    s.starts_with("/**") && !s.starts_with("/**/") && !s.starts_with("/***")
}

fn is_inner_attr(s: &str) -> bool {
    s.starts_with("#![") || s.starts_with("//!") || s.starts_with("/*!")
}

fn parse_param(text: &str) -> Param {
    let text = scan::normalize(text);
    match scan::single_colon(&text) {
        Some(at) => Param {
            pattern: text[..at].trim().to_string(),
            ty: Some(text[at + 1..].trim().to_string()),
        },
        None => Param {
            pattern: text,
            ty: None,
        },
    }
}

/// Text inside a variant's parentheses or braces.
fn payload_block(inner: &str) -> Block {
    if inner.contains('\n') {
        scan::body_block(inner)
    } else {
        Block::single(scan::normalize(inner))
    }
}

/// Attach `text`, the declaration as written, when rendering `fragment`
/// would drop some of its comments.
fn keep_source(fragment: Fragment, text: &str, column: usize) -> Fragment {
    let written = scan::comment_count(text);
    if written == 0 {
        return fragment;
    }
    let tree = SyntaxTree::from_fragment(fragment);
    let canonical = fingerprint(&tree, tree.root());
    let mut fragment = tree.fragment(tree.root());
    if scan::comment_count(&canonical) < written {
        fragment.kept = Some(KeptSource {
            text: scan::item_block(text, column),
            fingerprint: canonical,
        });
    }
    fragment
}

// ---------------------------------------------------------------------------
// Comment groups
// ---------------------------------------------------------------------------

struct CommentGroup {
    lines: Vec<String>,
    newlines_before: usize,
}

#[derive(Default)]
struct Gap {
    comments: Vec<CommentGroup>,
    newlines_after: usize,
}

fn flatten(groups: Vec<CommentGroup>) -> Vec<String> {
    groups.into_iter().flat_map(|g| g.lines).collect()
}

/// Move the comment groups that hug the previous item into its trailing decor.
fn attach_trailing(
    decor: &mut Decor,
    pending: &mut Vec<CommentGroup>,
    newlines_after: usize,
    at_end: bool,
) {
    if pending.first().is_none_or(|g| g.newlines_before > 1) {
        return;
    }
    let mut hugging = 1;
    while hugging < pending.len() && pending[hugging].newlines_before == 1 {
        hugging += 1;
    }
    let followed_by = pending
        .get(hugging)
        .map_or(newlines_after, |g| g.newlines_before);
    if followed_by >= 2 || (hugging == pending.len() && at_end) {
        decor
            .trailing
            .extend(pending.drain(..hugging).flat_map(|g| g.lines));
    }
}

// ---------------------------------------------------------------------------
// Outline parser
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Member {
    Variant,
    Field,
}

struct Outline<'s> {
    src: &'s str,
}

impl<'s> Outline<'s> {
    fn column(&self, input: &str) -> usize {
        let offset = self.src.len() - input.len();
        let line_start = self.src[..offset].rfind('\n').map_or(0, |p| p + 1);
        offset - line_start
    }

    /// Whitespace and plain comments between items.
    fn gap(&self, input: &mut &'s str) -> Gap {
        let mut gap = Gap::default();
        let mut newlines = 0;
        loop {
            let trimmed = input.trim_start();
            newlines += input[..input.len() - trimmed.len()].matches('\n').count();
            *input = trimmed;
            if is_plain_line_comment(input) {
                let end = input.find('\n').unwrap_or(input.len());
                gap.comments.push(CommentGroup {
                    lines: vec![input[..end].trim_end().to_string()],
                    newlines_before: newlines,
                });
                *input = &input[end..];
            } else if is_plain_block_comment(input) {
                let column = self.column(input);
                let len = scan::opaque_at(input, None).map_or(input.len(), |(len, _)| len);
                let block = scan::item_block(&input[..len], column);
                gap.comments.push(CommentGroup {
                    lines: block.lines.into_iter().map(|l| l.text).collect(),
                    newlines_before: newlines,
                });
                *input = &input[len..];
            } else {
                break;
            }
            newlines = 0;
        }
        gap.newlines_after = newlines;
        gap
    }

    /// Items of a file (`closed == false`) or of a braced container.
    fn items(&self, input: &mut &'s str, closed: bool) -> ModalResult<(Vec<String>, Vec<Fragment>)> {
        self.container(input, closed, true, |outline, input| outline.item(input))
    }

    fn members(&self, input: &mut &'s str, member: Member) -> ModalResult<Vec<Fragment>> {
        let (_, members) = self.container(input, true, false, |outline, input| match member {
            Member::Variant => outline.variant(input),
            Member::Field => outline.field(input),
        })?;
        Ok(members)
    }

    fn container(
        &self,
        input: &mut &'s str,
        closed: bool,
        allow_inner: bool,
        mut entry: impl FnMut(&Self, &mut &'s str) -> ModalResult<Fragment>,
    ) -> ModalResult<(Vec<String>, Vec<Fragment>)> {
        let mut inner = Vec::new();
        let mut out: Vec<Fragment> = Vec::new();
        loop {
            let gap = self.gap(input);
            let at_end = input.is_empty() || (closed && input.starts_with('}'));
            let mut pending = gap.comments;
            if let Some(last) = out.last_mut() {
                attach_trailing(&mut last.decor, &mut pending, gap.newlines_after, at_end);
            }
            if at_end {
                if closed && input.is_empty() {
                    return Err(make_cut_error("closing `}`"));
                }
                if !pending.is_empty() {
                    out.push(Fragment::new(NodeKind::Comment(flatten(pending))));
                }
                break;
            }
            if allow_inner && out.is_empty() && is_inner_attr(input) {
                inner.extend(flatten(pending));
                inner.extend(self.inner_attr(input)?);
                continue;
            }
            let mut fragment = entry(self, input)?;
            let mut comments = flatten(pending);
            comments.append(&mut fragment.decor.comments);
            fragment.decor.comments = comments;
            out.push(fragment);
        }
        Ok((inner, out))
    }

    fn inner_attr(&self, input: &mut &'s str) -> ModalResult<Vec<String>> {
        if input.starts_with("#![") {
            let len = 2 + scan::group_end(&input[2..]).ok_or_else(|| make_cut_error("closing `]`"))?;
            let text = attr_text(&input[..len]);
            *input = &input[len..];
            Ok(vec![text])
        } else if input.starts_with("//!") {
            let end = input.find('\n').unwrap_or(input.len());
            let text = input[..end].trim_end().to_string();
            *input = &input[end..];
            Ok(vec![text])
        } else {
            let column = self.column(input);
            let len = scan::opaque_at(input, None).map_or(input.len(), |(len, _)| len);
            let block = scan::item_block(&input[..len], column);
            *input = &input[len..];
            Ok(block.lines.into_iter().map(|l| l.text).collect())
        }
    }

    /// Outer attributes, doc comments and any plain comments among them.
    fn outer_decor(&self, input: &mut &'s str) -> ModalResult<Decor> {
        let mut decor = Decor::default();
        loop {
            let gap = self.gap(input);
            decor.comments.extend(flatten(gap.comments));
            if input.starts_with("#[") {
                let len = 1 + scan::group_end(&input[1..]).ok_or_else(|| make_cut_error("closing `]`"))?;
                decor.attrs.push(attr_text(&input[..len]));
                *input = &input[len..];
            } else if is_outer_doc_line(input) {
                let end = input.find('\n').unwrap_or(input.len());
                decor.attrs.push(input[..end].trim_end().to_string());
                *input = &input[end..];
            } else if is_outer_doc_block(input) {
                let column = self.column(input);
                let len = scan::opaque_at(input, None).map_or(input.len(), |(len, _)| len);
                let block = scan::item_block(&input[..len], column);
                decor.attrs.extend(block.lines.into_iter().map(|l| l.text));
                *input = &input[len..];
            } else {
                break;
            }
        }
        Ok(decor)
    }

    fn item(&self, input: &mut &'s str) -> ModalResult<Fragment> {
        let decor = self.outer_decor(input)?;
        let column = self.column(input);
        let start = *input;
        let vis = visibility(input)?;
        let head: &'s str = *input;
        let fragment = match peek_word(head) {
            "mod" => self.module(input, vis)?,
            "use" => self.use_item(input, vis, column)?,
            "enum" => self.enum_item(input, vis)?,
            "struct" => self.struct_item(input, vis)?,
            "impl" => self.impl_item(input, false)?,
            "trait" => self.trait_item(input, vis, false)?,
            "unsafe" if second_word_is(input, "impl") => {
                keyword(input, "unsafe")?;
                self.impl_item(input, true)?
            }
            "unsafe" if second_word_is(input, "trait") => {
                keyword(input, "unsafe")?;
                self.trait_item(input, vis, true)?
            }
            "static" => self.const_item(input, vis, column)?,
            "fn" | "const" | "async" | "unsafe" | "extern" => match fn_qualifiers(input) {
                Some(qualifiers) => self.fn_item(input, vis, qualifiers)?,
                None if peek_word(input) == "const" => self.const_item(input, vis, column)?,
                None => self.verbatim(input, start, column)?,
            },
            _ => self.verbatim(input, start, column)?,
        };
        let text = &start[..start.len() - input.len()];
        Ok(keep_source(fragment, text, column).with_decor(decor))
    }

    fn module(&self, input: &mut &'s str, vis: String) -> ModalResult<Fragment> {
        keyword(input, "mod")?;
        let name = name(input)?;
        blank(input);
        if input.starts_with(';') {
            *input = &input[1..];
            return Ok(Fragment::new(NodeKind::Module(ModuleDecl {
                vis,
                name,
                inline: false,
                inner: Vec::new(),
            })));
        }
        expect(input, "{", "`{` or `;` after module name")?;
        let (inner, children) = self.items(input, true)?;
        expect(input, "}", "closing `}`")?;
        Ok(Fragment::new(NodeKind::Module(ModuleDecl {
            vis,
            name,
            inline: true,
            inner,
        }))
        .with_children(children))
    }

    fn use_item(&self, input: &mut &'s str, vis: String, column: usize) -> ModalResult<Fragment> {
        keyword(input, "use")?;
        let end = scan::find_top_level(input, false, |_, r| r.starts_with(';'));
        if end >= input.len() || !input[end..].starts_with(';') {
            return Err(make_cut_error("`;` after use declaration"));
        }
        let tree = scan::item_block(input[..end].trim_end(), column);
        *input = &input[end + 1..];
        Ok(Fragment::new(NodeKind::Use(UseDecl { vis, tree })))
    }

    fn enum_item(&self, input: &mut &'s str, vis: String) -> ModalResult<Fragment> {
        keyword(input, "enum")?;
        let name = name(input)?;
        let generics = generics(input)?;
        let where_clause = where_clause(input);
        expect(input, "{", "`{` after enum header")?;
        let variants = self.members(input, Member::Variant)?;
        expect(input, "}", "closing `}`")?;
        Ok(Fragment::new(NodeKind::Enum(EnumDecl {
            vis,
            name,
            generics,
            where_clause,
        }))
        .with_children(variants))
    }

    fn variant(&self, input: &mut &'s str) -> ModalResult<Fragment> {
        let decor = self.outer_decor(input)?;
        let column = self.column(input);
        let start = *input;
        visibility(input)?;
        let name = name(input)?;
        let mut rest = *input;
        blank(&mut rest);
        let payload = if rest.starts_with('(') || rest.starts_with('{') {
            *input = rest;
            let len = scan::group_end(input).ok_or_else(|| make_cut_error("closing delimiter"))?;
            let block = payload_block(&input[1..len - 1]);
            let payload = if input.starts_with('(') {
                VariantPayload::Tuple(block)
            } else {
                VariantPayload::Named(block)
            };
            *input = &input[len..];
            payload
        } else {
            VariantPayload::Unit
        };
        let mut rest = *input;
        blank(&mut rest);
        let discriminant = if rest.starts_with('=') {
            *input = &rest[1..];
            let end = scan::find_top_level(input, false, |_, r| r.starts_with(','));
            let end = scan::code_len(&input[..end]);
            let text = scan::normalize(&input[..end]);
            *input = &input[end..];
            Some(text)
        } else {
            None
        };
        let text = &start[..start.len() - input.len()];
        skip_comma(input);
        let variant = Fragment::new(NodeKind::Variant(VariantDecl {
            name,
            payload,
            discriminant,
        }));
        Ok(keep_source(variant, text, column).with_decor(decor))
    }

    fn field(&self, input: &mut &'s str) -> ModalResult<Fragment> {
        let decor = self.outer_decor(input)?;
        let column = self.column(input);
        let start = *input;
        let vis = visibility(input)?;
        let name = name(input)?;
        expect(input, ":", "`:` after field name")?;
        let end = scan::find_top_level(input, true, |_, r| r.starts_with(','));
        let end = scan::code_len(&input[..end]);
        let ty = scan::normalize(&input[..end]);
        *input = &input[end..];
        let text = &start[..start.len() - input.len()];
        skip_comma(input);
        let field = Fragment::new(NodeKind::Field(FieldDecl {
            vis,
            name: Some(name),
            ty,
        }));
        Ok(keep_source(field, text, column).with_decor(decor))
    }

    fn struct_item(&self, input: &mut &'s str, vis: String) -> ModalResult<Fragment> {
        keyword(input, "struct")?;
        let name = name(input)?;
        let generics = generics(input)?;
        let mut fields = Vec::new();
        let shape;
        let where_clause;
        if input.starts_with(';') {
            shape = StructShape::Unit;
            where_clause = None;
            *input = &input[1..];
        } else if input.starts_with('(') {
            shape = StructShape::Tuple;
            let len = scan::group_end(input).ok_or_else(|| make_cut_error("closing `)`"))?;
            for part in scan::split_top_level(&input[1..len - 1], ',', true) {
                if part.trim().is_empty() {
                    continue;
                }
                let mut part = part;
                let decor = self.outer_decor(&mut part)?;
                if part.trim().is_empty() {
                    continue;
                }
                let field_vis = visibility(&mut part)?;
                fields.push(
                    Fragment::new(NodeKind::Field(FieldDecl {
                        vis: field_vis,
                        name: None,
                        ty: scan::normalize(part),
                    }))
                    .with_decor(decor),
                );
            }
            *input = &input[len..];
            where_clause = where_clause_of(input);
            expect(input, ";", "`;` after tuple struct")?;
        } else {
            shape = StructShape::Named;
            where_clause = where_clause_of(input);
            expect(input, "{", "`{`, `(` or `;` after struct name")?;
            fields = self.members(input, Member::Field)?;
            expect(input, "}", "closing `}`")?;
        }
        Ok(Fragment::new(NodeKind::Struct(StructDecl {
            vis,
            name,
            generics,
            shape,
            where_clause,
        }))
        .with_children(fields))
    }

    fn impl_item(&self, input: &mut &'s str, unsafety: bool) -> ModalResult<Fragment> {
        keyword(input, "impl")?;
        let generics = generics(input)?;
        let end = scan::find_top_level(input, true, |_, r| r.starts_with('{') || r.starts_with(';'));
        let header = &input[..end];
        *input = &input[end..];
        let (head, where_text) = scan::split_at_word(header, "where");
        let (trait_ref, self_ty) = match scan::split_at_word(head, "for") {
            (t, Some(s)) => (Some(scan::normalize(t)), scan::normalize(s)),
            (s, None) => (None, scan::normalize(s)),
        };
        let where_clause = where_text
            .map(|w| scan::normalize(w).trim_end_matches(',').to_string())
            .filter(|w| !w.is_empty());
        expect(input, "{", "`{` after impl header")?;
        let (_, children) = self.items(input, true)?;
        expect(input, "}", "closing `}`")?;
        Ok(Fragment::new(NodeKind::Impl(ImplDecl {
            unsafety,
            generics,
            trait_ref,
            self_ty,
            where_clause,
        }))
        .with_children(children))
    }

    fn trait_item(&self, input: &mut &'s str, vis: String, unsafety: bool) -> ModalResult<Fragment> {
        keyword(input, "trait")?;
        let name = name(input)?;
        let end = scan::find_top_level(input, true, |_, r| r.starts_with('{'));
        let (head, where_text) = scan::split_at_word(&input[..end], "where");
        let tail = scan::normalize(head);
        let where_clause = where_text
            .map(|w| scan::normalize(w).trim_end_matches(',').to_string())
            .filter(|w| !w.is_empty());
        *input = &input[end..];
        expect(input, "{", "`{` after trait header")?;
        let (_, children) = self.items(input, true)?;
        expect(input, "}", "closing `}`")?;
        Ok(Fragment::new(NodeKind::Trait(TraitDecl {
            vis,
            unsafety,
            name,
            tail,
            where_clause,
        }))
        .with_children(children))
    }

    fn fn_item(&self, input: &mut &'s str, vis: String, qualifiers: String) -> ModalResult<Fragment> {
        keyword(input, "fn")?;
        let name = name(input)?;
        let generics = generics(input)?;
        if !input.starts_with('(') {
            return Err(make_cut_error("`(` after function name"));
        }
        let len = scan::group_end(input).ok_or_else(|| make_cut_error("closing `)`"))?;
        let params = scan::split_top_level(&input[1..len - 1], ',', true)
            .into_iter()
            .map(parse_param)
            .filter(|p| !p.pattern.is_empty())
            .collect();
        *input = &input[len..];
        blank(input);

        let ret = if input.starts_with("->") {
            *input = &input[2..];
            let end = scan::find_top_level(input, true, |prev, r| {
                r.starts_with('{') || r.starts_with(';') || scan::at_word("where")(prev, r)
            });
            let text = scan::normalize(&input[..end]);
            *input = &input[end..];
            Some(text)
        } else {
            None
        };

        blank(input);
        let mut where_preds = Vec::new();
        if scan::starts_with_word(input, "where") {
            *input = &input[5..];
            let end = scan::find_top_level(input, true, |_, r| r.starts_with('{') || r.starts_with(';'));
            where_preds = scan::split_top_level(&input[..end], ',', true)
                .into_iter()
                .map(scan::normalize)
                .filter(|p| !p.is_empty())
                .collect();
            *input = &input[end..];
        }

        blank(input);
        let body = if input.starts_with(';') {
            *input = &input[1..];
            None
        } else if input.starts_with('{') {
            let len = scan::group_end(input).ok_or_else(|| make_cut_error("closing `}`"))?;
            let block = scan::body_block(&input[1..len - 1]);
            *input = &input[len..];
            Some(block)
        } else {
            return Err(make_cut_error("function body or `;`"));
        };

        Ok(Fragment::new(NodeKind::Fn(FnDecl {
            vis,
            qualifiers,
            name,
            generics,
            params,
            ret,
            where_clause: where_preds,
            body,
        })))
    }

    fn const_item(&self, input: &mut &'s str, vis: String, column: usize) -> ModalResult<Fragment> {
        let keyword_text = if scan::starts_with_word(input, "static") {
            keyword(input, "static")?;
            if scan::starts_with_word(input, "mut") {
                keyword(input, "mut")?;
                "static mut"
            } else {
                "static"
            }
        } else {
            keyword(input, "const")?;
            "const"
        };
        let name = name(input)?;
        expect(input, ":", "`:` after constant name")?;
        let end = scan::find_top_level(input, true, |_, r| r.starts_with('=') || r.starts_with(';'));
        let ty = scan::normalize(&input[..end]);
        *input = &input[end..];
        let value = if input.starts_with('=') {
            *input = &input[1..];
            let end = scan::find_top_level(input, false, |_, r| r.starts_with(';'));
            let block = scan::item_block(input[..end].trim(), column);
            *input = &input[end..];
            Some(block)
        } else {
            None
        };
        expect(input, ";", "`;` after constant")?;
        Ok(Fragment::new(NodeKind::Const(ConstDecl {
            vis,
            keyword: keyword_text.to_string(),
            name,
            ty,
            value,
        })))
    }

    /// Any other item, up to its terminating `;` or closing brace.
    fn verbatim(&self, input: &mut &'s str, start: &'s str, column: usize) -> ModalResult<Fragment> {
        *input = start;
        let stop = scan::find_top_level(input, false, |_, r| r.starts_with(';') || r.starts_with('{'));
        let rest = &input[stop..];
        let len = if rest.starts_with(';') {
            stop + 1
        } else if rest.starts_with('{') {
            stop + scan::group_end(rest).ok_or_else(|| make_cut_error("closing `}`"))?
        } else {
            return Err(make_cut_error("item"));
        };
        let block = scan::item_block(&input[..len], column);
        *input = &input[len..];
        Ok(Fragment::new(NodeKind::Verbatim(block)))
    }
}

fn where_clause_of(input: &mut &str) -> Option<String> {
    where_clause(input).filter(|w| !w.is_empty())
}

fn offset_to_line_col(src: &str, remaining_len: usize) -> (usize, usize) {
    let consumed = src.len() - remaining_len;
    let prefix = &src[..consumed];
    let line = prefix.matches('\n').count() + 1;
    let col = match prefix.rfind('\n') {
        Some(pos) => consumed - pos,
        None => consumed + 1,
    };
    (line, col)
}

/// Parse a Rust source file into a [`SyntaxTree`].
pub fn parse_document(src: &str) -> Result<SyntaxTree> {
    let outline = Outline { src };
    let mut input = src;
    let (inner, items) = outline.items(&mut input, false).map_err(|e| {
        let (line, col) = offset_to_line_col(src, input.len());
        SwitchyardError::DocumentParse {
            line,
            col,
            message: e.to_string(),
        }
    })?;
    let root = Fragment::new(NodeKind::File(FileDecl { inner })).with_children(items);
    let tree = SyntaxTree::from_fragment(root);
    tracing::debug!(
        items = tree.children(tree.root()).len(),
        bytes = src.len(),
        "parsed document outline"
    );
    Ok(tree)
}
