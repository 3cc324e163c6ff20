//! Outline-level Rust syntax trees for Switchyard.
//!
//! [`parse_document`] reads a source file into a persistent [`SyntaxTree`]:
//! item structure is parsed, while bodies and anything unmodelled are carried
//! as text. [`emit`] renders a tree back to source deterministically, so
//! `emit(parse(emit(tree)))` equals `emit(tree)`.
//!
//! # Example
//! ```
//! use switchyard_syntax::{emit, parse_document, EmitOptions};
//!
//! let tree = parse_document("pub enum Door { Open, Closed }\n").unwrap();
//! let text = emit(&tree, &EmitOptions::default());
//! assert_eq!(text, "pub enum Door {\n    Open,\n    Closed,\n}\n");
//! ```

pub mod decl;
mod emit;
mod parser;
mod scan;
pub mod tree;

pub use decl::*;
pub use emit::{emit, EmitOptions};
pub use parser::parse_document;
pub use tree::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(src: &str) -> String {
        let tree = parse_document(src).unwrap();
        emit(&tree, &EmitOptions::default())
    }

    const SAMPLE: &str = r#"//! Crate docs.

use std::fmt;
use std::collections::{
    HashMap,
    HashSet,
};

// The door.
#[derive(Debug, Clone)]
pub enum Door {
    /// Open.
    Open,
    Closed(u8),
    Locked { code: u32 },
}

pub mod door_state {
    use super::*;

    #[derive(Debug, Default)]
    pub struct Open_ {}

    impl Open_ {
        // region: Open -> Closed
        pub fn close(self) -> Closed_ {
            let text = "multi
line";
            Closed_::default()
        }
        // endregion
    }
}

impl fmt::Display for Door {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

const A: u8 = 1;
const B: u8 = 2;

macro_rules! noop {
    () => {};
}
"#;

    #[test]
    fn canonical_source_round_trips_exactly() {
        assert_eq!(round_trip(SAMPLE), SAMPLE);
    }

    #[test]
    fn messy_source_is_normalized_then_stable() {
        let first = round_trip("pub   fn   f ( a : u8 ,b:u16 )->u8{a}");
        assert_eq!(first, "pub fn f(a: u8, b: u16) -> u8 {\n    a\n}\n");
        assert_eq!(round_trip(&first), first);
    }

    #[test]
    fn trailing_and_leading_comments() {
        let src = "struct A;\n// about A\n\n// about B\nstruct B;\n";
        let tree = parse_document(src).unwrap();
        let items = tree.children(tree.root());
        assert_eq!(tree.get(items[0]).decor.trailing, vec!["// about A"]);
        assert_eq!(tree.get(items[1]).decor.comments, vec!["// about B"]);
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn same_line_comment_trails_its_item() {
        let src = "fn a() {} // note\n\nfn b() {}\n";
        let tree = parse_document(src).unwrap();
        let a = tree.children(tree.root())[0];
        assert_eq!(tree.get(a).decor.trailing, vec!["// note"]);
        assert_eq!(round_trip(src), "fn a() {}\n// note\n\nfn b() {}\n");
    }

    #[test]
    fn dangling_comment_becomes_its_own_node() {
        let src = "fn a() {}\n\n// the end\n";
        let tree = parse_document(src).unwrap();
        let items = tree.children(tree.root());
        assert_eq!(items.len(), 2);
        assert!(matches!(tree.get(items[1]).kind, NodeKind::Comment(_)));
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn block_comments_keep_their_shape() {
        let src = "/*\n * Licensed.\n */\nfn a() {}\n";
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn impl_headers_with_generics_and_where() {
        let src = "impl<T> From<T> for Wrapper<T>\nwhere\n    T: Clone,\n{\n}\n";
        let tree = parse_document(src).unwrap();
        let imp = tree.get(tree.children(tree.root())[0]).as_impl().unwrap().clone();
        assert_eq!(imp.generics, "<T>");
        assert_eq!(imp.trait_ref.as_deref(), Some("From<T>"));
        assert_eq!(imp.trait_name(), Some("From"));
        assert_eq!(imp.self_ty, "Wrapper<T>");
        assert_eq!(imp.where_clause.as_deref(), Some("T: Clone"));
        assert_eq!(
            round_trip(src),
            "impl<T> From<T> for Wrapper<T> where T: Clone {}\n"
        );
    }

    #[test]
    fn function_signatures_are_structured() {
        let src = "pub(crate) async fn run<F>(mut self, deferred: impl Future<Output = Self>, f: F) -> Result<(), E> where F: Fn(u8) -> u8 { todo!() }";
        let tree = parse_document(src).unwrap();
        let f = tree.get(tree.children(tree.root())[0]).as_fn().unwrap().clone();
        assert_eq!(f.vis, "pub(crate)");
        assert_eq!(f.qualifiers, "async");
        assert_eq!(f.generics, "<F>");
        assert!(f.has_receiver());
        assert_eq!(f.params[0].pattern, "mut self");
        assert_eq!(f.params[1].pattern, "deferred");
        assert_eq!(f.params[1].ty.as_deref(), Some("impl Future<Output = Self>"));
        assert_eq!(f.ret.as_deref(), Some("Result<(), E>"));
        assert_eq!(f.where_clause, vec!["F: Fn(u8) -> u8"]);
        let emitted = round_trip(src);
        assert!(emitted.contains("\nwhere\n    F: Fn(u8) -> u8,\n{\n"));
        assert_eq!(round_trip(&emitted), emitted);
    }

    #[test]
    fn long_signatures_split_per_parameter() {
        let f = FnDecl::new("match_with")
            .with_vis("pub")
            .with_generics("<T>")
            .receiver("&self")
            .param("not_registered", "impl FnOnce() -> T")
            .param("demo_registered", "impl FnOnce() -> T")
            .param("full", "impl FnOnce() -> T")
            .returns("T")
            .body(["todo!()"]);
        let root = Fragment::new(NodeKind::File(FileDecl::default()))
            .with_child(Fragment::new(NodeKind::Fn(f)));
        let tree = SyntaxTree::from_fragment(root);
        let text = emit(&tree, &EmitOptions::default());
        assert_eq!(
            text,
            "pub fn match_with<T>(\n    &self,\n    not_registered: impl FnOnce() -> T,\n    demo_registered: impl FnOnce() -> T,\n    full: impl FnOnce() -> T,\n) -> T {\n    todo!()\n}\n"
        );
        assert_eq!(round_trip(&text), text);
    }

    #[test]
    fn structs_of_every_shape() {
        let src = "pub struct Unit;\n\npub struct Pair(pub u8, String);\n\npub struct Named<T> where T: Clone {\n    pub value: T,\n    count: HashMap<String, Vec<u8>>,\n}\n";
        let tree = parse_document(src).unwrap();
        let items = tree.children(tree.root());
        assert_eq!(tree.get(items[0]).as_struct().unwrap().shape, StructShape::Unit);
        let pair = items[1];
        assert_eq!(tree.get(pair).as_struct().unwrap().shape, StructShape::Tuple);
        let pair_fields = tree.children(pair);
        assert_eq!(tree.get(pair_fields[0]).as_field().unwrap().vis, "pub");
        let named = items[2];
        let count = tree.get(tree.children(named)[1]).as_field().unwrap();
        assert_eq!(count.ty, "HashMap<String, Vec<u8>>");
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn comments_inside_signatures_survive() {
        let sources = [
            "fn f(\n    a: u8, // first\n    b: u8,\n) {}\n",
            "fn g<T>(value: T)\nwhere\n    T: Clone, // needs clone\n{\n    value.clone();\n}\n",
            "struct W<T>\nwhere\n    T: Clone, // needs clone\n{\n    value: T,\n}\n",
            "struct P(\n    u8, // x\n    u8,\n);\n",
            "enum E {\n    A(/* raw */ u8),\n    B = /* two */ 2,\n}\n",
        ];
        for src in sources {
            let first = round_trip(src);
            assert_eq!(first, src);
            assert_eq!(round_trip(&first), first);
        }
    }

    #[test]
    fn nested_commented_declarations_keep_their_indentation() {
        let src = "impl P {\n    fn new(\n        a: u8, // first\n    ) -> Self {\n        Self(a, a)\n    }\n}\n\nstruct S {\n    map: HashMap<\n        String, // key\n        u8,\n    >,\n    n: u8,\n}\n";
        assert_eq!(round_trip(src), src);
        let tree = parse_document(src).unwrap();
        let imp = tree.children(tree.root())[0];
        assert!(tree.get(imp).kept.is_none());
        assert!(tree.get(tree.children(imp)[0]).kept.is_some());
    }

    #[test]
    fn edited_declaration_drops_kept_source() {
        let mut tree = parse_document("fn f(\n    a: u8, // first\n    b: u8,\n) {}\n").unwrap();
        let f = tree.children(tree.root())[0];
        let decl = tree.get(f).as_fn().unwrap();
        let params: Vec<_> = decl.params.iter().map(|p| p.pattern.as_str()).collect();
        assert_eq!(params, vec!["a", "b"]);
        tree.update(f, |n| {
            if let NodeKind::Fn(d) = &mut n.kind {
                d.name = "renamed".into();
            }
        })
        .unwrap();
        assert_eq!(emit(&tree, &EmitOptions::default()), "fn renamed(a: u8, b: u8) {}\n");
    }

    #[test]
    fn kept_source_ignores_decor_edits() {
        let mut tree = parse_document("struct P(\n    u8, // x\n    u8,\n);\n").unwrap();
        let p = tree.children(tree.root())[0];
        tree.update(p, |n| n.decor.attrs.push("#[derive(Debug)]".into())).unwrap();
        assert_eq!(
            emit(&tree, &EmitOptions::default()),
            "#[derive(Debug)]\nstruct P(\n    u8, // x\n    u8,\n);\n"
        );
    }

    #[test]
    fn unknown_items_are_kept_verbatim() {
        let src = "extern crate alloc;\n\ntype Alias = Vec<u8>;\n\nstatic mut COUNT: usize = 0;\n\nthread_local! {\n    static X: u8 = 1;\n}\n";
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn raw_strings_and_chars_do_not_confuse_braces() {
        let src = "fn f() {\n    let a = r#\"}\"#;\n    let b = '}';\n    let c: &'static str = \"{\";\n}\n";
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn const_items_group_without_blank_lines() {
        let src = "pub const A: u8 = 1;\npub const B: &str = \"b\";\n";
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn indent_width_is_configurable() {
        let tree = parse_document("enum E { A }").unwrap();
        let text = emit(&tree, &EmitOptions { indent_width: 2 });
        assert_eq!(text, "enum E {\n  A,\n}\n");
    }

    #[test]
    fn unterminated_item_reports_position() {
        let err = parse_document("struct A;\nfn broken( {\n").unwrap_err();
        match err {
            switchyard_types::SwitchyardError::DocumentParse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected DocumentParse, got {other:?}"),
        }
    }

    #[test]
    fn missing_closing_brace_is_an_error() {
        assert!(parse_document("mod m {\n    fn a() {}\n").is_err());
    }
}
