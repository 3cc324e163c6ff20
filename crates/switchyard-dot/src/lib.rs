//! DOT parser for the Graphviz subset used to describe state machines.
//!
//! Parses `digraph Name { ... }` with nodes, labeled edges, subgraphs, and typed attributes.
//! Produces a typed AST: [`DotGraph`], [`NodeDef`], [`EdgeDef`], [`SubgraphDef`], [`AttributeValue`].
//! Nodes and edges keep their declaration order, which downstream code relies on.
//!
//! # Example
//! ```
//! let dot = r#"digraph Door { Open -> Closed [label="Close"] }"#;
//! let graph = switchyard_dot::parse(dot).unwrap();
//! assert_eq!(graph.name.as_deref(), Some("Door"));
//! assert_eq!(graph.edges[0].label(), Some("Close"));
//! ```

pub mod ast;
mod parser;

pub use ast::*;
pub use parser::parse;

#[cfg(test)]
mod tests {
    use super::*;

    fn node_ids(graph: &DotGraph) -> Vec<&str> {
        graph.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn parse_simple_chain() {
        let input = "digraph Test { start -> plan -> done }";
        let graph = parse(input).unwrap();
        assert_eq!(graph.name.as_deref(), Some("Test"));
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].from, "start");
        assert_eq!(graph.edges[0].to, "plan");
        assert_eq!(graph.edges[1].from, "plan");
        assert_eq!(graph.edges[1].to, "done");
        assert_eq!(node_ids(&graph), vec!["start", "plan", "done"]);
    }

    #[test]
    fn node_order_follows_first_mention() {
        let input = r#"digraph G {
            Zeta;
            Alpha -> Mid [label="Go"];
            Beta;
            Zeta -> Alpha [label="Back"];
        }"#;
        let graph = parse(input).unwrap();
        assert_eq!(node_ids(&graph), vec!["Zeta", "Alpha", "Mid", "Beta"]);
    }

    #[test]
    fn redeclared_node_keeps_position_and_merges_attrs() {
        let input = r#"digraph G {
            A -> B [label="Go"]
            A [label="Start"]
        }"#;
        let graph = parse(input).unwrap();
        assert_eq!(node_ids(&graph), vec!["A", "B"]);
        assert_eq!(graph.node("A").unwrap().label(), Some("Start"));
    }

    #[test]
    fn parse_node_with_attributes() {
        let input = r#"digraph G {
            NotRegistered_NoDisplayName [shape="box", label="NotRegistered"]
        }"#;
        let graph = parse(input).unwrap();
        let node = graph.node("NotRegistered_NoDisplayName").unwrap();
        assert_eq!(
            node.attrs.get("shape"),
            Some(&AttributeValue::String("box".to_string()))
        );
        assert_eq!(node.label(), Some("NotRegistered"));
    }

    #[test]
    fn parse_edge_with_attributes() {
        let input = r#"digraph G {
            A -> B [label="ok", weight=10]
        }"#;
        let graph = parse(input).unwrap();
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].label(), Some("ok"));
        assert_eq!(
            graph.edges[0].attrs.get("weight"),
            Some(&AttributeValue::Integer(10))
        );
    }

    #[test]
    fn bare_identifier_attribute_values() {
        let input = "digraph G { A -> B [label=Go] }";
        let graph = parse(input).unwrap();
        assert_eq!(graph.edges[0].label(), Some("Go"));
    }

    #[test]
    fn quoted_node_ids() {
        let input = r#"digraph "Door" { "Open" -> "Closed" [label="Close"] }"#;
        let graph = parse(input).unwrap();
        assert_eq!(graph.name.as_deref(), Some("Door"));
        assert_eq!(node_ids(&graph), vec!["Open", "Closed"]);
    }

    #[test]
    fn anonymous_digraph() {
        let graph = parse("digraph { A }").unwrap();
        assert!(graph.name.is_none());
        assert!(graph.contains_node("A"));
    }

    #[test]
    fn chained_edge_expansion() {
        let input = r#"digraph G {
            A -> B -> C [label="chain"]
        }"#;
        let graph = parse(input).unwrap();
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].from, "A");
        assert_eq!(graph.edges[0].to, "B");
        assert_eq!(graph.edges[1].from, "B");
        assert_eq!(graph.edges[1].to, "C");
        assert_eq!(graph.edges[0].label(), Some("chain"));
        assert_eq!(graph.edges[1].label(), Some("chain"));
    }

    #[test]
    fn outgoing_preserves_edge_order() {
        let input = r#"digraph G {
            A -> C [label="Second"]
            B -> A [label="Other"]
            A -> B [label="Third"]
        }"#;
        let graph = parse(input).unwrap();
        let labels: Vec<_> = graph.outgoing("A").filter_map(EdgeDef::label).collect();
        assert_eq!(labels, vec!["Second", "Third"]);
    }

    #[test]
    fn parse_subgraph_flattens_in_order() {
        let input = r#"digraph G {
            Before;
            subgraph cluster_inner {
                node [shape="box"]
                A -> B [label="Go"]
            }
            After;
        }"#;
        let graph = parse(input).unwrap();
        assert_eq!(graph.subgraphs.len(), 1);
        let sg = &graph.subgraphs[0];
        assert_eq!(sg.name.as_deref(), Some("cluster_inner"));
        assert_eq!(sg.node_ids, vec!["A", "B"]);
        assert_eq!(sg.edge_count, 1);
        assert_eq!(node_ids(&graph), vec!["Before", "A", "B", "After"]);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(
            graph.node("A").unwrap().attrs.get("shape"),
            Some(&AttributeValue::String("box".to_string()))
        );
        assert!(graph.node("After").unwrap().attrs.get("shape").is_none());
    }

    #[test]
    fn comment_stripping() {
        let input = r#"
            // This is a comment
            # and a preprocessor line
            digraph G {
                /* block comment */
                A -> B // inline comment
            }
        "#;
        let graph = parse(input).unwrap();
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].from, "A");
        assert_eq!(graph.edges[0].to, "B");
    }

    #[test]
    fn comment_markers_inside_strings_survive() {
        let input = r#"digraph G { A -> B [label="a//b"] }"#;
        let graph = parse(input).unwrap();
        assert_eq!(graph.edges[0].label(), Some("a//b"));
    }

    #[test]
    fn reject_undirected_graph() {
        let input = "graph G { A -- B }";
        let result = parse(input);
        assert!(result.is_err());
    }

    #[test]
    fn reject_undirected_edges() {
        let input = "digraph G { A -- B }";
        let result = parse(input);
        assert!(result.is_err());
    }

    #[test]
    fn reject_trailing_garbage() {
        assert!(parse("digraph G { A } B").is_err());
    }

    #[test]
    fn parse_graph_attrs() {
        let input = r#"digraph G {
            graph [rankdir="LR"]
            label = "My Graph"
        }"#;
        let graph = parse(input).unwrap();
        assert_eq!(
            graph.attrs.get("rankdir"),
            Some(&AttributeValue::String("LR".to_string()))
        );
        assert_eq!(
            graph.attrs.get("label"),
            Some(&AttributeValue::String("My Graph".to_string()))
        );
    }

    #[test]
    fn parse_node_and_edge_defaults() {
        let input = r#"digraph G {
            node [shape="ellipse"]
            edge [style="dashed"]
            A -> B
        }"#;
        let graph = parse(input).unwrap();
        assert_eq!(
            graph.node("A").unwrap().attrs.get("shape"),
            Some(&AttributeValue::String("ellipse".to_string()))
        );
        assert_eq!(
            graph.edges[0].attrs.get("style"),
            Some(&AttributeValue::String("dashed".to_string()))
        );
        assert!(graph.node_defaults.contains_key("shape"));
        assert!(graph.edge_defaults.contains_key("style"));
    }

    #[test]
    fn parse_float_and_boolean_attributes() {
        let input = r#"digraph G {
            A [weight=3.5, visible=true, hidden=false]
        }"#;
        let graph = parse(input).unwrap();
        let node = graph.node("A").unwrap();
        assert_eq!(node.attrs.get("weight"), Some(&AttributeValue::Float(3.5)));
        assert_eq!(
            node.attrs.get("visible"),
            Some(&AttributeValue::Boolean(true))
        );
        assert_eq!(
            node.attrs.get("hidden"),
            Some(&AttributeValue::Boolean(false))
        );
    }

    #[test]
    fn parse_string_escapes() {
        let input = r#"digraph G {
            A [label="line1\nline2\ttab\\slash\"quote"]
        }"#;
        let graph = parse(input).unwrap();
        assert_eq!(
            graph.node("A").unwrap().label(),
            Some("line1\nline2\ttab\\slash\"quote")
        );
    }

    #[test]
    fn error_includes_line_and_col() {
        let input = "digraph G {\n  A -> [label=\"x\"]\n}";
        let err = parse(input).unwrap_err();
        match err {
            switchyard_types::SwitchyardError::GraphParse { line, col, .. } => {
                assert!((1..=3).contains(&line));
                assert!(col >= 1);
            }
            other => panic!("expected GraphParse, got {other:?}"),
        }
    }

    #[test]
    fn semicolons_optional() {
        let input = r#"digraph G {
            A [label="first"];
            B [label="second"]
            A -> B;
            B -> C
        }"#;
        let graph = parse(input).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
    }
}
