use std::collections::HashMap;

use winnow::ascii::{digit1, multispace0};
use winnow::combinator::{alt, opt, preceded, repeat};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::token::{literal, take_while};
use winnow::{ModalResult, Parser};

use switchyard_types::SwitchyardError;

use crate::ast::*;

fn make_cut_error(desc: &'static str) -> ErrMode<ContextError<StrContext>> {
    let mut e = ContextError::new();
    e.push(StrContext::Expected(StrContextValue::Description(desc)));
    ErrMode::Cut(e)
}

/// Strip `//`, `#` and `/* */` comments from the input, keeping newlines.
pub(crate) fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut at_line_start = true;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&n) = chars.peek() {
                    if n == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            // preprocessor-style lines are comments in DOT
            '#' if at_line_start => {
                while let Some(&n) = chars.peek() {
                    if n == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    if n == '\n' {
                        out.push('\n');
                    }
                    prev = n;
                }
            }
            '"' => {
                out.push('"');
                while let Some(n) = chars.next() {
                    out.push(n);
                    if n == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if n == '"' {
                        break;
                    }
                }
            }
            other => out.push(other),
        }
        at_line_start = c == '\n' || (at_line_start && c.is_whitespace());
    }
    out
}

/// Whitespace consumer (including newlines).
fn ws<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    multispace0.parse_next(input)
}

/// Parse an identifier: [A-Za-z_][A-Za-z0-9_]*
fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Parse a qualified id: identifier ( '.' identifier )+  or plain identifier.
/// Returns the full dotted string.
fn qualified_or_plain_id(input: &mut &str) -> ModalResult<String> {
    let first = identifier.parse_next(input)?;
    let rest: Vec<&str> = repeat(0.., preceded('.', identifier)).parse_next(input)?;
    let mut s = first.to_string();
    for part in rest {
        s.push('.');
        s.push_str(part);
    }
    Ok(s)
}

/// Parse a double-quoted string with escape support.
fn quoted_string(input: &mut &str) -> ModalResult<String> {
    let _ = '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let c = winnow::token::any.parse_next(input)?;
        match c {
            '"' => break,
            '\\' => {
                let esc = winnow::token::any.parse_next(input)?;
                match esc {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    '\\' => s.push('\\'),
                    '"' => s.push('"'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            other => s.push(other),
        }
    }
    Ok(s)
}

/// A node id: a bare identifier, a quoted string or a numeral.
fn node_id(input: &mut &str) -> ModalResult<String> {
    alt((
        identifier.map(str::to_string),
        quoted_string,
        (opt('-'), digit1).take().map(str::to_string),
    ))
    .parse_next(input)
}

/// Parse a boolean value.
fn boolean_value(input: &mut &str) -> ModalResult<bool> {
    let word = identifier.parse_next(input)?;
    match word {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ErrMode::Backtrack(ContextError::new())),
    }
}

/// Parse a float: optional sign, digits, '.', digits.
fn float_value(input: &mut &str) -> ModalResult<f64> {
    let s: &str = (opt(alt(('-', '+'))), digit1, '.', digit1)
        .take()
        .parse_next(input)?;
    s.parse()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

/// Parse an integer: optional sign + digits.
fn integer_value(input: &mut &str) -> ModalResult<i64> {
    let s: &str = (opt(alt(('-', '+'))), digit1).take().parse_next(input)?;
    s.parse()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

/// Parse an attribute value. Bare identifiers are strings, as in Graphviz.
fn attr_value(input: &mut &str) -> ModalResult<AttributeValue> {
    alt((
        quoted_string.map(AttributeValue::String),
        boolean_value.map(AttributeValue::Boolean),
        float_value.map(AttributeValue::Float),
        integer_value.map(AttributeValue::Integer),
        identifier.map(|s: &str| AttributeValue::String(s.to_string())),
    ))
    .parse_next(input)
}

/// Parse a single attribute: key '=' value.
fn attr(input: &mut &str) -> ModalResult<(String, AttributeValue)> {
    let key = qualified_or_plain_id.parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = '='.parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let value = attr_value
        .context(StrContext::Expected(StrContextValue::Description(
            "attribute value",
        )))
        .parse_next(input)?;
    Ok((key, value))
}

/// Parse an attribute block: '[' attr ( ','? attr )* ']'
fn attr_block(input: &mut &str) -> ModalResult<HashMap<String, AttributeValue>> {
    let _ = '['.parse_next(input)?;
    let _ = ws.parse_next(input)?;

    let mut attrs = HashMap::new();
    if let Some(first) = opt(attr).parse_next(input)? {
        attrs.insert(first.0, first.1);
        loop {
            let _ = ws.parse_next(input)?;
            let _ = opt(alt((',', ';'))).parse_next(input)?;
            let _ = ws.parse_next(input)?;
            if let Some(a) = opt(attr).parse_next(input)? {
                attrs.insert(a.0, a.1);
            } else {
                break;
            }
        }
    }

    let _ = ws.parse_next(input)?;
    let _ = ']'
        .context(StrContext::Expected(StrContextValue::CharLiteral(']')))
        .parse_next(input)?;
    Ok(attrs)
}

/// Intermediate representation of a parsed statement, before we merge them into a DotGraph.
enum Statement {
    GraphAttrs(HashMap<String, AttributeValue>),
    NodeDefaults(HashMap<String, AttributeValue>),
    EdgeDefaults(HashMap<String, AttributeValue>),
    Node(String, HashMap<String, AttributeValue>),
    Edge(Vec<String>, HashMap<String, AttributeValue>),
    Subgraph(Option<String>, Vec<Statement>),
    GraphAttrDecl(String, AttributeValue),
}

/// Parse `keyword '[' ... ']' ';'?` for the `graph`, `node` and `edge` defaults.
fn defaults_block(
    keyword: &'static str,
) -> impl FnMut(&mut &str) -> ModalResult<HashMap<String, AttributeValue>> {
    move |input: &mut &str| {
        let _ = literal(keyword).parse_next(input)?;
        let _ = ws.parse_next(input)?;
        let attrs = attr_block.parse_next(input)?;
        let _ = ws.parse_next(input)?;
        let _ = opt(';').parse_next(input)?;
        Ok(attrs)
    }
}

/// Parse 'subgraph' identifier? '{' statement* '}'
fn subgraph_stmt(input: &mut &str) -> ModalResult<Statement> {
    let _ = opt((literal("subgraph"), ws)).parse_next(input)?;
    let name = opt(node_id).parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = '{'.parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let stmts = statements.parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = '}'
        .context(StrContext::Expected(StrContextValue::CharLiteral('}')))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = opt(';').parse_next(input)?;
    Ok(Statement::Subgraph(name, stmts))
}

/// Parse a node or edge statement. An edge starts as a node id then has '->'.
fn node_or_edge_stmt(input: &mut &str) -> ModalResult<Statement> {
    let first = node_id.parse_next(input)?;
    let _ = ws.parse_next(input)?;

    if opt(literal("->")).parse_next(input)?.is_some() {
        let mut chain = vec![first];
        loop {
            let _ = ws.parse_next(input)?;
            let next = node_id
                .context(StrContext::Expected(StrContextValue::Description(
                    "edge target identifier",
                )))
                .parse_next(input)?;
            chain.push(next);
            let _ = ws.parse_next(input)?;
            if opt(literal("->")).parse_next(input)?.is_none() {
                break;
            }
        }

        let attrs = opt(attr_block).parse_next(input)?.unwrap_or_default();
        let _ = ws.parse_next(input)?;
        let _ = opt(';').parse_next(input)?;
        return Ok(Statement::Edge(chain, attrs));
    }

    if opt(literal("--")).parse_next(input)?.is_some() {
        return Err(make_cut_error(
            "only directed edges (->); undirected edges (--) are not supported",
        ));
    }

    if let Some(attrs) = opt(attr_block).parse_next(input)? {
        let _ = ws.parse_next(input)?;
        let _ = opt(';').parse_next(input)?;
        return Ok(Statement::Node(first, attrs));
    }

    // `key = value` at statement level is a graph attribute
    if opt('=').parse_next(input)?.is_some() {
        let _ = ws.parse_next(input)?;
        let val = attr_value.parse_next(input)?;
        let _ = ws.parse_next(input)?;
        let _ = opt(';').parse_next(input)?;
        return Ok(Statement::GraphAttrDecl(first, val));
    }

    let _ = opt(';').parse_next(input)?;
    Ok(Statement::Node(first, HashMap::new()))
}

/// Parse a single statement.
fn statement(input: &mut &str) -> ModalResult<Statement> {
    let _ = ws.parse_next(input)?;
    alt((
        defaults_block("graph").map(Statement::GraphAttrs),
        defaults_block("node").map(Statement::NodeDefaults),
        defaults_block("edge").map(Statement::EdgeDefaults),
        subgraph_stmt,
        node_or_edge_stmt,
    ))
    .parse_next(input)
}

/// Parse zero or more statements.
fn statements(input: &mut &str) -> ModalResult<Vec<Statement>> {
    let mut stmts = Vec::new();
    loop {
        let _ = ws.parse_next(input)?;
        if input.is_empty() || input.starts_with('}') {
            break;
        }
        let stmt = statement.parse_next(input)?;
        stmts.push(stmt);
    }
    Ok(stmts)
}

/// Accumulates nodes and edges across nested scopes in declaration order.
#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<NodeDef>,
    index: HashMap<String, usize>,
    edges: Vec<EdgeDef>,
    subgraphs: Vec<SubgraphDef>,
    graph_attrs: HashMap<String, AttributeValue>,
}

impl GraphBuilder {
    /// Declare or re-declare a node. Explicit attributes override earlier ones;
    /// scope defaults only fill gaps.
    fn touch_node(
        &mut self,
        id: &str,
        attrs: HashMap<String, AttributeValue>,
        defaults: &HashMap<String, AttributeValue>,
    ) {
        let pos = match self.index.get(id) {
            Some(&pos) => pos,
            None => {
                self.nodes.push(NodeDef {
                    id: id.to_string(),
                    attrs: HashMap::new(),
                });
                self.index.insert(id.to_string(), self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        let node = &mut self.nodes[pos];
        node.attrs.extend(attrs);
        for (k, v) in defaults {
            node.attrs.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    /// Fold one scope's statements in. Returns the ids the scope touched and
    /// how many edges it produced.
    fn merge_scope(
        &mut self,
        stmts: Vec<Statement>,
        parent_node_defaults: &HashMap<String, AttributeValue>,
        parent_edge_defaults: &HashMap<String, AttributeValue>,
        is_root: bool,
    ) -> (Vec<String>, usize, HashMap<String, AttributeValue>) {
        let mut node_defaults = parent_node_defaults.clone();
        let mut edge_defaults = parent_edge_defaults.clone();
        let mut scope_attrs = HashMap::new();
        let mut touched: Vec<String> = Vec::new();
        let mut edge_count = 0;

        for stmt in stmts {
            match stmt {
                Statement::GraphAttrs(attrs) => scope_attrs.extend(attrs),
                Statement::GraphAttrDecl(key, val) => {
                    scope_attrs.insert(key, val);
                }
                Statement::NodeDefaults(attrs) => node_defaults.extend(attrs),
                Statement::EdgeDefaults(attrs) => edge_defaults.extend(attrs),
                Statement::Node(id, attrs) => {
                    self.touch_node(&id, attrs, &node_defaults);
                    remember(&mut touched, &id);
                }
                Statement::Edge(chain, attrs) => {
                    for id in &chain {
                        self.touch_node(id, HashMap::new(), &node_defaults);
                        remember(&mut touched, id);
                    }
                    // A -> B -> C => (A,B), (B,C)
                    for pair in chain.windows(2) {
                        let mut merged = edge_defaults.clone();
                        merged.extend(attrs.clone());
                        self.edges.push(EdgeDef {
                            from: pair[0].clone(),
                            to: pair[1].clone(),
                            attrs: merged,
                        });
                        edge_count += 1;
                    }
                }
                Statement::Subgraph(name, inner) => {
                    let slot = self.subgraphs.len();
                    self.subgraphs.push(SubgraphDef {
                        name,
                        attrs: HashMap::new(),
                        node_ids: Vec::new(),
                        edge_count: 0,
                    });
                    let (ids, edges, attrs) =
                        self.merge_scope(inner, &node_defaults, &edge_defaults, false);
                    for id in &ids {
                        remember(&mut touched, id);
                    }
                    edge_count += edges;
                    let sg = &mut self.subgraphs[slot];
                    sg.node_ids = ids;
                    sg.edge_count = edges;
                    sg.attrs = attrs;
                }
            }
        }

        if is_root {
            self.graph_attrs.extend(scope_attrs.clone());
        }
        (touched, edge_count, scope_attrs)
    }
}

fn remember(touched: &mut Vec<String>, id: &str) {
    if !touched.iter().any(|t| t == id) {
        touched.push(id.to_string());
    }
}

/// Top-level parser: 'digraph' name? '{' statements '}'.
fn parse_digraph(input: &mut &str) -> ModalResult<DotGraph> {
    let _ = ws.parse_next(input)?;

    if input.starts_with("strict") {
        return Err(make_cut_error(
            "'digraph' keyword (strict graphs are not supported)",
        ));
    }

    if input.starts_with("graph") {
        let trimmed = input[5..].trim_start();
        if trimmed.starts_with('{')
            || trimmed.starts_with('"')
            || trimmed.starts_with(|c: char| c.is_ascii_alphabetic())
        {
            return Err(make_cut_error(
                "'digraph' keyword (undirected graphs are not supported)",
            ));
        }
    }

    let _ = literal("digraph")
        .context(StrContext::Expected(StrContextValue::StringLiteral(
            "digraph",
        )))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let name = opt(node_id).parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = '{'
        .context(StrContext::Expected(StrContextValue::CharLiteral('{')))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let stmts = statements.parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = '}'
        .context(StrContext::Expected(StrContextValue::CharLiteral('}')))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    if !input.is_empty() {
        return Err(make_cut_error("end of input after the closing brace"));
    }

    // Root-scope defaults are reported on the graph; nested scopes inherit them.
    let (node_defaults, edge_defaults) = root_defaults(&stmts);
    let mut builder = GraphBuilder::default();
    let empty = HashMap::new();
    builder.merge_scope(stmts, &empty, &empty, true);

    Ok(DotGraph {
        name,
        attrs: builder.graph_attrs,
        nodes: builder.nodes,
        edges: builder.edges,
        subgraphs: builder.subgraphs,
        node_defaults,
        edge_defaults,
    })
}

fn root_defaults(
    stmts: &[Statement],
) -> (
    HashMap<String, AttributeValue>,
    HashMap<String, AttributeValue>,
) {
    let mut node_defaults = HashMap::new();
    let mut edge_defaults = HashMap::new();
    for stmt in stmts {
        match stmt {
            Statement::NodeDefaults(attrs) => node_defaults.extend(attrs.clone()),
            Statement::EdgeDefaults(attrs) => edge_defaults.extend(attrs.clone()),
            _ => {}
        }
    }
    (node_defaults, edge_defaults)
}

/// Compute (line, col) from the number of bytes already consumed. Comment
/// stripping keeps newlines, so line numbers match the original text.
fn offset_to_line_col(stripped: &str, remaining_len: usize) -> (usize, usize) {
    let consumed = stripped.len() - remaining_len;
    let prefix = &stripped[..consumed];
    let line = prefix.matches('\n').count() + 1;
    let col = match prefix.rfind('\n') {
        Some(pos) => consumed - pos,
        None => consumed + 1,
    };
    (line, col)
}

/// Public entry point.
pub fn parse(input: &str) -> switchyard_types::Result<DotGraph> {
    let stripped = strip_comments(input);
    let mut remaining = stripped.as_str();

    let graph = parse_digraph.parse_next(&mut remaining).map_err(|e| {
        let (line, col) = offset_to_line_col(&stripped, remaining.len());
        let message = format!("{}", e);

        let snippet = remaining.chars().take(40).collect::<String>();
        let source_snippet = if snippet.is_empty() {
            None
        } else {
            Some(snippet)
        };

        SwitchyardError::GraphParse {
            line,
            col,
            message,
            source_snippet,
        }
    })?;

    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "parsed DOT graph"
    );
    Ok(graph)
}
