//! Lexical helpers shared by the outline parser.
//!
//! Everything here works on raw source slices and knows just enough about
//! Rust's lexical grammar to step over string literals, character literals and
//! comments, so that delimiters inside them are never mistaken for structure.

use crate::decl::{Block, CodeLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Opaque {
    LineComment,
    BlockComment,
    Str,
    Char,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Length of the comment or literal starting at `s`, if one does.
/// `prev` is the character preceding `s`, used to tell a raw string prefix
/// from the tail of an identifier.
pub(crate) fn opaque_at(s: &str, prev: Option<char>) -> Option<(usize, Opaque)> {
    let bytes = s.as_bytes();
    if s.starts_with("//") {
        return Some((s.find('\n').unwrap_or(s.len()), Opaque::LineComment));
    }
    if s.starts_with("/*") {
        let mut depth = 0usize;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i..].starts_with(b"/*") {
                depth += 1;
                i += 2;
            } else if bytes[i..].starts_with(b"*/") {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return Some((i, Opaque::BlockComment));
                }
            } else {
                i += 1;
            }
        }
        return Some((s.len(), Opaque::BlockComment));
    }

    let after_ident = prev.is_some_and(is_ident_char);
    if !after_ident {
        for prefix in ["br", "cr", "r"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                let hashes = rest.bytes().take_while(|&b| b == b'#').count();
                if rest.as_bytes().get(hashes) == Some(&b'"') {
                    let body_start = prefix.len() + hashes + 1;
                    let closing = format!("\"{}", "#".repeat(hashes));
                    let len = match s[body_start..].find(&closing) {
                        Some(pos) => body_start + pos + closing.len(),
                        None => s.len(),
                    };
                    return Some((len, Opaque::Str));
                }
            }
        }
        if s.starts_with("b\"") || s.starts_with("c\"") {
            return Some((1 + quoted_len(&s[1..]), Opaque::Str));
        }
        if s.starts_with("b'") {
            return char_len(&s[1..]).map(|len| (1 + len, Opaque::Char));
        }
    }

    match bytes.first() {
        Some(b'"') => Some((quoted_len(s), Opaque::Str)),
        Some(b'\'') => char_len(s).map(|len| (len, Opaque::Char)),
        _ => None,
    }
}

/// Length of a `"..."` literal including both quotes.
fn quoted_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    s.len()
}

/// Length of a character literal, or `None` when `'` starts a lifetime.
fn char_len(s: &str) -> Option<usize> {
    let rest = &s[1..];
    if rest.starts_with('\\') {
        let close = rest.get(2..)?.find('\'')?;
        return Some(1 + 2 + close + 1);
    }
    let c = rest.chars().next()?;
    let after = 1 + c.len_utf8();
    if s[after..].starts_with('\'') {
        Some(after + 1)
    } else {
        None
    }
}

/// Walk `s`, skipping literals and comments, and return the byte offset of
/// the first position at nesting depth zero where `stop(prev, rest)` holds.
/// An unmatched closing delimiter also ends the walk. Returns `s.len()` when
/// nothing stops it.
///
/// With `angles`, `<`/`>` count as nesting at bracket depth zero, which is
/// right for types and wrong for expressions.
pub(crate) fn find_top_level(
    s: &str,
    angles: bool,
    mut stop: impl FnMut(Option<char>, &str) -> bool,
) -> usize {
    let mut depth = 0usize;
    let mut angle = 0usize;
    let mut prev: Option<char> = None;
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if let Some((len, _)) = opaque_at(rest, prev) {
            prev = rest[..len].chars().last();
            i += len;
            continue;
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        if depth == 0 && angle == 0 && stop(prev, rest) {
            return i;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            }
            '<' if angles && depth == 0 => angle += 1,
            '>' if angles && depth == 0 && angle > 0 && !matches!(prev, Some('-') | Some('=')) => {
                angle -= 1
            }
            _ => {}
        }
        prev = Some(c);
        i += c.len_utf8();
    }
    s.len()
}

/// For `s` starting with `(`, `[` or `{`, the offset just past the matching
/// closing delimiter.
pub(crate) fn group_end(s: &str) -> Option<usize> {
    let inner = s.get(1..)?;
    let close = find_top_level(inner, false, |_, _| false);
    if close < inner.len() {
        Some(close + 2)
    } else {
        None
    }
}

/// For `s` starting with `<`, the offset just past the matching `>`.
pub(crate) fn angle_group_end(s: &str) -> Option<usize> {
    let inner = s.get(1..)?;
    let close = find_top_level(inner, true, |prev, rest| {
        rest.starts_with('>') && !matches!(prev, Some('-') | Some('='))
    });
    if close < inner.len() && inner[close..].starts_with('>') {
        Some(close + 2)
    } else {
        None
    }
}

pub(crate) fn starts_with_word(s: &str, word: &str) -> bool {
    s.starts_with(word) && !s[word.len()..].starts_with(is_ident_char)
}

/// A stop predicate matching `word` as a whole word.
pub(crate) fn at_word(word: &'static str) -> impl FnMut(Option<char>, &str) -> bool {
    move |prev, rest| !prev.is_some_and(is_ident_char) && starts_with_word(rest, word)
}

/// Split on `sep` at nesting depth zero.
pub(crate) fn split_top_level(s: &str, sep: char, angles: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    loop {
        let at = find_top_level(rest, angles, |_, r| r.starts_with(sep));
        parts.push(&rest[..at]);
        if at >= rest.len() || !rest[at..].starts_with(sep) {
            break;
        }
        rest = &rest[at + sep.len_utf8()..];
    }
    parts
}

/// Split `s` at the first top-level occurrence of `word`.
pub(crate) fn split_at_word<'a>(s: &'a str, word: &'static str) -> (&'a str, Option<&'a str>) {
    let at = find_top_level(s, true, at_word(word));
    if at < s.len() && starts_with_word(&s[at..], word) {
        (&s[..at], Some(&s[at + word.len()..]))
    } else {
        (s, None)
    }
}

/// Offset of the first top-level `:` that is not part of `::`.
pub(crate) fn single_colon(s: &str) -> Option<usize> {
    let at = find_top_level(s, true, |prev, rest| {
        rest.starts_with(':') && !rest.starts_with("::") && prev != Some(':')
    });
    if at < s.len() && s[at..].starts_with(':') {
        Some(at)
    } else {
        None
    }
}

/// Collapse a type, pattern or signature fragment onto one line: comments go,
/// runs of whitespace become one space, and spaces just inside brackets or
/// before separators are dropped.
pub(crate) fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    let mut prev: Option<char> = None;
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if let Some((len, kind)) = opaque_at(rest, prev) {
            match kind {
                Opaque::LineComment | Opaque::BlockComment => pending_space = true,
                Opaque::Str | Opaque::Char => {
                    flush_space(&mut out, &mut pending_space, rest);
                    out.push_str(&rest[..len]);
                }
            }
            prev = rest[..len].chars().last();
            i += len;
            continue;
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        if c.is_whitespace() {
            pending_space = true;
        } else {
            flush_space(&mut out, &mut pending_space, rest);
            out.push(c);
        }
        prev = Some(c);
        i += c.len_utf8();
    }
    out
}

fn flush_space(out: &mut String, pending: &mut bool, next: &str) {
    if *pending {
        let glued_left = out.is_empty()
            || out.ends_with('(')
            || out.ends_with('[')
            || out.ends_with('<')
            || out.ends_with('&')
            || out.ends_with("::");
        let glued_right = next.starts_with(')')
            || next.starts_with(']')
            || next.starts_with(',')
            || next.starts_with(';')
            || next.starts_with("::")
            || (next.starts_with('>') && !out.ends_with('-') && !out.ends_with('='));
        if !glued_left && !glued_right {
            out.push(' ');
        }
        *pending = false;
    }
}

/// Number of comments in `s`, not counting comment markers inside literals.
pub(crate) fn comment_count(s: &str) -> usize {
    let mut count = 0;
    let mut prev: Option<char> = None;
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if let Some((len, kind)) = opaque_at(rest, prev) {
            if matches!(kind, Opaque::LineComment | Opaque::BlockComment) {
                count += 1;
            }
            prev = rest[..len].chars().last();
            i += len;
            continue;
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        prev = Some(c);
        i += c.len_utf8();
    }
    count
}

/// Length of `s` once trailing whitespace and comments are cut off.
pub(crate) fn code_len(s: &str) -> usize {
    let mut end = 0;
    let mut prev: Option<char> = None;
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if let Some((len, kind)) = opaque_at(rest, prev) {
            if matches!(kind, Opaque::Str | Opaque::Char) {
                end = i + len;
            }
            prev = rest[..len].chars().last();
            i += len;
            continue;
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        if !c.is_whitespace() {
            end = i + c.len_utf8();
        }
        prev = Some(c);
        i += c.len_utf8();
    }
    end
}

/// Byte offsets of newlines that sit inside string literals.
pub(crate) fn literal_newlines(s: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut prev: Option<char> = None;
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if let Some((len, kind)) = opaque_at(rest, prev) {
            if kind == Opaque::Str {
                out.extend(
                    rest[..len]
                        .char_indices()
                        .filter(|&(_, c)| c == '\n')
                        .map(|(j, _)| i + j),
                );
            }
            prev = rest[..len].chars().last();
            i += len;
            continue;
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        prev = Some(c);
        i += c.len_utf8();
    }
    out
}

/// Split `s` into lines, flagging those that begin inside a string literal.
fn flagged_lines(s: &str) -> Vec<(&str, bool)> {
    let inside = literal_newlines(s);
    let mut lines = Vec::new();
    let mut start = 0;
    let mut literal = false;
    for (i, c) in s.char_indices() {
        if c == '\n' {
            lines.push((&s[start..i], literal));
            literal = inside.binary_search(&i).is_ok();
            start = i + 1;
        }
    }
    lines.push((&s[start..], literal));
    lines
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start_matches([' ', '\t']).len()
}

fn strip_ws(s: &str, max: usize) -> &str {
    let n = leading_ws(s).min(max);
    &s[n..]
}

/// Trim trailing whitespace unless the line break after it is inside a literal.
fn finish(lines: Vec<(String, bool)>) -> Block {
    let mut out: Vec<CodeLine> = Vec::with_capacity(lines.len());
    for (i, (text, literal)) in lines.iter().enumerate() {
        let next_literal = lines.get(i + 1).is_some_and(|(_, l)| *l);
        let text = if next_literal {
            text.clone()
        } else {
            text.trim_end().to_string()
        };
        out.push(CodeLine {
            text,
            literal: *literal,
        });
    }
    while out.first().is_some_and(|l| !l.literal && l.text.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| !l.literal && l.text.is_empty()) {
        out.pop();
    }
    Block { lines: out }
}

/// Block for the text between a pair of braces, with the common indentation
/// of its lines removed.
pub(crate) fn body_block(inner: &str) -> Block {
    let flagged = flagged_lines(inner);
    let indent = flagged
        .iter()
        .skip(1)
        .filter(|(text, literal)| !literal && !text.trim().is_empty())
        .map(|(text, _)| leading_ws(text))
        .min()
        .unwrap_or(0);
    let lines = flagged
        .into_iter()
        .enumerate()
        .map(|(i, (text, literal))| {
            if literal {
                (text.to_string(), true)
            } else if i == 0 {
                (text.trim_start().to_string(), false)
            } else {
                (strip_ws(text, indent).to_string(), false)
            }
        })
        .collect();
    finish(lines)
}

/// Block for item text whose first line starts at the item's own column.
/// Continuation lines lose up to `column` leading whitespace characters.
pub(crate) fn item_block(text: &str, column: usize) -> Block {
    let lines = flagged_lines(text)
        .into_iter()
        .enumerate()
        .map(|(i, (line, literal))| {
            if literal {
                (line.to_string(), true)
            } else if i == 0 {
                (line.trim_start().to_string(), false)
            } else {
                (strip_ws(line, column).to_string(), false)
            }
        })
        .collect();
    finish(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_end_skips_strings_and_comments() {
        let s = r#"{ let x = "}"; /* } */ // }
            '}' }rest"#;
        let end = group_end(s).unwrap();
        assert_eq!(&s[end..], "rest");
    }

    #[test]
    fn group_end_handles_raw_strings() {
        let s = r###"(r#"a ) "quoted" b"#, 1)tail"###;
        let end = group_end(s).unwrap();
        assert_eq!(&s[end..], "tail");
    }

    #[test]
    fn lifetimes_are_not_char_literals() {
        let s = "(&'a str, &'b mut T)x";
        let end = group_end(s).unwrap();
        assert_eq!(&s[end..], "x");
    }

    #[test]
    fn escaped_char_literals() {
        let s = r"('\'', '\\', '\u{1F600}')z";
        let end = group_end(s).unwrap();
        assert_eq!(&s[end..], "z");
    }

    #[test]
    fn angle_group_ignores_arrows() {
        let s = "<T, F: Fn() -> T, G: Iterator<Item = T>> rest";
        let end = angle_group_end(s).unwrap();
        assert_eq!(&s[end..], " rest");
    }

    #[test]
    fn split_params_respects_generics() {
        let parts = split_top_level("a: HashMap<K, V>, b: (u8, u8), c: u32", ',', true);
        assert_eq!(parts, vec!["a: HashMap<K, V>", " b: (u8, u8)", " c: u32"]);
    }

    #[test]
    fn split_at_for_keyword() {
        let (head, tail) = split_at_word("From<Fortune> for Wrapper", "for");
        assert_eq!(head.trim(), "From<Fortune>");
        assert_eq!(tail.map(str::trim), Some("Wrapper"));
    }

    #[test]
    fn single_colon_skips_paths() {
        assert_eq!(single_colon("x: std::fmt::Result"), Some(1));
        assert_eq!(single_colon("std::fmt::Result"), None);
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(
            normalize("HashMap<\n    String, // key\n    Vec< u8 >\n>"),
            "HashMap<String, Vec<u8>>"
        );
        assert_eq!(normalize("& mut self"), "&mut self");
        assert_eq!(normalize("impl FnOnce( u8 ) -> T"), "impl FnOnce(u8) -> T");
    }

    #[test]
    fn comments_inside_literals_are_not_counted() {
        assert_eq!(comment_count("a: u8, // first\n b: /* inline */ u8"), 2);
        assert_eq!(comment_count("let s = \"// not a comment\";"), 0);
    }

    #[test]
    fn code_len_drops_trailing_comments() {
        let s = "HashMap<String, u8> // last\n    ";
        assert_eq!(&s[..code_len(s)], "HashMap<String, u8>");
        let s = "\"ends // in a string\"  ";
        assert_eq!(&s[..code_len(s)], "\"ends // in a string\"");
    }

    #[test]
    fn body_block_dedents_and_keeps_literals() {
        let inner = "\n        let s = \"first\nsecond\";\n        if x {\n            y();\n        }\n    ";
        let block = body_block(inner);
        let texts: Vec<_> = block.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["let s = \"first", "second\";", "if x {", "    y();", "}"]);
        assert!(block.lines[1].literal);
        assert!(!block.lines[0].literal);
    }

    #[test]
    fn body_block_single_line() {
        let block = body_block(" self.close() ");
        assert_eq!(block.text(), "self.close()");
    }

    #[test]
    fn item_block_strips_item_column() {
        let text = "macro_rules! m {\n        () => {};\n    }";
        let block = item_block(text, 4);
        assert_eq!(block.text(), "macro_rules! m {\n    () => {};\n}");
    }
}
