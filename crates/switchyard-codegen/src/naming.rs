//! Identifier derivation.
//!
//! Every name the generator writes comes from here, so the conventions live in
//! one place: `{Base}State`, `{Base}Trigger`, case structs `{Case}_` inside a
//! snake-cased case module, and snake-cased transition methods.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use switchyard_types::{Result, SwitchyardError};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// Strict and reserved keywords that need `r#` to be used as identifiers.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn",
    "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use",
    "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers at all.
const UNESCAPABLE: &[&str] = &["self", "Self", "super", "crate"];

/// Parameter name used by the deferred Match overloads.
pub const DEFERRED_PARAM: &str = "deferred";

/// Binding used for the case payload in generated match arms.
pub const CASE_BINDING: &str = "case";

/// Name of the discriminator enum inside every case module.
pub const UNION_CASES: &str = "UnionCases";

/// Discriminator method on every union. It also marks the plumbing impl.
pub const UNION_CASE_FN: &str = "union_case";

/// Methods of a union that case accessors share an impl with.
pub const UNION_METHODS: &[&str] = &[
    UNION_CASE_FN,
    "match_with",
    "match_with_async",
    "match_deferred",
    "match_deferred_async",
];

pub fn is_identifier(s: &str) -> bool {
    s != "_" && IDENTIFIER.is_match(s) && !UNESCAPABLE.contains(&s)
}

/// Fail with [`SwitchyardError::InvalidIdentifier`] unless `s` can name a
/// type or method.
pub fn validate_identifier(s: &str, context: &str) -> Result<()> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(SwitchyardError::InvalidIdentifier {
            identifier: s.to_string(),
            context: context.to_string(),
        })
    }
}

/// `r#ident` for keywords, `ident` otherwise.
pub fn escape(ident: &str) -> String {
    if KEYWORDS.contains(&ident) {
        format!("r#{ident}")
    } else {
        ident.to_string()
    }
}

/// Drop a leading `r#`.
pub fn unescape(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

/// `FullLicenseFound` -> `full_license_found`, `HTTPServer` -> `http_server`.
pub fn snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `FullLicenseFound` -> `FULL_LICENSE_FOUND`.
pub fn screaming_snake_case(s: &str) -> String {
    snake_case(s).to_uppercase()
}

/// `license_state` or `license-state` -> `LicenseState`; already camel-cased
/// words keep their inner capitals.
pub fn upper_camel_case(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Base name from a graph file name: `LicenseState.dot` -> `License`,
/// `door_machine.dot` -> `DoorMachine`.
pub fn base_name_from_file(file_name: &str) -> Result<String> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let camel = upper_camel_case(stem);
    let base = ["States", "State"]
        .iter()
        .find_map(|suffix| camel.strip_suffix(suffix).filter(|rest| !rest.is_empty()))
        .unwrap_or(&camel)
        .to_string();
    validate_identifier(&base, "base name")?;
    Ok(base)
}

/// Case struct of a case: `Open` -> `Open_`.
pub fn case_struct(case: &str) -> String {
    format!("{}_", unescape(case))
}

/// Enum variant naming a case.
pub fn variant(case: &str) -> String {
    escape(unescape(case))
}

/// Associated const accessor of a case without fields.
pub fn const_accessor(case: &str) -> String {
    screaming_snake_case(unescape(case))
}

/// Associated fn accessor of a case with fields.
pub fn fn_accessor(case: &str) -> String {
    escape(&snake_case(unescape(case)))
}

/// Positional Match handler parameter of a case.
pub fn handler(case: &str) -> String {
    escape(&snake_case(unescape(case)))
}

/// Case module of a union: `DoorState` -> `door_state`.
pub fn union_module(union: &str) -> String {
    snake_case(union)
}

/// Flattened transition method of a trigger label.
pub fn transition_method(label: &str) -> String {
    escape(&snake_case(label))
}

/// Boxed transition method of a trigger label.
pub fn boxed_transition_method(label: &str) -> String {
    format!("{}_with", snake_case(label))
}

/// All type names derived from one base name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeNames {
    pub base_name: String,
    pub state_type: String,
    pub trigger_type: String,
    pub extension_type: String,
    pub transition_result_type: String,
    pub transition_type: String,
    pub invalid_trigger_type: String,
    pub state_module: String,
    pub trigger_module: String,
}

impl TypeNames {
    pub fn new(base: &str) -> Result<Self> {
        validate_identifier(base, "base name")?;
        let state_type = format!("{base}State");
        let trigger_type = format!("{base}Trigger");
        Ok(Self {
            base_name: base.to_string(),
            state_module: union_module(&state_type),
            trigger_module: union_module(&trigger_type),
            state_type,
            trigger_type,
            extension_type: format!("{base}Extension"),
            transition_result_type: format!("{base}TransitionResult"),
            transition_type: format!("{base}Transition"),
            invalid_trigger_type: format!("{base}InvalidTrigger"),
        })
    }
}

/// A set of identifiers that must stay distinct.
#[derive(Debug)]
pub struct Scope {
    name: String,
    taken: HashSet<String>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            taken: HashSet::new(),
        }
    }

    /// A scope with names already reserved.
    pub fn reserving(name: impl Into<String>, reserved: &[&str]) -> Self {
        let mut scope = Self::new(name);
        scope.taken.extend(reserved.iter().map(|r| r.to_string()));
        scope
    }

    /// Record `identifier`, failing if it is already taken.
    pub fn claim(&mut self, identifier: &str) -> Result<()> {
        if self.taken.insert(identifier.to_string()) {
            Ok(())
        } else {
            Err(SwitchyardError::NamingCollision {
                scope: self.name.clone(),
                identifier: identifier.to_string(),
            })
        }
    }
}

/// Check the cases of union `union` for invalid or colliding identifiers:
/// case names, their accessors and their Match handler parameters.
pub fn check_union_cases(union: &str, cases: &[String]) -> Result<()> {
    let mut names = Scope::new(format!("{union} cases"));
    let mut accessors = Scope::reserving(format!("{union} accessors"), UNION_METHODS);
    let mut handlers = Scope::reserving(format!("{union} match handlers"), &[DEFERRED_PARAM, CASE_BINDING]);
    for case in cases {
        validate_identifier(case, &format!("case of {union}"))?;
        names.claim(unescape(case))?;
        accessors.claim(&const_accessor(case))?;
        accessors.claim(&fn_accessor(case))?;
        handlers.claim(&handler(case))?;
    }
    Ok(())
}
