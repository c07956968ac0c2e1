//! Keyword emission engine.
//!
//! A [`ModuleBlock`] is one delimited region of the input file:
//!
//! ```text
//! $SCF
//! RKS
//! Charge
//!  0
//! $END
//! ```
//!
//! Body lines are either a bare keyword or a value line with exactly one
//! leading space. Generators write the keywords they understand explicitly
//! and hand everything else to [`emit_passthrough`], which follows these
//! rules for each `(key, value)`:
//!
//! | value            | output                                        |
//! |------------------|-----------------------------------------------|
//! | `true`           | keyword line only                             |
//! | `false` / `null` | nothing                                       |
//! | number / string  | keyword line, then one value line             |
//! | list             | keyword line, then the items joined by spaces |
//! | mapping          | nothing                                       |
//!
//! Keys are lower-cased and then capitalized (`DIIS` becomes `Diis`).
//! Protected keys and keywords the block already holds are skipped so a
//! keyword is never emitted twice.

use crate::config::lowercase_keys;
use crate::normalize::{boolish, format_float};
use log::debug;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt::Display;

/// Line closing every module block.
pub const END_MARKER: &str = "$END";

/// One module block of the target input file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleBlock {
    name: String,
    lines: Vec<String>,
    keywords: HashSet<String>,
}

impl ModuleBlock {
    /// Starts an empty block; `name` is written as `$NAME`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            lines: Vec::new(),
            keywords: HashSet::new(),
        }
    }

    /// Module name without the `$` prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Body lines in emission order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Appends a bare keyword line.
    pub fn keyword(&mut self, keyword: &str) -> &mut Self {
        self.keywords.insert(keyword.to_ascii_lowercase());
        self.lines.push(keyword.to_string());
        self
    }

    /// Appends a keyword line followed by its value line.
    pub fn value(&mut self, keyword: &str, value: impl Display) -> &mut Self {
        self.keyword(keyword);
        self.value_line(value)
    }

    /// Appends a value line (one leading space).
    pub fn value_line(&mut self, value: impl Display) -> &mut Self {
        self.lines.push(format!(" {}", value));
        self
    }

    /// Appends a line verbatim, e.g. a geometry line or `End Geometry`.
    pub fn raw(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// True when `keyword` was already emitted (case-insensitive).
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains(&keyword.to_ascii_lowercase())
    }

    /// Renders the block with its start and end markers, without a
    /// trailing newline.
    pub fn render(&self) -> String {
        let mut out = format!("${}", self.name);
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        out.push('\n');
        out.push_str(END_MARKER);
        out
    }
}

/// How a passthrough value is written.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Keyword line only
    Flag,
    /// Keyword line plus this value
    Value(String),
    /// Nothing is written
    Suppressed,
}

/// Renders a scalar (number or string). Other kinds yield `None`.
pub fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(u)) => u.to_string(),
            _ => format_float(n.as_f64().unwrap_or(0.0)),
        }),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Renders list items space-joined. `true` becomes `"true"`; `false`,
/// nulls, nested lists and mappings are dropped.
pub fn render_list(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(|item| match item {
            Value::Bool(true) => Some("true".to_string()),
            other => render_scalar(other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Applies the passthrough rules to one value.
pub fn render_passthrough(value: &Value) -> Rendered {
    match value {
        Value::Bool(true) => Rendered::Flag,
        Value::Bool(false) | Value::Null | Value::Object(_) => Rendered::Suppressed,
        Value::Array(items) => {
            let joined = render_list(items);
            if joined.is_empty() {
                Rendered::Suppressed
            } else {
                Rendered::Value(joined)
            }
        }
        scalar => render_scalar(scalar).map_or(Rendered::Suppressed, Rendered::Value),
    }
}

/// Text of a value line for a scalar or list value; flags, mappings and
/// empty lists yield `None`.
pub fn render_value(value: &Value) -> Option<String> {
    match render_passthrough(value) {
        Rendered::Value(text) => Some(text),
        Rendered::Flag | Rendered::Suppressed => None,
    }
}

/// Lower-cases a key and capitalizes its first character.
pub fn passthrough_key(key: &str) -> String {
    let lower = key.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Forwards every non-protected entry of `entries` into `block`.
///
/// `protected` holds lower-case key names the calling generator handles
/// itself.
pub fn emit_passthrough(block: &mut ModuleBlock, entries: &Map<String, Value>, protected: &[&str]) {
    for (key, value) in entries {
        if protected.contains(&key.to_lowercase().as_str()) {
            continue;
        }
        let keyword = passthrough_key(key);
        if keyword.is_empty() {
            continue;
        }
        if block.has_keyword(&keyword) {
            debug!(
                "${}: skipping passthrough key '{}', keyword already emitted",
                block.name(),
                key
            );
            continue;
        }
        match render_passthrough(value) {
            Rendered::Flag => {
                block.keyword(&keyword);
            }
            Rendered::Value(text) => {
                block.value(&keyword, text);
            }
            Rendered::Suppressed => {}
        }
    }
}

/// Layered configuration: entries of `overrides` replace same-named
/// entries of `global`.
///
/// Precedence is override > global; hardcoded defaults are applied by the
/// caller with [`resolve`]. Keys are compared case-insensitively and come
/// out lower-cased.
pub fn layered(global: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = lowercase_keys(global.clone());
    for (key, value) in overrides {
        merged.insert(key.to_lowercase(), value.clone());
    }
    merged
}

/// Resolves a setting as explicit parameter > configured value > default.
pub fn resolve<T>(explicit: Option<T>, configured: Option<T>, default: T) -> T {
    explicit.or(configured).unwrap_or(default)
}

/// Convenience lookups on a settings mapping.
pub trait SectionExt {
    /// First non-null value among `keys`.
    fn first_of(&self, keys: &[&str]) -> Option<&Value>;

    /// Truthiness of `key` ([`boolish`]); absent keys are false.
    fn flag(&self, key: &str) -> bool;

    /// First of `keys` rendered as a scalar.
    fn scalar(&self, keys: &[&str]) -> Option<String>;

    /// First of `keys` as an integer.
    fn integer(&self, keys: &[&str]) -> Option<i64>;

    /// First of `keys` as a float.
    fn number(&self, keys: &[&str]) -> Option<f64>;

    /// First of `keys` as a mapping.
    fn mapping(&self, key: &str) -> Option<&Map<String, Value>>;
}

impl SectionExt for Map<String, Value> {
    fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.get(*key))
            .find(|value| !value.is_null())
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(boolish)
    }

    fn scalar(&self, keys: &[&str]) -> Option<String> {
        self.first_of(keys).and_then(render_scalar)
    }

    fn integer(&self, keys: &[&str]) -> Option<i64> {
        self.first_of(keys).and_then(|value| match value {
            Value::String(s) => s.trim().parse().ok(),
            other => other.as_i64(),
        })
    }

    fn number(&self, keys: &[&str]) -> Option<f64> {
        self.first_of(keys).and_then(|value| match value {
            Value::String(s) => s.trim().parse().ok(),
            other => other.as_f64(),
        })
    }

    fn mapping(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_block_render() {
        let mut block = ModuleBlock::new("scf");
        block.keyword("RKS").value("Charge", 0);
        assert_eq!(block.render(), "$SCF\nRKS\nCharge\n 0\n$END");
        assert!(block.has_keyword("charge"));
        assert!(!block.has_keyword("spin"));
    }

    #[test]
    fn test_empty_block_render() {
        assert_eq!(ModuleBlock::new("XUANYUAN").render(), "$XUANYUAN\n$END");
    }

    #[test]
    fn test_passthrough_scalars_and_flags() {
        let mut block = ModuleBlock::new("MP2");
        emit_passthrough(
            &mut block,
            &map(json!({"diis": 0.7, "damp": true, "foo": false})),
            &[],
        );
        assert_eq!(block.lines(), &["Diis", " 0.7", "Damp"]);
    }

    #[test]
    fn test_passthrough_lists() {
        let mut block = ModuleBlock::new("SCF");
        emit_passthrough(
            &mut block,
            &map(json!({
                "Alpha": [3, 0, 1, 1],
                "MIXED": [1, true, false, "x", {"a": 1}, [2]],
                "empty": [],
                "nested": {"a": 1},
                "nothing": null
            })),
            &[],
        );
        assert_eq!(block.lines(), &["Alpha", " 3 0 1 1", "Mixed", " 1 true x"]);
    }

    #[test]
    fn test_passthrough_respects_protection() {
        let mut block = ModuleBlock::new("SCF");
        block.value("Charge", 0);
        emit_passthrough(
            &mut block,
            &map(json!({"charge": 1, "Spin": 3, "maxiter": 200})),
            &["spin"],
        );
        assert_eq!(block.lines(), &["Charge", " 0", "Maxiter", " 200"]);
    }

    #[test]
    fn test_passthrough_key_casing() {
        assert_eq!(passthrough_key("DIIS"), "Diis");
        assert_eq!(passthrough_key("maxIter"), "Maxiter");
        assert_eq!(passthrough_key(""), "");
    }

    #[test]
    fn test_layered_precedence() {
        let global = map(json!({"nstates": 5, "tda": true}));
        let overrides = map(json!({"nstates": 10}));
        let merged = layered(&global, &overrides);
        assert_eq!(merged["nstates"], json!(10));
        assert_eq!(merged["tda"], json!(true));
        assert_eq!(global["nstates"], json!(5));
        assert_eq!(resolve(Some(2), Some(1), 0), 2);
        assert_eq!(resolve(None, Some(1), 0), 1);
        assert_eq!(resolve::<i64>(None, None, 0), 0);

        let merged = layered(&map(json!({"NStates": 5})), &map(json!({"NSTATES": 3, "Isf": 1})));
        assert_eq!(merged, map(json!({"nstates": 3, "isf": 1})));
    }

    #[test]
    fn test_section_lookups() {
        let section = map(json!({"a": null, "b": "4", "c": 2.5, "d": "off"}));
        assert_eq!(section.first_of(&["a", "b"]), Some(&json!("4")));
        assert_eq!(section.integer(&["b"]), Some(4));
        assert_eq!(section.number(&["c"]), Some(2.5));
        assert_eq!(section.scalar(&["c"]).as_deref(), Some("2.5"));
        assert!(!section.flag("d"));
        assert!(!section.flag("missing"));
    }
}
