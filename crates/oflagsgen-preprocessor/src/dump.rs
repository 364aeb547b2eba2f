//! Macro dump parsing
//!
//! Turns the `#define` lines of a compiler's macro dump into a table that
//! expansion can resolve names against.

use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use oflagsgen_core::MacroDefinition;

/// Errors that can occur while reading a dump
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Malformed parameter list for macro {name}: ({params})")]
    BadParams { name: String, params: String },
}

impl From<DumpError> for oflagsgen_core::Error {
    fn from(err: DumpError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Parser for `#define` lines
pub struct DefineParser {
    define_re: Regex,
}

impl DefineParser {
    pub fn new() -> Self {
        Self {
            define_re: Regex::new(
                r"^\s*#\s*define\s+([A-Za-z_][A-Za-z0-9_]*)(\(([^)]*)\))?(?:\s+(.*?))?\s*$",
            )
            .unwrap(),
        }
    }

    /// Parse one line. Returns `Ok(None)` for anything that is not a
    /// `#define` directive.
    pub fn parse_line(&self, line: &str) -> Result<Option<MacroDefinition>, DumpError> {
        let Some(caps) = self.define_re.captures(line) else {
            return Ok(None);
        };

        let name = caps[1].to_string();
        let body = caps.get(4).map_or("", |m| m.as_str()).to_string();

        let Some(param_list) = caps.get(3) else {
            return Ok(Some(MacroDefinition {
                name,
                params: None,
                variadic: false,
                body,
            }));
        };

        let (params, variadic) = parse_params(&name, param_list.as_str())?;
        Ok(Some(MacroDefinition {
            name,
            params: Some(params),
            variadic,
            body,
        }))
    }
}

impl Default for DefineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a parameter list. An anonymous `...` becomes `__VA_ARGS__`; the GNU
/// `name...` form keeps its name.
fn parse_params(name: &str, list: &str) -> Result<(Vec<String>, bool), DumpError> {
    let bad = || DumpError::BadParams {
        name: name.to_string(),
        params: list.to_string(),
    };

    if list.trim().is_empty() {
        return Ok((Vec::new(), false));
    }

    let raw: Vec<&str> = list.split(',').map(str::trim).collect();
    let mut params = Vec::with_capacity(raw.len());
    let mut variadic = false;

    for (i, param) in raw.iter().enumerate() {
        let is_last = i + 1 == raw.len();
        let ident = if let Some(stem) = param.strip_suffix("...") {
            if !is_last {
                return Err(bad());
            }
            variadic = true;
            let stem = stem.trim();
            if stem.is_empty() {
                "__VA_ARGS__"
            } else {
                stem
            }
        } else {
            *param
        };

        let valid = ident
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid || params.iter().any(|p| p == ident) {
            return Err(bad());
        }
        params.push(ident.to_string());
    }

    Ok((params, variadic))
}

/// Every macro in a dump, keyed by name
#[derive(Debug, Default, Clone)]
pub struct MacroTable {
    macros: HashMap<String, MacroDefinition>,
    order: Vec<String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from dump text. Lines that are not definitions are
    /// skipped.
    pub fn from_dump(text: &str) -> Result<Self, DumpError> {
        let parser = DefineParser::new();
        let mut table = Self::new();

        for line in text.lines() {
            match parser.parse_line(line)? {
                Some(def) => table.insert(def),
                None if !line.trim().is_empty() => debug!("Skipping non-define line: {}", line),
                None => {}
            }
        }

        debug!("Parsed {} macro definitions", table.len());
        Ok(table)
    }

    /// Add a definition. A redefinition replaces the earlier one in place.
    pub fn insert(&mut self, def: MacroDefinition) {
        if !self.macros.contains_key(&def.name) {
            self.order.push(def.name.clone());
        }
        self.macros.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Definitions in the order they first appeared
    pub fn iter(&self) -> impl Iterator<Item = &MacroDefinition> {
        self.order.iter().filter_map(|name| self.macros.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_like() {
        let parser = DefineParser::new();
        let def = parser.parse_line("#define O_RDONLY 00").unwrap().unwrap();
        assert_eq!(def, MacroDefinition::object("O_RDONLY", "00"));

        let def = parser
            .parse_line("  #  define O_TMPFILE (__O_TMPFILE | O_DIRECTORY)  ")
            .unwrap()
            .unwrap();
        assert_eq!(def.body, "(__O_TMPFILE | O_DIRECTORY)");
        assert!(!def.is_function_like());
    }

    #[test]
    fn test_empty_body() {
        let parser = DefineParser::new();
        let def = parser.parse_line("#define _FCNTL_H").unwrap().unwrap();
        assert_eq!(def.body, "");
        let def = parser.parse_line("#define __USE_GNU ").unwrap().unwrap();
        assert_eq!(def.body, "");
    }

    #[test]
    fn test_function_like() {
        let parser = DefineParser::new();
        let def = parser
            .parse_line("#define __CONCAT(x,y) x ## y")
            .unwrap()
            .unwrap();
        assert_eq!(def, MacroDefinition::function("__CONCAT", &["x", "y"], false, "x ## y"));

        let def = parser.parse_line("#define __NOARGS() 1").unwrap().unwrap();
        assert_eq!(def.params, Some(Vec::new()));
    }

    #[test]
    fn test_variadic_forms() {
        let parser = DefineParser::new();
        let def = parser
            .parse_line("#define __LOG(fmt, ...) printf(fmt, __VA_ARGS__)")
            .unwrap()
            .unwrap();
        assert!(def.variadic);
        assert_eq!(
            def.params,
            Some(vec!["fmt".to_string(), "__VA_ARGS__".to_string()])
        );

        let def = parser.parse_line("#define __G(args...) f(args)").unwrap().unwrap();
        assert!(def.variadic);
        assert_eq!(def.params, Some(vec!["args".to_string()]));
    }

    #[test]
    fn test_bad_params() {
        let parser = DefineParser::new();
        assert!(parser.parse_line("#define F(a, a) a").is_err());
        assert!(parser.parse_line("#define F(..., a) a").is_err());
        assert!(parser.parse_line("#define F(1) a").is_err());
    }

    #[test]
    fn test_non_define_lines() {
        let parser = DefineParser::new();
        assert!(parser.parse_line("#undef O_RDONLY").unwrap().is_none());
        assert!(parser.parse_line("int x;").unwrap().is_none());
        assert!(parser.parse_line("").unwrap().is_none());
    }

    #[test]
    fn test_table_order_and_redefinition() {
        let dump = "#define B 2\n#define A 1\n\n#define B 3\n";
        let table = MacroTable::from_dump(dump).unwrap();
        let names: Vec<&str> = table.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(table.get("B").unwrap().body, "3");
        assert_eq!(table.len(), 2);
        assert!(table.contains("A"));
        assert!(!table.contains("C"));
    }
}
