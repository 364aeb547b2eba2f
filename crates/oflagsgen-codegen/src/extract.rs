//! Flag macro extraction
//!
//! Picks the flag definitions out of a macro dump and resolves each one.

use regex::Regex;
use tracing::{debug, info};

use oflagsgen_core::{Error, FlagConstant, Result};
use oflagsgen_preprocessor::{render, Expander, MacroTable};

/// Matches `#define <prefix><IDENT> ` lines
pub struct FlagMatcher {
    prefix: String,
    flag_re: Regex,
}

impl FlagMatcher {
    pub fn new(prefix: &str) -> Result<Self> {
        let pattern = format!(
            r"^\s*#\s*define\s+({}[A-Za-z0-9_]+)\s",
            regex::escape(prefix)
        );
        let flag_re = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("invalid flag prefix {:?}: {}", prefix, e)))?;
        Ok(Self {
            prefix: prefix.to_string(),
            flag_re,
        })
    }

    /// The flag macro defined on `line`, if any
    pub fn match_line<'l>(&self, line: &'l str) -> Option<&'l str> {
        self.flag_re
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Member name for a flag macro: prefix removed, lowercased
    pub fn member_name(&self, macro_name: &str) -> String {
        macro_name
            .strip_prefix(&self.prefix)
            .unwrap_or(macro_name)
            .to_lowercase()
    }
}

/// Resolve every flag macro in `dump`, in dump order.
pub fn extract_flags(dump: &str, matcher: &FlagMatcher) -> Result<Vec<FlagConstant>> {
    let table = MacroTable::from_dump(dump)?;
    let expander = Expander::new(&table);
    let mut flags = Vec::new();

    for line in dump.lines() {
        let Some(name) = matcher.match_line(line) else {
            continue;
        };

        let definition = table.get(name).map(|d| d.body.clone()).unwrap_or_default();
        let value = render(&expander.expand_name(name)?);
        debug!("{} = {} -> {}", name, definition, value);

        flags.push(FlagConstant {
            macro_name: name.to_string(),
            member: matcher.member_name(name),
            definition,
            value,
        });
    }

    info!(
        "Extracted {} flag macros from {} definitions",
        flags.len(),
        table.len()
    );
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_line() {
        let matcher = FlagMatcher::new("O_").unwrap();
        assert_eq!(matcher.match_line("#define O_RDONLY 00"), Some("O_RDONLY"));
        assert_eq!(matcher.match_line(" # define\tO_CLOEXEC\t02000000"), Some("O_CLOEXEC"));
        assert_eq!(matcher.match_line("#define S_IRWXU 00700"), None);
        assert_eq!(matcher.match_line("#define __O_TMPFILE 020000000"), None);
        assert_eq!(matcher.match_line("#define O_ 1"), None);
        // Function-like macros and bodiless definitions are not flags
        assert_eq!(matcher.match_line("#define O_FN(x) x"), None);
        assert_eq!(matcher.match_line("#define O_BARE"), None);
        assert_eq!(matcher.match_line("x #define O_RDONLY 00"), None);
    }

    #[test]
    fn test_member_name() {
        let matcher = FlagMatcher::new("O_").unwrap();
        assert_eq!(matcher.member_name("O_RDONLY"), "rdonly");
        assert_eq!(matcher.member_name("O_LARGEFILE"), "largefile");
    }

    #[test]
    fn test_custom_prefix_is_literal() {
        let matcher = FlagMatcher::new("AT_").unwrap();
        assert_eq!(
            matcher.match_line("#define AT_SYMLINK_NOFOLLOW 0x100"),
            Some("AT_SYMLINK_NOFOLLOW")
        );
        assert_eq!(matcher.member_name("AT_SYMLINK_NOFOLLOW"), "symlink_nofollow");
        assert_eq!(matcher.match_line("#define O_RDONLY 00"), None);
    }

    #[test]
    fn test_extract_in_dump_order() {
        let dump = "#define O_WRONLY 01\n#define S_IRWXU 00700\n\
                    #define O_NDELAY O_NONBLOCK\n#define O_NONBLOCK 04000\n\
                    #define O_RDONLY 00\n";
        let matcher = FlagMatcher::new("O_").unwrap();
        let flags = extract_flags(dump, &matcher).unwrap();

        let members: Vec<&str> = flags.iter().map(|f| f.member.as_str()).collect();
        assert_eq!(members, vec!["wronly", "ndelay", "nonblock", "rdonly"]);
        assert_eq!(flags[1].definition, "O_NONBLOCK");
        assert_eq!(flags[1].value, "04000");
    }

    #[test]
    fn test_extract_empty_dump() {
        let matcher = FlagMatcher::new("O_").unwrap();
        assert!(extract_flags("", &matcher).unwrap().is_empty());
    }
}
