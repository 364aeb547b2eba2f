//! Output template
//!
//! The preamble repeats the probe includes and defines a two-step
//! stringification helper pair, so that text after the cut line can be
//! resolved by a later preprocessor pass if needed.

use oflagsgen_core::{FlagConstant, GeneratorConfig, OutputStyle};
use oflagsgen_preprocessor::{stringify, tokenize};

/// Separates the preamble from generated definitions
pub const CUT_LINE: &str = "----------cut here----------";

/// Renders preamble and per-flag lines
#[derive(Debug, Clone)]
pub struct Template {
    headers: Vec<String>,
    class_name: String,
    stringify_helper: String,
    indirect_helper: String,
    style: OutputStyle,
}

impl Template {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            headers: config.headers.clone(),
            class_name: config.class_name.clone(),
            stringify_helper: config.stringify_helper.clone(),
            indirect_helper: config.indirect_helper.clone(),
            style: config.style,
        }
    }

    /// Includes, helper directives and the cut line, newline-terminated
    pub fn preamble(&self) -> String {
        let mut out = String::new();
        for header in &self.headers {
            out.push_str(&format!("#include <{}>\n", header));
        }
        out.push('\n');

        let (outer, inner) = (&self.stringify_helper, &self.indirect_helper);
        out.push_str(&format!("#undef {}\n", inner));
        out.push_str(&format!("#undef {}\n", outer));
        out.push_str(&format!("#define {}(x) #x\n", inner));
        out.push_str(&format!("#define {}(x) {}(x)\n", outer, inner));
        out.push_str(CUT_LINE);
        out.push('\n');
        out
    }

    /// One `constexpr` definition, without trailing newline
    pub fn flag_line(&self, flag: &FlagConstant) -> String {
        let init = match self.style {
            OutputStyle::Stringified => stringify(&tokenize(&flag.value)),
            OutputStyle::Deferred => format!("{}({})", self.stringify_helper, flag.macro_name),
            OutputStyle::Expanded => flag.value.clone(),
        };
        format!(
            "constexpr const {cls} {cls}::{member}{{{init}}};",
            cls = self.class_name,
            member = flag.member,
            init = init
        )
    }

    /// Complete text output
    pub fn render(&self, flags: &[FlagConstant]) -> String {
        let mut out = self.preamble();
        for flag in flags {
            out.push_str(&self.flag_line(flag));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flag(name: &str, member: &str, value: &str) -> FlagConstant {
        FlagConstant {
            macro_name: name.into(),
            member: member.into(),
            definition: value.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_default_preamble() {
        let template = Template::from_config(&GeneratorConfig::default());
        assert_eq!(
            template.preamble(),
            "#include <sys/types.h>\n\
             #include <sys/stat.h>\n\
             #include <fcntl.h>\n\
             \n\
             #undef strfry2\n\
             #undef strfry\n\
             #define strfry2(x) #x\n\
             #define strfry(x) strfry2(x)\n\
             ----------cut here----------\n"
        );
    }

    #[test]
    fn test_flag_line_styles() {
        let f = flag("O_TMPFILE", "tmpfile", "(020000000 | 0200000)");
        let mut config = GeneratorConfig::default();

        assert_eq!(
            Template::from_config(&config).flag_line(&f),
            r#"constexpr const fdflags fdflags::tmpfile{"(020000000 | 0200000)"};"#
        );

        config.style = OutputStyle::Deferred;
        assert_eq!(
            Template::from_config(&config).flag_line(&f),
            "constexpr const fdflags fdflags::tmpfile{strfry(O_TMPFILE)};"
        );

        config.style = OutputStyle::Expanded;
        assert_eq!(
            Template::from_config(&config).flag_line(&f),
            "constexpr const fdflags fdflags::tmpfile{(020000000 | 0200000)};"
        );
    }

    #[test]
    fn test_custom_class_and_helpers() {
        let config = GeneratorConfig {
            class_name: "openflags".into(),
            stringify_helper: "stringify".into(),
            indirect_helper: "stringify_indirect".into(),
            style: OutputStyle::Deferred,
            ..Default::default()
        };
        let template = Template::from_config(&config);

        assert!(template
            .preamble()
            .contains("#define stringify(x) stringify_indirect(x)\n"));
        assert_eq!(
            template.flag_line(&flag("O_CREAT", "creat", "0100")),
            "constexpr const openflags openflags::creat{stringify(O_CREAT)};"
        );
    }

    #[test]
    fn test_render_without_flags_is_preamble() {
        let template = Template::from_config(&GeneratorConfig::default());
        assert_eq!(template.render(&[]), template.preamble());
    }
}
