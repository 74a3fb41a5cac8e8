//! Languages command for printing the effective suffix table.

use std::io::Write;

use anyhow::Result;

use crate::Config;

/// Prints mappings in the order they are tried against an entity.
pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let mappings = config.language_mappings();
    if mappings.is_empty() {
        writeln!(writer, "No language mappings configured.")?;
        return Ok(());
    }
    for (suffix, language) in mappings.iter() {
        writeln!(writer, "- .{suffix} -> {language}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn prints_default_mappings_in_resolution_order() {
        let mut output = Vec::new();
        run(&mut output, &Config::default()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        - .astro -> Astro
        - .cjs -> JavaScript
        - .ipynb -> Python
        - .jsx -> JSX
        - .svelte -> Svelte
        - .tsx -> TSX
        - .vue -> Vue
        ");
    }

    #[test]
    fn more_specific_suffixes_come_first() {
        let mut config = Config::default();
        config
            .language_mappings
            .insert("test.ts".to_string(), "TypeScript-Test".to_string());

        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(output.lines().next(), Some("- .test.ts -> TypeScript-Test"));
    }

    #[test]
    fn empty_table() {
        let config = Config {
            language_mappings: std::collections::BTreeMap::new(),
            ..Config::default()
        };
        let mut output = Vec::new();
        run(&mut output, &config).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "No language mappings configured.\n");
    }
}
