//! Suite tables.
//!
//! The built-in catalog mirrors the toolchain's fixture tree. A YAML file
//! holding a list of [`SuiteDef`]s can replace it:
//!
//! ```yaml
//! - name: loops
//!   dir: test_loops_pkg
//!   cases: [while, do_while]
//!   templates: [build, execution]
//!   compiler_flags: [--no-runtime]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::errors::{HarnessError, Result};
use crate::suite::{SuiteDef, Template};

const NO_RUNTIME: &str = "--no-runtime";

const EXTRA_CASES: &[&str] = &[
    "bin_val",
    "decl_assign",
    "do_while",
    "do_while_break",
    "do_while_continue",
    "elseif",
    "for1",
    "for_break",
    "for_continue",
    "func_args",
    "func_call",
    "func_cond",
    "func_loop",
    "func_rec",
    "func_rec2",
    "func_ret",
    "func_ret2",
    "hex_val",
    "loop_scope",
    "lots_do_while",
    "lots_for",
    "lots_scopes",
    "lots_var",
    "lots_while",
    "main",
    "multiple_assigment",
    "multiple_assigment2",
    "multiple_var",
    "mult_expr",
    "mult_line",
    "nestedif",
    "nested_do_while",
    "nested_do_while_break",
    "nested_do_while_continue",
    "nested_for",
    "nested_for_break",
    "nested_for_continue",
    "nested_while",
    "nested_while_break",
    "nested_while_continue",
    "oct_val",
    "prefix",
    "prefix2",
    "ptr1",
    "ptr2",
    "ptr3",
    "scope_var",
    "simple",
    "simple2",
    "simple3",
    "single_line",
    "while1",
    "while_break",
    "while_continue",
];

/// The default suites, in the order the driver runs them.
pub fn builtin() -> Vec<SuiteDef> {
    use Template::*;
    let full_pipeline = [Syntactic, Codegen, Execution, Optimized];
    let build_and_run = [Build, Execution];
    vec![
        SuiteDef::new("lexical", "test_lexical_pkg", &["valid", "mix", "junk"], &[Lexical])
            .with_flags(&[NO_RUNTIME]),
        SuiteDef::new(
            "unary-operators",
            "test_unary_ops_pkg",
            &["unary_ops"],
            &full_pipeline,
        ),
        SuiteDef::new(
            "binary-operators",
            "test_binary_ops_pkg",
            &["binary_ops"],
            &full_pipeline,
        )
        .with_flags(&[NO_RUNTIME]),
        SuiteDef::new(
            "variables",
            "test_variables_pkg",
            &[
                "variables",
                "global_var",
                "address_of_global",
                "address_of_cancel_deref",
                "pointer",
            ],
            &build_and_run,
        )
        .with_flags(&[NO_RUNTIME]),
        SuiteDef::new(
            "conditions",
            "test_conditions_pkg",
            &["simple_if", "simple_else"],
            &[Syntactic, Semantic, Codegen, Execution],
        )
        .with_flags(&[NO_RUNTIME]),
        SuiteDef::new(
            "loops",
            "test_loops_pkg",
            &[
                "while",
                "do_while",
                "for",
                "for_decl",
                "var_shadowing",
                "var_shadowing2",
            ],
            &build_and_run,
        )
        .with_flags(&[NO_RUNTIME]),
        SuiteDef::new(
            "break-continue",
            "test_loops_pkg",
            &["break", "continue"],
            &build_and_run,
        ),
        // Linked against the allocator runtime, hence no --no-runtime.
        SuiteDef::new(
            "memory",
            "test_memory_pkg",
            &["malloc", "free", "array"],
            &build_and_run,
        ),
        SuiteDef::new("extra", "test_extra_pkg", EXTRA_CASES, &build_and_run)
            .with_flags(&[NO_RUNTIME])
            .with_exec_suffix("")
            .extra(),
    ]
}

/// Parses a YAML list of suite tables. `origin` only labels errors.
pub fn parse_yaml(text: &str, origin: &Path) -> Result<Vec<SuiteDef>> {
    let suites: Vec<SuiteDef> =
        serde_yaml::from_str(text).map_err(|e| HarnessError::Catalog {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
    validate(&suites, origin)?;
    Ok(suites)
}

/// Reads and parses a suite table file.
pub fn load_yaml(path: &Path) -> Result<Vec<SuiteDef>> {
    let text = fs::read_to_string(path).map_err(|e| HarnessError::io("read", path, e))?;
    parse_yaml(&text, path)
}

fn validate(suites: &[SuiteDef], origin: &Path) -> Result<()> {
    let invalid = |message: String| HarnessError::Catalog {
        path: origin.to_path_buf(),
        message,
    };
    let mut seen = HashSet::new();
    for suite in suites {
        if suite.name.trim().is_empty() {
            return Err(invalid("suite with an empty name".to_string()));
        }
        if !seen.insert(suite.name.as_str()) {
            return Err(invalid(format!("duplicate suite '{}'", suite.name)));
        }
        if suite.templates.is_empty() {
            return Err(invalid(format!("suite '{}' has no templates", suite.name)));
        }
        if let Some(case) = suite.cases.iter().find(|c| c.trim().is_empty()) {
            return Err(invalid(format!(
                "suite '{}' has an empty case name {:?}",
                suite.name, case
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_order_is_fixed() {
        let names: Vec<_> = builtin().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "lexical",
                "unary-operators",
                "binary-operators",
                "variables",
                "conditions",
                "loops",
                "break-continue",
                "memory",
                "extra",
            ]
        );
    }

    #[test]
    fn only_the_large_suite_is_extra() {
        let suites = builtin();
        let extra: Vec<_> = suites.iter().filter(|s| s.extra).collect();
        assert_eq!(extra.len(), 1);
        assert!(extra[0].cases.len() >= 50);
        assert_eq!(extra[0].exec_suffix, "");
    }

    #[test]
    fn builtin_catalog_is_valid() {
        validate(&builtin(), Path::new("<builtin>")).unwrap();
    }

    #[test]
    fn yaml_catalog_parses() {
        let yaml = r#"
- name: conditions
  dir: test_conditions_pkg
  cases: [simple_if]
  templates: [syntactic, semantic, codegen, execution]
  compiler_flags: [--no-runtime]
- name: extra
  dir: test_extra_pkg
  cases: [main]
  templates: [build, execution]
  exec_suffix: ""
  extra: true
"#;
        let suites = parse_yaml(yaml, Path::new("suites.yaml")).unwrap();
        assert_eq!(suites.len(), 2);
        assert_eq!(suites[0].compiler_flags, vec!["--no-runtime".to_string()]);
        assert!(suites[1].extra);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let yaml = "- {name: a, dir: x, cases: [c], templates: [build]}\n- {name: a, dir: y, cases: [c], templates: [build]}\n";
        let err = parse_yaml(yaml, Path::new("dup.yaml")).unwrap_err();
        assert!(err.to_string().contains("duplicate suite 'a'"));
    }

    #[test]
    fn unknown_template_is_a_catalog_error() {
        let yaml = "- {name: a, dir: x, cases: [c], templates: [link]}\n";
        let err = parse_yaml(yaml, Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, HarnessError::Catalog { .. }));
    }
}
