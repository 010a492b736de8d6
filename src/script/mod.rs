//! Check scripts
//!
//! The comments of a test source form a small C-like script that drives the
//! debugger. It is compiled in full before the debugger starts, so syntax
//! and name errors never leave a half-run test behind, then interpreted
//! against [`ScriptGlobals`].
//!
//! ```text
//! send("1-break-insert " + test_source + ":" + str(lines["BP"]));
//! let r = expect("1^done");
//! assert_eq(lines["BP"], r.find_int("bkpt.line"));
//! ```

pub mod ast;
pub mod compiler;
pub mod globals;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod value;

use std::fmt;

use serde::Serialize;

use crate::common::{Error, Result};

pub use compiler::CompiledScript;
pub use globals::{ScriptGlobals, DEFAULT_EXPECT_TIMEOUT};
pub use value::Value;

/// A compile problem at a script position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Lex, parse and check a script
///
/// Returns every problem found as one [`Error::ScriptCompile`], sorted by
/// position. Name checks only run once the syntax is clean.
pub fn compile(text: &str) -> Result<CompiledScript> {
    let (tokens, mut diagnostics) = lexer::Lexer::new(text).tokenize();
    let (program, parse_diagnostics) = parser::Parser::new(tokens).parse();
    diagnostics.extend(parse_diagnostics);

    if diagnostics.is_empty() {
        diagnostics = compiler::resolve(&program);
    }

    if !diagnostics.is_empty() {
        diagnostics.sort_by_key(|d| (d.line, d.column));
        tracing::debug!("Script has {} compile error(s)", diagnostics.len());
        return Err(Error::ScriptCompile(diagnostics));
    }

    tracing::debug!("Compiled script with {} statement(s)", program.stmts.len());
    Ok(CompiledScript::new(program))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bridge::ProcessBridge;
    use crate::source::LineTagMap;
    use crate::testing::Transcript;
    use std::path::Path;
    use std::time::Duration;

    /// Globals over `cat`, which echoes every sent line back
    fn echo_globals(tags: &str) -> ScriptGlobals {
        let lines = LineTagMap::collect_text(tags, Path::new("test.rs")).unwrap();
        let bridge = ProcessBridge::spawn("cat", Transcript::new()).unwrap();
        ScriptGlobals::new(lines, "/src/test.rs", "/src/test", bridge)
            .with_expect_timeout(Duration::from_secs(5))
    }

    async fn run(script: &str, globals: &mut ScriptGlobals) -> Result<()> {
        compile(script)?.run(globals).await
    }

    #[test]
    fn test_compile_collects_all_errors() {
        let err = compile("send(;\nlet x = 1;\nsend(\"a\")").unwrap_err();
        let Error::ScriptCompile(diagnostics) = err else {
            panic!("expected compile error");
        };
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(diagnostics[1].line, 3);
    }

    #[test]
    fn test_pathological_nesting_fails_to_compile() {
        let text = format!("log({}1);\nlog(\"after\");", "-".repeat(50_000));
        let err = compile(&text).unwrap_err();
        let Error::ScriptCompile(diagnostics) = err else {
            panic!("expected compile error");
        };
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 1);
        assert!(diagnostics[0].message.contains("nesting deeper than"));
    }

    #[test]
    fn test_compile_reports_lines_of_extracted_script() {
        let err = compile("\n\n\n\nsend(undefined_thing);").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("5:6: undeclared identifier 'undefined_thing'"), "{message}");
    }

    #[tokio::test]
    async fn test_send_expect_and_record_fields() {
        let mut globals = echo_globals("x\nfoo(); // @BP@\n");
        run(
            r#"
            send("5^done,bkpt={number=\"1\",line=\"" + str(lines["BP"]) + "\"}");
            let r = expect("5^done");
            assert_eq("done", r.class());
            assert_eq(5, r.token());
            assert_eq(lines["BP"], r.find_int("bkpt.line"));
            assert_eq("1", r.bkpt.number);
            "#,
            &mut globals,
        )
        .await
        .unwrap();

        let output = globals.close().await;
        assert!(output.lines().iter().any(|l| l.starts_with("< 5^done")));
        assert!(output.lines().iter().any(|l| l.starts_with("> 5^done")));
    }

    #[tokio::test]
    async fn test_assertion_failure_names_line_and_values() {
        let mut globals = echo_globals("");
        let err = run("let a = 1;\n\nassert_eq(2, a);", &mut globals)
            .await
            .unwrap_err();
        globals.close().await;

        assert!(matches!(err, Error::Assertion { line: 3, .. }));
        assert_eq!(
            err.to_string(),
            "Assertion failed at line 3: expected 2 (int), got 1 (int)"
        );
    }

    #[tokio::test]
    async fn test_expect_timeout_from_script() {
        let mut globals = echo_globals("");
        let err = run("send(\"a\");\nexpect(\"never\", 1);", &mut globals)
            .await
            .unwrap_err();
        let output = globals.close().await;

        assert_eq!(err.to_string(), "Expected 'never' in 1s");
        assert!(output.contents().contains("line 2: Expected 'never' in 1s"));
    }

    #[tokio::test]
    async fn test_control_flow_and_checkpoints() {
        let mut globals = echo_globals("");
        let result = run(
            r#"
            let total = 0;
            for n in [1, 2, 3] { total = total + n; }
            let i = 0;
            while i < 3 { i = i + 1; }
            checkpoint "sum" {
                if total == 6 && i == 3 { log(format("total={0} i={1}", total, i)); }
                else { assert(false, "bad loop"); }
            }
            checkpoint "fails" {
                assert(total > 10, "total too small");
            }
            "#,
            &mut globals,
        )
        .await;
        let output = globals.close().await;

        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Assertion failed at line 11: total too small (in checkpoint 'fails')"
        );
        let lines = output.lines();
        assert!(lines.contains(&"total=6 i=3".to_string()));
        assert!(lines.contains(&"checkpoint 'sum' passed".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("checkpoint 'fails' failed")));
    }

    #[tokio::test]
    async fn test_globals_and_helpers() {
        let mut globals = echo_globals("a // @START@\n");
        run(
            r#"
            assert_eq("/src/test.rs", test_source);
            assert_eq("test", file_name(test_bin));
            assert_eq(1, line("START"));
            assert_eq(7, int("7"));
            assert_eq(3, len("abc"));
            assert(lines.contains("START"));
            "#,
            &mut globals,
        )
        .await
        .unwrap();
        globals.close().await;
    }

    #[tokio::test]
    async fn test_runtime_type_error() {
        let mut globals = echo_globals("");
        let err = run("let a = 1;\nif a { }", &mut globals).await.unwrap_err();
        globals.close().await;
        assert!(matches!(err, Error::ScriptRuntime { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_generate_delta_without_generator() {
        let mut globals = echo_globals("");
        let err = run("generate_delta(\"fn main() {}\", \"main.rs\");", &mut globals)
            .await
            .unwrap_err();
        globals.close().await;
        assert!(matches!(err, Error::DeltaFailed { .. }));
    }
}
