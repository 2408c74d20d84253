//! Suites, case templates and the stage state machine.
//!
//! A suite is a table: a directory, a list of case prefixes and the templates
//! every case instantiates. [`plan_case`] turns one case into its ordered
//! list of [`Step`]s without touching the filesystem; [`run_suite`] walks the
//! plans, numbers the stages and threads a [`SkipState`] through each case.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::errors::{HarnessError, Result};
use crate::oracle;
use crate::process::{self, ProcessStage};
use crate::report::{Outcome, Reporter, StageKind, StageRecord};

const SOURCE_EXT: &str = ".c";
const TEXT_EXT: &str = ".txt";
const BYTECODE_EXT: &str = ".msm";
const GOLDEN_EXT: &str = ".ref";
const OPTI_SUFFIX: &str = "_opti";
const OPTI_FLAG: &str = "--opti-const-op";

// ============================================================================
// SUITE TABLES
// ============================================================================

/// A fixed stage sequence a case can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    /// Lexer dump, compared to its golden file.
    Lexical,
    /// Parser dump, compared to its golden file.
    Syntactic,
    /// Checker dump, compared to its golden file.
    Semantic,
    /// Compilation, bytecode compared to its golden file.
    Codegen,
    /// Compilation only.
    Build,
    /// Bytecode execution, output compared to its golden file.
    Execution,
    /// Compilation with constant folding and execution, output compared to
    /// the non-optimized execution output of the same case.
    Optimized,
}

/// The analysis stages the compiler can stop at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Lexical,
    Syntactic,
    Semantic,
}

impl AnalysisStage {
    /// Value passed to `--stage`.
    pub fn flag(self) -> &'static str {
        match self {
            AnalysisStage::Lexical => "lexical",
            AnalysisStage::Syntactic => "syntactic",
            AnalysisStage::Semantic => "semantic",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            AnalysisStage::Lexical => "_lex",
            AnalysisStage::Syntactic => "_syn",
            AnalysisStage::Semantic => "_sem",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            AnalysisStage::Lexical => "lexical",
            AnalysisStage::Syntactic => "syntactical",
            AnalysisStage::Semantic => "semantic",
        }
    }
}

fn default_exec_suffix() -> String {
    "_exec".to_string()
}

/// One suite table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuiteDef {
    pub name: String,
    /// Fixture directory, relative to the fixture root.
    pub dir: PathBuf,
    /// Case prefixes, in execution order.
    pub cases: Vec<String>,
    pub templates: Vec<Template>,
    /// Flags inserted before the source file on every compiler invocation.
    #[serde(default)]
    pub compiler_flags: Vec<String>,
    /// Suffix of execution output files (`P<suffix>.txt`).
    #[serde(default = "default_exec_suffix")]
    pub exec_suffix: String,
    /// Only runs when the driver is asked for the extra suites.
    #[serde(default)]
    pub extra: bool,
}

impl SuiteDef {
    pub fn new(name: &str, dir: &str, cases: &[&str], templates: &[Template]) -> Self {
        Self {
            name: name.to_string(),
            dir: PathBuf::from(dir),
            cases: cases.iter().map(|c| c.to_string()).collect(),
            templates: templates.to_vec(),
            compiler_flags: Vec::new(),
            exec_suffix: default_exec_suffix(),
            extra: false,
        }
    }

    pub fn with_flags(mut self, flags: &[&str]) -> Self {
        self.compiler_flags = flags.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_exec_suffix(mut self, suffix: &str) -> Self {
        self.exec_suffix = suffix.to_string();
        self
    }

    pub fn extra(mut self) -> Self {
        self.extra = true;
        self
    }
}

// ============================================================================
// FIXTURE NAMES
// ============================================================================

/// File names derived from a case prefix, relative to the suite directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixtures<'a> {
    prefix: &'a str,
    exec_suffix: &'a str,
}

impl<'a> Fixtures<'a> {
    pub fn new(prefix: &'a str, exec_suffix: &'a str) -> Self {
        Self {
            prefix,
            exec_suffix,
        }
    }

    pub fn source(&self) -> String {
        format!("{}{}", self.prefix, SOURCE_EXT)
    }

    pub fn analysis_dump(&self, stage: AnalysisStage) -> String {
        format!("{}{}{}", self.prefix, stage.suffix(), TEXT_EXT)
    }

    pub fn bytecode(&self) -> String {
        format!("{}{}", self.prefix, BYTECODE_EXT)
    }

    pub fn exec_output(&self) -> String {
        format!("{}{}{}", self.prefix, self.exec_suffix, TEXT_EXT)
    }

    pub fn opti_bytecode(&self) -> String {
        format!("{}{}{}", self.prefix, OPTI_SUFFIX, BYTECODE_EXT)
    }

    pub fn opti_exec_output(&self) -> String {
        format!("{}{}{}{}", self.prefix, OPTI_SUFFIX, self.exec_suffix, TEXT_EXT)
    }
}

/// `name.ref`
pub fn golden(name: &str) -> String {
    format!("{}{}", name, GOLDEN_EXT)
}

// ============================================================================
// STAGE PLANS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Compiler,
    Vm,
}

/// Where a run stage's stdout goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// `logs/out_NNN.txt`
    Log,
    /// A fixture file the next stages read.
    Artifact(String),
}

/// A process invocation, with file names relative to the suite directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStep {
    pub description: String,
    pub tool: Tool,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub stdout: Capture,
}

/// One unit of harness work, before numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Run(RunStep),
    Compare {
        actual: String,
        expected: String,
    },
}

impl Step {
    pub fn kind(&self) -> StageKind {
        match self {
            Step::Run(_) => StageKind::Run,
            Step::Compare { .. } => StageKind::Compare,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Step::Run(run) => run.description.clone(),
            Step::Compare { actual, expected } => {
                format!("Comparing \"{}\" to \"{}\"", actual, expected)
            }
        }
    }

    fn compare(actual: String, expected: String) -> Self {
        Step::Compare { actual, expected }
    }
}

fn compile_args(suite: &SuiteDef, source: &str, extra: &[&str], output: &str) -> Vec<String> {
    let mut args = suite.compiler_flags.clone();
    args.push(source.to_string());
    args.extend(extra.iter().map(|a| a.to_string()));
    args.push("-o".to_string());
    args.push(output.to_string());
    args
}

fn analysis_steps(suite: &SuiteDef, fx: &Fixtures<'_>, stage: AnalysisStage) -> Vec<Step> {
    let source = fx.source();
    let dump = fx.analysis_dump(stage);
    vec![
        Step::Run(RunStep {
            description: format!("Running {} analysis on {}", stage.verb(), source),
            tool: Tool::Compiler,
            args: compile_args(suite, &source, &["--stage", stage.flag()], &dump),
            stdin: None,
            stdout: Capture::Log,
        }),
        Step::compare(dump.clone(), golden(&dump)),
    ]
}

fn compile_step(suite: &SuiteDef, fx: &Fixtures<'_>) -> Step {
    let source = fx.source();
    Step::Run(RunStep {
        description: format!("Compiling {}", source),
        tool: Tool::Compiler,
        args: compile_args(suite, &source, &[], &fx.bytecode()),
        stdin: None,
        stdout: Capture::Log,
    })
}

fn execute_step(bytecode: String, output: String) -> Step {
    Step::Run(RunStep {
        description: format!("Running {}", bytecode),
        tool: Tool::Vm,
        args: Vec::new(),
        stdin: Some(bytecode),
        stdout: Capture::Artifact(output),
    })
}

/// Expands one case into its ordered stage list.
pub fn plan_case(suite: &SuiteDef, prefix: &str) -> Vec<Step> {
    let fx = Fixtures::new(prefix, &suite.exec_suffix);
    let mut steps = Vec::new();
    for template in &suite.templates {
        match template {
            Template::Lexical => steps.extend(analysis_steps(suite, &fx, AnalysisStage::Lexical)),
            Template::Syntactic => {
                steps.extend(analysis_steps(suite, &fx, AnalysisStage::Syntactic))
            }
            Template::Semantic => steps.extend(analysis_steps(suite, &fx, AnalysisStage::Semantic)),
            Template::Codegen => {
                let bytecode = fx.bytecode();
                steps.push(compile_step(suite, &fx));
                steps.push(Step::compare(bytecode.clone(), golden(&bytecode)));
            }
            Template::Build => steps.push(compile_step(suite, &fx)),
            Template::Execution => {
                let output = fx.exec_output();
                steps.push(execute_step(fx.bytecode(), output.clone()));
                steps.push(Step::compare(output.clone(), golden(&output)));
            }
            Template::Optimized => {
                let source = fx.source();
                let opti_bytecode = fx.opti_bytecode();
                steps.push(Step::Run(RunStep {
                    description: format!("Compiling {} with {} flag", source, OPTI_FLAG),
                    tool: Tool::Compiler,
                    args: compile_args(suite, &source, &[OPTI_FLAG], &opti_bytecode),
                    stdin: None,
                    stdout: Capture::Log,
                }));
                steps.push(execute_step(opti_bytecode, fx.opti_exec_output()));
                steps.push(Step::compare(fx.opti_exec_output(), fx.exec_output()));
            }
        }
    }
    steps
}

// ============================================================================
// SKIP PROPAGATION
// ============================================================================

/// Whether the next stage of the current case must be skipped.
///
/// Every template ends with a comparison, which closes its stage group. A
/// run stage that reports KO skips the rest of its group: a skipped run
/// keeps the flag set, so a failed compile also skips the execution that
/// would read its bytecode and the comparison of that execution's output.
/// The comparison clears the flag, whether it ran or was skipped, so the
/// next group runs normally. Comparison failures never skip anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipState {
    skip_next: bool,
}

impl SkipState {
    pub fn should_skip(self) -> bool {
        self.skip_next
    }

    /// The state after a stage of `kind` reported `outcome`.
    #[must_use]
    pub fn advance(self, kind: StageKind, outcome: Outcome) -> SkipState {
        let skip_next = match kind {
            StageKind::Compare => false,
            StageKind::Run => outcome != Outcome::Ok,
        };
        SkipState { skip_next }
    }
}

// ============================================================================
// RUNNER
// ============================================================================

/// Everything one suite reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub name: String,
    pub stages: Vec<StageRecord>,
}

impl SuiteReport {
    /// Number of KO stages. Skipped stages do not count.
    pub fn errors(&self) -> usize {
        self.stages.iter().filter(|s| !s.outcome.is_success()).count()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.stages.iter().filter(|s| s.outcome == outcome).count()
    }
}

/// Runs every case of `suite` in order.
///
/// Stage numbers start at 1 and increase across the whole suite. Any I/O
/// problem (missing fixture, unwritable log directory, unlaunchable tool)
/// aborts the suite with an error.
pub fn run_suite<W: Write>(
    suite: &SuiteDef,
    config: &HarnessConfig,
    reporter: &mut Reporter<W>,
) -> Result<SuiteReport> {
    let mut runner = SuiteRunner::new(suite, config)?;
    info!(suite = %suite.name, cases = suite.cases.len(), "running suite");
    for case in &suite.cases {
        runner.run_case(case, reporter)?;
    }
    let report = SuiteReport {
        name: suite.name.clone(),
        stages: runner.records,
    };
    info!(suite = %report.name, errors = report.errors(), "suite finished");
    Ok(report)
}

struct SuiteRunner<'a> {
    suite: &'a SuiteDef,
    config: &'a HarnessConfig,
    suite_dir: PathBuf,
    log_dir: PathBuf,
    next_number: usize,
    records: Vec<StageRecord>,
}

impl<'a> SuiteRunner<'a> {
    fn new(suite: &'a SuiteDef, config: &'a HarnessConfig) -> Result<Self> {
        let suite_dir = config.suite_dir(&suite.dir);
        let log_dir = suite_dir.join(&config.log_dir_name);
        if !log_dir.is_dir() {
            std::fs::create_dir_all(&log_dir)
                .map_err(|e| HarnessError::io("create log directory", &log_dir, e))?;
        }
        Ok(Self {
            suite,
            config,
            suite_dir,
            log_dir,
            next_number: 1,
            records: Vec::new(),
        })
    }

    fn run_case<W: Write>(&mut self, case: &str, reporter: &mut Reporter<W>) -> Result<()> {
        debug!(suite = %self.suite.name, case, "running case");
        let mut state = SkipState::default();
        for step in plan_case(self.suite, case) {
            state = self.run_step(&step, state, reporter)?;
        }
        Ok(())
    }

    fn run_step<W: Write>(
        &mut self,
        step: &Step,
        state: SkipState,
        reporter: &mut Reporter<W>,
    ) -> Result<SkipState> {
        let number = self.next_number;
        self.next_number += 1;

        let skip = state.should_skip();
        let outcome = match step {
            Step::Run(run) => {
                let stage = self.process_stage(run, number);
                process::run_stage(&stage, number, skip, reporter)?
            }
            Step::Compare { actual, expected } => {
                self.compare(number, &step.description(), actual, expected, skip, reporter)?
            }
        };

        self.records.push(StageRecord {
            number,
            kind: step.kind(),
            description: step.description(),
            outcome,
        });
        Ok(state.advance(step.kind(), outcome))
    }

    fn compare<W: Write>(
        &self,
        number: usize,
        description: &str,
        actual: &str,
        expected: &str,
        skip: bool,
        reporter: &mut Reporter<W>,
    ) -> Result<Outcome> {
        if skip {
            reporter.skipped(number, description)?;
            return Ok(Outcome::Skipped);
        }
        reporter.begin(number, description)?;
        let equal = oracle::files_match(&self.in_suite(actual), &self.in_suite(expected))?;
        let outcome = Outcome::from_success(equal);
        reporter.finish(number, description, outcome)?;
        Ok(outcome)
    }

    fn process_stage(&self, run: &RunStep, number: usize) -> ProcessStage {
        let program = match run.tool {
            Tool::Compiler => self.config.compiler.clone(),
            Tool::Vm => self.config.vm.clone(),
        };
        let stdout = match &run.stdout {
            Capture::Log => self.log_file("out", number),
            Capture::Artifact(name) => self.in_suite(name),
        };
        ProcessStage {
            description: run.description.clone(),
            program,
            args: run.args.clone(),
            stdout,
            stderr: self.log_file("err", number),
            stdin: run.stdin.as_deref().map(|name| self.in_suite(name)),
            working_dir: Some(self.suite_dir.clone()),
        }
    }

    fn in_suite(&self, name: &str) -> PathBuf {
        self.suite_dir.join(name)
    }

    fn log_file(&self, stream: &str, number: usize) -> PathBuf {
        log_path(&self.log_dir, stream, number)
    }
}

/// `<log_dir>/<stream>_NNN.txt`
pub fn log_path(log_dir: &Path, stream: &str, number: usize) -> PathBuf {
    log_dir.join(format!("{}_{:03}{}", stream, number, TEXT_EXT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_suite() -> SuiteDef {
        SuiteDef::new(
            "unary-operators",
            "test_unary_ops_pkg",
            &["unary_ops"],
            &[
                Template::Syntactic,
                Template::Codegen,
                Template::Execution,
                Template::Optimized,
            ],
        )
        .with_flags(&["--no-runtime"])
    }

    #[test]
    fn fixture_names_follow_the_prefix() {
        let fx = Fixtures::new("while", "_exec");
        assert_eq!(fx.source(), "while.c");
        assert_eq!(fx.analysis_dump(AnalysisStage::Semantic), "while_sem.txt");
        assert_eq!(fx.bytecode(), "while.msm");
        assert_eq!(fx.exec_output(), "while_exec.txt");
        assert_eq!(fx.opti_bytecode(), "while_opti.msm");
        assert_eq!(fx.opti_exec_output(), "while_opti_exec.txt");
        assert_eq!(golden(&fx.bytecode()), "while.msm.ref");
    }

    #[test]
    fn empty_exec_suffix_names_output_after_the_case() {
        let fx = Fixtures::new("func_rec", "");
        assert_eq!(fx.exec_output(), "func_rec.txt");
    }

    #[test]
    fn lexical_plan_is_run_then_compare() {
        let suite = SuiteDef::new("lexical", "lex", &["valid"], &[Template::Lexical])
            .with_flags(&["--no-runtime"]);
        let plan = plan_case(&suite, "valid");
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan[0],
            Step::Run(RunStep {
                description: "Running lexical analysis on valid.c".to_string(),
                tool: Tool::Compiler,
                args: ["--no-runtime", "valid.c", "--stage", "lexical", "-o", "valid_lex.txt"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                stdin: None,
                stdout: Capture::Log,
            })
        );
        assert_eq!(
            plan[1].description(),
            "Comparing \"valid_lex.txt\" to \"valid_lex.txt.ref\""
        );
    }

    #[test]
    fn full_plan_order_and_kinds() {
        let plan = plan_case(&full_suite(), "unary_ops");
        let kinds: Vec<_> = plan.iter().map(Step::kind).collect();
        use StageKind::{Compare as C, Run as R};
        assert_eq!(kinds, vec![R, C, R, C, R, C, R, R, C]);
    }

    #[test]
    fn execution_reads_bytecode_on_stdin() {
        let plan = plan_case(&full_suite(), "unary_ops");
        match &plan[4] {
            Step::Run(run) => {
                assert_eq!(run.tool, Tool::Vm);
                assert!(run.args.is_empty());
                assert_eq!(run.stdin.as_deref(), Some("unary_ops.msm"));
                assert_eq!(run.stdout, Capture::Artifact("unary_ops_exec.txt".to_string()));
            }
            other => panic!("expected a run step, got {:?}", other),
        }
    }

    #[test]
    fn optimized_output_is_compared_to_plain_execution() {
        let plan = plan_case(&full_suite(), "unary_ops");
        match &plan[6] {
            Step::Run(run) => {
                assert!(run.args.contains(&"--opti-const-op".to_string()));
                assert_eq!(run.args.last().map(String::as_str), Some("unary_ops_opti.msm"));
            }
            other => panic!("expected a run step, got {:?}", other),
        }
        assert_eq!(
            plan[8],
            Step::Compare {
                actual: "unary_ops_opti_exec.txt".to_string(),
                expected: "unary_ops_exec.txt".to_string(),
            }
        );
    }

    #[test]
    fn run_failure_skips_until_the_group_comparison() {
        let s = SkipState::default();
        assert!(!s.should_skip());
        let s = s.advance(StageKind::Run, Outcome::Ko);
        assert!(s.should_skip());
        let s = s.advance(StageKind::Compare, Outcome::Skipped);
        assert!(!s.should_skip());
    }

    #[test]
    fn skipped_run_keeps_the_flag() {
        let s = SkipState::default()
            .advance(StageKind::Run, Outcome::Ko)
            .advance(StageKind::Run, Outcome::Skipped);
        assert!(s.should_skip());
        assert!(!s.advance(StageKind::Compare, Outcome::Skipped).should_skip());
    }

    #[test]
    fn optimized_group_is_skipped_after_a_failed_compile() {
        let plan = plan_case(&full_suite(), "unary_ops");
        let mut state = SkipState::default();
        let mut outcomes = Vec::new();
        for (i, step) in plan.iter().enumerate() {
            let outcome = if state.should_skip() {
                Outcome::Skipped
            } else if i == 6 {
                Outcome::Ko
            } else {
                Outcome::Ok
            };
            outcomes.push(outcome);
            state = state.advance(step.kind(), outcome);
        }
        assert_eq!(
            &outcomes[6..],
            &[Outcome::Ko, Outcome::Skipped, Outcome::Skipped]
        );
        assert!(!state.should_skip());
    }

    #[test]
    fn compare_failure_does_not_skip() {
        let s = SkipState::default().advance(StageKind::Compare, Outcome::Ko);
        assert!(!s.should_skip());
    }

    #[test]
    fn successful_run_never_skips_its_comparison() {
        let s = SkipState::default().advance(StageKind::Run, Outcome::Ok);
        assert!(!s.should_skip());
    }

    #[test]
    fn log_paths_are_zero_padded() {
        assert_eq!(
            log_path(Path::new("logs"), "err", 7),
            Path::new("logs/err_007.txt")
        );
        assert_eq!(
            log_path(Path::new("logs"), "out", 1234),
            Path::new("logs/out_1234.txt")
        );
    }

    #[test]
    fn suite_tables_deserialize_with_defaults() {
        let yaml = "name: loops\ndir: test_loops_pkg\ncases: [while]\ntemplates: [build, execution]\n";
        let suite: SuiteDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(suite.templates, vec![Template::Build, Template::Execution]);
        assert_eq!(suite.exec_suffix, "_exec");
        assert!(suite.compiler_flags.is_empty());
        assert!(!suite.extra);
    }
}
