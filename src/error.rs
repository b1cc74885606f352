use std::fmt::Write;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised by task registration and graph execution.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("a task named '{0}' is already registered")]
    DuplicateTask(String),

    #[error("no task named '{0}' is registered")]
    UnknownTask(String),

    #[error("task '{task}' lists prerequisite '{dependency}', which was never registered")]
    MissingDependency { task: String, dependency: String },

    #[error("task dependency cycle involving '{0}'")]
    Cycle(String),

    #[error("task '{0}':\n{1}")]
    TaskFailed(String, anyhow::Error),
}

/// A single problem reported by the HTML lint task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub file: Utf8PathBuf,
    pub line: usize,
    pub column: usize,
    pub rule: &'static str,
    pub message: String,
}

/// Aggregated lint report. Any violation fails the build.
#[derive(Debug, Error)]
#[error("{}", render_report(.violations))]
pub struct LintError {
    pub violations: Vec<Violation>,
}

fn render_report(violations: &[Violation]) -> String {
    let mut out = String::new();

    for v in violations {
        let _ = writeln!(
            out,
            "{}:{}:{}: [{}] {}",
            v.file, v.line, v.column, v.rule, v.message
        );
    }

    let _ = write!(out, "{} lint problem(s) found", violations.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lint_error_report_names_file_and_rule() {
        let err = LintError {
            violations: vec![Violation {
                file: "src/index.html".into(),
                line: 4,
                column: 2,
                rule: "tag-pair",
                message: "tag <div> is never closed".into(),
            }],
        };

        let report = err.to_string();
        assert!(report.contains("src/index.html:4:2"));
        assert!(report.contains("tag-pair"));
        assert!(report.contains("1 lint problem(s) found"));
    }
}
