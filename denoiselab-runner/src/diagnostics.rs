//! Structured diagnostics — non-fatal conditions collected for deferred
//! end-of-run reporting.
//!
//! Nothing here is raised mid-flight: warnings accumulate in a
//! [`DiagnosticsLog`] owned by the run and are rendered once at the end.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Where a diagnostic applies: any combination of strategy, group, subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl DiagnosticScope {
    pub fn strategy(name: &str) -> Self {
        Self {
            strategy: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    fn label(&self) -> String {
        let mut parts = Vec::new();
        if let Some(s) = &self.strategy {
            parts.push(format!("strategy={s}"));
        }
        if let Some(g) = &self.group {
            parts.push(format!("group={g}"));
        }
        if let Some(s) = &self.subject {
            parts.push(format!("subject={s}"));
        }
        if parts.is_empty() {
            "run".to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub scope: DiagnosticScope,
    pub message: String,
}

/// Accumulates diagnostics over one benchmark run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, scope: DiagnosticScope, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity,
            scope,
            message: message.into(),
        });
    }

    pub fn info(&mut self, scope: DiagnosticScope, message: impl Into<String>) {
        self.push(Severity::Info, scope, message);
    }

    pub fn warn(&mut self, scope: DiagnosticScope, message: impl Into<String>) {
        self.push(Severity::Warning, scope, message);
    }

    pub fn error(&mut self, scope: DiagnosticScope, message: impl Into<String>) {
        self.push(Severity::Error, scope, message);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another log's entries into this one.
    pub fn extend(&mut self, other: DiagnosticsLog) {
        self.entries.extend(other.entries);
    }

    /// One line per diagnostic, for the end-of-run report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.entries {
            out.push_str(&format!("[{}] {}: {}\n", d.severity, d.scope.label(), d.message));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_filters() {
        let mut log = DiagnosticsLog::new();
        assert!(log.is_empty());

        log.warn(
            DiagnosticScope::strategy("scrubbing").with_group("rest"),
            "2 edges had constant weight; correlations set to 0",
        );
        log.error(
            DiagnosticScope::strategy("aroma").with_group("rest"),
            "matrix asymmetric",
        );
        log.info(DiagnosticScope::default(), "run started");

        assert_eq!(log.len(), 3);
        assert_eq!(log.warnings().count(), 1);
        assert_eq!(log.errors().count(), 1);
    }

    #[test]
    fn render_is_one_line_per_entry() {
        let mut log = DiagnosticsLog::new();
        log.warn(
            DiagnosticScope::strategy("simple").with_subject("sub-03"),
            "subject failed",
        );
        log.info(DiagnosticScope::default(), "done");
        let text = log.render();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("[WARNING] strategy=simple subject=sub-03: subject failed"));
        assert!(text.contains("[INFO] run: done"));
    }

    #[test]
    fn scope_serializes_sparsely() {
        let scope = DiagnosticScope::strategy("simple");
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json, serde_json::json!({"strategy": "simple"}));
    }

    #[test]
    fn extend_merges_entries() {
        let mut a = DiagnosticsLog::new();
        a.info(DiagnosticScope::default(), "one");
        let mut b = DiagnosticsLog::new();
        b.warn(DiagnosticScope::default(), "two");
        a.extend(b);
        assert_eq!(a.len(), 2);
    }
}
