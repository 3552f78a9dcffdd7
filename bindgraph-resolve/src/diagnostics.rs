//! Diagnostics sink
//!
//! User-facing problems are collected here rather than returned as errors so a
//! single resolution pass can surface a batch of them. A host may attach a
//! [`DiagnosticReporter`] to forward each diagnostic as it arrives.

use bindgraph_core::{DeclarationRef, TypeKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Category of a user-facing problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    MissingBinding,
    DuplicateBinding,
    IncompatiblyScopedBindings,
    EmptyMultibinding,
    DependencyCycle,
    GenericClassWithoutArguments,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    /// Declaration the problem is reported against
    pub declaration: Option<DeclarationRef>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            declaration: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(kind, message)
        }
    }

    pub fn at(mut self, declaration: DeclarationRef) -> Self {
        self.declaration = Some(declaration);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.kind)?;
        if let Some(declaration) = &self.declaration {
            write!(f, "{}: ", declaration)?;
        }
        f.write_str(&self.message)
    }
}

/// Receives diagnostics as they are reported
pub trait DiagnosticReporter: Send {
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Collects diagnostics for one graph and tracks the error limit
pub struct Diagnostics {
    max_errors: usize,
    entries: Vec<Diagnostic>,
    error_count: usize,
    reporter: Option<Box<dyn DiagnosticReporter>>,
}

impl Diagnostics {
    pub fn new(max_errors: usize) -> Self {
        Self {
            max_errors,
            entries: Vec::new(),
            error_count: 0,
            reporter: None,
        }
    }

    /// Forward every diagnostic to `reporter` as well
    pub fn with_reporter(mut self, reporter: Box<dyn DiagnosticReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        if diagnostic.is_error() {
            self.error_count += 1;
        }
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.report(&diagnostic);
        }
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    /// Whether the configured error limit has been reached
    pub fn limit_reached(&self) -> bool {
        self.error_count >= self.max_errors
    }

    /// Forget everything reported so far, keeping the reporter
    pub fn clear(&mut self) {
        self.entries.clear();
        self.error_count = 0;
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("max_errors", &self.max_errors)
            .field("entries", &self.entries)
            .field("error_count", &self.error_count)
            .field("has_reporter", &self.reporter.is_some())
            .finish()
    }
}

/// Keys worth suggesting when `requested` has no binding
///
/// A candidate is similar when it has the same type under a different
/// qualifier, or the same raw class with different type arguments.
pub fn similar_keys<'a>(
    requested: &TypeKey,
    candidates: impl IntoIterator<Item = &'a TypeKey>,
) -> Vec<TypeKey> {
    let mut similar: Vec<TypeKey> = candidates
        .into_iter()
        .filter(|candidate| *candidate != requested)
        .filter(|candidate| {
            let same_type = candidate.ty == requested.ty;
            let same_class = candidate.ty.class_id().is_some()
                && candidate.ty.class_id() == requested.ty.class_id()
                && candidate.ty.arguments() != requested.ty.arguments();
            same_type || same_class
        })
        .cloned()
        .collect();
    similar.sort();
    similar.dedup();
    similar
}
