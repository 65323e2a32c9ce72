use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Context provided to diagnostic renderers while producing output lines.
pub struct DiagnosticRenderContext<'a> {
    pub context: &'a str,
    pub verbose_info: bool,
}

/// Runtime configuration for emitting diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticDisplayOptions {
    pub verbose_info: bool,
}

impl DiagnosticDisplayOptions {
    pub fn new(verbose_info: bool) -> Self {
        Self { verbose_info }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub suggestions: Vec<String>,
    pub source_context: Option<String>,
    pub code: Option<String>,
}

impl Diagnostic {
    fn with_level(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            suggestions: Vec::new(),
            source_context: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_source_context(mut self, context: impl Into<String>) -> Self {
        self.source_context = Some(context.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }

        if !self.suggestions.is_empty() {
            let hints = self.suggestions.join("; ");
            write!(f, " (hints: {})", hints)?;
        }

        Ok(())
    }
}

/// Thread-safe sink shared by the jobs of one compiler instance.
///
/// A bounded sink keeps only the most recent `limit` diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticManager {
    diagnostics: Arc<Mutex<VecDeque<Diagnostic>>>,
    limit: Option<usize>,
}

impl DiagnosticManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(limit: usize) -> Self {
        Self {
            diagnostics: Arc::default(),
            limit: Some(limit),
        }
    }

    pub fn add_diagnostic(&self, diagnostic: Diagnostic) {
        self.add_diagnostics(vec![diagnostic]);
    }

    pub fn add_diagnostics(&self, new_diagnostics: Vec<Diagnostic>) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.extend(new_diagnostics);
            if let Some(limit) = self.limit {
                let excess = diagnostics.len().saturating_sub(limit);
                diagnostics.drain(..excess);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .map(|d| d.iter().any(|diag| diag.level == DiagnosticLevel::Error))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.clear();
        }
    }

    /// Render diagnostics into lines. The fallback context is used when a
    /// diagnostic does not specify a source context.
    pub fn render(
        diagnostics: &[Diagnostic],
        fallback_context: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) -> Vec<String> {
        let mut lines = Vec::new();
        for diagnostic in diagnostics {
            let context = diagnostic
                .source_context
                .as_deref()
                .or(fallback_context)
                .unwrap_or("lowering");

            let render_ctx = DiagnosticRenderContext {
                context,
                verbose_info: options.verbose_info,
            };

            if let Some(rendered) = render_plain(diagnostic, &render_ctx) {
                lines.extend(rendered);
            }
        }
        lines
    }

    /// Forward rendered diagnostics to the tracing subscriber.
    pub fn emit(
        diagnostics: &[Diagnostic],
        fallback_context: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) {
        for line in Self::render(diagnostics, fallback_context, options) {
            tracing::info!(target: "graft::diagnostics", "{}", line);
        }
    }
}

fn render_plain(
    diagnostic: &Diagnostic,
    ctx: &DiagnosticRenderContext<'_>,
) -> Option<Vec<String>> {
    if matches!(diagnostic.level, DiagnosticLevel::Info) && !ctx.verbose_info {
        return None;
    }

    let level = match diagnostic.level {
        DiagnosticLevel::Error => "ERROR",
        DiagnosticLevel::Warning => "WARNING",
        DiagnosticLevel::Info => "INFO",
    };

    let header = match diagnostic.code.as_ref() {
        Some(code) => format!(
            "[{}] {}: {} ({})",
            ctx.context, level, diagnostic.message, code
        ),
        None => format!("[{}] {}: {}", ctx.context, level, diagnostic.message),
    };

    let mut lines = vec![header];

    for suggestion in &diagnostic.suggestions {
        lines.push(format!("   suggestion: {}", suggestion));
    }

    Some(lines)
}
