//! # Diagnostic Module
//!
//! Source-anchored rendering of type errors.
//!
//! The parser in front of the checker keeps the machine text; given that
//! text, a [`TypeError`] can be shown the way a compiler shows it:
//!
//! ```text
//! error[E0001]: mismatched types
//!  --> Counter.mch:3:15
//!   |
//! 3 | INVARIANT c : 1 \/ {3}
//!   |               ^ expected `POW(INTEGER)`, found `INTEGER`
//!   |
//!  = note: in number 1
//! ```

use crate::span::Span;
use crate::type_checker::{TypeError, UnresolvedKind};
use crate::types::Type;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    pub fn color_code(&self) -> &'static str {
        match self {
            Severity::Error => Colors::BOLD_RED,
            Severity::Warning => Colors::BOLD_YELLOW,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message attached to a span of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Error code, e.g. `E0001`
    pub code: Option<String>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
    /// Name of the machine file, shown in the location line
    pub filename: Option<String>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
            filename: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    /// Adds a label only when the span is known.
    pub fn with_optional_label(self, span: Option<Span>, message: impl Into<String>) -> Self {
        match span {
            Some(span) => self.with_label(span, message),
            None => self,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

impl TypeError {
    /// Error code shown in rendered diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            TypeError::TypeMismatch { .. } => "E0001",
            TypeError::Unresolved { .. } => "E0002",
            TypeError::UnknownField { .. } => "E0003",
            TypeError::ExpectedRecord { .. } => "E0004",
            TypeError::ArityMismatch { .. } => "E0005",
            TypeError::UndefinedOperation { .. } => "E0006",
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let span = self.span();
        let diagnostic = match self {
            TypeError::TypeMismatch {
                expected,
                found,
                context,
                cause,
            } => {
                let diagnostic = Diagnostic::error("mismatched types")
                    .with_optional_label(span, format!("expected `{}`, found `{}`", expected, found))
                    .with_note(format!("in {}", context.description));
                let cause = cause.to_string();
                if cause.contains(&expected.to_string()) && cause.contains(&found.to_string()) {
                    diagnostic
                } else {
                    diagnostic.with_note(cause)
                }
            }
            TypeError::Unresolved { what, name, ty, .. } => {
                let diagnostic = Diagnostic::error(format!("cannot infer the type of {} `{}`", what, name))
                    .with_optional_label(span, format!("only known as `{}`", ty));
                match what {
                    UnresolvedKind::Operator => diagnostic.with_help(
                        "constrain an operand to tell whether this works on integers or on sets",
                    ),
                    UnresolvedKind::Constant => {
                        diagnostic.with_help("give the constant a type in the PROPERTIES clause")
                    }
                    UnresolvedKind::Variable => {
                        diagnostic.with_help("give the variable a type in the INVARIANT clause")
                    }
                    _ => diagnostic,
                }
            }
            TypeError::UnknownField { record, field, .. } => {
                let diagnostic = Diagnostic::error(format!("no field `{}` in `{}`", field, record))
                    .with_optional_label(span, "unknown field");
                match record {
                    Type::Record(fields) => diagnostic.with_help(format!(
                        "available fields: {}",
                        fields.names().collect::<Vec<_>>().join(", ")
                    )),
                    _ => diagnostic,
                }
            }
            TypeError::ExpectedRecord { field, found, .. } => {
                Diagnostic::error(format!("field access `'{}` on a non-record value", field))
                    .with_optional_label(span, format!("this has type `{}`", found))
            }
            TypeError::ArityMismatch {
                expected,
                found,
                context,
            } => Diagnostic::error(format!("wrong number of arguments in {}", context.description))
                .with_optional_label(span, format!("expected {}, found {}", expected, found)),
            TypeError::UndefinedOperation { name, .. } => {
                Diagnostic::error(format!("operation `{}` is not defined", name))
                    .with_optional_label(span, "called here")
            }
        };
        diagnostic.with_code(self.code())
    }
}

/// ANSI color codes for terminal output.
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD_RED: &'static str = "\x1b[1;31m";
    pub const BOLD_GREEN: &'static str = "\x1b[1;32m";
    pub const BOLD_YELLOW: &'static str = "\x1b[1;33m";
    pub const BOLD_BLUE: &'static str = "\x1b[1;34m";
    pub const BOLD_CYAN: &'static str = "\x1b[1;36m";
    pub const BOLD_WHITE: &'static str = "\x1b[1;37m";
}

/// Configuration for diagnostic rendering.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub colors: bool,
    /// Number of source lines shown around each label
    pub context_lines: usize,
    /// Columns a tab expands to in the source excerpt
    pub tab_width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            colors: true,
            context_lines: 1,
            tab_width: 4,
        }
    }
}

impl RenderConfig {
    pub fn no_colors() -> Self {
        Self {
            colors: false,
            ..Default::default()
        }
    }
}

pub struct DiagnosticRenderer {
    config: RenderConfig,
}

impl DiagnosticRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn colored() -> Self {
        Self::new(RenderConfig::default())
    }

    pub fn plain() -> Self {
        Self::new(RenderConfig::no_colors())
    }

    pub fn render(&self, diagnostic: &Diagnostic, source: &str) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.render_to(&mut output, diagnostic, source);
        output
    }

    pub fn render_to(&self, output: &mut dyn fmt::Write, diagnostic: &Diagnostic, source: &str) -> fmt::Result {
        self.render_header(output, diagnostic)?;
        self.render_labels(output, diagnostic, source)?;
        self.render_trailer(output, "note", Colors::BOLD_CYAN, &diagnostic.notes)?;
        self.render_trailer(output, "help", Colors::BOLD_GREEN, &diagnostic.help)
    }

    fn color<'a>(&self, code: &'a str) -> &'a str {
        if self.config.colors {
            code
        } else {
            ""
        }
    }

    fn reset(&self) -> &'static str {
        self.color(Colors::RESET)
    }

    fn expand_tabs(&self, line: &str) -> String {
        line.replace('\t', &" ".repeat(self.config.tab_width))
    }

    fn render_header(&self, output: &mut dyn fmt::Write, diagnostic: &Diagnostic) -> fmt::Result {
        write!(output, "{}{}", self.color(diagnostic.severity.color_code()), diagnostic.severity)?;
        if let Some(code) = &diagnostic.code {
            write!(output, "[{}]", code)?;
        }
        writeln!(
            output,
            "{}: {}{}{}",
            self.reset(),
            self.color(Colors::BOLD_WHITE),
            diagnostic.message,
            self.reset()
        )
    }

    fn render_labels(&self, output: &mut dyn fmt::Write, diagnostic: &Diagnostic, source: &str) -> fmt::Result {
        let mut labels = diagnostic.labels.clone();
        if labels.is_empty() {
            return Ok(());
        }
        labels.sort_by_key(|label| label.span.start);

        let lines: Vec<&str> = source.lines().collect();
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        let mut shown: Vec<usize> = labels
            .iter()
            .flat_map(|label| {
                let (line, _) = label.span.to_line_col(source);
                line.saturating_sub(self.config.context_lines)..=line + self.config.context_lines
            })
            .filter(|&line| line < lines.len())
            .collect();
        shown.sort_unstable();
        shown.dedup();

        let width = shown.last().map(|n| (n + 1).to_string().len()).unwrap_or(1);
        let gutter = self.color(Colors::BOLD_BLUE);

        let (line, col) = labels[0].span.to_line_col(source);
        let filename = diagnostic.filename.as_deref().unwrap_or("<machine>");
        writeln!(output, "{}{:>width$}--> {}{}:{}:{}", gutter, "", self.reset(), filename, line + 1, col + 1, width = width)?;
        writeln!(output, "{}{:>width$} |{}", gutter, "", self.reset(), width = width)?;

        let mut previous: Option<usize> = None;
        for &index in &shown {
            if matches!(previous, Some(prev) if index > prev + 1) {
                writeln!(output, "{}...{}", gutter, self.reset())?;
            }
            previous = Some(index);

            let content = lines.get(index).copied().unwrap_or("");
            let start = line_starts.get(index).copied().unwrap_or(0);
            let end = start + content.len();
            writeln!(output, "{}{:>width$} |{} {}", gutter, index + 1, self.reset(), self.expand_tabs(content), width = width)?;

            for label in labels.iter().filter(|label| label.span.to_line_col(source).0 == index) {
                let offset = label.span.start.saturating_sub(start);
                let length = label.span.end.min(end).saturating_sub(label.span.start).max(1);
                write!(
                    output,
                    "{}{:>width$} |{} {}{}{}",
                    gutter,
                    "",
                    self.reset(),
                    " ".repeat(offset),
                    self.color(diagnostic.severity.color_code()),
                    "^".repeat(length),
                    width = width
                )?;
                if !label.message.is_empty() {
                    write!(output, " {}", label.message)?;
                }
                writeln!(output, "{}", self.reset())?;
            }
        }
        writeln!(output, "{}{:>width$} |{}", gutter, "", self.reset(), width = width)
    }

    fn render_trailer(&self, output: &mut dyn fmt::Write, kind: &str, color: &str, lines: &[String]) -> fmt::Result {
        for line in lines {
            writeln!(
                output,
                "{} = {}{}{}: {}",
                self.color(Colors::BOLD_BLUE),
                self.color(color),
                kind,
                self.reset(),
                line
            )?;
        }
        Ok(())
    }
}
