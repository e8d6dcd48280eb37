pub mod line_index;

pub use line_index::LineIndex;

use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("syntax error: {msg}")]
    Syntax { msg: String, span: Span },

    #[error("try expression used outside of a function")]
    NoEnclosingFunction { span: Span },

    #[error("{msg}")]
    UnsupportedResultShape { msg: String, span: Span },

    #[error("unhandled result type: {ty}")]
    UnhandledTypeShape { ty: String, span: Span },

    #[error("try expression is not allowed here: {msg}")]
    UnsupportedTryPosition { msg: String, span: Span },

    #[error("failed to write output: {0}")]
    Print(#[from] std::io::Error),

    #[error("{msg}")]
    Io { msg: String, path: PathBuf },

    #[error("config error: {msg}")]
    Config { msg: String, path: PathBuf },
}

impl CompileError {
    pub fn syntax(msg: impl Into<String>, span: Span) -> Self {
        Self::Syntax { msg: msg.into(), span }
    }

    pub fn no_enclosing_function(span: Span) -> Self {
        Self::NoEnclosingFunction { span }
    }

    pub fn unsupported_result_shape(msg: impl Into<String>, span: Span) -> Self {
        Self::UnsupportedResultShape { msg: msg.into(), span }
    }

    pub fn unhandled_type_shape(ty: impl Into<String>, span: Span) -> Self {
        Self::UnhandledTypeShape { ty: ty.into(), span }
    }

    pub fn unsupported_try_position(msg: impl Into<String>, span: Span) -> Self {
        Self::UnsupportedTryPosition { msg: msg.into(), span }
    }

    pub fn io(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Io { msg: msg.into(), path }
    }

    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    /// Source span of errors raised while lexing, parsing or rewriting.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Syntax { span, .. }
            | CompileError::NoEnclosingFunction { span }
            | CompileError::UnsupportedResultShape { span, .. }
            | CompileError::UnhandledTypeShape { span, .. }
            | CompileError::UnsupportedTryPosition { span, .. } => Some(*span),
            CompileError::Print(_) | CompileError::Io { .. } | CompileError::Config { .. } => None,
        }
    }

    /// Re-tag a span-carrying error with a different span. Used to report
    /// failures at the statement that owns the try expression.
    pub fn at(self, new_span: Span) -> Self {
        match self {
            CompileError::Syntax { msg, .. } => CompileError::Syntax { msg, span: new_span },
            CompileError::NoEnclosingFunction { .. } => {
                CompileError::NoEnclosingFunction { span: new_span }
            }
            CompileError::UnsupportedResultShape { msg, .. } => {
                CompileError::UnsupportedResultShape { msg, span: new_span }
            }
            CompileError::UnhandledTypeShape { ty, .. } => {
                CompileError::UnhandledTypeShape { ty, span: new_span }
            }
            CompileError::UnsupportedTryPosition { msg, .. } => {
                CompileError::UnsupportedTryPosition { msg, span: new_span }
            }
            other => other,
        }
    }

    /// `file:line:col: message`, the plain one-line form used when the
    /// ariadne report is not wanted (non-terminal stderr, `--check` summaries).
    pub fn located(&self, source: &str, filename: &str) -> String {
        match self.span() {
            Some(span) => {
                let pos = LineIndex::new(source).offset_to_position(span.start);
                format!("{}:{}:{}: {}", filename, pos.line + 1, pos.column + 1, self)
            }
            None => format!("{filename}: {self}"),
        }
    }
}

/// Render a CompileError with ariadne for nice terminal output.
pub fn render_error(source: &str, filename: &str, err: &CompileError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match err.span() {
        Some(span) => {
            let kind_str = match err {
                CompileError::Syntax { .. } => "syntax error",
                _ => "transpile error",
            };
            let end = span.end.max(span.start + 1).min(source.len().max(span.start));
            let printed = Report::build(ReportKind::Error, (), span.start)
                .with_message(format!("{kind_str} in {filename}"))
                .with_label(Label::new(span.start..end).with_message(err.to_string()))
                .finish()
                .eprint(Source::from(source));
            if printed.is_err() {
                eprintln!("error: {}", err.located(source, filename));
            }
        }
        None => match err {
            CompileError::Io { msg, path } => {
                eprintln!("error: {msg}");
                eprintln!("  --> {}", path.display());
            }
            CompileError::Config { msg, path } => {
                eprintln!("error[config]: {msg}");
                eprintln!("  --> {}", path.display());
            }
            other => eprintln!("error: {other}"),
        },
    }
}
