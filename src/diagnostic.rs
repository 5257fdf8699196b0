use crate::span::Span;

/// A compiler diagnostic (error or warning).
///
/// Code generation is fail-fast: the first error aborts emission for the
/// current compilation unit and the partial listing is discarded.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Print the diagnostic to stderr through ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report
            .finish()
            .eprint((filename, Source::from(source)))
            .unwrap();
    }
}

/// Print every diagnostic in order.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(0, 10, 15);
        let d = Diagnostic::error("Unsupported value type: function ()", span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "Unsupported value type: function ()");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_with_note_and_help() {
        let d = Diagnostic::error("Unsupported for mapping key type: string", Span::dummy())
            .with_note("dictionary keys must be restorable from their bit encoding")
            .with_help("hash the key yourself and use uint256");
        assert_eq!(d.notes.len(), 1);
        assert_eq!(d.help.as_deref(), Some("hash the key yourself and use uint256"));
    }

    #[test]
    fn test_warning_construction() {
        let d = Diagnostic::warning("unused state variable", Span::new(0, 3, 8));
        assert_eq!(d.severity, Severity::Warning);
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "mapping(string => uint) m;\n";
        let d = Diagnostic::error("Unsupported for mapping key type: string", Span::new(0, 8, 14));
        // Render to stderr; just verify it doesn't panic.
        d.render("test.sol", source);
    }

    #[test]
    fn test_render_diagnostics_multiple() {
        let source = "uint a;\nuint b;\n";
        let diagnostics = vec![
            Diagnostic::warning("unused a", Span::new(0, 5, 6)),
            Diagnostic::warning("unused b", Span::new(0, 13, 14)),
        ];
        render_diagnostics(&diagnostics, "test.sol", source);
    }
}
