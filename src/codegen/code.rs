//! Append-only buffer of emitted assembly lines.

/// What a line is, tracked structurally so post-edits (like trailing
/// `RET` elision) never have to re-parse text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// An executable instruction.
    Instr,
    /// A `RET` instruction; kept distinct so fall-through returns can be
    /// dropped after the fact.
    Ret,
    /// An assembler directive (`.globl`, `.macro`, ...).
    Directive,
    /// A `;;` comment line.
    Comment,
    /// An empty output line.
    Blank,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeLine {
    pub tabs: u32,
    pub kind: LineKind,
    pub text: String,
}

/// Ordered instruction lines plus the current indent depth.
///
/// Continuation bodies (`PUSHCONT { ... }`) nest the indent one level;
/// the brackets must balance back to zero by the end of every function.
#[derive(Clone, Debug, Default)]
pub struct CodeLines {
    lines: Vec<CodeLine>,
    tab_qty: u32,
}

fn classify(cmd: &str) -> LineKind {
    if cmd == " " {
        LineKind::Blank
    } else if cmd == "RET" {
        LineKind::Ret
    } else if cmd.starts_with('.') {
        LineKind::Directive
    } else if cmd.starts_with(';') {
        LineKind::Comment
    } else {
        LineKind::Instr
    }
}

impl CodeLines {
    /// Append one line at the current indent. The empty string is
    /// ignored; a single space records a blank output line.
    pub fn push(&mut self, cmd: &str) {
        if cmd.is_empty() || cmd == "\n" {
            return;
        }
        let kind = classify(cmd);
        let text = if kind == LineKind::Blank {
            String::new()
        } else {
            cmd.to_string()
        };
        self.lines.push(CodeLine {
            tabs: if kind == LineKind::Blank { 0 } else { self.tab_qty },
            kind,
            text,
        });
    }

    /// Append a line one level deeper than the current indent, keeping
    /// its own nesting. Used to splice continuation bodies.
    pub(crate) fn push_nested(&mut self, line: &CodeLine) {
        self.lines.push(CodeLine {
            tabs: line.tabs + self.tab_qty + 1,
            kind: line.kind,
            text: line.text.clone(),
        });
    }

    /// Append another buffer, re-indenting it to the current depth.
    pub fn append(&mut self, other: &CodeLines) {
        for line in &other.lines {
            self.lines.push(CodeLine {
                tabs: line.tabs + self.tab_qty,
                kind: line.kind,
                text: line.text.clone(),
            });
        }
    }

    pub fn add_tabs(&mut self, qty: u32) {
        self.tab_qty += qty;
    }

    pub fn sub_tabs(&mut self, qty: u32) {
        assert!(
            self.tab_qty >= qty,
            "unbalanced continuation: indent would drop below zero"
        );
        self.tab_qty -= qty;
    }

    pub fn start_continuation(&mut self) {
        self.push("PUSHCONT {");
        self.tab_qty += 1;
    }

    pub fn end_continuation(&mut self) {
        assert!(
            self.tab_qty > 0,
            "unbalanced continuation: `}}` without matching `PUSHCONT {{`"
        );
        self.tab_qty -= 1;
        self.push("}");
    }

    /// Current continuation nesting depth; zero at function boundaries.
    pub fn tab_qty(&self) -> u32 {
        self.tab_qty
    }

    pub fn lines(&self) -> &[CodeLine] {
        &self.lines
    }

    pub fn last(&self) -> Option<&CodeLine> {
        self.lines.last()
    }

    pub fn pop_last(&mut self) -> Option<CodeLine> {
        self.lines.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render to text; `indent` is prefixed to every non-blank line.
    pub fn str(&self, indent: &str) -> String {
        let mut out = String::new();
        for line in &self.lines {
            if line.kind != LineKind::Blank {
                out.push_str(indent);
                for _ in 0..line.tabs {
                    out.push('\t');
                }
                out.push_str(&line.text);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_render() {
        let mut code = CodeLines::default();
        code.push("NEWC");
        code.push("STU 64");
        assert_eq!(code.str(""), "NEWC\nSTU 64\n");
        assert_eq!(code.str("  "), "  NEWC\n  STU 64\n");
    }

    #[test]
    fn test_space_marker_is_blank_line() {
        let mut code = CodeLines::default();
        code.push("ENDC");
        code.push(" ");
        code.push("");
        assert_eq!(code.lines().len(), 2);
        assert_eq!(code.lines()[1].kind, LineKind::Blank);
        assert_eq!(code.str("x"), "xENDC\n\n");
    }

    #[test]
    fn test_continuation_indents_body() {
        let mut code = CodeLines::default();
        code.start_continuation();
        code.push("DROP");
        code.end_continuation();
        assert_eq!(code.str(""), "PUSHCONT {\n\tDROP\n}\n");
        assert_eq!(code.tab_qty(), 0);
    }

    #[test]
    fn test_nested_continuations() {
        let mut code = CodeLines::default();
        code.start_continuation();
        code.start_continuation();
        code.push("NIP");
        code.end_continuation();
        code.end_continuation();
        assert_eq!(code.str(""), "PUSHCONT {\n\tPUSHCONT {\n\t\tNIP\n\t}\n}\n");
    }

    #[test]
    #[should_panic(expected = "unbalanced continuation")]
    fn test_unbalanced_continuation_panics() {
        let mut code = CodeLines::default();
        code.end_continuation();
    }

    #[test]
    fn test_append_reindents() {
        let mut inner = CodeLines::default();
        inner.push("DUP");
        inner.start_continuation();
        inner.push("DROP");
        inner.end_continuation();

        let mut outer = CodeLines::default();
        outer.add_tabs(1);
        outer.append(&inner);
        assert_eq!(outer.str(""), "\tDUP\n\tPUSHCONT {\n\t\tDROP\n\t}\n");
    }

    #[test]
    fn test_line_kinds() {
        let mut code = CodeLines::default();
        code.push(".globl\tmain");
        code.push(";; note");
        code.push("RET");
        code.push("SWAP");
        let kinds: Vec<_> = code.lines().iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            [
                LineKind::Directive,
                LineKind::Comment,
                LineKind::Ret,
                LineKind::Instr
            ]
        );
    }
}
