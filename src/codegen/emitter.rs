//! The emission core: one [`Emitter`] per compiled function.
//!
//! Every primitive appends opcode text and applies the matching net
//! stack delta in the same call, so the shadow [`StackModel`] can never
//! drift from the emitted code. Primitives derive their own deltas;
//! [`Emitter::raw`] is the one escape hatch that takes a caller-supplied
//! delta, for opcodes this crate does not wrap.

use super::code::{CodeLines, LineKind};
use super::stack::StackModel;
use super::StructOps;
use crate::ast::{DeclId, Function};
use crate::context::CompilerContext;
use crate::diagnostic::Diagnostic;


pub struct Emitter<'a> {
    stack: StackModel,
    code: CodeLines,
    ctx: &'a CompilerContext<'a>,
}

impl<'a> Emitter<'a> {
    /// A fresh emitter whose stack already holds `stack_size` values
    /// (the function's arguments).
    pub fn new(ctx: &'a CompilerContext<'a>, stack_size: i32) -> Self {
        let mut stack = StackModel::default();
        stack.change(stack_size);
        Self {
            stack,
            code: CodeLines::default(),
            ctx,
        }
    }

    pub fn ctx(&self) -> &'a CompilerContext<'a> {
        self.ctx
    }

    pub fn stack(&self) -> &StackModel {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut StackModel {
        &mut self.stack
    }

    pub fn code(&self) -> &CodeLines {
        &self.code
    }

    pub fn into_code(self) -> CodeLines {
        self.code
    }

    // ─── Raw emission ─────────────────────────────────────────────

    /// Append `cmd` and apply `delta` to the shadow stack.
    ///
    /// Last resort: prefer the typed primitives, which derive the delta
    /// from the opcode themselves and cannot be mis-annotated.
    pub fn raw(&mut self, delta: i32, cmd: &str) {
        self.code.push(cmd);
        self.stack.change(delta);
    }

    /// Model-only correction with no emitted line, for flows whose
    /// continuations make the per-line deltas deliberately uneven.
    pub fn adjust_stack(&mut self, delta: i32) {
        self.stack.change(delta);
    }

    /// Append a multi-line chunk verbatim, with no stack effect.
    pub fn push_lines(&mut self, lines: &str) {
        for line in lines.lines() {
            self.raw(0, line);
        }
    }

    /// Append another buffer, re-indented, with no stack effect.
    pub fn append(&mut self, other: &CodeLines) {
        self.code.append(other);
    }

    pub fn add_tabs(&mut self, qty: u32) {
        self.code.add_tabs(qty);
    }

    pub fn sub_tabs(&mut self, qty: u32) {
        self.code.sub_tabs(qty);
    }

    /// `PRINTSTR` debug marker, dropped entirely in no-log builds.
    pub fn push_log(&mut self, message: &str) {
        if !self.ctx.without_logstr() {
            self.raw(0, &format!("PRINTSTR {}", message));
        }
    }

    // ─── Post-edits ───────────────────────────────────────────────

    /// Remove the last line when it is a `RET`: a fall-through return at
    /// the end of a function body is implicit.
    pub fn try_poll_last_ret(&mut self) {
        if matches!(self.code.last(), Some(line) if line.kind == LineKind::Ret) {
            self.code.pop_last();
        }
    }

    /// Remove the last emitted line unconditionally.
    pub fn poll_last_op(&mut self) {
        self.code.pop_last();
    }

    // ─── Continuations ────────────────────────────────────────────

    pub fn start_continuation(&mut self) {
        self.code.start_continuation();
    }

    pub fn end_continuation(&mut self) {
        self.code.end_continuation();
    }

    /// Push a pre-built continuation body. Models +1: the continuation
    /// value itself.
    pub fn push_cont(&mut self, cont: &CodeLines, comment: Option<&str>) {
        match comment {
            None => self.raw(0, "PUSHCONT {"),
            Some(c) => self.raw(0, &format!("PUSHCONT {{ ; {}", c)),
        }
        for line in cont.lines() {
            self.code.push_nested(line);
        }
        self.raw(1, "}");
    }

    // ─── Stack primitives ─────────────────────────────────────────

    /// Drop the top `count` values.
    pub fn drop(&mut self, count: i32) {
        assert!(count >= 0);
        match count {
            0 => {}
            1 => self.raw(-1, "DROP"),
            2 => self.raw(-2, "DROP2"),
            _ if count <= 15 => self.raw(-count, &format!("BLKDROP {}", count)),
            _ => {
                self.push_int(count);
                self.raw(-(count + 1), "DROPX");
            }
        }
    }

    /// Exchange stack positions `i` and `j` (`i <= j`).
    pub fn exchange(&mut self, i: i32, j: i32) {
        assert!(i <= j && i >= 0 && j >= 1, "bad exchange ({}, {})", i, j);
        if i == 0 && j <= 255 {
            if j == 1 {
                self.raw(0, "SWAP");
            } else if j <= 15 {
                self.raw(0, &format!("XCHG s{}", j));
            } else {
                self.raw(0, &format!("XCHG s0,s{}", j));
            }
        } else if i == 1 && (2..=15).contains(&j) {
            self.raw(0, &format!("XCHG s1,s{}", j));
        } else if 1 <= i && i < j && j <= 15 {
            self.raw(0, &format!("XCHG s{},s{}", i, j));
        } else if j <= 255 {
            self.exchange(0, i);
            self.exchange(0, j);
            self.exchange(0, i);
        } else {
            panic!("exchange depth {} out of range", j);
        }
    }

    /// Swap the top `n` values with the `m` values beneath them.
    pub fn block_swap(&mut self, m: i32, n: i32) {
        assert!(m >= 0 && n >= 0);
        if m == 0 || n == 0 {
            return;
        }
        if m == 1 && n == 1 {
            self.exchange(0, 1);
        } else if m == 1 && n == 2 {
            self.raw(0, "ROT");
        } else if m == 2 && n == 1 {
            self.raw(0, "ROTREV");
        } else if m == 2 && n == 2 {
            self.raw(0, "SWAP2");
        } else if n <= 16 && m <= 16 {
            self.raw(0, &format!("BLKSWAP {}, {}", m, n));
        } else {
            self.push_int(m);
            self.push_int(n);
            self.raw(-2, "BLKSWX");
        }
    }

    /// Reverse the order of `i` values starting `j` deep (`i >= 2`).
    pub fn reverse(&mut self, i: i32, j: i32) {
        assert!(i >= 2 && j >= 0, "bad reverse ({}, {})", i, j);
        if i == 2 && j == 0 {
            self.raw(0, "SWAP");
        } else if i == 3 && j == 0 {
            self.raw(0, "XCHG s2");
        } else if i - 2 <= 15 && j <= 15 {
            self.raw(0, &format!("REVERSE {}, {}", i, j));
        } else {
            self.push_int(i);
            self.push_int(j);
            self.raw(-2, "REVX");
        }
    }

    /// Drop `dropped` values sitting beneath the top `left` values.
    pub fn drop_under(&mut self, left: i32, dropped: i32) {
        assert!(left >= 0 && dropped >= 0);

        if dropped == 0 {
            return;
        }
        if left == 0 {
            self.drop(dropped);
            return;
        }
        if dropped == 1 && left == 1 {
            self.raw(-1, "NIP");
            return;
        }
        if dropped == 2 && left == 1 {
            self.raw(-1, "NIP");
            self.raw(-1, "NIP");
            return;
        }
        if dropped > 2 && left == 1 {
            self.exchange(0, dropped);
            self.drop(dropped);
            return;
        }
        if dropped > 15 || left > 15 {
            self.push_int(dropped);
            self.push_int(left);
            self.raw(-2, "BLKSWX");
            self.drop(dropped);
        } else {
            self.raw(-dropped, &format!("BLKDROP2 {}, {}", dropped, left));
        }
    }

    /// Copy stack value `i` to the top.
    pub fn push_s(&mut self, i: i32) {
        assert!(i >= 0);
        if i == 0 {
            self.raw(1, "DUP");
        } else {
            self.raw(1, &format!("PUSH S{}", i));
        }
    }

    pub fn push_int(&mut self, value: i32) {
        self.raw(1, &format!("PUSHINT {}", value));
    }

    // ─── Tuples ───────────────────────────────────────────────────

    pub fn tuple(&mut self, qty: i32) {
        assert!(qty >= 0);
        if qty <= 15 {
            self.raw(-qty + 1, &format!("TUPLE {}", qty));
        } else {
            assert!(qty <= 255);
            self.push_int(qty);
            self.raw(-1 - qty + 1, "TUPLEVAR");
        }
    }

    pub fn untuple(&mut self, n: i32) {
        assert!(n >= 0);
        if n <= 15 {
            self.raw(-1 + n, &format!("UNTUPLE {}", n));
        } else {
            assert!(n <= 255);
            self.push_int(n);
            self.raw(-2 + n, "UNTUPLEVAR");
        }
    }

    pub fn index(&mut self, index: i32) {
        assert!(index >= 0);
        if index <= 15 {
            self.raw(0, &format!("INDEX {}", index));
        } else {
            assert!(index <= 254);
            self.push_int(index);
            self.raw(-2 + 1, "INDEXVAR");
        }
    }

    pub fn set_index(&mut self, index: i32) {
        assert!(index >= 0);
        if index <= 15 {
            self.raw(-2 + 1, &format!("SETINDEX {}", index));
        } else {
            assert!(index <= 254);
            self.push_int(index);
            self.raw(-1 - 2 + 1, "SETINDEXVAR");
        }
    }

    // ─── Globals ──────────────────────────────────────────────────

    pub fn get_glob(&mut self, index: u32) {
        if index <= 31 {
            self.raw(1, &format!("GETGLOB {}", index));
        } else {
            assert!(index < 255);
            self.push_int(index as i32);
            self.raw(-1 + 1, "GETGLOBVAR");
        }
    }

    pub fn set_glob(&mut self, index: u32) {
        if index <= 31 {
            self.raw(-1, &format!("SETGLOB {}", index));
        } else {
            assert!(index < 255);
            self.push_int(index as i32);
            self.raw(-1 - 1, "SETGLOBVAR");
        }
    }

    /// Read a state variable from its c7 slot.
    pub fn get_state_var(&mut self, decl: DeclId) {
        let slot = self.ctx.state_var_slot(decl);
        self.get_glob(slot);
    }

    /// Write the top of the stack into a state variable's c7 slot.
    pub fn set_state_var(&mut self, decl: DeclId) {
        let slot = self.ctx.state_var_slot(decl);
        self.set_glob(slot);
    }

    /// Reset every state variable to its type's canonical zero.
    pub fn reset_all_state_vars(&mut self, structs: &dyn StructOps) -> Result<(), Diagnostic> {
        self.raw(0, ";; set default state vars");
        for variable in self.ctx.not_constant_state_variables() {
            self.push_default(&variable.ty, false, structs)?;
            self.set_state_var(variable.id);
        }
        self.raw(0, ";; end set default state vars");
        Ok(())
    }

    // ─── Builder bit stores ───────────────────────────────────────

    /// Append `qty` zero bits to the builder on top.
    pub fn stzeroes(&mut self, qty: i32) {
        if qty > 0 {
            if qty == 1 {
                self.raw(0, "STSLICECONST 0");
            } else {
                self.push_int(qty);
                self.raw(-1, "STZEROES");
            }
        }
    }

    /// Append `qty` one bits to the builder on top.
    pub fn stones(&mut self, qty: i32) {
        if qty > 0 {
            if qty == 1 {
                self.raw(0, "STSLICECONST 1");
            } else {
                self.push_int(qty);
                self.raw(-1, "STONES");
            }
        }
    }

    pub fn sendrawmsg(&mut self) {
        self.raw(-2, "SENDRAWMSG");
    }

    // ─── Calls ────────────────────────────────────────────────────

    /// Call a private function or macro with an explicit net delta.
    pub fn push_private_call(&mut self, delta: i32, name: &str) {
        self.raw(delta, &format!("CALL ${}$", name));
    }

    /// Call by name with the delta derived from the signature arity.
    pub fn push_call(&mut self, name: &str, params: usize, returns: usize) {
        self.raw(
            returns as i32 - params as i32,
            &format!("CALL ${}$", name),
        );
    }

    /// Store the top of the stack back into a bound parameter, if `decl`
    /// is one. Returns whether it was.
    pub fn try_assign_param(&mut self, decl: DeclId) -> bool {
        if !self.stack.is_param(decl) {
            return false;
        }
        let offset = self.stack.offset(decl);
        assert!(offset >= 0);
        if offset == 0 {
            // already in place
        } else if offset == 1 {
            self.raw(-1, "NIP");
        } else {
            self.raw(-1, &format!("POP s{}", offset));
        }
        true
    }

    // ─── Directives ───────────────────────────────────────────────

    pub fn generate_globl(&mut self, name: &str, is_public: bool) {
        self.raw(0, &format!(".globl\t{}", name));
        if is_public {
            self.raw(0, &format!(".public\t{}", name));
        }
        self.raw(0, &format!(".type\t{}, @function", name));
    }

    pub fn generate_internal(&mut self, name: &str, id: i32) {
        self.raw(0, &format!(".internal-alias :{},        {}", name, id));
        self.raw(0, &format!(".internal\t:{}", name));
    }

    pub fn generate_macro(&mut self, name: &str) {
        self.raw(0, &format!(".macro {}", name));
    }

    /// The `c7_to_c4` persistence macro: pack the pubkey, the optional
    /// replay timestamp, the constructor flag and every state variable
    /// into a fresh c4 cell.
    pub fn generate_c7_to_c4_macro(&mut self, structs: &dyn StructOps) -> Result<(), Diagnostic> {
        self.push_lines(
            ".macro\tc7_to_c4\n\
             GETGLOB 2\n\
             NEWC\n\
             STU 256",
        );
        if self.ctx.store_timestamp_in_c4() {
            self.push_lines(
                "GETGLOB 3\n\
                 STUR 64",
            );
        }
        self.push_lines(
            "GETGLOB 6\n\
             STUR 1",
        );
        if !self.ctx.not_constant_state_variables().is_empty() {
            structs.state_vars_to_builder(self)?;
        }
        self.push_lines(
            "ENDC\n\
             POP C4",
        );
        self.raw(0, " ");
        Ok(())
    }
}

/// Preamble restoring the code-page selector before the first private
/// call of a protocol entry point.
pub fn switch_selector_if_needed(f: &Function) -> CodeLines {
    let mut code = CodeLines::default();
    if f.calls_private_functions {
        code.push("PUSHINT 1");
        code.push("CALL 1");
    }
    code
}
