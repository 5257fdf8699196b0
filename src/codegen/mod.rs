//! TVM code emission.
//!
//! One [`Emitter`] per function walks no AST itself (the statement and
//! expression compilers upstream drive it) but owns the two things that
//! must never drift apart: the emitted instruction buffer and the shadow
//! stack model mirroring what those instructions do at runtime.

pub mod code;
pub mod dict;
pub mod emitter;
pub mod encode;
pub mod msg;
pub mod stack;

pub use code::{CodeLine, CodeLines, LineKind};
pub use dict::{DictGetOp, DictSetOp};
pub use emitter::Emitter;
pub use stack::StackModel;

use crate::diagnostic::Diagnostic;
use crate::types::StructTy;

/// Seam to the struct layout compiler, an upstream collaborator the
/// core treats as opaque.
///
/// Implementations emit through the emitter they are handed, so
/// ownership stays tree-shaped: the emitter never stores a struct
/// compiler. Every operation must leave the shadow stack with the net
/// effect documented on it; the dictionary and default-value flows are
/// calibrated against those contracts.
pub trait StructOps {
    /// True when `st` serializes inline into the value cell of a
    /// dictionary keyed by `key_length` bits, without an extra
    /// reference cell.
    fn is_compatible_with_sdk(&self, key_length: u16, st: &StructTy) -> bool;

    /// Serialize the struct tuple on top of the stack into a builder.
    /// Net stack effect 0.
    fn tuple_to_builder(&self, emitter: &mut Emitter, st: &StructTy) -> Result<(), Diagnostic>;

    /// Decode the slice on top of the stack into a struct tuple.
    /// Net stack effect 0.
    fn convert_slice_to_tuple(&self, emitter: &mut Emitter, st: &StructTy)
        -> Result<(), Diagnostic>;

    /// Push the canonical zero value of `st` (as a tuple, or as a
    /// builder when `as_builder`). Net stack effect +1.
    fn create_default_struct(
        &self,
        emitter: &mut Emitter,
        st: &StructTy,
        as_builder: bool,
    ) -> Result<(), Diagnostic>;

    /// Append every state variable to the builder on top of the stack.
    /// Net stack effect 0.
    fn state_vars_to_builder(&self, emitter: &mut Emitter) -> Result<(), Diagnostic>;
}
