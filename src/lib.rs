//! Code-emission core of the Solidity→TVM compiler backend.
//!
//! The front end parses, resolves and type-checks; the statement and
//! expression compilers above this crate walk the AST and drive an
//! [`codegen::Emitter`] per function. This crate owns the shadow stack
//! model, the TVM instruction primitives, the type-directed
//! serialization strategies, the dictionary opcode dispatch and the
//! outbound-message header assembly.

pub mod ast;
pub mod codegen;
pub mod constants;
pub mod context;
pub mod diagnostic;
pub mod span;
pub mod types;

pub use codegen::{CodeLines, DictGetOp, DictSetOp, Emitter, StackModel, StructOps};
pub use context::CompilerContext;
pub use diagnostic::Diagnostic;
pub use span::Span;
pub use types::Ty;
