//! The slice of the front end's AST that code generation consumes.
//!
//! Parsing, name resolution and type checking happen upstream; what
//! arrives here is already resolved. Declarations are addressed by index
//! newtypes rather than references so the context can build maps over
//! them without tying lifetimes together.

use crate::span::Span;
use crate::types::Ty;

/// Index of a contract within its compilation unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContractId(pub usize);

/// Unique id of a variable declaration (state variable, parameter or
/// local), assigned by the front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(pub u32);

/// A function, addressed as (defining contract, index within it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionId {
    pub contract: ContractId,
    pub index: usize,
}

/// One compilation unit: every contract the front end resolved,
/// including inherited bases.
#[derive(Clone, Debug, Default)]
pub struct Unit {
    pub contracts: Vec<Contract>,
}

impl Unit {
    pub fn contract(&self, id: ContractId) -> &Contract {
        &self.contracts[id.0]
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.contracts[id.contract.0].functions[id.index]
    }
}

#[derive(Clone, Debug)]
pub struct Contract {
    pub name: String,
    /// C3-linearized inheritance chain, most derived first; the contract
    /// itself is the first entry.
    pub linearized_bases: Vec<ContractId>,
    pub functions: Vec<Function>,
    pub state_variables: Vec<Variable>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Regular,
    Constructor,
    Fallback,
    Receive,
    OnBounce,
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub kind: FunctionKind,
    pub params: Vec<Variable>,
    pub returns: Vec<Variable>,
    pub is_public: bool,
    /// Declared but not implemented (body-less override point).
    pub is_unimplemented: bool,
    /// Whether the body calls private functions, determined by the
    /// front end's usage scan; drives the selector-switch preamble.
    pub calls_private_functions: bool,
    pub span: Span,
}

impl Function {
    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == FunctionKind::Fallback
    }

    pub fn is_receive(&self) -> bool {
        self.kind == FunctionKind::Receive
    }

    pub fn is_on_bounce(&self) -> bool {
        self.kind == FunctionKind::OnBounce
    }
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub id: DeclId,
    pub name: String,
    pub ty: Ty,
    pub is_constant: bool,
    pub span: Span,
}

/// The pragma/ABI directives the code generator cares about.
#[derive(Clone, Copy, Debug)]
pub struct PragmaHelper {
    pub abi_version: u8,
    pub have_time: bool,
    pub have_ignore_int_overflow: bool,
}

impl Default for PragmaHelper {
    fn default() -> Self {
        Self {
            abi_version: 2,
            have_time: false,
            have_ignore_int_overflow: false,
        }
    }
}
