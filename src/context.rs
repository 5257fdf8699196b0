//! Process-scoped compilation context: the function registry, state
//! variable slots and pragma-derived flags every emitter consults.

use std::collections::HashMap;

use crate::ast::{Contract, ContractId, DeclId, Function, FunctionId, PragmaHelper, Unit, Variable};
use crate::constants::c7;
use crate::diagnostic::Diagnostic;

/// Read-only registry built once per contract before any code is
/// emitted. Every emitter for the unit shares one context.
pub struct CompilerContext<'a> {
    unit: &'a Unit,
    contract: ContractId,
    pragma: PragmaHelper,
    /// Non-constructor functions reachable through the inheritance
    /// chain, keyed by source name; the most derived override wins.
    functions: HashMap<String, FunctionId>,
    /// Defining contract of every function in the chain.
    function_contracts: HashMap<FunctionId, ContractId>,
    /// c7 slot of every non-constant state variable, from slot 10 up.
    state_var_slots: HashMap<DeclId, u32>,
    have_fallback: bool,
    have_receive: bool,
    have_on_bounce: bool,
    have_offchain_constructor: bool,
    ignore_int_overflow: bool,
    without_logstr: bool,
}

impl<'a> CompilerContext<'a> {
    pub fn new(
        unit: &'a Unit,
        contract: ContractId,
        pragma: PragmaHelper,
        without_logstr: bool,
    ) -> Result<Self, Diagnostic> {
        let mut ctx = Self {
            unit,
            contract,
            pragma,
            functions: HashMap::new(),
            function_contracts: HashMap::new(),
            state_var_slots: HashMap::new(),
            have_fallback: false,
            have_receive: false,
            have_on_bounce: false,
            have_offchain_constructor: false,
            ignore_int_overflow: false,
            without_logstr,
        };
        ctx.init_members()?;
        Ok(ctx)
    }

    fn init_members(&mut self) -> Result<(), Diagnostic> {
        let unit = self.unit;
        for &base_id in &unit.contract(self.contract).linearized_bases {
            let base = unit.contract(base_id);
            for (index, f) in base.functions.iter().enumerate() {
                self.function_contracts
                    .insert(FunctionId { contract: base_id, index }, base_id);
                self.ignore_int_overflow |= f.name == "tvm_ignore_integer_overflow";
                if f.name == "offchainConstructor" {
                    if self.have_offchain_constructor {
                        return Err(Diagnostic::error(
                            "offchainConstructor cannot be overridden or overloaded",
                            f.span,
                        ));
                    }
                    self.have_offchain_constructor = true;
                }
                self.have_fallback |= f.is_fallback();
                self.have_on_bounce |= f.is_on_bounce();
                self.have_receive |= f.is_receive();
            }
        }
        self.ignore_int_overflow |= self.pragma.have_ignore_int_overflow;

        // Base-first registration so a derived override replaces its base.
        for &base_id in self.contracts_chain() {
            let base = unit.contract(base_id);
            for (index, f) in base.functions.iter().enumerate() {
                if self.is_pure_function(f) || f.is_constructor() {
                    continue;
                }
                self.functions
                    .insert(f.name.clone(), FunctionId { contract: base_id, index });
            }
        }

        for variable in self.not_constant_state_variables() {
            let slot = c7::FIRST_STATE_VAR + self.state_var_slots.len() as u32;
            self.state_var_slots.insert(variable.id, slot);
        }
        Ok(())
    }

    pub fn contract(&self) -> &'a Contract {
        self.unit.contract(self.contract)
    }

    /// Defining contract of a registered function.
    pub fn contract_of(&self, function: FunctionId) -> &'a Contract {
        self.unit.contract(self.function_contracts[&function])
    }

    /// Inheritance chain in storage-layout order: base first, the
    /// compiled contract last.
    fn contracts_chain(&self) -> std::iter::Rev<std::slice::Iter<'a, ContractId>> {
        self.contract().linearized_bases.iter().rev()
    }

    /// State variables in slot order: base contracts first, constants
    /// skipped.
    pub fn not_constant_state_variables(&self) -> Vec<&'a Variable> {
        let mut variables = Vec::new();
        for &base_id in self.contracts_chain() {
            for variable in &self.unit.contract(base_id).state_variables {
                if !variable.is_constant {
                    variables.push(variable);
                }
            }
        }
        variables
    }

    /// c7 slot assigned to a non-constant state variable.
    pub fn state_var_slot(&self, decl: DeclId) -> u32 {
        self.state_var_slots[&decl]
    }

    pub fn pragma(&self) -> &PragmaHelper {
        &self.pragma
    }

    pub fn have_time_in_abi_header(&self) -> bool {
        match self.pragma.abi_version {
            1 => true,
            2 => self.pragma.have_time || self.after_signature_check().is_none(),
            v => panic!("unsupported ABI version {}", v),
        }
    }

    pub fn is_stdlib(&self) -> bool {
        self.contract().name == "stdlib"
    }

    /// Name a function carries in the emitted listing when dispatched
    /// internally.
    pub fn function_internal_name(&self, function: &Function) -> String {
        if self.is_stdlib() {
            return function.name.clone();
        }
        if function.name == "onCodeUpgrade" {
            return ":onCodeUpgrade".to_string();
        }
        format!("{}_internal", function.name)
    }

    /// Name a public function is exposed under in the ABI.
    pub fn function_external_name(function: &Function) -> String {
        assert!(
            function.is_public,
            "expected public function: {}",
            function.name
        );
        if function.is_constructor() {
            return "constructor".to_string();
        }
        if function.is_fallback() {
            return "fallback".to_string();
        }
        function.name.clone()
    }

    /// Declared-but-unimplemented functions generate no code.
    pub fn is_pure_function(&self, function: &Function) -> bool {
        function.is_unimplemented
    }

    pub fn local_function(&self, name: &str) -> Option<&'a Function> {
        self.functions.get(name).map(|&id| self.unit.function(id))
    }

    pub fn have_fallback_function(&self) -> bool {
        self.have_fallback
    }

    pub fn have_receive_function(&self) -> bool {
        self.have_receive
    }

    pub fn have_on_bounce_handler(&self) -> bool {
        self.have_on_bounce
    }

    pub fn ignore_integer_overflow(&self) -> bool {
        self.ignore_int_overflow
    }

    pub fn have_offchain_constructor(&self) -> bool {
        self.have_offchain_constructor
    }

    /// The replay-protection hook, looked up on the compiled contract
    /// only (not through the chain).
    pub fn after_signature_check(&self) -> Option<&'a Function> {
        self.contract()
            .functions
            .iter()
            .find(|f| f.name == "afterSignatureCheck")
    }

    /// The timestamp is persisted in c4 only when the ABI header carries
    /// time and no custom replay-protection hook overrides it.
    pub fn store_timestamp_in_c4(&self) -> bool {
        self.have_time_in_abi_header() && self.after_signature_check().is_none()
    }

    /// Suppresses `PRINTSTR` debug output when set.
    pub fn without_logstr(&self) -> bool {
        self.without_logstr
    }
}
