//! Dictionary opcode dispatch.
//!
//! TVM spells a dictionary access as `DICT[I|U]?(op)[B|REF]?`: the key
//! family comes from the key type, the suffix from how the value is
//! encoded. The value category is classified once into a [`ValueKind`]
//! tag and every emitter below matches on it exhaustively, so an
//! unhandled combination is a build error rather than a wrong opcode.

use super::emitter::Emitter;
use super::encode::store_instruction;
use super::StructOps;
use crate::constants::exception;
use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::types::{dict_key_char, dict_key_length, StructTy, Ty};

/// Write-only dictionary operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DictSetOp {
    Set,
    Replace,
    Add,
}

impl DictSetOp {
    fn mnemonic(self) -> &'static str {
        match self {
            DictSetOp::Set => "SET",
            DictSetOp::Replace => "REPLACE",
            DictSetOp::Add => "ADD",
        }
    }
}

/// Read (and read-modify-write) dictionary operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DictGetOp {
    /// Index a mapping; a miss yields the value type's default.
    GetFromMapping,
    /// Write and return the previous value plus a hit flag.
    GetSetFromMapping,
    /// Insert-if-absent and return the previous value plus a hit flag.
    GetAddFromMapping,
    /// Overwrite-if-present and return the previous value plus a hit flag.
    GetReplaceFromMapping,
    /// Index an array; a miss throws at runtime.
    GetFromArray,
    /// Yield `(hit, value-or-default)`.
    Fetch,
    /// Yield only the hit flag.
    Exist,
}

/// How a value of some type is carried in and out of a dictionary.
#[derive(Clone, Copy, Debug)]
enum ValueKind<'t> {
    /// Stored as a reference cell, used verbatim.
    Cell,
    /// Fits inline into the value slice.
    SmallStruct(&'t StructTy),
    /// Too big to inline; stored as a reference cell and re-sliced.
    LargeStruct(&'t StructTy),
    /// An address slice, stored inline.
    Address,
    /// Byte arrays and strings live in their own cell chain.
    Bytes,
    /// Anything serialized through a builder and preloaded back.
    IntegralOrArrayOrVarUint,
    /// Nested dictionaries, one bit plus a ref.
    MapOrCurrency,
}

fn classify_value<'t>(
    key_length: u16,
    value: &'t Ty,
    structs: &dyn StructOps,
    span: Span,
) -> Result<ValueKind<'t>, Diagnostic> {
    match value {
        Ty::TvmCell => Ok(ValueKind::Cell),
        Ty::Struct(st) => Ok(if structs.is_compatible_with_sdk(key_length, st) {
            ValueKind::SmallStruct(st)
        } else {
            ValueKind::LargeStruct(st)
        }),
        Ty::Address | Ty::Contract(_) => Ok(ValueKind::Address),
        Ty::Bytes | Ty::StringLiteral(_) => Ok(ValueKind::Bytes),
        Ty::Bool
        | Ty::Int(_)
        | Ty::Uint(_)
        | Ty::FixedBytes(_)
        | Ty::Enum(_)
        | Ty::VarUint
        | Ty::Array(_) => Ok(ValueKind::IntegralOrArrayOrVarUint),
        Ty::Mapping(..) | Ty::ExtraCurrencyCollection => Ok(ValueKind::MapOrCurrency),
        Ty::TvmSlice | Ty::TvmBuilder | Ty::Function { .. } => Err(Diagnostic::error(
            format!("Unsupported value type: {}", value.display()),
            span,
        )),
    }
}

impl<'a> Emitter<'a> {
    /// Adapt the value on top of the stack to the encoding its dict
    /// opcode expects. Returns whether the result is a prepared
    /// builder/cell (as opposed to a raw value).
    pub fn prepare_value_for_dict_operations(
        &mut self,
        structs: &dyn StructOps,
        key: &Ty,
        value: &Ty,
        is_value_builder: bool,
    ) -> Result<bool, Diagnostic> {
        if value.is_integral() {
            if !is_value_builder {
                self.raw(1, "NEWC");
                self.raw(-1, &store_instruction(value));
                return Ok(true);
            }
        } else if let Ty::Struct(st) = value {
            if structs.is_compatible_with_sdk(dict_key_length(key), st) {
                if !is_value_builder {
                    structs.tuple_to_builder(self, st)?;
                }
                return Ok(true);
            }
            if !is_value_builder {
                structs.tuple_to_builder(self, st)?;
            }
            // the prepared value is a finished cell here, not a builder
            self.raw(0, "ENDC");
            return Ok(true);
        } else if value.is_usual_array() {
            if !is_value_builder {
                self.raw(1, "UNPAIR"); // size dict
                self.raw(0, "SWAP"); // dict size
                self.raw(1, "NEWC"); // dict size builder
                self.raw(-1, "STU 32"); // dict builder
                self.raw(-1, "STDICT"); // builder
                return Ok(true);
            }
        } else if matches!(value, Ty::TvmCell | Ty::Bytes) {
            if is_value_builder {
                self.raw(0, "ENDC");
                return Ok(false);
            }
        } else if matches!(value, Ty::Mapping(..) | Ty::ExtraCurrencyCollection) {
            if !is_value_builder {
                self.raw(1, "NEWC"); // dict builder
                self.raw(-1, "STDICT"); // builder
                return Ok(true);
            }
        } else if matches!(value, Ty::VarUint) {
            if !is_value_builder {
                self.raw(1, "NEWC"); // value builder
                self.raw(0, "SWAP"); // builder value
                self.raw(-1, "STVARUINT32"); // builder
                return Ok(true);
            }
        }

        Ok(is_value_builder)
    }

    /// Store into a dictionary. Expects `value key dict` on the stack,
    /// with the value already prepared
    /// (see [`Emitter::prepare_value_for_dict_operations`]).
    pub fn set_dict(
        &mut self,
        structs: &dyn StructOps,
        key: &Ty,
        value: &Ty,
        is_value_builder: bool,
        span: Span,
        op: DictSetOp,
    ) -> Result<(), Diagnostic> {
        let key_length = dict_key_length(key);
        self.push_int(key_length as i32);
        // stack: value key dict key_length

        let mut opcode = format!("DICT{}{}", dict_key_char(key), op.mnemonic());
        match classify_value(key_length, value, structs, span)? {
            ValueKind::Cell => {
                assert!(!is_value_builder);
                opcode.push_str("REF");
            }
            ValueKind::SmallStruct(_) => {
                assert!(is_value_builder);
                opcode.push('B');
            }
            ValueKind::LargeStruct(_) => {
                assert!(is_value_builder);
                opcode.push_str("REF");
            }
            ValueKind::Bytes => {
                assert!(!is_value_builder);
                opcode.push_str("REF");
            }
            ValueKind::Address => {
                if is_value_builder {
                    opcode.push('B');
                }
            }
            ValueKind::IntegralOrArrayOrVarUint | ValueKind::MapOrCurrency => {
                assert!(is_value_builder);
                opcode.push('B');
            }
        }

        let delta = match op {
            DictSetOp::Set => -4 + 1,
            DictSetOp::Replace | DictSetOp::Add => -4 + 2,
        };
        self.raw(delta, &opcode);
        Ok(())
    }

    /// Read from a dictionary. Expects `key dict` on the stack (`value
    /// key dict` for the get+write variants). `result_as_slice_for_struct`
    /// hands struct reads back as raw slices instead of decoded tuples.
    pub fn get_dict(
        &mut self,
        structs: &dyn StructOps,
        key: &Ty,
        value: &Ty,
        span: Span,
        op: DictGetOp,
        result_as_slice_for_struct: bool,
    ) -> Result<(), Diagnostic> {
        let key_length = dict_key_length(key);
        let have_value = Emitter::new(self.ctx(), 0);
        GetFromDict {
            emitter: self,
            structs,
            key,
            value,
            span,
            op,
            result_as_slice: result_as_slice_for_struct,
            key_length,
            have_value,
        }
        .emit()
    }
}

/// Carries a single `get_dict` emission: the opcode prologue plus the
/// per-value-kind postlude that turns TVM's `(value?, flag)` answer into
/// the language-level result.
struct GetFromDict<'e, 'a> {
    emitter: &'e mut Emitter<'a>,
    structs: &'e dyn StructOps,
    key: &'e Ty,
    value: &'e Ty,
    span: Span,
    op: DictGetOp,
    result_as_slice: bool,
    key_length: u16,
    /// Hit-path continuation body for `Fetch`, pre-seeded with the flag
    /// swap.
    have_value: Emitter<'a>,
}

#[derive(Clone, Copy)]
enum StatusFlag {
    True,
    False,
    None,
}

impl<'e, 'a> GetFromDict<'e, 'a> {
    fn emit(&mut self) -> Result<(), Diagnostic> {
        // get+write variants enter with: value key dict
        // plain reads with:              key dict
        self.emitter.prepare_key_for_dict_operations(self.key);
        self.emitter.push_int(self.key_length as i32);

        let stack_delta = match self.op {
            DictGetOp::GetSetFromMapping
            | DictGetOp::GetAddFromMapping
            | DictGetOp::GetReplaceFromMapping => -4 + 3,
            _ => -3 + 2,
        };

        self.have_value.raw(0, "SWAP");

        let kind = classify_value(self.key_length, self.value, self.structs, self.span)?;
        let mut opcode = format!("DICT{}", dict_key_char(self.key));
        match self.op {
            DictGetOp::GetSetFromMapping
            | DictGetOp::GetAddFromMapping
            | DictGetOp::GetReplaceFromMapping => {
                opcode.push_str(match self.op {
                    DictGetOp::GetSetFromMapping => "SETGET",
                    DictGetOp::GetAddFromMapping => "ADDGET",
                    DictGetOp::GetReplaceFromMapping => "REPLACEGET",
                    _ => unreachable!(),
                });
                match kind {
                    ValueKind::Address | ValueKind::Bytes => {}
                    ValueKind::Cell | ValueKind::LargeStruct(_) => opcode.push_str("REF"),
                    _ => opcode.push('B'),
                }
            }
            DictGetOp::Exist
            | DictGetOp::Fetch
            | DictGetOp::GetFromArray
            | DictGetOp::GetFromMapping => {
                opcode.push_str("GET");
                if matches!(
                    kind,
                    ValueKind::Cell | ValueKind::LargeStruct(_) | ValueKind::Bytes
                ) {
                    opcode.push_str("REF");
                }
            }
        }

        self.emitter.raw(stack_delta, &opcode);

        match kind {
            ValueKind::Cell | ValueKind::Address | ValueKind::Bytes => self.ready_value()?,
            ValueKind::SmallStruct(st) => self.small_struct(st)?,
            ValueKind::LargeStruct(st) => self.large_struct(st)?,
            ValueKind::IntegralOrArrayOrVarUint | ValueKind::MapOrCurrency => {
                self.preloaded_value()?
            }
        }
        Ok(())
    }

    /// Values that come back from the opcode already in language form.
    fn ready_value(&mut self) -> Result<(), Diagnostic> {
        match self.op {
            DictGetOp::GetFromMapping => {
                self.push_default_cont(StatusFlag::None, false)?;
                self.emitter.raw(-2, "IFNOT");
            }
            DictGetOp::GetSetFromMapping | DictGetOp::GetReplaceFromMapping => {
                self.emitter.push_s(0);
                self.push_default_cont(StatusFlag::None, true)?;
                self.emitter.raw(-2, "IFNOT");
            }
            DictGetOp::GetAddFromMapping => {
                self.emitter.push_s(0);
                self.push_default_cont(StatusFlag::None, true)?;
                self.emitter.raw(-2, "IF");
            }
            DictGetOp::GetFromArray => self.throw_if_missing(),
            DictGetOp::Fetch => self.fetch_value()?,
            DictGetOp::Exist => self.check_exist(),
        }
        Ok(())
    }

    /// Struct values stored inline: decode the slice on hit.
    fn small_struct(&mut self, st: &StructTy) -> Result<(), Diagnostic> {
        match self.op {
            DictGetOp::GetFromMapping => {
                if self.result_as_slice {
                    self.push_default_cont(StatusFlag::None, false)?;
                    self.emitter.raw(-2, "IFNOT");
                } else {
                    // hit
                    self.emitter.start_continuation();
                    self.structs.convert_slice_to_tuple(self.emitter, st)?;
                    self.emitter.end_continuation();
                    // miss
                    self.emitter.start_continuation();
                    self.structs.create_default_struct(self.emitter, st, false)?;
                    self.emitter.end_continuation();
                    self.emitter.raw(-2, "IFELSE");
                }
            }
            DictGetOp::GetSetFromMapping | DictGetOp::GetReplaceFromMapping => {
                assert!(!self.result_as_slice);
                // hit
                self.emitter.start_continuation();
                self.structs.convert_slice_to_tuple(self.emitter, st)?;
                self.emitter.raw(0, "TRUE");
                self.emitter.end_continuation();
                // miss
                self.push_default_cont(StatusFlag::False, false)?;
                self.emitter.raw(-1, "IFELSE");
            }
            DictGetOp::GetAddFromMapping => {
                assert!(!self.result_as_slice);
                // prior value present
                self.push_default_cont(StatusFlag::True, false)?;
                // inserted
                self.emitter.start_continuation();
                self.structs.convert_slice_to_tuple(self.emitter, st)?;
                self.emitter.raw(0, "FALSE");
                self.emitter.end_continuation();
                self.emitter.raw(-1, "IFELSE");
            }
            DictGetOp::GetFromArray => {
                self.throw_if_missing();
                if !self.result_as_slice {
                    self.structs.convert_slice_to_tuple(self.emitter, st)?;
                }
            }
            DictGetOp::Fetch => {
                self.structs
                    .convert_slice_to_tuple(&mut self.have_value, st)?;
                self.fetch_value()?;
            }
            DictGetOp::Exist => self.check_exist(),
        }
        Ok(())
    }

    /// Struct values stored by reference: `CTOS` first, then decode.
    fn large_struct(&mut self, st: &StructTy) -> Result<(), Diagnostic> {
        match self.op {
            DictGetOp::GetFromMapping => {
                let mut helper = Emitter::new(self.emitter.ctx(), 0);
                helper.raw(0, "CTOS");
                if !self.result_as_slice {
                    self.structs.convert_slice_to_tuple(&mut helper, st)?;
                }
                self.emitter.push_cont(helper.code(), None);
                self.push_default_cont(StatusFlag::None, false)?;
                self.emitter.raw(-3, "IFELSE");
            }
            DictGetOp::GetSetFromMapping | DictGetOp::GetReplaceFromMapping => {
                assert!(!self.result_as_slice);
                // hit
                self.emitter.start_continuation();
                self.emitter.raw(0, "CTOS");
                self.structs.convert_slice_to_tuple(self.emitter, st)?;
                self.emitter.raw(0, "TRUE");
                self.emitter.end_continuation();
                // miss
                self.push_default_cont(StatusFlag::False, false)?;
                self.emitter.adjust_stack(-1);
                self.emitter.raw(0, "IFELSE");
            }
            DictGetOp::GetAddFromMapping => {
                assert!(!self.result_as_slice);
                // prior value present
                self.push_default_cont(StatusFlag::True, false)?;
                // inserted
                self.emitter.start_continuation();
                self.emitter.raw(0, "CTOS");
                self.structs.convert_slice_to_tuple(self.emitter, st)?;
                self.emitter.raw(0, "FALSE");
                self.emitter.end_continuation();
                self.emitter.raw(-1, "IFELSE");
            }
            DictGetOp::GetFromArray => {
                self.throw_if_missing();
                self.emitter.raw(0, "CTOS");
                if !self.result_as_slice {
                    self.structs.convert_slice_to_tuple(self.emitter, st)?;
                }
            }
            DictGetOp::Fetch => {
                self.have_value.raw(0, "CTOS");
                self.structs
                    .convert_slice_to_tuple(&mut self.have_value, st)?;
                self.fetch_value()?;
            }
            DictGetOp::Exist => self.check_exist(),
        }
        Ok(())
    }

    /// Values decoded by preloading from the result slice.
    fn preloaded_value(&mut self) -> Result<(), Diagnostic> {
        match self.op {
            DictGetOp::GetFromMapping => {
                let mut helper = Emitter::new(self.emitter.ctx(), 0);
                helper.preload(self.value);
                self.emitter.push_cont(helper.code(), None);
                self.push_default_cont(StatusFlag::None, false)?;
                self.emitter.raw(-3, "IFELSE");
            }
            DictGetOp::GetSetFromMapping | DictGetOp::GetReplaceFromMapping => {
                // hit
                self.emitter.start_continuation();
                self.emitter.preload(self.value);
                self.emitter.raw(0, "TRUE");
                self.emitter.end_continuation();
                // miss
                self.push_default_cont(StatusFlag::False, false)?;
                self.emitter.adjust_stack(-1);
                self.emitter.raw(0, "IFELSE");
            }
            DictGetOp::GetAddFromMapping => {
                // prior value present
                self.push_default_cont(StatusFlag::True, false)?;
                // inserted
                self.emitter.start_continuation();
                self.emitter.preload(self.value);
                self.emitter.raw(0, "FALSE");
                self.emitter.end_continuation();
                self.emitter.raw(-1, "IFELSE");
            }
            DictGetOp::GetFromArray => {
                self.throw_if_missing();
                self.emitter.preload(self.value);
            }
            DictGetOp::Fetch => {
                self.have_value.preload(self.value);
                self.fetch_value()?;
            }
            DictGetOp::Exist => self.check_exist(),
        }
        Ok(())
    }

    // ─── Shared postlude pieces ───────────────────────────────────

    /// Push a continuation producing the value type's default, plus an
    /// optional status flag, optionally swapped under it.
    fn push_default_cont(&mut self, flag: StatusFlag, do_swap: bool) -> Result<(), Diagnostic> {
        let mut helper = Emitter::new(self.emitter.ctx(), 0);
        if matches!(self.value, Ty::Struct(_)) && self.result_as_slice {
            helper.push_default(self.value, true, self.structs)?;
            helper.raw(0, "ENDC");
            helper.raw(0, "CTOS");
        } else {
            helper.push_default(self.value, false, self.structs)?;
        }
        match flag {
            StatusFlag::True => helper.raw(1, "TRUE"),
            StatusFlag::False => helper.raw(1, "FALSE"),
            StatusFlag::None => {}
        }
        if do_swap {
            helper.exchange(0, 1);
        }
        self.emitter.push_cont(helper.code(), None);
        Ok(())
    }

    fn throw_if_missing(&mut self) {
        self.emitter.raw(
            -1,
            &format!("THROWIFNOT {}", exception::ARRAY_INDEX_OUT_OF_RANGE),
        );
    }

    /// `(value?, flag)` → `(flag, value-or-default)`, NULL standing in
    /// for missing structs.
    fn fetch_value(&mut self) -> Result<(), Diagnostic> {
        let mut no_value = Emitter::new(self.emitter.ctx(), 0);
        if matches!(self.value, Ty::Struct(_)) {
            no_value.raw(0, "NULL");
        } else {
            no_value.push_default(self.value, false, self.structs)?;
        }

        self.emitter.raw(0, "DUP");
        self.emitter.push_cont(self.have_value.code(), None);
        self.emitter.push_cont(no_value.code(), None);
        self.emitter.raw(-2, "IFELSE");
        Ok(())
    }

    /// Keep only the hit flag, discarding the value on a hit.
    fn check_exist(&mut self) {
        let mut nip = Emitter::new(self.emitter.ctx(), 0);
        nip.adjust_stack(1);
        nip.raw(-1, "NIP");

        self.emitter.raw(0, "DUP");
        self.emitter.push_cont(nip.code(), None);
        self.emitter.raw(-2, "IF");
    }
}
