//! Serialized layouts of language-level values: store/load opcodes,
//! canonical defaults and the bit-string literals behind them.

use alloy_primitives::U256;

use super::emitter::Emitter;
use super::StructOps;
use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::types::{ElementaryTy, Ty};

/// The opcode that appends a value of type `ty` to a builder.
pub fn store_instruction(ty: &Ty) -> String {
    if ty.is_address_like() {
        return "STSLICE".to_string();
    }
    if let Some(info) = ty.integer_info() {
        let cmd = if info.is_signed { "STI" } else { "STU" };
        return format!("{} {}", cmd, info.num_bits);
    }
    match ty {
        Ty::VarUint => "STVARUINT32".to_string(),
        Ty::Mapping(..) | Ty::ExtraCurrencyCollection => "STDICT".to_string(),
        _ => panic!("no store instruction for {}", ty.display()),
    }
}

impl<'a> Emitter<'a> {
    // ─── Loads ────────────────────────────────────────────────────

    /// Split the slice on top into `(value, remainder)`.
    pub fn load(&mut self, ty: &Ty) {
        if ty.is_usual_array() {
            self.load_array(true);
            return;
        }
        let info = ty
            .integer_info()
            .unwrap_or_else(|| panic!("cannot load {}", ty.display()));
        let cmd = if info.is_signed { "LDI" } else { "LDU" };
        self.raw(1, &format!("{} {}", cmd, info.num_bits));
    }

    /// Like [`Emitter::load`], but yields only the value.
    pub fn preload(&mut self, ty: &Ty) {
        if ty.is_usual_array() {
            self.preload_array();
            return;
        }
        match ty {
            Ty::Mapping(..) | Ty::ExtraCurrencyCollection => self.raw(0, "PLDDICT"),
            Ty::VarUint => {
                // The remainder slice is dead here; preload keeps the value only.
                self.raw(1, "LDVARUINT32");
                self.raw(-1, "DROP");
            }
            _ => {
                let info = ty
                    .integer_info()
                    .unwrap_or_else(|| panic!("cannot preload {}", ty.display()));
                let cmd = if info.is_signed { "PLDI" } else { "PLDU" };
                self.raw(0, &format!("{} {}", cmd, info.num_bits));
            }
        }
    }

    /// Load an array as its `(length, dict)` pair.
    pub fn load_array(&mut self, direct_order: bool) {
        self.raw(1, "LDU 32");
        self.raw(1, "LDDICT");
        self.raw(0, "ROTREV");
        self.raw(-1, "PAIR");
        // stack: slice array
        if direct_order {
            self.exchange(0, 1);
        }
    }

    /// Preload an array, discarding the remainder slice.
    pub fn preload_array(&mut self) {
        self.raw(1, "LDU 32");
        self.raw(0, "PLDDICT");
        self.raw(-1, "PAIR");
        // stack: array
    }

    // ─── Defaults ─────────────────────────────────────────────────

    /// Push the canonical zero of `ty`: a ready value, or packed
    /// into a builder when `as_builder`.
    pub fn push_default(
        &mut self,
        ty: &Ty,
        as_builder: bool,
        structs: &dyn StructOps,
    ) -> Result<(), Diagnostic> {
        match ty {
            Ty::Address | Ty::Contract(_) => {
                self.push_zero_address();
                if as_builder {
                    self.raw(1, "NEWC");
                    self.raw(-1, "STSLICE");
                }
            }
            Ty::Bool | Ty::Int(_) | Ty::Uint(_) | Ty::FixedBytes(_) | Ty::Enum(_) | Ty::VarUint => {
                self.raw(1, "PUSHINT 0");
                if as_builder {
                    self.raw(1, "NEWC");
                    self.raw(-1, &store_instruction(ty));
                }
            }
            Ty::Bytes => {
                self.raw(1, "NEWC");
                if !as_builder {
                    self.raw(0, "ENDC");
                }
            }
            Ty::Array(_) => {
                if as_builder {
                    // an empty array is 32 length bits plus one empty-dict bit
                    self.raw(1, "NEWC");
                    self.push_int(33);
                    self.raw(-1, "STZEROES");
                } else {
                    self.push_int(0);
                    self.raw(1, "NEWDICT");
                    self.raw(-1, "PAIR");
                }
            }
            Ty::Mapping(..) | Ty::ExtraCurrencyCollection => {
                if as_builder {
                    self.raw(1, "NEWC");
                    self.stzeroes(1);
                } else {
                    self.raw(1, "NEWDICT");
                }
            }
            Ty::Struct(st) => {
                structs.create_default_struct(self, st, as_builder)?;
            }
            Ty::TvmSlice => {
                self.raw(1, "PUSHSLICE x8_");
                if as_builder {
                    self.raw(1, "NEWC");
                    self.raw(-1, "STSLICE");
                }
            }
            Ty::TvmBuilder => {
                self.raw(1, "NEWC");
            }
            Ty::TvmCell => {
                self.raw(1, "NEWC");
                if !as_builder {
                    self.raw(0, "ENDC");
                }
            }
            Ty::Function { params, returns } => {
                assert!(!as_builder, "a function default is never a builder");
                let mut body = Emitter::new(self.ctx(), params.len() as i32);
                body.drop(params.len() as i32);
                for ret in returns {
                    body.push_default(ret, false, structs)?;
                }
                let cont = body.into_code();
                self.push_cont(&cont, None);
            }
            Ty::StringLiteral(_) => panic!("string literals have no default value"),
        }
        Ok(())
    }

    /// The all-zero standard address: `addr_std$10`, no anycast,
    /// workchain 0, 256 zero address bits.
    pub fn push_zero_address(&mut self) {
        self.raw(
            1,
            "PUSHSLICE x8000000000000000000000000000000000000000000000000000000000000000001_",
        );
    }

    /// Serialize an address literal as an `addr_std` slice push and
    /// return its bit string.
    pub fn push_slice_address(&mut self, value: U256) -> String {
        let bits = address_literal_bits(value);
        self.raw(1, &format!("PUSHSLICE x{}", binary_to_slice(&bits)));
        bits
    }

    // ─── Casts & conversions ──────────────────────────────────────

    /// Emit the range check a cast to `target` implies.
    pub fn ensure_value_fits(
        &mut self,
        target: ElementaryTy,
        span: Span,
    ) -> Result<(), Diagnostic> {
        self.raw(0, &format!(";; {}", target.display()));
        match target {
            ElementaryTy::IntM(n) => self.raw(0, &format!("FITS {}", n)),
            ElementaryTy::UintM(n) => self.raw(0, &format!("UFITS {}", n)),
            ElementaryTy::BytesM(n) => self.raw(0, &format!("UFITS {}", 8 * n as u16)),
            ElementaryTy::Int => self.raw(0, "FITS 256"),
            ElementaryTy::Uint => self.raw(0, "UFITS 256"),
            // an address is a slice; nothing to check
            ElementaryTy::Address => {}
            ElementaryTy::Bool => self.raw(0, "FITS 1"),
            ElementaryTy::Bytes | ElementaryTy::String => {
                return Err(Diagnostic::error(
                    format!("Unimplemented cast to {}", target.display()),
                    span,
                ));
            }
        }
        Ok(())
    }

    /// The one cross-category literal conversion: a string literal
    /// assigned to `bytesN` becomes its big-endian byte integer.
    /// Returns whether anything was emitted.
    pub fn try_implicit_convert(&mut self, left: &Ty, right: &Ty) -> bool {
        if let (Ty::FixedBytes(_), Ty::StringLiteral(text)) = (left, right) {
            // TODO: validate the literal length against the bytesN width
            // before widening.
            let mut value = U256::ZERO;
            for byte in text.bytes() {
                value = value * U256::from(256u64) + U256::from(byte);
            }
            self.raw(1, &format!("PUSHINT {}", value));
            return true;
        }
        false
    }

    // ─── Dictionary keys ──────────────────────────────────────────

    /// Direct string/bytes keys cannot be restored from their hashed
    /// encoding, so contexts that must reconstruct keys reject them.
    pub fn check_key_restorable(&self, key: &Ty, span: Span) -> Result<(), Diagnostic> {
        if key.is_byte_array_or_string() {
            return Err(Diagnostic::error(
                format!("Unsupported for mapping key type: {}", key.display()),
                span,
            ));
        }
        Ok(())
    }

    /// Replace a string/bytes key (sitting under the dict) with its
    /// cell hash. Other key encodings pass through untouched.
    pub fn prepare_key_for_dict_operations(&mut self, key: &Ty) {
        // stack: key dict
        if key.is_byte_array_or_string() {
            self.raw(1, "PUSH s1");
            self.raw(0, "HASHCU");
            self.raw(-1, "POP s2");
            // stack: hash dict
        }
    }
}

// ─── Bit-string helpers ───────────────────────────────────────────

/// Append `bitlen` bits of `value`, most significant first.
pub fn append_binary_number(s: &mut String, value: U256, bitlen: usize) {
    for i in (0..bitlen).rev() {
        s.push(if value.bit(i) { '1' } else { '0' });
    }
}

/// Encode a binary string as the hex body of a `PUSHSLICE x...` literal.
/// Lengths that are not a nibble multiple get the TVM completion tag: a
/// one bit, zero-padding, and a trailing `_`.
pub fn binary_to_slice(bits: &str) -> String {
    let mut s: Vec<u8> = bits.bytes().collect();
    let completion_tag = s.len() % 4 != 0;
    if completion_tag {
        s.push(b'1');
        while s.len() % 4 != 0 {
            s.push(b'0');
        }
    }
    let mut hex = String::new();
    for nibble in s.chunks(4) {
        let x = nibble.iter().fold(0u8, |acc, &b| (acc << 1) | (b - b'0'));
        hex.push_str(&format!("{:x}", x));
    }
    if completion_tag {
        hex.push('_');
    }
    hex
}

/// TL-B `Grams`: a 4-bit byte count followed by the big-endian,
/// byte-aligned amount.
pub fn grams_to_binary(value: U256) -> String {
    let len = 256 - value.leading_zeros();
    assert!(len < 120, "Gram value should fit 120 bit");
    let byte_len = len.div_ceil(8);
    let mut s = String::new();
    for i in (0..4).rev() {
        s.push(if byte_len >> i & 1 == 1 { '1' } else { '0' });
    }
    append_binary_number(&mut s, value, byte_len * 8);
    s
}

/// Bit string of an address literal:
/// `addr_std$10 anycast:none workchain_id:0 address:bits256`.
pub fn address_literal_bits(value: U256) -> String {
    let mut s = String::from("10");
    s.push('0');
    s.push_str(&"0".repeat(8));
    append_binary_number(&mut s, value, 256);
    s
}
