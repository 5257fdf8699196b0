//! Outbound-message headers: TL-B bit strings mixing compile-time
//! constants with runtime-supplied fields, and the send flow around
//! them.

use std::collections::{BTreeMap, BTreeSet};

use super::emitter::Emitter;
use super::encode::binary_to_slice;
use crate::constants::{ext_msg_info, int_msg_info, sendrawmsg};
use crate::types::STD_ADDRESS_BITS;

/// Field widths of `CommonMsgInfoRelaxed`, in declaration order:
/// ihr_disabled, bounce, bounced, src, dest, grams, other currencies,
/// ihr_fee, fwd_fee, created_lt, created_at.
const INT_FIELD_BITS: [usize; 11] = [1, 1, 1, 2, 2, 4, 1, 4, 4, 64, 32];

/// Field widths of `ext_out_msg_info`: src, dest, created_lt, created_at.
const EXT_FIELD_BITS: [usize; 4] = [2, 2, 64, 32];

/// A generator appending something to the builder on top of the stack.
pub type BuilderGen<'g, 'a> = &'g mut dyn FnMut(&mut Emitter<'a>);

/// Like [`BuilderGen`], but told how many header bits precede it so it
/// can decide between inlining and referencing its payload.
pub type BodyGen<'g, 'a> = &'g mut dyn FnMut(&mut Emitter<'a>, usize);

impl<'a> Emitter<'a> {
    /// Start a builder and assemble an internal-message header
    /// (`int_msg_info$0 ... = CommonMsgInfoRelaxed`).
    ///
    /// Runtime fields are consumed from the stack in field order, below
    /// the builder; everything else is a constant bit or a zero fill.
    /// Returns the still-unflushed tail of the bit string and the
    /// worst-case header size in bits.
    pub fn int_msg_info(
        &mut self,
        params_on_stack: &BTreeSet<usize>,
        const_params: &BTreeMap<usize, String>,
    ) -> (String, usize) {
        let mut bits = String::from("0");
        let mut max_bit_size = 0;
        self.raw(1, "NEWC");
        for (param, &width) in INT_FIELD_BITS.iter().enumerate() {
            assert!(
                !(const_params.contains_key(&param) && params_on_stack.contains(&param)),
                "message field {} is both constant and on the stack",
                param
            );

            if let Some(constant) = const_params.get(&param) {
                bits.push_str(constant);
            } else if !params_on_stack.contains(&param) {
                for _ in 0..width {
                    bits.push('0');
                }
                assert!(
                    param != int_msg_info::DEST,
                    "dest has no zero fill; pass it as a constant or on the stack"
                );
            } else {
                self.append_to_builder(&bits);
                bits.clear();
                match param {
                    int_msg_info::BOUNCE => {
                        self.raw(-1, "STI 1");
                        max_bit_size += 1;
                    }
                    int_msg_info::DEST => {
                        self.raw(-1, "STSLICE");
                        max_bit_size += STD_ADDRESS_BITS as usize;
                    }
                    int_msg_info::GRAMS => {
                        // nanograms$_ amount:(VarUInteger 16) = Grams
                        self.exchange(0, 1);
                        self.raw(-1, "STGRAMS");
                        max_bit_size += 4 + 16 * 8;
                    }
                    int_msg_info::CURRENCY => {
                        self.raw(-1, "STDICT");
                    }
                    _ => panic!("message field {} cannot be taken from the stack", param),
                }
            }
        }
        max_bit_size += bits.len();
        (bits, max_bit_size)
    }

    /// Assemble an external-outbound header
    /// (`ext_out_msg_info$11 ... = CommonMsgInfo`). Only the destination
    /// can come from the stack.
    pub fn ext_msg_info(&mut self, params_on_stack: &BTreeSet<usize>) -> (String, usize) {
        let mut bits = String::from("11");
        let mut max_bit_size = 0;
        self.raw(1, "NEWC");
        for (param, &width) in EXT_FIELD_BITS.iter().enumerate() {
            if !params_on_stack.contains(&param) {
                for _ in 0..width {
                    bits.push('0');
                }
            } else {
                self.append_to_builder(&bits);
                bits.clear();
                assert!(
                    param == ext_msg_info::DEST,
                    "message field {} cannot be taken from the stack",
                    param
                );
                self.raw(-1, "STSLICE");
                max_bit_size += STD_ADDRESS_BITS as usize;
            }
        }
        max_bit_size += bits.len();
        (bits, max_bit_size)
    }

    /// Append a literal bit string to the builder on top, picking the
    /// cheapest encoding: nothing, `STZEROES`, an inline
    /// `STSLICECONST`, or a pushed slice.
    pub fn append_to_builder(&mut self, bits: &str) {
        if bits.is_empty() {
            return;
        }
        if bits.bytes().all(|b| b == b'0') {
            self.stzeroes(bits.len() as i32);
        } else {
            let hex = binary_to_slice(bits);
            if hex.len() * 4 <= 8 * 7 + 1 {
                self.raw(0, &format!("STSLICECONST x{}", hex));
            } else {
                self.raw(1, &format!("PUSHSLICE x{}", hex));
                self.raw(-1, "STSLICER");
            }
        }
    }

    /// The full send flow: header, state-init presence bit, body
    /// presence bit, `ENDC`, mode flag, `SENDRAWMSG`.
    ///
    /// The body generator receives the header size so it can decide
    /// whether the payload still fits inline.
    pub fn send_msg(
        &mut self,
        params_on_stack: &BTreeSet<usize>,
        const_params: &BTreeMap<usize, String>,
        append_body: Option<BodyGen<'_, 'a>>,
        append_state_init: Option<BuilderGen<'_, 'a>>,
        push_sendrawmsg_flag: Option<BuilderGen<'_, 'a>>,
        is_internal_message: bool,
    ) {
        let (bits, mut msg_info_size) = if is_internal_message {
            self.int_msg_info(params_on_stack, const_params)
        } else {
            self.ext_msg_info(params_on_stack)
        };
        // stack: builder
        self.append_to_builder(&bits);

        match append_state_init {
            Some(gen) => {
                self.append_to_builder("1");
                gen(self);
                msg_info_size += 1;
            }
            None => self.append_to_builder("0"),
        }
        msg_info_size += 1;

        match append_body {
            Some(gen) => gen(self, msg_info_size),
            None => self.append_to_builder("0"),
        }

        self.raw(0, "ENDC");
        match push_sendrawmsg_flag {
            Some(gen) => gen(self),
            None => self.push_int(sendrawmsg::DEFAULT_FLAG as i32),
        }
        self.sendrawmsg();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Contract, ContractId, PragmaHelper, Unit};
    use crate::codegen::code::CodeLines;
    use crate::context::CompilerContext;

    fn unit() -> Unit {
        Unit {
            contracts: vec![Contract {
                name: "Test".to_string(),
                linearized_bases: vec![ContractId(0)],
                functions: Vec::new(),
                state_variables: Vec::new(),
            }],
        }
    }

    fn texts(code: &CodeLines) -> Vec<&str> {
        code.lines().iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_int_msg_info_all_defaults() {
        let unit = unit();
        let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();
        let mut e = Emitter::new(&ctx, 0);
        let mut consts = BTreeMap::new();
        // dest must be supplied; as a constant it stays in the literal.
        consts.insert(int_msg_info::DEST, "00".to_string());
        let (bits, max) = e.int_msg_info(&BTreeSet::new(), &consts);
        // tag + every declared width, nothing flushed yet
        let declared: usize = INT_FIELD_BITS.iter().sum();
        assert_eq!(bits.len(), 1 + declared);
        assert_eq!(bits.len(), 117);
        assert_eq!(max, bits.len());
        assert!(bits.bytes().all(|b| b == b'0'));
        assert_eq!(texts(e.code()), ["NEWC"]);
        assert_eq!(e.stack().size(), 1);
    }

    #[test]
    fn test_int_msg_info_dest_on_stack() {
        // stack: dest. The literal prefix is flushed, then STSLICE.
        let unit = unit();
        let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();
        let mut e = Emitter::new(&ctx, 1);
        let mut on_stack = BTreeSet::new();
        on_stack.insert(int_msg_info::DEST);
        let (bits, max) = e.int_msg_info(&on_stack, &BTreeMap::new());
        // 1 tag + ihr_disabled + bounce + bounced + src = 6 zeros flushed
        assert_eq!(
            texts(e.code()),
            ["NEWC", "PUSHINT 6", "STZEROES", "STSLICE"]
        );
        // grams..created_at still pending: 4+1+4+4+64+32 zeros
        assert_eq!(bits.len(), 109);
        assert_eq!(max, 267 + 109);
        assert_eq!(e.stack().size(), 1);
    }

    #[test]
    fn test_int_msg_info_grams_swaps_builder() {
        let unit = unit();
        let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();
        let mut e = Emitter::new(&ctx, 1);
        let mut on_stack = BTreeSet::new();
        on_stack.insert(int_msg_info::GRAMS);
        let mut consts = BTreeMap::new();
        consts.insert(int_msg_info::DEST, "00".to_string());
        let (_, _) = e.int_msg_info(&on_stack, &consts);
        let lines = texts(e.code());
        assert_eq!(
            lines,
            ["NEWC", "PUSHINT 8", "STZEROES", "SWAP", "STGRAMS"]
        );
        assert_eq!(e.stack().size(), 1);
    }

    #[test]
    #[should_panic(expected = "dest has no zero fill")]
    fn test_int_msg_info_requires_dest() {
        let unit = unit();
        let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();
        let mut e = Emitter::new(&ctx, 0);
        e.int_msg_info(&BTreeSet::new(), &BTreeMap::new());
    }

    #[test]
    fn test_ext_msg_info_dest_on_stack() {
        let unit = unit();
        let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();
        let mut e = Emitter::new(&ctx, 1);
        let mut on_stack = BTreeSet::new();
        on_stack.insert(ext_msg_info::DEST);
        let (bits, max) = e.ext_msg_info(&on_stack);
        // "11" + src zeros flushed as STSLICECONST; lt+at pending
        assert_eq!(texts(e.code()), ["NEWC", "STSLICECONST xc", "STSLICE"]);
        assert_eq!(bits.len(), 96);
        assert_eq!(max, 267 + 96);
    }

    #[test]
    fn test_append_to_builder_forms() {
        let unit = unit();
        let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();

        let mut e = Emitter::new(&ctx, 1);
        e.append_to_builder("");
        assert!(e.code().is_empty());

        e.append_to_builder("0");
        e.append_to_builder("0000");
        e.append_to_builder("101");
        let lines = texts(e.code());
        assert_eq!(
            lines,
            [
                "STSLICECONST 0",
                "PUSHINT 4",
                "STZEROES",
                "STSLICECONST xb_"
            ]
        );

        // 60 mixed bits exceed what STSLICECONST can inline.
        let mut long = String::from("1");
        for _ in 0..59 {
            long.push('0');
        }
        let mut e = Emitter::new(&ctx, 1);
        e.append_to_builder(&long);
        let lines = texts(e.code());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("PUSHSLICE x"));
        assert_eq!(lines[1], "STSLICER");
        assert_eq!(e.stack().size(), 1);
    }

    #[test]
    fn test_send_msg_defaults() {
        // Internal message, dest on stack, no state init, no body.
        let unit = unit();
        let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();
        let mut e = Emitter::new(&ctx, 1);
        let mut on_stack = BTreeSet::new();
        on_stack.insert(int_msg_info::DEST);
        e.send_msg(&on_stack, &BTreeMap::new(), None, None, None, true);
        let lines = texts(e.code());
        assert_eq!(
            lines,
            [
                "NEWC",
                "PUSHINT 6",
                "STZEROES",
                "STSLICE",
                // grams..created_at zeros, then stateinit=0 and body=0
                "PUSHINT 109",
                "STZEROES",
                "STSLICECONST 0",
                "STSLICECONST 0",
                "ENDC",
                "PUSHINT 3",
                "SENDRAWMSG"
            ]
        );
        // dest consumed, nothing left
        assert_eq!(e.stack().size(), 0);
    }

    #[test]
    fn test_send_msg_with_body_generator() {
        let unit = unit();
        let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();
        let mut e = Emitter::new(&ctx, 1);
        let mut on_stack = BTreeSet::new();
        on_stack.insert(int_msg_info::DEST);
        let mut seen_size = 0usize;
        let mut body = |em: &mut Emitter, msg_info_size: usize| {
            seen_size = msg_info_size;
            em.append_to_builder("1");
            em.raw(0, "STSLICECONST x5_");
        };
        e.send_msg(&on_stack, &BTreeMap::new(), Some(&mut body), None, None, true);
        // pending zeros (109) + stateinit bit
        assert_eq!(seen_size, 267 + 109 + 1);
        let lines = texts(e.code());
        assert!(lines.contains(&"SENDRAWMSG"));
        assert!(lines.contains(&"STSLICECONST x5_"));
    }
}
