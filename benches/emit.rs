//! Emission-throughput benchmark.
//!
//! Measures the hot paths of a full-contract compile: raw opcode
//! emission with shadow-stack updates, dictionary access emission, and
//! message-header assembly.

use std::collections::{BTreeMap, BTreeSet};

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tonc::ast::{Contract, ContractId, PragmaHelper, Unit};
use tonc::codegen::{DictGetOp, Emitter};
use tonc::constants::int_msg_info;
use tonc::context::CompilerContext;
use tonc::diagnostic::Diagnostic;
use tonc::span::Span;
use tonc::types::{StructTy, Ty};
use tonc::StructOps;

fn unit() -> Unit {
    Unit {
        contracts: vec![Contract {
            name: "Bench".to_string(),
            linearized_bases: vec![ContractId(0)],
            functions: Vec::new(),
            state_variables: Vec::new(),
        }],
    }
}

struct NoStructs;

impl StructOps for NoStructs {
    fn is_compatible_with_sdk(&self, _key_length: u16, _st: &StructTy) -> bool {
        true
    }
    fn tuple_to_builder(&self, _e: &mut Emitter, _st: &StructTy) -> Result<(), Diagnostic> {
        Ok(())
    }
    fn convert_slice_to_tuple(&self, _e: &mut Emitter, _st: &StructTy) -> Result<(), Diagnostic> {
        Ok(())
    }
    fn create_default_struct(
        &self,
        e: &mut Emitter,
        _st: &StructTy,
        _as_builder: bool,
    ) -> Result<(), Diagnostic> {
        e.adjust_stack(1);
        Ok(())
    }
    fn state_vars_to_builder(&self, _e: &mut Emitter) -> Result<(), Diagnostic> {
        Ok(())
    }
}

fn bench_primitives(c: &mut Criterion) {
    let unit = unit();
    let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();

    c.bench_function("emit_1k_stack_ops", |b| {
        b.iter(|| {
            let mut e = Emitter::new(&ctx, 16);
            for i in 0..250 {
                e.push_int(black_box(i));
                e.push_s(1);
                e.exchange(0, 3);
                e.drop(2);
            }
            e.into_code().str("")
        })
    });
}

fn bench_dict_get(c: &mut Criterion) {
    let unit = unit();
    let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();
    let key = Ty::Uint(32);
    let value = Ty::Uint(64);

    c.bench_function("emit_dict_get", |b| {
        b.iter(|| {
            let mut e = Emitter::new(&ctx, 2);
            e.get_dict(
                &NoStructs,
                black_box(&key),
                black_box(&value),
                Span::dummy(),
                DictGetOp::GetFromMapping,
                false,
            )
            .unwrap();
            e.into_code().str("")
        })
    });
}

fn bench_msg_header(c: &mut Criterion) {
    let unit = unit();
    let ctx = CompilerContext::new(&unit, ContractId(0), PragmaHelper::default(), true).unwrap();
    let mut on_stack = BTreeSet::new();
    on_stack.insert(int_msg_info::DEST);
    let consts = BTreeMap::new();

    c.bench_function("emit_send_msg", |b| {
        b.iter(|| {
            let mut e = Emitter::new(&ctx, 1);
            e.send_msg(black_box(&on_stack), &consts, None, None, None, true);
            e.into_code().str("")
        })
    });
}

criterion_group!(benches, bench_primitives, bench_dict_get, bench_msg_header);
criterion_main!(benches);
