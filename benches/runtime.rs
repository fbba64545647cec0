//! Benchmarks for the hot paths generated code goes through:
//! - stack frame enter/alloc/exit
//! - struct layout computation
//! - Int64 shifts
//! - indirect calls in both dispatch modes
//! - UTF-8 decoding out of linear memory

extern crate memrt;

use criterion::{criterion_group, criterion_main, Criterion};
use memrt::{
    layout::{compute_layout, IntWidth, TypeDescriptor},
    memory::RegionKind,
    numeric::{shift, Quantum, ShiftOp},
    value::HostValue,
    DispatchMode, RuntimeBuilder,
};
use std::hint::black_box;

/// Benchmark a frame holding two locals, the common shape of a compiled leaf function.
fn bench_stack_frame(c: &mut Criterion) {
    let mut runtime = RuntimeBuilder::new().for_release().build().unwrap();

    c.bench_function("stack_frame_enter_alloc_exit", |b| {
        b.iter(|| {
            let frame = runtime.stack_enter(black_box(16)).unwrap();
            let local = runtime.stack_alloc(black_box(8)).unwrap();
            runtime.stack_exit(frame).unwrap();
            black_box(local)
        });
    });
}

/// Benchmark layout of a mixed 8-field struct.
fn bench_compute_layout(c: &mut Criterion) {
    let fields = [
        TypeDescriptor::Int(IntWidth::I8),
        TypeDescriptor::Int(IntWidth::I32),
        TypeDescriptor::Float64,
        TypeDescriptor::Int(IntWidth::I16),
        TypeDescriptor::Pointer,
        TypeDescriptor::Int(IntWidth::I64),
        TypeDescriptor::Float32,
        TypeDescriptor::Int(IntWidth::I1),
    ];

    c.bench_function("layout_mixed_8_fields", |b| {
        b.iter(|| black_box(compute_layout(black_box(&fields), false, Quantum::WORD)));
    });
}

fn bench_int64_shift(c: &mut Criterion) {
    c.bench_function("int64_shift_left_33", |b| {
        b.iter(|| {
            black_box(
                shift(black_box(0xDEAD_BEEF), black_box(0x1234), ShiftOp::ShiftLeft, 33).unwrap(),
            )
        });
    });
    c.bench_function("int64_arith_shift_right_7", |b| {
        b.iter(|| {
            black_box(
                shift(black_box(0), black_box(0x8000_0000), ShiftOp::ArithShiftRight, 7).unwrap(),
            )
        });
    });
}

/// Benchmark `iii` calls through the signature-routed and the direct table.
fn bench_dyn_call(c: &mut Criterion) {
    for mode in [DispatchMode::SignatureRouted, DispatchMode::Direct] {
        let runtime = RuntimeBuilder::new().dispatch(mode).build().unwrap();
        let index = runtime.register_function(|args: &[HostValue]| {
            let a = args[0].as_i32().unwrap_or(0);
            let b = args[1].as_i32().unwrap_or(0);
            Ok(HostValue::I32(a.wrapping_add(b)))
        });
        let args = [HostValue::I32(40), HostValue::I32(2)];

        c.bench_function(&format!("dyn_call_iii_{mode}"), |b| {
            b.iter(|| black_box(runtime.dyn_call("iii", index, black_box(&args)).unwrap()));
        });
    }
}

/// Benchmark reading back a 64-character mixed-width string.
fn bench_read_c_string(c: &mut Criterion) {
    let mut runtime = RuntimeBuilder::new().build().unwrap();
    let text = "ascii text, grüße, 日本語 and € signs repeated: ascii ü € 日";
    let address = runtime.alloc_string(text, RegionKind::Static).unwrap();

    c.bench_function("read_c_string_mixed", |b| {
        b.iter(|| black_box(runtime.read_c_string(black_box(address)).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_stack_frame,
    bench_compute_layout,
    bench_int64_shift,
    bench_dyn_call,
    bench_read_c_string
);
criterion_main!(benches);
