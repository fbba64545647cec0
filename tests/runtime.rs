//! Integration tests driving a complete runtime the way generated code does.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use memrt::{layout::NamedField, prelude::*};

fn small_runtime(checks: CheckFlags) -> Result<Runtime> {
    RuntimeBuilder::new()
        .checks(checks)
        .stack_size(1024)
        .initial_memory(4096)
        .max_memory(64 * 1024)
        .build()
}

/// A function that builds a struct on its own stack frame, reads it back field by field and
/// returns the sum, the way a compiled function with a local aggregate would.
#[test]
fn test_struct_on_stack_frame() -> Result<()> {
    let mut rt = small_runtime(CheckFlags::ASSERTIONS | CheckFlags::STACK_INVALIDATION)?;

    let ty = rt.register_struct("%struct.Item", &["i32", "i8", "i32"], false)?;
    assert_eq!(ty.layout().flat_indexes, vec![0, 4, 8]);
    assert_eq!(ty.layout().flat_size, 12);
    assert_eq!(ty.layout().align_size, 4);

    let info = rt.resolve_named_offsets(
        &[
            NamedField::field("count"),
            NamedField::field("flag"),
            NamedField::field("total"),
        ],
        "Item",
        0,
    )?;

    let before = rt.stack_save();
    let frame = rt.stack_enter(info.size())?;
    let item = before;

    let mem = rt.memory_mut();
    mem.store_i32(item + info.offset("count").unwrap_or_default(), 3)?;
    mem.store_i8(item + info.offset("flag").unwrap_or_default(), 1)?;
    mem.store_i32(item + info.offset("total").unwrap_or_default(), 39)?;

    let sum = rt.memory().load_i32(item)?
        + i32::from(rt.memory().load_i8(item + 4)?)
        + rt.memory().load_i32(item + 8)?;
    assert_eq!(sum, 43);

    rt.stack_exit(frame)?;
    assert_eq!(rt.stack_save(), before);

    // the frame's bytes were invalidated on exit
    assert!(rt.memory().is_poisoned(item));
    assert!(matches!(
        rt.memory().load_i32(item),
        Err(Error::AssertionFailure { .. })
    ));
    Ok(())
}

#[test]
fn test_nested_frames_must_close_in_order() -> Result<()> {
    let mut rt = small_runtime(CheckFlags::ASSERTIONS)?;

    let outer = rt.stack_enter(8)?;
    let inner = rt.stack_enter(16)?;
    let stale = inner;

    assert!(matches!(
        rt.stack_exit(outer),
        Err(Error::FrameOrder {
            expected_depth: 2,
            found_depth: 1
        })
    ));

    rt.stack_exit(inner)?;
    rt.stack_exit(outer)?;
    assert_eq!(rt.memory().frame_depth(), 0);

    // a stale token from an already closed frame is rejected as well
    assert!(rt.stack_exit(stale).is_err());
    Ok(())
}

#[test]
fn test_stack_exhaustion_keeps_top() -> Result<()> {
    let mut rt = small_runtime(CheckFlags::empty())?;
    let top = rt.stack_save();

    let err = rt.stack_alloc(4096).unwrap_err();
    assert!(matches!(
        err,
        Error::OutOfMemory {
            region: RegionKind::Stack,
            requested: 4096,
            ..
        }
    ));
    assert_eq!(rt.stack_save(), top);

    // the stack never grows into the static region
    assert_eq!(rt.memory().stack().limit() - rt.memory().stack().base(), 1024);
    Ok(())
}

#[test]
fn test_static_region_grows() -> Result<()> {
    let mut rt = small_runtime(CheckFlags::ASSERTIONS)?;
    let initial = rt.memory().size();

    let first = rt.static_alloc(16)?;
    rt.memory_mut().store_i32(first, 0x1234)?;

    let big = rt.static_alloc(8 * 1024)?;
    assert!(rt.memory().size() > initial);
    assert!(rt.memory().size() <= 64 * 1024);
    assert!(big > first);

    // existing contents survive growth, new memory is zeroed
    assert_eq!(rt.memory().load_i32(first)?, 0x1234);
    assert!(rt.memory().read(big, 8 * 1024)?.iter().all(|&b| b == 0));

    assert!(matches!(
        rt.static_alloc(1024 * 1024),
        Err(Error::OutOfMemory {
            region: RegionKind::Static,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_fixed_memory_never_grows() -> Result<()> {
    let mut rt = RuntimeBuilder::new()
        .stack_size(256)
        .initial_memory(1024)
        .max_memory(1024 * 1024)
        .grower(FixedMemory)
        .build()?;

    let top = rt.memory().statics().top();
    assert!(rt.static_alloc(2048).is_err());
    assert_eq!(rt.memory().statics().top(), top);
    assert_eq!(rt.memory().size(), 1024);
    Ok(())
}

#[test]
fn test_int64_shift_through_scratch_slot() -> Result<()> {
    let mut rt = small_runtime(CheckFlags::ASSERTIONS)?;

    let shifted = rt.bitshift64(1, 0, ShiftOp::ShiftLeft, 33)?;
    assert_eq!(shifted, Int64::new(0, 2));
    assert_eq!(rt.memory().load_i64(rt.temp_double_ptr())?, shifted);

    let negative = Int64::from_i64(-1024);
    let back = rt.bitshift64(negative.low, negative.high, ShiftOp::ArithShiftRight, 4)?;
    assert_eq!(back.to_i64(), -64);

    let logical = rt.bitshift64(0, 0x8000_0000, ShiftOp::LogicalShiftRight, 63)?;
    assert_eq!(logical.to_u64(), 1);
    Ok(())
}

#[test]
fn test_sign_conversion_modes() -> Result<()> {
    let lax = small_runtime(CheckFlags::empty())?;
    assert_eq!(lax.to_unsigned(-1, 32)?, 0xFFFF_FFFF);
    assert_eq!(lax.to_signed(0x80, 8)?, -128);
    assert_eq!(lax.to_signed(0x7F, 8)?, 127);

    let strict = small_runtime(CheckFlags::STRICT_SIGNS)?;
    assert!(matches!(
        strict.to_unsigned(-1, 32),
        Err(Error::SignConversion { bits: 32, .. })
    ));
    assert_eq!(strict.to_unsigned(5, 32)?, 5);
    Ok(())
}

#[test]
fn test_function_table_and_wrappers() -> Result<()> {
    let rt = small_runtime(CheckFlags::empty())?;
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let index = rt.register_function(move |args: &[HostValue]| {
        counter.fetch_add(1, Ordering::SeqCst);
        let sum: i32 = args.iter().filter_map(HostValue::as_i32).sum();
        Ok(HostValue::I32(sum))
    });

    assert_eq!(
        rt.dyn_call("iii", index, &[HostValue::I32(40), HostValue::I32(2)])?,
        HostValue::I32(42)
    );
    assert!(matches!(
        rt.dyn_call("iii", index, &[HostValue::I32(1)]),
        Err(Error::ArityMismatch {
            expected: 2,
            found: 1,
            ..
        })
    ));

    let first = rt.func_wrapper(index, "vii")?;
    let second = rt.func_wrapper(index, "vii")?;
    assert!(Arc::ptr_eq(&first, &second));

    first.invoke(&[HostValue::I32(1), HostValue::I32(2)])?;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // a conflicting signature still yields the cached wrapper, with one warning
    let third = rt.func_wrapper(index, "vi")?;
    let _ = rt.func_wrapper(index, "vi")?;
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(rt.diagnostics().warning_count(), 1);

    assert!(matches!(
        rt.func_wrapper(index + 1, "v"),
        Err(Error::InvalidTableIndex(_))
    ));
    Ok(())
}

#[test]
fn test_direct_dispatch_mode() -> Result<()> {
    let rt = RuntimeBuilder::new()
        .dispatch(DispatchMode::Direct)
        .stack_size(256)
        .initial_memory(1024)
        .max_memory(1024)
        .build()?;
    let index = rt.register_function(|_: &[HostValue]| Ok(HostValue::F64(0.5)));
    assert_eq!(rt.dyn_call("d", index, &[])?, HostValue::F64(0.5));
    assert_eq!(rt.table().mode(), DispatchMode::Direct);
    Ok(())
}

#[test]
fn test_strings_round_trip() -> Result<()> {
    let mut rt = small_runtime(CheckFlags::ASSERTIONS)?;

    for text in ["", "plain ascii", "Grüße, 世界", "€uro"] {
        let address = rt.alloc_string(text, RegionKind::Static)?;
        assert_eq!(rt.read_c_string(address)?, text);
        assert_eq!(rt.memory().read(address + text.len(), 1)?, &[0]);
    }
    Ok(())
}

#[test]
fn test_embedded_struct_offsets() -> Result<()> {
    let rt = small_runtime(CheckFlags::empty())?;
    rt.register_struct("%struct.Vec2", &["float", "float"], false)?;
    rt.register_struct("%struct.Body", &["i8", "%struct.Vec2", "double"], false)?;

    let info = rt.resolve_named_offsets(
        &[
            NamedField::field("kind"),
            NamedField::embedded(
                "pos",
                vec![NamedField::field("x"), NamedField::field("y")],
            ),
            NamedField::field("mass"),
        ],
        "Body",
        0,
    )?;

    assert_eq!(info.offset("kind"), Some(0));
    let pos = info.nested("pos").map(|p| (p.offset("x"), p.offset("y")));
    assert_eq!(pos, Some((Some(4), Some(8))));
    assert_eq!(info.offset("mass"), Some(12));
    assert_eq!(info.size(), 20);
    Ok(())
}

#[test]
fn test_finish_returns_diagnostics() -> Result<()> {
    let rt = small_runtime(CheckFlags::empty())?;
    rt.warn_once("unsupported intrinsic");
    rt.warn_once("unsupported intrinsic");

    let diagnostics = rt.finish();
    assert_eq!(diagnostics.count(), 1);
    assert!(diagnostics.has_warnings());
    assert!(!diagnostics.has_errors());
    Ok(())
}
