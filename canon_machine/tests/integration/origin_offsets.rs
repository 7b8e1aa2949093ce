//! Integration test: G92 origin offsets.
//!
//! Suspended offsets must come back unchanged, and motion issued while they
//! are suspended must not include them.

use canon_common::machine::axis::{Axis, AxisVector};
use canon_common::machine::codes::BlockCodes;
use canon_common::machine::state::UnitsMode;

use super::running;

#[test]
fn suspend_and_resume_keep_values_bit_for_bit() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(12.345).y(-3.75).build())
        .unwrap();
    m.execute_block(&m.block().code(BlockCodes::G92).x(1.0).y(1.0).build())
        .unwrap();
    let offset = m.origin_offset();
    assert!(m.origin_offset_enabled());
    assert_eq!(offset.x(), 12.345 - 1.0);
    assert_eq!(offset.y(), -3.75 - 1.0);

    // suspended: target excludes the offset
    m.execute_block(&m.block().code(BlockCodes::G92_2).build())
        .unwrap();
    m.execute_block(&m.block().x(20.0).build()).unwrap();
    assert_eq!(m.canonical_position().x(), 20.0);
    assert_eq!(m.origin_offset(), offset);

    // resumed: target includes the original offset again
    m.execute_block(&m.block().code(BlockCodes::G92_3).build())
        .unwrap();
    m.execute_block(&m.block().x(20.0).build()).unwrap();
    assert_eq!(m.origin_offset().x().to_bits(), offset.x().to_bits());
    assert_eq!(m.origin_offset().y().to_bits(), offset.y().to_bits());
    assert_eq!(m.canonical_position().x(), 20.0 + offset.x());
}

#[test]
fn cancel_zeroes_offsets() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(10.0).build())
        .unwrap();
    m.execute_block(&m.block().code(BlockCodes::G92).x(0.0).build())
        .unwrap();
    assert_eq!(m.work_position(Axis::X), 0.0);
    m.execute_block(&m.block().code(BlockCodes::G92_1).build())
        .unwrap();
    assert_eq!(m.origin_offset(), AxisVector::ZERO);
    assert!(!m.origin_offset_enabled());
    assert_eq!(m.work_position(Axis::X), 10.0);

    // G92.3 after a cancel applies zeros
    m.execute_block(&m.block().code(BlockCodes::G92_3).build())
        .unwrap();
    assert_eq!(m.work_position(Axis::X), 10.0);
}

#[test]
fn offset_input_follows_units() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(50.8).build())
        .unwrap();
    m.execute_block(
        &m.block()
            .code(BlockCodes::G20)
            .code(BlockCodes::G92)
            .x(1.0)
            .build(),
    )
    .unwrap();
    assert_eq!(m.units_mode(), UnitsMode::Inches);
    assert!((m.origin_offset().x() - 25.4).abs() < 1e-9);
    assert!((m.work_position(Axis::X) - 1.0).abs() < 1e-9);
}

#[test]
fn program_end_cancels_offsets() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(10.0).build())
        .unwrap();
    m.execute_block(&m.block().code(BlockCodes::G92).x(0.0).build())
        .unwrap();
    canon_machine::script::settle(&mut m);
    m.execute_block(&m.block().code(BlockCodes::M30).build())
        .unwrap();
    assert_eq!(m.origin_offset(), AxisVector::ZERO);
    assert!(!m.origin_offset_enabled());
}
