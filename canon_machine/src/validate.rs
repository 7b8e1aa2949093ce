//! Modal Group Validator.
//!
//! Runs before any dispatch function touches state. A block may flag at most
//! one code per modal group; auxiliary words must lie in their domains.

use canon_common::machine::codes::{BlockCodes, ModalGroup};
use canon_common::machine::error::CanonError;
use canon_common::machine::model::{GCodeFlags, GCodeModel, WordFlags};

/// Reject a block that flags two codes of one modal group.
pub fn check_modal_groups(flags: &GCodeFlags) -> Result<(), CanonError> {
    for group in ModalGroup::ALL {
        let present = flags.codes & group.members();
        if present.bits().count_ones() > 1 {
            return Err(CanonError::ModalGroupConflict(group, present));
        }
    }
    Ok(())
}

/// Reject non-finite or negative F, S, P and R values, and G10 without L2.
pub fn check_words(values: &GCodeModel, flags: &GCodeFlags) -> Result<(), CanonError> {
    let checks = [
        (WordFlags::F, 'F', values.feed_rate),
        (WordFlags::S, 'S', values.spindle_speed),
        (WordFlags::P, 'P', values.dwell_time),
    ];
    for (word, letter, value) in checks {
        if flags.has_word(word) && !(value.is_finite() && value >= 0.0) {
            return Err(CanonError::InvalidWordValue {
                word: letter,
                value,
            });
        }
    }
    if flags.has_word(WordFlags::R) && !values.arc_radius.is_finite() {
        return Err(CanonError::InvalidWordValue {
            word: 'R',
            value: values.arc_radius,
        });
    }
    for (i, letter) in ['I', 'J', 'K'].into_iter().enumerate() {
        let word = WordFlags::from_bits_truncate(WordFlags::I.bits() << i);
        if flags.has_word(word) && !values.arc_offset[i].is_finite() {
            return Err(CanonError::InvalidWordValue {
                word: letter,
                value: values.arc_offset[i],
            });
        }
    }
    if flags.has_code(BlockCodes::G10) && !flags.has_word(WordFlags::L) {
        return Err(CanonError::InvalidWordValue {
            word: 'L',
            value: 0.0,
        });
    }
    Ok(())
}

/// Both checks, in order.
pub fn validate_block(values: &GCodeModel, flags: &GCodeFlags) -> Result<(), CanonError> {
    check_modal_groups(flags)?;
    check_words(values, flags)
}
