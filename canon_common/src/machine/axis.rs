//! Axis identifiers, six-axis value vectors and axis masks.
//!
//! `AxisVector` is a plain `Copy` value: committed, incoming and flag records
//! each hold their own copy, so there is no aliasing between them.

use std::ops::{Add, Index, IndexMut, Sub};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::{AXES, LINEAR_AXES};

/// Machine axis. Linear axes X, Y, Z are in millimeters; A, B, C are rotary
/// and always in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
    A = 3,
    B = 4,
    C = 5,
}

impl Axis {
    /// All axes in vector order.
    pub const ALL: [Axis; AXES] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            3 => Some(Self::A),
            4 => Some(Self::B),
            5 => Some(Self::C),
            _ => None,
        }
    }

    /// Vector index of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn is_linear(self) -> bool {
        (self as usize) < LINEAR_AXES
    }

    #[inline]
    pub const fn is_rotary(self) -> bool {
        !self.is_linear()
    }

    /// Single-bit mask for this axis.
    #[inline]
    pub const fn flag(self) -> AxisFlags {
        AxisFlags::from_bits_truncate(1 << (self as u8))
    }

    pub const fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

bitflags! {
    /// Set of axes, e.g. "axis words present in this block".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AxisFlags: u8 {
        const X = 0x01;
        const Y = 0x02;
        const Z = 0x04;
        const A = 0x08;
        const B = 0x10;
        const C = 0x20;
    }
}

impl AxisFlags {
    /// Whether `axis` is in the set.
    #[inline]
    pub const fn has(&self, axis: Axis) -> bool {
        self.contains(axis.flag())
    }

    /// Axes in the set, in vector order.
    pub fn axes(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.has(*a))
    }
}

/// Ordered six-axis tuple of f64 values (target, position, offsets).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisVector([f64; AXES]);

impl AxisVector {
    pub const ZERO: Self = Self([0.0; AXES]);

    #[inline]
    pub const fn new(values: [f64; AXES]) -> Self {
        Self(values)
    }

    /// Vector with only the linear components set.
    #[inline]
    pub const fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z, 0.0, 0.0, 0.0])
    }

    #[inline]
    pub const fn get(&self, axis: Axis) -> f64 {
        self.0[axis as usize]
    }

    #[inline]
    pub fn set(&mut self, axis: Axis, value: f64) {
        self.0[axis as usize] = value;
    }

    /// Copy of `self` with one axis replaced.
    #[inline]
    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    #[inline]
    pub const fn as_array(&self) -> &[f64; AXES] {
        &self.0
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.0[0]
    }
    #[inline]
    pub fn y(&self) -> f64 {
        self.0[1]
    }
    #[inline]
    pub fn z(&self) -> f64 {
        self.0[2]
    }
    #[inline]
    pub fn a(&self) -> f64 {
        self.0[3]
    }
    #[inline]
    pub fn b(&self) -> f64 {
        self.0[4]
    }
    #[inline]
    pub fn c(&self) -> f64 {
        self.0[5]
    }

    /// True if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Component-wise combination.
    pub fn map2(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let mut out = [0.0; AXES];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = f(self.0[i], other.0[i]);
        }
        Self(out)
    }

    /// Euclidean length over the linear axes only.
    pub fn linear_norm(&self) -> f64 {
        (self.0[0] * self.0[0] + self.0[1] * self.0[1] + self.0[2] * self.0[2]).sqrt()
    }
}

impl From<[f64; AXES]> for AxisVector {
    fn from(values: [f64; AXES]) -> Self {
        Self(values)
    }
}

impl Index<Axis> for AxisVector {
    type Output = f64;

    fn index(&self, axis: Axis) -> &f64 {
        &self.0[axis as usize]
    }
}

impl IndexMut<Axis> for AxisVector {
    fn index_mut(&mut self, axis: Axis) -> &mut f64 {
        &mut self.0[axis as usize]
    }
}

impl Add for AxisVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.map2(rhs, |a, b| a + b)
    }
}

impl Sub for AxisVector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.map2(rhs, |a, b| a - b)
    }
}
