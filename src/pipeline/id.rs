//! Identity types for the pipeline system.
//!
//! `FilterId` and `EdgeId` are plain `u32` newtypes that index straight
//! into the pipeline's storage vectors. `Side` names the two ports of a
//! splitting filter's outputs or an aggregating filter's inputs.

use serde::Serialize;
use std::fmt;

/// Index into `Pipeline::slots`, assigned in `add_*` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FilterId(pub u32);

impl FilterId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index into `Pipeline::edges`, assigned in `connect` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub u32);

/// Positional label of a port on a two-port side of a filter.
///
/// Splitting filters use it for their outputs, aggregating filters for their
/// inputs. Ports are numbered in connection order: the first `connect` call
/// binds `One`, the second binds `Two`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::One, Side::Two];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    #[inline]
    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::One => f.write_str("one"),
            Side::Two => f.write_str("two"),
        }
    }
}
