//! Cosmetic filters: frame-wide looks and face-local touch-ups

mod facial;
mod global;

pub use facial::{
    FacialBeautyEngine, FacialFilter, FacialFilterKind, FacialFilterOutcome, FacialFilterParams,
};
pub use global::{BeautyFilter, BeautyFilterEngine, BeautyFilterKind};
