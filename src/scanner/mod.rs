//! Package tree scanning: deterministic walker, junk patterns, shadow cloning.

pub mod patterns;
pub mod shadow;
pub mod walker;
