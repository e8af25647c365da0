//! Speech backend implementations

pub mod native;
pub mod null;
