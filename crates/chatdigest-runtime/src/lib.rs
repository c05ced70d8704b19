//! Digest runtime: importance classification pipeline, digest assembly,
//! category listings and report rendering.

pub mod digest;
pub mod pipeline;
pub mod render;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use digest::DigestAssembler;
pub use pipeline::classify_pipeline;
pub use types::*;
