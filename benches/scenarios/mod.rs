//! Real-world scenario benchmarks.
//!
//! These benchmarks model actual usage patterns: single FM patches of
//! increasing complexity and a full engine under chord and steal load.

mod engine;
mod voices;

pub use engine::bench_engine;
pub use voices::bench_voices;
