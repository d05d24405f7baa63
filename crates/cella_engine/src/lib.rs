#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::too_many_lines,
    clippy::cast_lossless,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

mod error;
pub use error::*;

mod rect;
pub use rect::*;

mod rule;
pub use rule::*;

mod algorithm;
pub use algorithm::*;

mod grid;
pub use grid::*;

mod viewport;
pub use viewport::*;

pub mod formats;
pub use formats::{Compression, PatternFormat, read_pattern, write_pattern};

pub type EngineResult<T> = anyhow::Result<T>;

pub use num_bigint::BigInt;
