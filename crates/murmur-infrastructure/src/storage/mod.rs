//! File storage primitives shared by the repositories.

mod atomic;

pub use atomic::{read_optional, write_atomic};
