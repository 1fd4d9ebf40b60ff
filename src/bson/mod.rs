//! Document value model and field-path utilities.

mod path;
mod value;

pub use path::*;
pub use value::*;
