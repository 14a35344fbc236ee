//! Attributed document tree, transactions and the plugin registry that the
//! plate editing surface drives.

mod core;
mod ops;
mod plugin;
mod serde_value;

pub use crate::core::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::serde_value::*;
