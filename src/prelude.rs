//! Reexports of all important traits of this library for convenience.
//!
//! As with every prelude, the main usage is to glob import everything from
//! this module:
//!
//! ```
//! use hedge::prelude::*;
//! ```
//!
//! Now you have all important traits in scope.

pub use crate::{
    handle::Handle,
    kernel::{Config, KernelHandle},
};
