//! Feedforward networks and their trainers.
//!
//! A `Net` is built once, handed over to a `Trainer` (or a `CascadeTrainer`) for training,
//! and taken back with `teardown`.

mod activation;
mod backprop;
mod cascade;
mod data;
mod io;
mod net;
mod params;
mod trainer;

pub use activation::*;
pub use cascade::*;
pub use data::*;
pub use io::*;
pub use net::*;
pub use params::*;
pub use trainer::*;
