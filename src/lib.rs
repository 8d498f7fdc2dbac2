//! Fully connected and shortcut-connected feedforward neural networks, trained either with
//! classic backpropagation (incremental, batch, RPROP, Quickprop, SARPROP) or by growing
//! the topology with cascade-correlation.

pub mod feedforward;
