//! Environments implemented in Rust, usable without a Python interpreter.

pub mod cart_pole;

pub use cart_pole::CartPole;
