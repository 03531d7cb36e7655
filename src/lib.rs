#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::missing_crate_level_docs)]
#![doc = include_str!("../README.md")]

pub mod definition;
pub mod engine;
pub mod image;
pub mod module;
pub mod patcher;
pub mod presets;
pub mod scanner;
pub mod startup;
