pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Batch, Daemon, Health, Submit, Version};
