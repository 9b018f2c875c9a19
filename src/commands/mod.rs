pub mod lease;
pub mod memory;
pub mod message;
pub mod registry;
pub mod serve;
