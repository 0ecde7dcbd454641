//! Reference services.

pub mod memory;

pub use memory::MemoryService;
