pub mod error;
pub mod instruction;
pub mod module;
pub mod opcode;
pub mod section;
pub mod types;
