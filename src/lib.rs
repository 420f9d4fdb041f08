pub mod binary;
pub mod execution;

pub use binary::error::DecodeError;
pub use binary::instruction::Instruction;
pub use binary::module::Module;
pub use execution::error::{LinkError, Trap};
pub use execution::runtime::Runtime;
pub use execution::value::Value;

use thiserror::Error;

/// Anything that can go wrong between raw bytes and a finished call.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Trap(#[from] Trap),
}
