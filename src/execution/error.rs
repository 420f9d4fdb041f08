use thiserror::Error;

/// Errors raised while turning a decoded module into a runnable instance.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("type index {0} is not defined")]
    UndefinedType(u32),
    #[error("function and code section lengths disagree")]
    FunctionCountMismatch,
    #[error("memory of {min} pages exceeds the addressable limit")]
    MemoryAllocFailed { min: u32 },
    #[error("memory {0} is not defined")]
    UndefinedMemory(u32),
    #[error("data segment does not fit in memory {memory_index}")]
    DataOutOfBounds { memory_index: u32 },
    #[error("global initializer failed")]
    GlobalInitFailed(#[source] Trap),
}

/// Runtime errors. A trap aborts the outermost call and unwinds all frames.
#[derive(Debug, Error)]
pub enum Trap {
    #[error("unreachable executed")]
    Unreachable,
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("out of bounds memory access")]
    MemoryOutOfBounds,
    #[error("integer divide by zero")]
    DivideByZero,
    #[error("undefined function: {0}")]
    UndefinedFunction(u32),
    #[error("undefined export: {0}")]
    UndefinedExport(String),
    #[error("undefined local: {0}")]
    UndefinedLocal(u32),
    #[error("undefined global: {0}")]
    UndefinedGlobal(u32),
    #[error("branch depth {0} has no matching label")]
    UndefinedLabel(u32),
    #[error("function body ran out without a matching end")]
    MissingEnd,
    #[error("missing import: {module}.{field}")]
    MissingImport { module: String, field: String },
    #[error("host function trapped: {0}")]
    Host(anyhow::Error),
}
