use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Failed to load ELF file: {0}")]
    ElfLoadError(#[from] ElfError),

    #[error("Memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to write pipeline trace: {0}")]
    TraceError(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Errors related to ELF file operations
#[derive(Error, Debug)]
pub enum ElfError {
    #[error("Failed to parse ELF file '{0}': {1}")]
    ParseError(PathBuf, String),

    #[error("Invalid ELF machine type: {0}")]
    InvalidMachine(u16),

    #[error("Segment does not fit in memory: {0:#010x}")]
    AddressOutOfBounds(u32),
}

/// Errors related to memory operations
#[derive(Error, Debug, PartialEq)]
pub enum MemoryError {
    #[error("Memory access error at address {address:#010x}: {kind}")]
    AccessError { address: u32, kind: MemoryErrorKind },
}

/// Specific kinds of memory errors
#[derive(Error, Debug, PartialEq)]
pub enum MemoryErrorKind {
    #[error("Attempted to access memory outside addressable range")]
    OutOfBounds,
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
