use thiserror::Error;

/// Fatal conditions raised while loading or executing an Intcode program.
///
/// Running out of input is not listed here: the machine suspends instead.
#[derive(Debug, Error)]
pub enum VmError {
    /// The instruction word at `ip` does not name a known opcode.
    #[error("unknown opcode in word {word} at ip {ip}")]
    UnknownOpcode { ip: usize, word: i64 },
    /// A parameter mode digit outside {0, 1, 2}.
    #[error("unknown parameter mode {mode} at ip {ip}")]
    UnknownMode { ip: usize, mode: i64 },
    /// A store parameter was encoded in immediate mode.
    #[error("write through immediate-mode parameter at ip {ip}")]
    ImmediateWrite { ip: usize },
    /// The effective address falls outside the padded memory region.
    #[error("address {address} out of bounds (memory size {size})")]
    AddressOutOfBounds { address: i64, size: usize },
    /// 64-bit arithmetic would wrap.
    #[error("{op} overflowed at ip {ip}")]
    Overflow { ip: usize, op: &'static str },
    /// The program plus its padding does not fit in addressable memory.
    #[error("cannot allocate {program_len} program cells with padding factor {padding_factor}")]
    MemoryTooLarge {
        program_len: usize,
        padding_factor: usize,
    },
    /// A token of the program text is not a base-10 integer.
    #[error("invalid program token #{index}: {token:?}")]
    Parse { index: usize, token: String },
    #[error("program is empty")]
    EmptyProgram,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A pipeline stage returned without producing the signal the next stage needs.
    #[error("stage {stage} produced no output")]
    NoSignal { stage: usize },
    /// A packet was addressed to a node the network does not have.
    #[error("no node at address {destination}")]
    Unroutable { destination: i64 },
    /// The machine already stopped on a fatal error and cannot be resumed.
    #[error("machine faulted on a previous run")]
    Faulted,
}

pub type Result<T> = std::result::Result<T, VmError>;
