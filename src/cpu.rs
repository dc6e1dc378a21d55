use std::fmt::Display;

use crate::error::VmError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cpu {
    pub ip: usize,          // The instruction pointer
    pub relative_base: i64, // Offset added to relative-mode parameters
    pub halt: bool,         // Set once by the halt opcode, never cleared
}

impl Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cpu [ ip: {}, relative_base: {}, halt: {} ]",
            self.ip, self.relative_base, self.halt
        )
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Add = 1,           // p3 = p1 + p2, IP += 4
    Multiply = 2,      // p3 = p1 * p2, IP += 4
    Input = 3,         // p1 = next input, IP += 2 (suspends when none is queued)
    Output = 4,        // emit p1, IP += 2
    JumpIfTrue = 5,    // IP = p2 if p1 != 0 else IP + 3
    JumpIfFalse = 6,   // IP = p2 if p1 == 0 else IP + 3
    LessThan = 7,      // p3 = (p1 < p2) as 1/0, IP += 4
    Equals = 8,        // p3 = (p1 == p2) as 1/0, IP += 4
    AdjustBase = 9,    // RB += p1, IP += 2
    Halt = 99,
}

impl OpCode {
    /// Number of cells the instruction occupies, opcode word included.
    pub fn width(self) -> usize {
        match self {
            OpCode::Add | OpCode::Multiply | OpCode::LessThan | OpCode::Equals => 4,
            OpCode::JumpIfTrue | OpCode::JumpIfFalse => 3,
            OpCode::Input | OpCode::Output | OpCode::AdjustBase => 2,
            OpCode::Halt => 1,
        }
    }
}

impl TryFrom<i64> for OpCode {
    type Error = i64;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Add),
            2 => Ok(Self::Multiply),
            3 => Ok(Self::Input),
            4 => Ok(Self::Output),
            5 => Ok(Self::JumpIfTrue),
            6 => Ok(Self::JumpIfFalse),
            7 => Ok(Self::LessThan),
            8 => Ok(Self::Equals),
            9 => Ok(Self::AdjustBase),
            99 => Ok(Self::Halt),
            _ => Err(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Position = 0,
    Immediate = 1,
    Relative = 2,
}

impl TryFrom<i64> for Mode {
    type Error = i64;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Position),
            1 => Ok(Self::Immediate),
            2 => Ok(Self::Relative),
            _ => Err(v),
        }
    }
}

/// A decoded instruction word.
///
/// Mode digits are kept raw and only validated when the matching parameter is
/// resolved, so digits for parameters an opcode does not take are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub modes: [i64; 3],
}

impl Instruction {
    pub fn decode(ip: usize, word: i64) -> Result<Self, VmError> {
        let opcode =
            OpCode::try_from(word % 100).map_err(|_| VmError::UnknownOpcode { ip, word })?;
        let modes = [(word / 100) % 10, (word / 1000) % 10, (word / 10000) % 10];
        Ok(Self { opcode, modes })
    }

    /// Mode of the 1-based parameter `offset`.
    pub fn mode(&self, ip: usize, offset: usize) -> Result<Mode, VmError> {
        let raw = self.modes[offset - 1];
        Mode::try_from(raw).map_err(|mode| VmError::UnknownMode { ip, mode })
    }
}
