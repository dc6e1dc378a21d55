use std::{fs, path::Path, str::FromStr};

use crate::error::{Result, VmError};

/// The integer list an Intcode machine is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub data: Vec<i64>,
}

impl Program {
    pub fn new(data: Vec<i64>) -> Self {
        Self { data }
    }

    /// Parses comma-separated base-10 integers, ignoring surrounding whitespace.
    ///
    /// Parse errors carry the index of the field among all comma-separated fields.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VmError::EmptyProgram);
        }

        // A single trailing comma is tolerated; empty fields anywhere else are not.
        let fields: Vec<&str> = text.strip_suffix(',').unwrap_or(text).split(',').collect();
        let data = fields
            .iter()
            .map(|field| field.trim())
            .enumerate()
            .map(|(index, token)| {
                token.parse::<i64>().map_err(|_| VmError::Parse {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(data))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Returns a copy with one cell patched, e.g. to switch a game into free play.
    pub fn with_override(mut self, address: usize, value: i64) -> Result<Self> {
        let size = self.data.len();
        let cell = self
            .data
            .get_mut(address)
            .ok_or(VmError::AddressOutOfBounds {
                address: address as i64,
                size,
            })?;
        *cell = value;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl FromStr for Program {
    type Err = VmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
