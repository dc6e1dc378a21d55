use crate::error::{Result, VmError};

pub trait Addressable<T> {
    fn read(&self, address: i64) -> Result<T>;
    fn write(&mut self, address: i64, value: T) -> Result<()>;
    fn write_chunk(&mut self, chunk: &[T]) -> Result<()>;
}

/// Zero cells reserved per program cell, on top of the program itself.
pub const PADDING_FACTOR: usize = 10;

/// Flat store of 64-bit cells, sized once when the program is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    data: Vec<i64>,
}

impl Memory {
    /// Allocates room for `program_len` cells plus `padding_factor` times as many zero cells.
    pub fn with_capacity_for(program_len: usize, padding_factor: usize) -> Result<Self> {
        let too_large = VmError::MemoryTooLarge {
            program_len,
            padding_factor,
        };
        let size = match program_len
            .checked_mul(padding_factor)
            .and_then(|padding| padding.checked_add(program_len))
        {
            Some(size) => size,
            None => return Err(too_large),
        };

        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            return Err(too_large);
        }
        data.resize(size, 0);

        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn index(&self, address: i64) -> Result<usize> {
        usize::try_from(address)
            .ok()
            .filter(|&index| index < self.data.len())
            .ok_or(VmError::AddressOutOfBounds {
                address,
                size: self.data.len(),
            })
    }
}

impl Addressable<i64> for Memory {
    fn read(&self, address: i64) -> Result<i64> {
        let index = self.index(address)?;
        Ok(self.data[index])
    }

    fn write(&mut self, address: i64, value: i64) -> Result<()> {
        let index = self.index(address)?;
        self.data[index] = value;
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[i64]) -> Result<()> {
        if chunk.len() > self.data.len() {
            return Err(VmError::AddressOutOfBounds {
                address: chunk.len() as i64 - 1,
                size: self.data.len(),
            });
        }

        self.data[..chunk.len()].copy_from_slice(chunk);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_with_zero_cells() {
        let mut memory = Memory::with_capacity_for(3, PADDING_FACTOR).unwrap();
        memory.write_chunk(&[1, 2, 3]).unwrap();
        assert_eq!(memory.len(), 33);
        assert_eq!(memory.read(2).unwrap(), 3);
        assert_eq!(memory.read(32).unwrap(), 0);
    }

    #[test]
    fn rejects_addresses_outside_the_region() {
        let mut memory = Memory::with_capacity_for(2, 1).unwrap();
        assert!(matches!(
            memory.read(4),
            Err(VmError::AddressOutOfBounds { address: 4, size: 4 })
        ));
        assert!(matches!(
            memory.write(-1, 7),
            Err(VmError::AddressOutOfBounds { address: -1, .. })
        ));
    }

    #[test]
    fn chunk_larger_than_memory_is_rejected() {
        let mut memory = Memory::with_capacity_for(1, 0).unwrap();
        assert!(memory.write_chunk(&[1, 2]).is_err());
    }

    #[test]
    fn oversized_padding_is_rejected() {
        assert!(matches!(
            Memory::with_capacity_for(3, usize::MAX),
            Err(VmError::MemoryTooLarge {
                program_len: 3,
                padding_factor: usize::MAX
            })
        ));
        assert!(matches!(
            Memory::with_capacity_for(1, usize::MAX),
            Err(VmError::MemoryTooLarge { .. })
        ));
        // Cell count fits in usize, but not the allocation in bytes.
        assert!(matches!(
            Memory::with_capacity_for(2, usize::MAX / 4),
            Err(VmError::MemoryTooLarge { .. })
        ));
    }
}
