//! Flat word-addressed RAM

use super::StorageInterface;
use crate::cpu::DEFAULT_MEMORY_WORDS;
use crate::error::MemoryError;
use crate::error::MemoryErrorKind;

/// Fixed-capacity array of words.
/// `data[address >> 2]` holds the word at `address`.
#[derive(Clone, Debug)]
pub struct Ram {
    data: Vec<u32>,
}

impl Ram {
    /// Make a zeroed RAM holding `words` words
    pub fn make(words: usize) -> Self {
        Self { data: vec![0; words] }
    }

    fn index(&self, address: u32) -> Result<usize, MemoryError> {
        let index = (address >> 2) as usize;
        if index < self.data.len() {
            Ok(index)
        } else {
            Err(MemoryError::AccessError {
                address,
                kind: MemoryErrorKind::OutOfBounds,
            })
        }
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::make(DEFAULT_MEMORY_WORDS)
    }
}

impl StorageInterface for Ram {
    fn try_read_word(&self, address: u32) -> Result<u32, MemoryError> {
        Ok(self.data[self.index(address)?])
    }

    fn try_write_word(
        &mut self,
        address: u32,
        value: u32,
    ) -> Result<(), MemoryError> {
        let index = self.index(address)?;
        self.data[index] = value;
        Ok(())
    }

    fn size(&self) -> usize {
        self.data.len() * 4
    }
}
