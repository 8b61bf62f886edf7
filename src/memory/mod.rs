//! Memory structure

pub mod ram;

use crate::error::MemoryError;

/// Memory interface implementation.
/// Accesses are word granular: the low two address bits are ignored.
pub trait StorageInterface {
    /// Reads the word containing `address`
    fn try_read_word(&self, address: u32) -> Result<u32, MemoryError>;

    /// Writes the word containing `address`
    fn try_write_word(
        &mut self,
        address: u32,
        value: u32,
    ) -> Result<(), MemoryError>;

    /// Reads the word containing `address`.
    /// Panics if the address is outside the backing store.
    fn read_word(&self, address: u32) -> u32 {
        match self.try_read_word(address) {
            Ok(value) => value,
            Err(e) => panic!("[read_word] {}", e),
        }
    }

    /// Writes the word containing `address`.
    /// Panics if the address is outside the backing store.
    fn write_word(&mut self, address: u32, value: u32) {
        if let Err(e) = self.try_write_word(address, value) {
            panic!("[write_word] {}", e);
        }
    }

    /// Capacity in bytes
    fn size(&self) -> usize;
}
