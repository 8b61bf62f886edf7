//! Helper functions for parsing ELF files

use std::path::Path;

use object::elf;
use object::read::elf::FileHeader;

use crate::error::ElfError;
use crate::error::SimulatorResult;

pub type ELFReaderType = elf::FileHeader32<object::Endianness>;
pub type Segment = elf::ProgramHeader32<object::Endianness>;

/// Checks for the ELF magic number
pub fn is_elf(data: &[u8]) -> bool {
    data.starts_with(&elf::ELFMAG)
}

/// Parses the header of a 32-bit ELF image
pub fn parse_elf<'data>(
    path: &Path,
    data: &'data [u8],
) -> SimulatorResult<&'data ELFReaderType> {
    ELFReaderType::parse(data).map_err(|e| parse_error(path, e))
}

/// Returns the endianness
pub fn get_elf_endian(
    path: &Path,
    elf_reader: &ELFReaderType,
) -> SimulatorResult<object::Endianness> {
    elf_reader.endian().map_err(|e| parse_error(path, e))
}

/// Returns the program entry address
pub fn get_elf_entry(elf_reader: &ELFReaderType, endian: object::Endianness) -> u32 {
    elf_reader.e_entry(endian)
}

/// Returns the machine type
pub fn get_elf_machine(
    elf_reader: &ELFReaderType,
    endian: object::Endianness,
) -> u16 {
    elf_reader.e_machine(endian)
}

/// Return it as a vector for good
pub fn get_elf_segments(
    path: &Path,
    elf_reader: &ELFReaderType,
    endian: object::Endianness,
    elf_data: &[u8],
) -> SimulatorResult<Vec<Segment>> {
    Ok(elf_reader
        .program_headers(endian, elf_data)
        .map_err(|e| parse_error(path, e))?
        .to_vec())
}

fn parse_error(path: &Path, e: object::read::Error) -> crate::error::SimulatorError {
    ElfError::ParseError(path.to_path_buf(), e.to_string()).into()
}
