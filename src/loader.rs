//! Utility functions for preparing the CPU and memory for execution

use std::io;
use std::io::Read;
use std::path::Path;

use object::read::elf::ProgramHeader;

use crate::cpu::CPUState;
use crate::elf_helper::*;
use crate::error::ElfError;
use crate::error::MemoryError;
use crate::error::SimulatorResult;
use crate::memory::StorageInterface;

/// Loads a stream of little-endian words into memory from address 0.
/// A trailing partial word is zero-padded.
/// Returns the number of words written.
pub fn load_image(
    mem: &mut impl StorageInterface,
    mut reader: impl Read,
) -> SimulatorResult<usize> {
    let mut address: u32 = 0;
    let mut words = 0;
    loop {
        let mut buffer = [0u8; 4];
        let filled = read_chunk(&mut reader, &mut buffer)?;
        if filled == 0 {
            break;
        }

        mem.try_write_word(address, u32::from_le_bytes(buffer))?;
        words += 1;
        address = address.wrapping_add(4);

        if filled < buffer.len() {
            break;
        }
    }

    log::info!("Loaded {} words ({} bytes of memory)", words, mem.size());
    Ok(words)
}

/// Fills `buffer` unless the stream ends first
fn read_chunk(reader: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Loads the segments of an ELF file and sets the entry point
pub fn load_elf(
    cpu: &mut CPUState,
    mem: &mut impl StorageInterface,
    path: &Path,
    elf_data: &[u8],
) -> SimulatorResult<()> {
    let elf_reader = parse_elf(path, elf_data)?;
    let endian = get_elf_endian(path, elf_reader)?;

    let machine = get_elf_machine(elf_reader, endian);
    if machine != object::elf::EM_RISCV {
        return Err(ElfError::InvalidMachine(machine).into());
    }

    // Set program entry
    cpu.pc = get_elf_entry(elf_reader, endian);
    log::info!("Initial PC: {:#010x}", cpu.pc);

    for segment in get_elf_segments(path, elf_reader, endian, elf_data)? {
        if segment.p_type(endian) != object::elf::PT_LOAD {
            continue;
        }

        let memory_size = segment.p_memsz(endian);
        let virtual_address = segment.p_vaddr(endian);
        let file_size = segment.p_filesz(endian);
        let offset = segment.p_offset(endian) as usize;

        // Can't handle with 32b memory
        if virtual_address.checked_add(memory_size).is_none() {
            return Err(ElfError::AddressOutOfBounds(virtual_address).into());
        }

        log::info!(
            "Loading segment at {:#010x}: {:#x} bytes ({:#x} from file)",
            virtual_address,
            memory_size,
            file_size
        );

        let file_bytes = elf_data
            .get(offset..offset + file_size as usize)
            .ok_or_else(|| {
                ElfError::ParseError(
                    path.to_path_buf(),
                    format!("segment at {:#010x} runs past the file", virtual_address),
                )
            })?;

        for i in 0..memory_size {
            // Past the file image the segment is zero-filled
            let byte = file_bytes.get(i as usize).copied().unwrap_or(0);
            set8(mem, virtual_address + i, byte)?;
        }
    }

    Ok(())
}

/// Writes one byte into its lane of the containing word
fn set8(
    mem: &mut impl StorageInterface,
    address: u32,
    byte: u8,
) -> Result<(), MemoryError> {
    let shift = (address & 0b11) * 8;
    let word = mem.try_read_word(address)?;
    let word = (word & !(0xff << shift)) | ((byte as u32) << shift);
    mem.try_write_word(address, word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CPUPolicy;
    use crate::error::SimulatorError;
    use crate::memory::ram::Ram;

    #[test]
    fn test_load_words() {
        let mut mem = Ram::make(8);
        let bytes = [0xb3, 0x00, 0x31, 0x00, 0x33, 0x82, 0x50, 0x00];
        assert_eq!(load_image(&mut mem, &bytes[..]).unwrap(), 2);
        assert_eq!(mem.read_word(0), 0x0031_00b3);
        assert_eq!(mem.read_word(4), 0x0050_8233);
        assert_eq!(mem.read_word(8), 0);
    }

    #[test]
    fn test_partial_tail_is_padded() {
        let mut mem = Ram::make(8);
        let bytes = [0x01, 0x02, 0x03, 0x04, 0xaa, 0xbb];
        assert_eq!(load_image(&mut mem, &bytes[..]).unwrap(), 2);
        assert_eq!(mem.read_word(4), 0x0000_bbaa);
    }

    #[test]
    fn test_image_too_large() {
        let mut mem = Ram::make(2);
        let bytes = [0x11u8; 12];
        let err = load_image(&mut mem, &bytes[..]).unwrap_err();
        assert!(matches!(err, SimulatorError::MemoryError(_)));
        // Words that fit stay written
        assert_eq!(mem.read_word(0), 0x1111_1111);
        assert_eq!(mem.read_word(4), 0x1111_1111);
    }

    #[test]
    fn test_read_error_is_reported() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "unreadable"))
            }
        }

        let mut mem = Ram::make(2);
        let err = load_image(&mut mem, Broken).unwrap_err();
        assert!(matches!(err, SimulatorError::IoError(_)));
    }

    /// Minimal little-endian ELF32 executable with one PT_LOAD segment
    fn make_elf(
        machine: u16,
        entry: u32,
        vaddr: u32,
        code: &[u8],
        mem_size: u32,
    ) -> Vec<u8> {
        let mut elf = Vec::new();
        elf.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
        elf.extend_from_slice(&[0; 8]);
        elf.extend_from_slice(&2u16.to_le_bytes()); // e_type
        elf.extend_from_slice(&machine.to_le_bytes());
        elf.extend_from_slice(&1u32.to_le_bytes()); // e_version
        elf.extend_from_slice(&entry.to_le_bytes());
        elf.extend_from_slice(&52u32.to_le_bytes()); // e_phoff
        elf.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
        elf.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        elf.extend_from_slice(&52u16.to_le_bytes()); // e_ehsize
        elf.extend_from_slice(&32u16.to_le_bytes()); // e_phentsize
        elf.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
        elf.extend_from_slice(&40u16.to_le_bytes()); // e_shentsize
        elf.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
        elf.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx

        elf.extend_from_slice(&object::elf::PT_LOAD.to_le_bytes());
        elf.extend_from_slice(&84u32.to_le_bytes()); // p_offset
        elf.extend_from_slice(&vaddr.to_le_bytes());
        elf.extend_from_slice(&vaddr.to_le_bytes());
        elf.extend_from_slice(&(code.len() as u32).to_le_bytes());
        elf.extend_from_slice(&mem_size.to_le_bytes());
        elf.extend_from_slice(&5u32.to_le_bytes()); // p_flags
        elf.extend_from_slice(&4u32.to_le_bytes()); // p_align

        elf.extend_from_slice(code);
        elf
    }

    #[test]
    fn test_load_elf_segment() {
        let code = [0x93, 0x00, 0x70, 0x00, 0xaa, 0xbb];
        let elf = make_elf(object::elf::EM_RISCV, 0x100, 0x100, &code, 12);
        assert!(is_elf(&elf));

        let mut cpu = CPUState::make(CPUPolicy::default());
        let mut mem = Ram::make(128);
        mem.write_word(0x108, 0xffff_ffff);
        load_elf(&mut cpu, &mut mem, Path::new("test.elf"), &elf).unwrap();

        assert_eq!(cpu.pc, 0x100);
        assert_eq!(mem.read_word(0x100), 0x0070_0093);
        assert_eq!(mem.read_word(0x104), 0x0000_bbaa);
        // Zero-filled up to the memory size
        assert_eq!(mem.read_word(0x108), 0);
    }

    #[test]
    fn test_reject_foreign_machine() {
        // EM_X86_64
        let elf = make_elf(62, 0, 0, &[0x13, 0, 0, 0], 4);
        let mut cpu = CPUState::make(CPUPolicy::default());
        let mut mem = Ram::make(16);
        let err = load_elf(&mut cpu, &mut mem, Path::new("x86.elf"), &elf).unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::ElfLoadError(ElfError::InvalidMachine(62))
        ));
    }

    #[test]
    fn test_reject_truncated_header() {
        let mut cpu = CPUState::make(CPUPolicy::default());
        let mut mem = Ram::make(16);
        let err = load_elf(&mut cpu, &mut mem, Path::new("bad.elf"), &[0x7f, b'E', b'L', b'F'])
            .unwrap_err();
        assert!(matches!(err, SimulatorError::ElfLoadError(ElfError::ParseError(..))));
    }
}
