//! A simulator wrapper

use std::fmt::Write;
use std::fs;
use std::path::Path;

use crate::cpu::CPUPolicy;
use crate::cpu::CPUState;
use crate::cpu::Implementation;
use crate::cpu::ABI_NAMES;
use crate::elf_helper;
use crate::error::SimulatorError;
use crate::error::SimulatorResult;
use crate::loader;
use crate::memory::ram::Ram;
use crate::memory::StorageInterface;
use crate::pipelined::Processor;
use crate::single_cycle;

/// Byte address of the first framebuffer pixel
pub const SCREEN_ADDRESS: u32 = 30032;
pub const SCREEN_WIDTH: u32 = 64;
pub const SCREEN_HEIGHT: u32 = 32;

/// Final state of a run
#[derive(Debug)]
pub struct RunOutcome {
    pub cpu: CPUState,
    pub mem: Ram,
    /// Cycles (pipelined) or instructions (single cycle) simulated
    pub cycles: u64,
    /// True if the program ran out of instructions before the limit
    pub finished: bool,
}

/// Loads an ELF file or a raw word image into memory
pub fn load_program(
    cpu: &mut CPUState,
    mem: &mut impl StorageInterface,
    path: &Path,
) -> SimulatorResult<()> {
    let data = fs::read(path)?;
    if elf_helper::is_elf(&data) {
        loader::load_elf(cpu, mem, path, &data)
    } else {
        loader::load_image(mem, &data[..]).map(|_| ())
    }
}

/// Run simulation on the given program image,
/// optionally writing a per-cycle pipeline trace as CSV
pub fn run(
    image_path: &Path,
    policy: CPUPolicy,
    trace_path: Option<&Path>,
) -> SimulatorResult<RunOutcome> {
    if policy.memory_words == 0 {
        return Err(SimulatorError::ConfigError(
            "memory must hold at least one word".to_string(),
        ));
    }

    let mut processor = Processor::make(policy);
    load_program(&mut processor.cpu, &mut processor.mem, image_path)?;

    let (cycles, finished) = match policy.implementation {
        Implementation::SingleCycle => {
            if trace_path.is_some() {
                return Err(SimulatorError::ConfigError(
                    "pipeline traces need the pipelined implementation"
                        .to_string(),
                ));
            }
            let steps = single_cycle::run(
                &mut processor.cpu,
                &mut processor.mem,
                policy.max_cycles,
            );
            (steps, steps < policy.max_cycles)
        }
        Implementation::Pipelined => {
            let cycles = run_pipelined(&mut processor, policy.max_cycles, trace_path)?;
            (cycles, processor.is_idle())
        }
    };

    let (cpu, mem) = processor.into_parts();
    log::info!(
        "Stopped after {} cycles at PC={:#010x}{}",
        cycles,
        cpu.pc,
        if finished { "" } else { " (cycle limit)" }
    );

    Ok(RunOutcome { cpu, mem, cycles, finished })
}

/// Runs the pipeline, recording every cycle if a trace was asked for
fn run_pipelined(
    processor: &mut Processor,
    max_cycles: u64,
    trace_path: Option<&Path>,
) -> SimulatorResult<u64> {
    let Some(path) = trace_path else {
        return Ok(processor.run(max_cycles));
    };

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["cycle", "pc", "stall", "IF", "ID", "EX", "MEM", "WB"])?;

    let cycles = processor.run_with(max_cycles, |processor, cycle| {
        writer.write_record(trace_record(processor, cycle))
    })?;
    writer.flush()?;

    Ok(cycles)
}

/// One trace line: cycle, pc, stall flag, then the pc in each slot
fn trace_record(processor: &Processor, cycle: u64) -> Vec<String> {
    let mut record = vec![
        cycle.to_string(),
        format!("{:#010x}", processor.pc()),
        processor.cpu.stall.to_string(),
    ];
    record.extend(processor.pipeline().occupancy().iter().map(|pc| match pc {
        Some(pc) => format!("{:#010x}", pc),
        None => "-".to_string(),
    }));
    record
}

/// Formats the register file with ABI names, four per line
pub fn format_registers(cpu: &CPUState) -> String {
    let mut out = String::new();
    for (i, value) in cpu.gpr.iter().enumerate() {
        let name = format!("x{}/{}", i, ABI_NAMES[i]);
        let _ = write!(out, "{:>8} = {:#010x}", name, value);
        out.push(if i % 4 == 3 { '\n' } else { ' ' });
    }
    let _ = writeln!(out, "      pc = {:#010x}", cpu.pc);
    out
}

/// Renders the framebuffer: one word per pixel, lit when it holds 1
pub fn render_screen(mem: &impl StorageInterface) -> String {
    let mut out = String::new();
    for y in 0..SCREEN_HEIGHT {
        for x in 0..SCREEN_WIDTH {
            let address = SCREEN_ADDRESS + (y * SCREEN_WIDTH + x) * 4;
            let lit = mem.try_read_word(address) == Ok(1);
            out.push(if lit { '#' } else { '.' });
        }
        out.push('\n');
    }
    out
}
