use std::error::Error;

use clap::Parser;
use sim_lib::flags::RvSimArgs;
use sim_lib::run_wrapper;

fn main() -> Result<(), Box<dyn Error>> {
    let args = RvSimArgs::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .init();

    let outcome =
        run_wrapper::run(&args.image, args.policy(), args.trace.as_deref())?;

    if !outcome.finished {
        eprintln!("Cycle limit of {} reached", outcome.cycles);
    }
    print!("{}", run_wrapper::format_registers(&outcome.cpu));
    if args.screen {
        print!("{}", run_wrapper::render_screen(&outcome.mem));
    }

    Ok(())
}
