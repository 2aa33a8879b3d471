use std::{
    env,
    io::{self, Write},
    process::ExitCode,
};

use tracing::info;
use tracing_subscriber::EnvFilter;

use csim::{
    config::{self, Command, Mode, Options},
    report::{self, RunReport, STDOUT},
    sweep::run_sweep,
    trace, Error, Replayed, Result, Simulation, Trace,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let program = env::args().next().unwrap_or_else(|| "csim".to_string());

    let opts = match config::parse_args(pico_args::Arguments::from_env()) {
        Ok(Command::Help) => {
            print!("{}", config::usage(&program));
            return ExitCode::SUCCESS;
        }
        Ok(Command::Run(opts)) => opts,
        Err(Error::Config(err)) => {
            println!("{program}: {err}");
            print!("{}", config::usage(&program));
            return ExitCode::FAILURE;
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: &Options) -> Result<()> {
    let trace = Trace::open(&opts.trace_path)?;
    info!(trace = %trace.path().display(), "replaying");
    let mut out = io::stdout().lock();

    match &opts.mode {
        Mode::Single(geometry) => {
            let mut sim = Simulation::new(*geometry)?;
            sim.replay(trace, |access, replayed| {
                if opts.verbose && replayed != Replayed::Skipped {
                    writeln!(out, "{access}{replayed}").map_err(|e| Error::io(STDOUT, e))?;
                }
                Ok(())
            })?;
            let stats = sim.finish();

            report::print_summary(&mut out, &stats)?;
            report::write_results(&opts.results_path, &stats)?;
            if let Some(json_path) = &opts.json_path {
                report::write_json(json_path, &[RunReport::new("csim", *geometry, stats)])?;
            }
        }
        Mode::Sweep(geometries) => {
            let records = trace::read_all(trace)?;
            let reports = run_sweep(geometries, &records)?;
            for r in &reports {
                writeln!(out, "{}: {}", r.name, report::summary_line(&r.stats))
                    .map_err(|e| Error::io(STDOUT, e))?;
            }
            if let Some(json_path) = &opts.json_path {
                report::write_json(json_path, &reports)?;
            }
        }
    }
    out.flush().map_err(|e| Error::io(STDOUT, e))
}
