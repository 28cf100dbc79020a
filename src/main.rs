use anyhow::Context;
use aslap::{copy_chars_with_patience, BePatient, Params, PrintImpatiently};
use clap::Parser;
use std::{io, time::Duration};
use tracing_subscriber::EnvFilter;

mod duration;

/// as slow as possible
#[derive(Parser, Debug)]
#[command(name = "aslap", version)]
struct Args {
    /// The base delay per character
    #[arg(long, env = "ASLAP_BASE", default_value = "1s", value_parser = duration::parse)]
    base: Duration,

    /// The amount of proportional delay added per unit of masked code point
    #[arg(long, env = "ASLAP_STEP", default_value = "100ms", value_parser = duration::parse)]
    step: Duration,

    /// The number of low-order code point bits used to determine the delay
    #[arg(long, env = "ASLAP_BITS", default_value_t = aslap::DEFAULT_BITS)]
    bits: u32,

    /// Print each input character and its calculated delay instead of the
    /// output
    #[arg(long, env = "ASLAP_DEBUG")]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("aslap: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let params = Params::new(args.base, args.step, args.bits).context("invalid configuration")?;
    tracing::debug!(?params, debug = args.debug, "starting");

    let patience = BePatient::new(params);
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let result = if args.debug {
        // Diagnostics take the place of the output on stdout.
        let mut patience = PrintImpatiently::new(patience, io::stdout());
        copy_chars_with_patience(&mut io::sink(), &mut input, &mut patience)
    } else {
        let mut patience = patience;
        copy_to_stdout(&mut input, &mut patience)
    };
    result.context("copy failed")
}

#[cfg(unix)]
fn copy_to_stdout(input: &mut impl io::Read, patience: &mut BePatient) -> Result<(), aslap::Error> {
    let mut output = aslap::FdWriter::new(io::stdout());
    copy_chars_with_patience(&mut output, input, patience)
}

#[cfg(not(unix))]
fn copy_to_stdout(input: &mut impl io::Read, patience: &mut BePatient) -> Result<(), aslap::Error> {
    copy_chars_with_patience(&mut io::stdout(), input, patience)
}
