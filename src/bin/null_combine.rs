//! `null_combine [-1|-2] <A> <B>` — merges two null-equivalent files onto
//! standard output. `-1`/`-2` select which side wins an unresolvable
//! byte-level mismatch; without either, such a mismatch is fatal
//! (spec.md §6).

use std::fs::File;
use std::os::unix::io::FromRawFd;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

use nulldiff::combine::{combine, Prefer};
use nulldiff::{FileView, NullDiffError};

#[derive(Parser)]
#[command(about = "Merge two null-equivalent files onto standard output")]
#[command(group(ArgGroup::new("prefer").args(["prefer_first", "prefer_second"])))]
struct Args {
    /// Prefer the first file's byte on an unresolvable mismatch.
    #[arg(short = '1', long = "prefer-first")]
    prefer_first: bool,

    /// Prefer the second file's byte on an unresolvable mismatch.
    #[arg(short = '2', long = "prefer-second")]
    prefer_second: bool,

    /// First file.
    a: PathBuf,

    /// Second file.
    b: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "null_combine failed");
            eprintln!("Error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<(), NullDiffError> {
    let v1 = FileView::open(&args.a)?;
    let v2 = FileView::open(&args.b)?;
    let prefer = if args.prefer_first {
        Prefer::First
    } else if args.prefer_second {
        Prefer::Second
    } else {
        Prefer::Neither
    };

    // Duplicate stdout's descriptor so we own an independent `File`: this
    // lets the combiner probe and use `Seek` without taking stdout's lock
    // or double-closing fd 1 when it drops.
    let dup_fd = unsafe { libc::dup(1) };
    if dup_fd < 0 {
        return Err(NullDiffError::Io(std::io::Error::last_os_error()));
    }
    let mut out = unsafe { File::from_raw_fd(dup_fd) };

    combine(&v1, &v2, prefer, &mut out)
}
