//! `null_diff [-g] [-s] <A> <B>` — null-equivalence comparison of two
//! files. Without flags: exit `0` equivalent, `1` terminal mismatch,
//! `2`/`-3`/`-4` on setup errors. With `-g`/`-s`: exit code is the
//! `RetCode` bitmask; `-1`/`-2`/`-3`/`-4` on setup errors (spec.md §6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nulldiff::{compare, CompareOptions, FileView, NullDiffError};

#[derive(Parser)]
#[command(about = "Compare two files for null-equivalence")]
struct Args {
    /// Report which file has strictly more non-zero data.
    #[arg(short = 'g', long = "greatest")]
    greatest: bool,

    /// Report whether either file is a null-subset of the other.
    #[arg(short = 's', long = "subset")]
    subset: bool,

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
    let accounting = args.greatest || args.subset;

    match run(&args) {
        Ok(retcode) => {
            if accounting {
                tracing::info!(retcode = %retcode.describe(), "comparison complete");
                ExitCode::from(retcode.bits())
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            tracing::error!(%err, "null_diff failed");
            eprintln!("Error: {err}");
            ExitCode::from(err.dual_file_exit_code(accounting) as u8)
        }
    }
}

fn run(args: &Args) -> Result<nulldiff::RetCode, NullDiffError> {
    let v1 = FileView::open(&args.a)?;
    let v2 = FileView::open(&args.b)?;
    let opts = CompareOptions {
        show_greatest: args.greatest,
        check_subset: args.subset,
    };
    Ok(compare(&v1, &v2, opts)?.retcode)
}
