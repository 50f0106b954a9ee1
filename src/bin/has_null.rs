//! `has_null <FILE>` — exit `0` if no embedded null page exists, `1` if
//! any data extent contains a whole zero page, `2` on error (spec.md §6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nulldiff::holes::has_embedded_null_page;
use nulldiff::{FileView, NullDiffError};

#[derive(Parser)]
#[command(about = "Report whether a file has a whole page of zero content")]
struct Args {
    /// File to inspect.
    file: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(&args.file) {
        Ok(true) => ExitCode::from(1),
        Ok(false) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(path = %args.file.display(), %err, "has_null failed");
            ExitCode::from(err.single_file_exit_code() as u8)
        }
    }
}

fn run(path: &PathBuf) -> Result<bool, NullDiffError> {
    let view = FileView::open(path)?;
    has_embedded_null_page(&view)
}
