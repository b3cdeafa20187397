//! mdslides binary entry point
//!
//! This is a thin wrapper that calls the library's `mdslides_cli()` function.

use anyhow::Result;
use mdslides_cli::mdslides_cli;

fn main() -> Result<()> {
    mdslides_cli()
}
