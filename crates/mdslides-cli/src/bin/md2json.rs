//! md2json binary entry point
//!
//! This is a thin wrapper that calls the library's `md2json_cli()` function.

use anyhow::Result;
use mdslides_cli::md2json_cli;

fn main() -> Result<()> {
    md2json_cli()
}
