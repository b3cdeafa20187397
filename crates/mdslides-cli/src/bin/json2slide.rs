//! json2slide binary entry point
//!
//! This is a thin wrapper that calls the library's `json2slide_cli()` function.

use anyhow::Result;
use mdslides_cli::json2slide_cli;

fn main() -> Result<()> {
    json2slide_cli()
}
