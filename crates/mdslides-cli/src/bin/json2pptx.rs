//! json2pptx binary entry point
//!
//! This is a thin wrapper that calls the library's `json2pptx_cli()` function.

use anyhow::Result;
use mdslides_cli::json2pptx_cli;

fn main() -> Result<()> {
    json2pptx_cli()
}
