//! mdslides CLI - Command-line interface library
//!
//! Each pipeline stage is a program of its own:
//! - `md2json`: Markdown to Markdown Document (`.json`)
//! - `json2slide`: Markdown Document to Slide Document (`.slides.json`)
//! - `json2pptx`: Slide Document to presentation (`.pptx`)
//! - `mdslides`: all three in one run
//!
//! # Library Usage
//!
//! ```ignore
//! use mdslides_cli::{run_md2json, run_mdslides};
//!
//! let json = run_md2json(Path::new("deck.md"), None)?;
//! let pptx = run_mdslides(Path::new("deck.md"), None, Some(Path::new("corp.potx")), None, false)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! md2json -i deck.md
//! json2slide -i deck.json
//! json2pptx -i deck.slides.json -r corporate.potx -c contract.toml
//!
//! mdslides -i deck.md -o talk.pptx --keep-intermediate -v
//! ```

pub mod app;

pub use app::{
    init_logging, json2pptx_cli, json2slide_cli, load_renderer, md2json_cli, mdslides_cli,
    run_json2pptx, run_json2slide, run_md2json, run_mdslides,
};
pub use app::{CommonArgs, RenderArgs};
