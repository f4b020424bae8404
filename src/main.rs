use anyhow::Result;

mod analyzer;
mod cli;
mod common;
mod config;
mod gemini;
mod source;
mod web;

fn main() -> Result<()> {
    cli::main()
}
