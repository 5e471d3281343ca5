use std::fs;
use std::io::{self, Read, Write};

use anyhow::{Context, Result, bail};
use mython::interpreter;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next();
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let source = if let Some(path) = &input_path {
        fs::read_to_string(path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let stdout = io::stdout();
    let mut output = stdout.lock();
    interpreter::run(&source, &mut output)?;
    output.flush().context("Flushing output")?;
    Ok(())
}
