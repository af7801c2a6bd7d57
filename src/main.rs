use anyhow::{anyhow, Context, Result};
use clap::Parser;
use hackvm::{translate, Config};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

/// Translates a VM program into Hack assembly
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source file (.vm)
    src: PathBuf,
    /// Destination file; defaults to the source with an .asm extension
    dst: Option<PathBuf>,
    /// Restate each VM command as a comment in the output
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let unit_name = args
        .src
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Invalid source path {}", args.src.display()))?;
    let dst_path = args
        .dst
        .clone()
        .unwrap_or_else(|| args.src.with_extension("asm"));

    let src = File::open(&args.src)
        .with_context(|| format!("Failed to open {}", args.src.display()))?;

    // translate fully before touching the destination
    let mut asm = vec![];
    translate(
        BufReader::new(src),
        unit_name,
        Config { debug: args.debug },
        &mut asm,
    )
    .with_context(|| format!("Failed to translate {}", args.src.display()))?;

    let dst = File::create(&dst_path)
        .with_context(|| format!("Failed to create {}", dst_path.display()))?;
    let mut dst = BufWriter::new(dst);
    dst.write_all(&asm)
        .and_then(|_| dst.flush())
        .with_context(|| format!("Failed to write {}", dst_path.display()))?;

    log::info!("wrote {}", dst_path.display());
    Ok(())
}
