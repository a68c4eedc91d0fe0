//! # Gray Table Generator
//!
//! Writes the calibration table for the reflected Gray code of a given width, one ordinal per
//! line, in the format the drive executive loads.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fs::File, io::BufWriter, path::PathBuf};
use color_eyre::{eyre::WrapErr, Result};
use structopt::StructOpt;

use drive_lib::gray::{GrayCodec, DEFAULT_BIT_WIDTH};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "gen_gray_table", about = "Generate an encoder calibration table")]
struct Opts {
    /// Encoder bit width
    #[structopt(short, long, default_value = "13")]
    bits: u32,

    /// File to write the table to
    #[structopt(parse(from_os_str))]
    output: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    if opts.bits != DEFAULT_BIT_WIDTH {
        println!(
            "Note: the mount's encoder is {} bits, generating a {} bit table",
            DEFAULT_BIT_WIDTH, opts.bits
        );
    }

    let codec = GrayCodec::new(opts.bits)
        .wrap_err("Could not build the Gray code")?;

    let file = File::create(&opts.output)
        .wrap_err_with(|| format!("Could not create {}", opts.output.display()))?;

    codec.write_calibration(BufWriter::new(file))
        .wrap_err("Could not write the table")?;

    println!("Wrote {} positions to {}", codec.positions(), opts.output.display());

    Ok(())
}
