use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use pricepack::source::DEFAULT_CLOSE_COLUMN;
use pricepack::{encode, read_close_prices_from_path, Decoder};
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress the close column of a CSV quote table into a blob.
    Compress {
        input: PathBuf,

        /// Defaults to the input path with `.bin` appended.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, default_value = DEFAULT_CLOSE_COLUMN)]
        column: String,
    },
    /// Print the prices stored in a blob, one per line.
    Decompress {
        input: PathBuf,

        #[arg(short, long, default_value_t = 0)]
        start: usize,

        /// Number of prices to print; the rest of the series when omitted.
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Print the header of a blob.
    Info { input: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Compress {
            input,
            output,
            column,
        } => compress(input, output, &column),
        Command::Decompress {
            input,
            start,
            count,
        } => decompress(input, start, count),
        Command::Info { input } => {
            let bytes = read_blob(&input)?;
            let header = Decoder::header(&bytes)?;
            println!("bytes:         {}", bytes.len());
            println!("points:        {}", header.point_count);
            println!("initial price: {}", header.initial_price());
            println!("padding bits:  {}", header.pad_count);
            Ok(())
        }
    }
}

fn compress(input: PathBuf, output: Option<PathBuf>, column: &str) -> Result<()> {
    let prices = read_close_prices_from_path(&input, column)
        .with_context(|| format!("reading {}", input.display()))?;
    let blob = encode(&prices).with_context(|| format!("encoding {}", input.display()))?;

    let output = output.unwrap_or_else(|| {
        let mut path = input.clone().into_os_string();
        path.push(".bin");
        PathBuf::from(path)
    });
    fs::write(&output, blob.as_bytes())
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        "{}: {} prices -> {} bytes ({})",
        input.display(),
        blob.point_count,
        blob.bytes.len(),
        output.display()
    );
    Ok(())
}

fn decompress(input: PathBuf, start: usize, count: Option<usize>) -> Result<()> {
    let bytes = read_blob(&input)?;
    let prices = match count {
        Some(count) => Decoder::decode_window(&bytes, start, count)?,
        None => {
            let all = match Decoder::decode_all(&bytes) {
                Ok(all) => all,
                Err(e) if !e.is_fatal() => {
                    warn!("{}: {}", input.display(), e);
                    e.into_recovered().unwrap_or_default()
                }
                Err(e) => return Err(e.into()),
            };
            if start > all.len() {
                bail!("start {} is past the end of {} prices", start, all.len());
            }
            all.into_iter().skip(start).collect::<Vec<Decimal>>()
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for price in prices {
        writeln!(out, "{price}")?;
    }
    out.flush()?;
    Ok(())
}

fn read_blob(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}
