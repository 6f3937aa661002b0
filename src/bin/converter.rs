//! camtqif - convert CAMT.053 bank exports into a QIF file.

use camtqif::{source::read_source, AccountMap, ConvertOptions, Converter, Result};
use clap::Parser;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "camtqif")]
#[command(about = "Convert CAMT.053 bank exports (zipped or XML) into QIF", long_about = None)]
struct Cli {
    /// INI configuration file mapping IBANs to account names
    config: PathBuf,

    /// CAMT.053 export files (.zip or .xml)
    #[arg(required = true)]
    source: Vec<PathBuf>,

    /// QIF output file (default: first source file with .qif appended)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report duplicated transactions and other details
    #[arg(short, long)]
    verbose: bool,

    /// Delete the source files once the conversion has succeeded
    #[arg(long)]
    prune: bool,

    /// Fail on transaction descriptions that are not recognised
    #[arg(long)]
    strict: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let accounts = AccountMap::load(&cli.config)?;
    let mut converter = Converter::new(&accounts, ConvertOptions { strict: cli.strict });

    for path in &cli.source {
        for source in read_source(path)? {
            log::info!(
                "Converting {} ({} statements)",
                source.origin,
                source.document.statements.len()
            );
            for statement in &source.document.statements {
                converter.add_statement(statement)?;
            }
        }
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.source[0]));

    // Everything is parsed and classified before the output file is touched.
    let mut writer = BufWriter::new(File::create(&output)?);
    converter.document().write_to(&mut writer)?;
    log::info!("Wrote {}", output.display());

    if cli.prune {
        let mut removed = HashSet::new();
        for path in &cli.source {
            // The same export may be listed twice.
            if !removed.insert(path) || !path.exists() {
                continue;
            }
            fs::remove_file(path)?;
            log::info!("Removed {}", path.display());
        }
    }

    println!("{}", converter.summary());

    Ok(())
}

fn default_output(first_source: &Path) -> PathBuf {
    let mut name = first_source.as_os_str().to_owned();
    name.push(".qif");
    PathBuf::from(name)
}
