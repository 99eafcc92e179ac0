//! Command-line interface for bncparse

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use bncparse::{Document, Limits, Loader};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "bncparse")]
#[command(author, version, about = "Load and inspect XML documents", long_about = None)]
struct Cli {
    /// Use strict resource limits
    #[arg(long, global = true, conflicts_with = "limits")]
    strict: bool,

    /// Read resource limits from a JSON file
    #[arg(long, global = true, value_name = "FILE")]
    limits: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Load an XML file and describe its root element
    Inspect {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the whole tree as JSON
        #[arg(short, long)]
        json: bool,

        /// Pretty print the JSON output
        #[arg(short, long, requires = "json")]
        pretty: bool,
    },

    /// Check that XML files load; exits non-zero if any fails
    Check {
        /// Paths to the XML files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = build_loader(cli.strict, cli.limits.as_ref()).and_then(|loader| {
        match cli.command {
            Commands::Inspect { file, json, pretty } => cmd_inspect(&loader, file, json, pretty),
            Commands::Check { files } => cmd_check(&loader, files),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn build_loader(
    strict: bool,
    limits_path: Option<&PathBuf>,
) -> Result<Loader, Box<dyn std::error::Error>> {
    let limits = match limits_path {
        Some(path) => Limits::from_json(&std::fs::read_to_string(path)?)?,
        None if strict => Limits::strict(),
        None => Limits::default(),
    };
    tracing::debug!(?limits, "configured limits");
    Ok(Loader::new().with_limits(limits))
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    loader: &Loader,
    file: PathBuf,
    json: bool,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = loader.load(&file)?;

    if json {
        let json_str = if pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        println!("{}", json_str);
    } else {
        print_summary(&doc);
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn print_summary(doc: &Document) {
    let root = doc.root();
    println!("Root: {}", root.name());
    if root.attributes().next().is_some() {
        println!("Attributes:");
        for (name, value) in root.attributes() {
            println!("  {} = {:?}", name, value);
        }
    }
    println!("Children: {}", root.child_count());
    println!("Elements: {}", doc.len());
    println!("Depth: {}", doc.depth());
}

#[cfg(feature = "cli")]
fn cmd_check(loader: &Loader, files: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = 0;
    for file in &files {
        match loader.load(file) {
            Ok(doc) => println!("ok      {} ({} elements)", file.display(), doc.len()),
            Err(e) => {
                failed += 1;
                println!("{:<7} {}: {}", e.kind(), file.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} files failed to load", failed, files.len()).into());
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
