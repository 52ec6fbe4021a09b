//! # CRD Generator
//!
//! Generates the `SharedCAConfig` CustomResourceDefinition YAML from the Rust
//! type definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Print to stdout
//! cargo run --bin crdgen > config/crd/sharedcaconfig.yaml
//!
//! # Write to a file
//! cargo run --bin crdgen -- --output config/crd/sharedcaconfig.yaml
//!
//! # Apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use clap::Parser;
use kube::CustomResourceExt;
use shared_ca_operator::crd::SharedCAConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crdgen", about = "Print the SharedCAConfig CRD as YAML")]
struct Args {
    /// Write the CRD to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    let crd = SharedCAConfig::crd();

    let yaml = match serde_yaml::to_string(&crd) {
        Ok(yaml) => yaml,
        Err(e) => {
            eprintln!("Failed to serialize CRD to YAML: {e}");
            std::process::exit(1);
        }
    };

    match args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, yaml) {
                eprintln!("Failed to write {}: {e}", path.display());
                std::process::exit(1);
            }
        }
        None => print!("{yaml}"),
    }
}
