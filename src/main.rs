use burn::data::dataset::Dataset;
use datawrap::{AttributedDataset, DatasetRegistry, Error, SharedDataset};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub mod cli;

use cli::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let registry = DatasetRegistry::with_list_dataset();

    match cli.command {
        Commands::Inspect { config } => {
            let dataset = load(&registry, &config)?;
            inspect(&dataset);
        }

        Commands::Get { config, indices } => {
            let dataset = load(&registry, &config)?;
            for index in indices {
                match dataset.get(index) {
                    Some(item) => println!("{:<6} {}", index, serde_json::to_string(&item)?),
                    None => println!(
                        "{:<6} out of range (length {})",
                        index,
                        dataset.len()
                    ),
                }
            }
        }

        Commands::Types => {
            for name in registry.names() {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

fn load(registry: &DatasetRegistry<Value>, path: &Path) -> datawrap::Result<SharedDataset<Value>> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| Error::Config {
        name: path.display().to_string(),
        source,
    })?;
    registry.build_value(value)
}

fn inspect(dataset: &SharedDataset<Value>) {
    println!("Dataset summary:");
    println!("{}", "-".repeat(40));
    println!("  Length:        {}", dataset.len());

    match dataset.aspect_ratios() {
        Some(ratios) if !ratios.is_empty() => {
            let min = ratios.iter().copied().fold(f32::INFINITY, f32::min);
            let max = ratios.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let mean = ratios.iter().sum::<f32>() / ratios.len() as f32;
            println!(
                "  Aspect ratios: min {:.3} / mean {:.3} / max {:.3}",
                min, mean, max
            );
        }
        Some(_) => println!("  Aspect ratios: (empty)"),
        None => println!("  Aspect ratios: none"),
    }

    match dataset.meta() {
        Some(meta) => {
            println!("  Meta:");
            for (key, value) in meta {
                println!("    {:<12} {}", key, value);
            }
        }
        None => println!("  Meta:          none"),
    }
    println!("{}", "-".repeat(40));
}
