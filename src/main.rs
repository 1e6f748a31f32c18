use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use world_finder::cli::{Cli, Commands};
use world_finder::config;
use world_finder::export::{self, Exporter};
use world_finder::lookup::NamedLookupParser;
use world_finder::placeholder::PlaceholderEngine;
use world_finder::scanner::{ScannerConfig, WorldScanner};

const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command.clone() {
        Commands::List => {
            let scanner = init_scanner(&cli, ScannerConfig::default())?;
            let document = export::build_document(&scanner.get_all());
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Export => {
            let scanner = init_scanner(&cli, ScannerConfig::default())?;
            let exporter = Exporter::new(scanner, config::resolve_export_file(&cli)?);
            let count = exporter.export()?;
            eprintln!(
                "[world-finder] exported {count} worlds to {}",
                exporter.path().display()
            );
        }
        Commands::Watch {
            scan_interval,
            export_interval,
            duration,
        } => {
            let config = ScannerConfig {
                scan_interval: Duration::from_secs(scan_interval.max(1)),
                ..ScannerConfig::default()
            };
            let scanner = init_scanner(&cli, config)?;
            let exporter = Exporter::new(scanner.clone(), config::resolve_export_file(&cli)?);
            exporter.export()?;

            let scan_task = scanner.spawn();
            let export_task = exporter.spawn(Duration::from_secs(export_interval.max(1)));

            match duration {
                Some(secs) => std::thread::sleep(Duration::from_secs(secs)),
                None => loop {
                    std::thread::sleep(Duration::from_secs(60));
                },
            }

            scan_task.shutdown(SHUTDOWN_WAIT);
            export_task.shutdown(SHUTDOWN_WAIT);
        }
        Commands::Resolve { template, world } => {
            let scanner = init_scanner(&cli, ScannerConfig::default())?;
            let engine = PlaceholderEngine::new()?;
            let record = match world {
                Some(name) => Some(
                    scanner
                        .get(&name)
                        .with_context(|| format!("unknown world folder: {name}"))?,
                ),
                None => None,
            };
            println!("{}", engine.resolve(&template, record.as_ref()));
        }
        Commands::Lookup { token } => {
            let scanner = init_scanner(&cli, ScannerConfig::default())?;
            let parser = NamedLookupParser::new(scanner)?;
            println!("{}", parser.parse(&token));
        }
        Commands::Placeholders => {
            let engine = PlaceholderEngine::new()?;
            for name in engine.known_placeholders() {
                println!("{{{name}}}");
            }
        }
    }

    Ok(())
}

fn init_scanner(cli: &Cli, config: ScannerConfig) -> Result<WorldScanner> {
    WorldScanner::initialize(Some(config::resolve_saves_dir(cli)?), config)
}
