use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::capture::{CopyControlLocator, FileCopyLocator, ReadyControls, StaticCopyControl};
use crate::config::{get_config_path, Config};
use crate::error::ScanError;
use crate::page::PageSnapshot;
use crate::render::{OutputFormat, Renderer, TerminalRenderer};
use crate::scan::{ScanOutcome, Scanner};

/// rosbag-linker - rosbag stream links and pull commands from page text
#[derive(Debug, Parser)]
#[command(name = "rosbag-linker")]
#[command(about = "Rosbag stream links and pull commands from issue tracker and console pages", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print which page layout an address belongs to
    Classify {
        /// Page address
        #[arg(required = true)]
        address: String,
    },

    /// Generate stream links from issue tracker page text
    Links {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Generate pull commands from vehicle console page text
    Command {
        /// Console page address
        #[arg(long)]
        address: String,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        copy: CopyArgs,
    },

    /// Classify the address and run the matching pipeline
    Scan {
        /// Page address
        #[arg(long)]
        address: String,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        copy: CopyArgs,
    },

    /// View or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// File with the rendered page text (stdin when omitted)
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Print JSON instead of a text panel
    #[arg(long)]
    pub json: bool,
}

/// Where the value behind the console's "Copy" control comes from
#[derive(Debug, Args)]
#[group(multiple = false)]
pub struct CopyArgs {
    /// Area map version id, as the copy control would copy it
    #[arg(long)]
    pub map_version: Option<String>,

    /// Wait for this file to appear and use its content as the copied text
    #[arg(long)]
    pub map_version_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigActions {
    /// Show the effective configuration
    Show,

    /// Print the default config file location
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl InputArgs {
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

impl CopyArgs {
    fn locator(&self) -> Box<dyn CopyControlLocator> {
        match (&self.map_version, &self.map_version_file) {
            (Some(value), _) => Box::new(ReadyControls::single(StaticCopyControl::new(value))),
            (None, Some(path)) => Box::new(FileCopyLocator::new(path)),
            (None, None) => Box::new(ReadyControls::none()),
        }
    }
}

/// Read rendered page text from a file or stdin
pub fn read_page_text(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page text from {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).context("Failed to read page text from stdin")?;
            Ok(text)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Classify { address } => {
            let scanner = Scanner::new(load_config(config_path)?);
            println!("{}", scanner.mode(&address));
            Ok(())
        }
        Commands::Links { input } => {
            let scanner = Scanner::new(load_config(config_path)?);
            let text = read_page_text(input.input.as_deref())?;
            let links = match scanner.issue_links(&text) {
                Ok(links) => links,
                Err(ScanError::MissingField(label)) => {
                    info!("No '{}' in page text, nothing to show", label);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            if links.is_empty() {
                info!("No cases found");
                return Ok(());
            }
            let mut renderer = TerminalRenderer::new(io::stdout().lock(), input.format());
            renderer.show_links(&links)?;
            Ok(())
        }
        Commands::Command { address, input, copy } => {
            let scanner = Scanner::new(load_config(config_path)?);
            let page = PageSnapshot::new(address, read_page_text(input.input.as_deref())?);
            let command = scanner.console_command(&page, copy.locator().as_ref()).await?;
            let mut renderer = TerminalRenderer::new(io::stdout().lock(), input.format());
            renderer.show_command(&page.address, &command)?;
            Ok(())
        }
        Commands::Scan { address, input, copy } => {
            let scanner = Scanner::new(load_config(config_path)?);
            let page = PageSnapshot::new(address, read_page_text(input.input.as_deref())?);
            let mut renderer = TerminalRenderer::new(io::stdout().lock(), input.format());
            let outcome = scanner.scan(&page, copy.locator().as_ref(), &mut renderer).await?;
            if outcome == ScanOutcome::Inert {
                info!("Nothing to show for {}", page.address);
            }
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigActions::Show => {
                let config = load_config(config_path)?;
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigActions::Path => {
                let path = match config_path {
                    Some(path) => path.to_path_buf(),
                    None => get_config_path()?,
                };
                println!("{}", path.display());
                Ok(())
            }
            ConfigActions::Init { force } => {
                let path = match config_path {
                    Some(path) => path.to_path_buf(),
                    None => get_config_path()?,
                };
                if path.exists() && !force {
                    bail!("Config already exists at {} (use --force to overwrite)", path.display());
                }
                Config::default().save_to(&path)?;
                println!("Wrote default config to {}", path.display());
                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_with_map_version() {
        let cli = Cli::try_parse_from([
            "rosbag-linker",
            "scan",
            "--address",
            "https://console.mob.tier4.jp/projects/x2_dev/rosbag",
            "--input",
            "page.txt",
            "--map-version",
            "4c1b7e2a",
        ])
        .unwrap();
        match cli.command {
            Commands::Scan { copy, input, .. } => {
                assert_eq!(copy.map_version.as_deref(), Some("4c1b7e2a"));
                assert_eq!(input.input, Some(PathBuf::from("page.txt")));
                assert!(!input.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_copy_sources_conflict() {
        let result = Cli::try_parse_from([
            "rosbag-linker",
            "command",
            "--address",
            "https://console.mob.tier4.jp/projects/x2_dev/rosbag",
            "--map-version",
            "a",
            "--map-version-file",
            "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_page_text_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("page.txt");
        std::fs::write(&path, "project_id: x2_dev\n")?;
        assert_eq!(read_page_text(Some(&path))?, "project_id: x2_dev\n");
        assert!(read_page_text(Some(&dir.path().join("missing.txt"))).is_err());
        Ok(())
    }
}
