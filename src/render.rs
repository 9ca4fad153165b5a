//! Output panels.
//!
//! The scan pipeline only talks to the [`Renderer`] trait. The terminal
//! renderer stands in for the floating panels of the browser version.

use serde::Serialize;
use serde_json::json;
use std::io::Write;

use crate::compose::{copy_all_text, GeneratedCommand, GeneratedLink};
use crate::error::ScanResult;

/// Displays scan results
pub trait Renderer {
    /// Remove whatever an earlier scan left behind
    fn clear(&mut self) -> ScanResult<()>;
    fn show_links(&mut self, links: &[GeneratedLink]) -> ScanResult<()>;
    fn show_command(&mut self, address: &str, command: &GeneratedCommand) -> ScanResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Links,
    Command,
}

pub struct TerminalRenderer<W: Write> {
    out: W,
    format: OutputFormat,
    active: Option<Panel>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format, active: None }
    }

    /// Panel currently on screen, if any
    pub fn active_panel(&self) -> Option<Panel> {
        self.active
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn clear(&mut self) -> ScanResult<()> {
        if let Some(panel) = self.active.take() {
            log::debug!("Removing previous {:?} panel", panel);
            if self.format == OutputFormat::Text {
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    fn show_links(&mut self, links: &[GeneratedLink]) -> ScanResult<()> {
        match self.format {
            OutputFormat::Json => {
                let body = json!({
                    "panel": Panel::Links,
                    "links": links,
                    "copy_all": copy_all_text(links),
                });
                serde_json::to_writer_pretty(&mut self.out, &body).map_err(std::io::Error::from)?;
                writeln!(self.out)?;
            }
            OutputFormat::Text => {
                writeln!(self.out, "Rosbag links ({} case(s))", links.len())?;
                for (idx, link) in links.iter().enumerate() {
                    writeln!(self.out, "  Case {}: {}", idx + 1, link.case.timestamp_text)?;
                    writeln!(self.out, "    {}", link.url)?;
                }
                writeln!(self.out)?;
                writeln!(self.out, "Copy all:")?;
                writeln!(self.out, "{}", copy_all_text(links))?;
            }
        }
        self.out.flush()?;
        self.active = Some(Panel::Links);
        Ok(())
    }

    fn show_command(&mut self, address: &str, command: &GeneratedCommand) -> ScanResult<()> {
        match self.format {
            OutputFormat::Json => {
                let body = json!({
                    "panel": Panel::Command,
                    "address": address,
                    "command": command,
                    "command_text": command.to_string(),
                });
                serde_json::to_writer_pretty(&mut self.out, &body).map_err(std::io::Error::from)?;
                writeln!(self.out)?;
            }
            OutputFormat::Text => {
                writeln!(self.out, "Current console URL:")?;
                writeln!(self.out, "  {}", address)?;
                writeln!(self.out, "Generated command:")?;
                writeln!(self.out, "{}", command)?;
            }
        }
        self.out.flush()?;
        self.active = Some(Panel::Command);
        Ok(())
    }
}
