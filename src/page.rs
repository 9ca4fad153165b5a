//! Page classification for the two supported layouts.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use url::Url;

use crate::config::HostsConfig;

static CONSOLE_ROSBAG_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/projects/[^/]+/rosbag").expect("valid console path pattern"));

const ISSUE_PATH_PREFIX: &str = "/browse/";

/// Which page layout is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageMode {
    IssueTracker,
    VehicleConsole,
    Unsupported,
}

impl fmt::Display for PageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageMode::IssueTracker => "issue-tracker",
            PageMode::VehicleConsole => "vehicle-console",
            PageMode::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Read-only inputs of one scan: the page address and its rendered text
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub address: String,
    pub text: String,
}

impl PageSnapshot {
    pub fn new(address: impl Into<String>, text: impl Into<String>) -> Self {
        Self { address: address.into(), text: text.into() }
    }
}

/// Classify a page address. Anything not recognised is `Unsupported`.
pub fn classify(address: &str, hosts: &HostsConfig) -> PageMode {
    let Ok(url) = Url::parse(address) else {
        log::debug!("Address '{}' is not a URL", address);
        return PageMode::Unsupported;
    };
    let Some(host) = url.host_str() else {
        return PageMode::Unsupported;
    };

    if host.eq_ignore_ascii_case(&hosts.issue_tracker) && url.path().starts_with(ISSUE_PATH_PREFIX)
    {
        PageMode::IssueTracker
    } else if host.eq_ignore_ascii_case(&hosts.console)
        && CONSOLE_ROSBAG_PATH.is_match(url.path())
    {
        PageMode::VehicleConsole
    } else {
        PageMode::Unsupported
    }
}
