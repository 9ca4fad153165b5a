//! URL and command composition
//!
//! Stream URLs must match the console's search syntax exactly: the `query`
//! parameter is form-encoded, so `:` `(` `)` become `%3A` `%28` `%29` and
//! the clauses are joined by `+`.

use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use url::Url;

use crate::cases::Case;
use crate::error::{ScanError, ScanResult};
use crate::window::{window_for, TimeWindow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedLink {
    pub case: Case,
    pub window: TimeWindow,
    pub url: String,
}

/// Build the console rosbag stream URL for one case
pub fn stream_url(console_host: &str, case: &Case, window: &TimeWindow) -> ScanResult<Url> {
    let invalid_host = || ScanError::InvalidAddress(format!("console host '{}'", console_host));

    let mut url = Url::parse(&format!("https://{}/", console_host)).map_err(|_| invalid_host())?;
    url.path_segments_mut()
        .map_err(|_| invalid_host())?
        .clear()
        .extend(["projects", case.project_id.as_str(), "rosbag"]);

    let query = format!(
        "project_id:({}) vehicle_id:({}) environment_id:({})",
        case.project_id, case.vehicle_id, case.environment_id
    );
    url.query_pairs_mut()
        .append_pair("viz", "stream")
        .append_pair("agg", "count")
        .append_pair("from_ts", &window.from_epoch_seconds.to_string())
        .append_pair("to_ts", &window.to_epoch_seconds.to_string())
        .append_pair("live", "false")
        .append_pair("query", &query);

    Ok(url)
}

/// One link per valid case. Cases with missing ids, a bad timestamp or an
/// unusable host are logged and dropped; the rest of the batch continues.
pub fn compose_links<I>(cases: I, console_host: &str) -> Vec<GeneratedLink>
where
    I: IntoIterator<Item = Case>,
{
    let mut links = Vec::new();
    for case in cases {
        if !case.is_valid() {
            warn!("Dropping case without project/vehicle id: {:?}", case);
            continue;
        }
        let window = match window_for(&case.timestamp_text) {
            Ok(window) => window,
            Err(e) => {
                warn!("Dropping case for vehicle {}: {}", case.vehicle_id, e);
                continue;
            }
        };
        match stream_url(console_host, &case, &window) {
            Ok(url) => {
                debug!("Case {} -> {}", case.timestamp_text, url);
                links.push(GeneratedLink { case, window, url: url.into() });
            }
            Err(e) => warn!("Dropping case for vehicle {}: {}", case.vehicle_id, e),
        }
    }
    links
}

/// Text of the panel's "copy all" action
pub fn copy_all_text(links: &[GeneratedLink]) -> String {
    links
        .iter()
        .enumerate()
        .map(|(idx, link)| {
            format!(
                "Case {} ({} / {}): {}",
                idx + 1,
                link.case.timestamp_text,
                link.case.vehicle_id,
                link.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fields needed for the console pull commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsoleFields {
    pub project_id: Option<String>,
    pub environment_id: Option<String>,
    pub rosbag_id: Option<String>,
    pub area_map_id: Option<String>,
    pub map_version_id: Option<String>,
}

impl ConsoleFields {
    /// Names of the fields that are still missing
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("project_id", &self.project_id),
            ("environment_id", &self.environment_id),
            ("rosbag_id", &self.rosbag_id),
            ("area_map_id", &self.area_map_id),
            ("map_version_id", &self.map_version_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedCommand {
    pub rosbag_pull: String,
    pub map_pull: String,
}

impl fmt::Display for GeneratedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.rosbag_pull, self.map_pull)
    }
}

/// Compose the rosbag and area map pull commands. Missing fields are left
/// empty so the user can fill them in.
pub fn compose_command(tool: &str, fields: &ConsoleFields) -> GeneratedCommand {
    let missing = fields.missing();
    if !missing.is_empty() {
        warn!("Command is incomplete, missing: {}", missing.join(", "));
    }

    let value = |field: &Option<String>| field.clone().unwrap_or_default();
    let project = value(&fields.project_id);

    GeneratedCommand {
        rosbag_pull: format!(
            "{} data rosbag pull --project-id {} --environment-id {} --rosbag-id {}",
            tool,
            project,
            value(&fields.environment_id),
            value(&fields.rosbag_id)
        ),
        map_pull: format!(
            "{} map area-map pull --project-id {} --area-map-id {} --area-map-version-id {}",
            tool,
            project,
            value(&fields.area_map_id),
            value(&fields.map_version_id)
        ),
    }
}
