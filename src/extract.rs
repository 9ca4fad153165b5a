//! Field extraction from rendered page text
//!
//! Page text comes from two sources with mixed Japanese/English labels, so
//! every `label:` lookup accepts both the ASCII colon and the full-width `：`.

use log::debug;
use regex::Regex;
use url::Url;

pub const PROJECT_ID: &str = "project_id";
pub const VEHICLE_ID: &str = "vehicle_id";
pub const ENVIRONMENT_ID: &str = "environment_id";
/// "Occurred at" label used by the issue tracker templates
pub const OCCURRED_AT: &str = "発生時刻";

const FILE_ID_HEADING: &str = "File ID";
const AREA_MAP_HEADING: &str = "Area Map";

/// Regex source matching `label`, a colon of either width, then the rest of the same line
pub fn labeled_value_pattern(label: &str) -> String {
    format!(r"{}[:：][ \t]*([^\n]+)", regex::escape(label))
}

/// Return the first value following `label`, trimmed. `None` when the label is absent.
pub fn extract_field(text: &str, label: &str) -> Option<String> {
    let re = match Regex::new(&labeled_value_pattern(label)) {
        Ok(re) => re,
        Err(e) => {
            debug!("Could not build pattern for label '{}': {}", label, e);
            return None;
        }
    };
    first_capture(&re, text)
}

/// Rosbag id: the line following the "File ID" heading
pub fn extract_file_id(text: &str) -> Option<String> {
    let pattern = format!(r"{}\s*\n\s*([^\n]+)", regex::escape(FILE_ID_HEADING));
    Regex::new(&pattern).ok().and_then(|re| first_capture(&re, text))
}

/// Area map id: the parenthesised part of the line after the "Area Map" heading,
/// e.g. `Shiojiri_Lv4 (1211)` gives `1211`.
pub fn extract_area_map_id(text: &str, map_name: Option<&str>) -> Option<String> {
    let name_pattern = match map_name {
        Some(name) => format!(r"{}\s*", regex::escape(name)),
        None => r"[^\n(]*".to_string(),
    };
    let pattern = format!(
        r"{}\s*\n\s*{}\(([^)\n]*)\)",
        regex::escape(AREA_MAP_HEADING),
        name_pattern
    );
    Regex::new(&pattern).ok().and_then(|re| first_capture(&re, text))
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Identifiers recoverable from a console address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressIds {
    pub project_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub environment_id: Option<String>,
}

/// Read ids from `/projects/<id>/...` and from the `key:(value)` clauses of the
/// decoded `query` parameter. The path wins for the project id.
pub fn ids_from_address(address: &str) -> AddressIds {
    let Ok(url) = Url::parse(address) else {
        return AddressIds::default();
    };

    let query = url
        .query_pairs()
        .find(|(key, _)| key == "query")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    let path_project = url.path_segments().and_then(|mut segments| {
        match (segments.next(), segments.next()) {
            (Some("projects"), Some(id)) if !id.is_empty() => Some(id.to_string()),
            _ => None,
        }
    });

    AddressIds {
        project_id: path_project.or_else(|| query_clause(&query, PROJECT_ID)),
        vehicle_id: query_clause(&query, VEHICLE_ID),
        environment_id: query_clause(&query, ENVIRONMENT_ID),
    }
}

fn query_clause(query: &str, key: &str) -> Option<String> {
    let pattern = format!(r"{}:\(([^)]+)\)", regex::escape(key));
    Regex::new(&pattern).ok().and_then(|re| first_capture(&re, query))
}
