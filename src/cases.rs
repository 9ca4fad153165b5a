//! Case collection from issue tracker text
//!
//! A case block starts at a `project_id` label and runs up to the next one,
//! so a block that lacks a field never borrows it from the following case.
//! Inside a block the fields appear in the order project, vehicle,
//! environment, then one or more occurred-at timestamps.

use log::debug;
use once_cell::sync::Lazy;
use regex::{Matches, Regex};
use serde::Serialize;
use std::collections::VecDeque;
use std::iter::Peekable;

use crate::extract::{labeled_value_pattern, ENVIRONMENT_ID, OCCURRED_AT, PROJECT_ID, VEHICLE_ID};

static BLOCK_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{}[:：]", regex::escape(PROJECT_ID))).expect("valid block start pattern")
});

static BLOCK_HEAD: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"^{}[\s\S]*?{}[\s\S]*?{}",
        labeled_value_pattern(PROJECT_ID),
        labeled_value_pattern(VEHICLE_ID),
        labeled_value_pattern(ENVIRONMENT_ID),
    );
    Regex::new(&pattern).expect("valid block head pattern")
});

// Only the timestamp itself; brackets and suffixes such as "(JST)" are dropped
static OCCURRED_AT_VALUE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"{}[:：][ \t]*\[?(\d{{4}}-\d{{2}}-\d{{2}} \d{{2}}:\d{{2}}:\d{{2}})",
        regex::escape(OCCURRED_AT)
    );
    Regex::new(&pattern).expect("valid timestamp label")
});

/// One occurrence of ids plus an occurred-at timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Case {
    pub project_id: String,
    pub vehicle_id: String,
    pub environment_id: String,
    pub timestamp_text: String,
}

impl Case {
    /// Project and vehicle ids are required for a usable link
    pub fn is_valid(&self) -> bool {
        !self.project_id.is_empty() && !self.vehicle_id.is_empty()
    }
}

/// Lazy, single-pass scan over the case blocks of one text
pub struct CaseScan<'t> {
    text: &'t str,
    starts: Peekable<Matches<'static, 't>>,
    pending: VecDeque<Case>,
}

/// Start scanning `text` for cases. Nothing is matched until the iterator is polled.
pub fn collect_cases(text: &str) -> CaseScan<'_> {
    CaseScan { text, starts: BLOCK_START.find_iter(text).peekable(), pending: VecDeque::new() }
}

impl Iterator for CaseScan<'_> {
    type Item = Case;

    fn next(&mut self) -> Option<Case> {
        loop {
            if let Some(case) = self.pending.pop_front() {
                return Some(case);
            }

            let start = self.starts.next()?.start();
            let end = self.starts.peek().map_or(self.text.len(), |m| m.start());
            self.pending.extend(scan_block(&self.text[start..end]));
        }
    }
}

fn scan_block(block: &str) -> Vec<Case> {
    let Some(head) = BLOCK_HEAD.captures(block) else {
        debug!("Skipping incomplete case block: {:?}", block.lines().next().unwrap_or_default());
        return Vec::new();
    };
    let field = |i: usize| head.get(i).map_or(String::new(), |m| m.as_str().trim().to_string());
    let (project_id, vehicle_id, environment_id) = (field(1), field(2), field(3));
    let head_end = head.get(0).map_or(0, |m| m.end());

    OCCURRED_AT_VALUE
        .captures_iter(&block[head_end..])
        .filter_map(|caps| caps.get(1))
        .map(|ts| Case {
            project_id: project_id.clone(),
            vehicle_id: vehicle_id.clone(),
            environment_id: environment_id.clone(),
            timestamp_text: ts.as_str().to_string(),
        })
        .collect()
}
