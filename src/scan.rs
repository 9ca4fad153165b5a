//! One scan of one page: classify, extract, compose, render.

use log::{debug, info};

use crate::capture::{capture_from_page, CopyControlLocator};
use crate::cases::collect_cases;
use crate::compose::{compose_command, compose_links, ConsoleFields, GeneratedCommand, GeneratedLink};
use crate::config::Config;
use crate::error::{ScanError, ScanResult};
use crate::extract::{
    extract_area_map_id, extract_field, extract_file_id, ids_from_address, ENVIRONMENT_ID,
    PROJECT_ID, VEHICLE_ID,
};
use crate::page::{classify, PageMode, PageSnapshot};
use crate::render::Renderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Links(Vec<GeneratedLink>),
    Command { address: String, command: GeneratedCommand },
    /// Unsupported page, missing fields or nothing found: no panel
    Inert,
}

pub struct Scanner {
    config: Config,
}

impl Scanner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn mode(&self, address: &str) -> PageMode {
        classify(address, &self.config.hosts)
    }

    /// Links for every case on an issue page.
    ///
    /// The page must name a project and a vehicle somewhere, otherwise the
    /// scan stops with `MissingField`.
    pub fn issue_links(&self, text: &str) -> ScanResult<Vec<GeneratedLink>> {
        for label in [PROJECT_ID, VEHICLE_ID] {
            if extract_field(text, label).is_none() {
                return Err(ScanError::MissingField(label));
            }
        }
        Ok(compose_links(collect_cases(text), &self.config.hosts.console))
    }

    /// Static console fields; the map version needs [`Scanner::console_command`]
    pub fn console_fields(&self, page: &PageSnapshot) -> ConsoleFields {
        let from_address = ids_from_address(&page.address);
        ConsoleFields {
            project_id: extract_field(&page.text, PROJECT_ID).or(from_address.project_id),
            environment_id: extract_field(&page.text, ENVIRONMENT_ID)
                .or(from_address.environment_id),
            rosbag_id: extract_file_id(&page.text),
            area_map_id: extract_area_map_id(
                &page.text,
                self.config.command.area_map_name.as_deref(),
            ),
            map_version_id: None,
        }
    }

    /// Pull commands for a console page. Fails if the copy control never
    /// shows up within the configured deadline.
    pub async fn console_command(
        &self,
        page: &PageSnapshot,
        locator: &dyn CopyControlLocator,
    ) -> ScanResult<GeneratedCommand> {
        let mut fields = self.console_fields(page);
        let copied = capture_from_page(locator, &self.config.capture.poll_policy()).await?;
        let copied = copied.trim();
        debug!("Captured map version '{}'", copied);
        fields.map_version_id = (!copied.is_empty()).then(|| copied.to_string());
        Ok(compose_command(&self.config.command.tool, &fields))
    }

    /// Run the whole pipeline once for `page`.
    ///
    /// Missing ids on an issue page end the scan without output. A copy
    /// control timeout is returned as an error.
    pub async fn scan(
        &self,
        page: &PageSnapshot,
        locator: &dyn CopyControlLocator,
        renderer: &mut dyn Renderer,
    ) -> ScanResult<ScanOutcome> {
        let mode = self.mode(&page.address);
        debug!("Page mode for {}: {}", page.address, mode);

        match mode {
            PageMode::IssueTracker => {
                let links = match self.issue_links(&page.text) {
                    Ok(links) => links,
                    Err(ScanError::MissingField(label)) => {
                        info!("No '{}' on issue page, nothing to show", label);
                        return Ok(ScanOutcome::Inert);
                    }
                    Err(e) => return Err(e),
                };
                if links.is_empty() {
                    info!("No cases found on issue page");
                    return Ok(ScanOutcome::Inert);
                }
                info!("Generated {} link(s)", links.len());
                renderer.clear()?;
                renderer.show_links(&links)?;
                Ok(ScanOutcome::Links(links))
            }
            PageMode::VehicleConsole => {
                let command = self.console_command(page, locator).await?;
                info!("Generated console command:\n{}", command);
                renderer.clear()?;
                renderer.show_command(&page.address, &command)?;
                Ok(ScanOutcome::Command { address: page.address.clone(), command })
            }
            PageMode::Unsupported => {
                debug!("Unsupported page, doing nothing");
                Ok(ScanOutcome::Inert)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ReadyControls, StaticCopyControl};
    use pretty_assertions::assert_eq;

    /// Records what the pipeline asked to show
    #[derive(Default)]
    struct RecordingRenderer {
        clears: usize,
        links: Vec<Vec<GeneratedLink>>,
        commands: Vec<(String, GeneratedCommand)>,
    }

    impl Renderer for RecordingRenderer {
        fn clear(&mut self) -> ScanResult<()> {
            self.clears += 1;
            Ok(())
        }

        fn show_links(&mut self, links: &[GeneratedLink]) -> ScanResult<()> {
            self.links.push(links.to_vec());
            Ok(())
        }

        fn show_command(&mut self, address: &str, command: &GeneratedCommand) -> ScanResult<()> {
            self.commands.push((address.to_string(), command.clone()));
            Ok(())
        }
    }

    const ISSUE: &str = "https://tier4.atlassian.net/browse/EVT-42";
    const CONSOLE: &str = "https://console.mob.tier4.jp/projects/x2_dev/rosbag?viz=stream";

    fn scanner() -> Scanner {
        let mut config = Config::default();
        config.capture.poll_interval_ms = 5;
        config.capture.timeout_ms = 200;
        Scanner::new(config)
    }

    fn issue_text(second_timestamp: &str) -> String {
        format!(
            "project_id: x2_dev\nvehicle_id: v-1\nenvironment_id: e-1\n発生時刻: 2025-09-29 05:36:04\n\n\
             project_id: x2_dev\nvehicle_id: v-2\nenvironment_id: e-2\n発生時刻: {}\n\n\
             project_id: x2_dev\nvehicle_id: v-3\nenvironment_id: e-3\n発生時刻: 2025-09-29 07:10:00\n",
            second_timestamp
        )
    }

    fn console_text() -> &'static str {
        "Rosbag detail\nproject_id: x2_dev\nenvironment_id: 8dc58113\nFile ID\nfe64ec95\nArea Map\nShiojiri_Lv4 (1211)\nCopy\n"
    }

    #[tokio::test]
    async fn test_issue_page_renders_links() {
        let page = PageSnapshot::new(ISSUE, issue_text("2025-09-29 06:00:00"));
        let mut renderer = RecordingRenderer::default();
        let outcome = scanner().scan(&page, &ReadyControls::none(), &mut renderer).await.unwrap();

        let ScanOutcome::Links(links) = outcome else { panic!("expected links") };
        assert_eq!(links.len(), 3);
        assert_eq!(renderer.clears, 1);
        assert_eq!(renderer.links, vec![links]);
    }

    #[tokio::test]
    async fn test_malformed_timestamp_drops_one_case() {
        let page = PageSnapshot::new(ISSUE, issue_text("2025-09-29 99:00:00"));
        let mut renderer = RecordingRenderer::default();
        let outcome = scanner().scan(&page, &ReadyControls::none(), &mut renderer).await.unwrap();

        let ScanOutcome::Links(links) = outcome else { panic!("expected links") };
        let vehicles: Vec<&str> = links.iter().map(|l| l.case.vehicle_id.as_str()).collect();
        assert_eq!(vehicles, vec!["v-1", "v-3"]);
    }

    #[tokio::test]
    async fn test_issue_page_without_labels_is_inert() {
        let page = PageSnapshot::new(ISSUE, "Steering wobble reported at the depot.");
        let mut renderer = RecordingRenderer::default();
        let outcome = scanner().scan(&page, &ReadyControls::none(), &mut renderer).await.unwrap();

        assert_eq!(outcome, ScanOutcome::Inert);
        assert_eq!(renderer.clears, 0);
        assert!(renderer.links.is_empty());
    }

    #[test]
    fn test_timestamp_with_zone_suffix_still_links() {
        let text = "project_id: x2_dev\nvehicle_id: v-1\nenvironment_id: e-1\n発生時刻: 2025-09-29 05:36:04 (JST)\n";
        let links = scanner().issue_links(text).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].case.timestamp_text, "2025-09-29 05:36:04");
        assert_eq!(links[0].window.from_epoch_seconds, 1_759_091_644);
    }

    #[test]
    fn test_missing_vehicle_aborts_issue_scan() {
        let err = scanner().issue_links("project_id: x2_dev\n発生時刻: 2025-09-29 05:36:04").unwrap_err();
        assert!(matches!(err, ScanError::MissingField(VEHICLE_ID)));
    }

    #[tokio::test]
    async fn test_console_page_renders_command() {
        let page = PageSnapshot::new(CONSOLE, console_text());
        let controls = ReadyControls::single(StaticCopyControl::new(" 4c1b7e2a \n"));
        let mut renderer = RecordingRenderer::default();
        let outcome = scanner().scan(&page, &controls, &mut renderer).await.unwrap();

        let ScanOutcome::Command { address, command } = outcome else { panic!("expected command") };
        assert_eq!(address, CONSOLE);
        assert_eq!(
            command.to_string(),
            "webauto data rosbag pull --project-id x2_dev --environment-id 8dc58113 --rosbag-id fe64ec95\n\
             webauto map area-map pull --project-id x2_dev --area-map-id 1211 --area-map-version-id 4c1b7e2a"
        );
        assert_eq!(renderer.commands, vec![(CONSOLE.to_string(), command)]);
    }

    #[tokio::test]
    async fn test_console_page_without_copy_control_times_out() {
        let page = PageSnapshot::new(CONSOLE, console_text());
        let mut renderer = RecordingRenderer::default();
        let err = scanner().scan(&page, &ReadyControls::none(), &mut renderer).await.unwrap_err();

        assert!(matches!(err, ScanError::CopyControlTimeout(_)));
        assert!(renderer.commands.is_empty());
    }

    #[test]
    fn test_console_fields_fall_back_to_address() {
        let page = PageSnapshot::new(
            "https://console.mob.tier4.jp/projects/x2_dev/rosbag?query=environment_id%3A%28e-9%29",
            "File ID\nfe64ec95\n",
        );
        let fields = scanner().console_fields(&page);
        assert_eq!(fields.project_id.as_deref(), Some("x2_dev"));
        assert_eq!(fields.environment_id.as_deref(), Some("e-9"));
        assert_eq!(fields.rosbag_id.as_deref(), Some("fe64ec95"));
        assert_eq!(fields.area_map_id, None);
    }

    #[tokio::test]
    async fn test_unsupported_page_is_inert() {
        let page = PageSnapshot::new("https://example.com/", issue_text("2025-09-29 06:00:00"));
        let mut renderer = RecordingRenderer::default();
        let outcome = scanner().scan(&page, &ReadyControls::none(), &mut renderer).await.unwrap();
        assert_eq!(outcome, ScanOutcome::Inert);
        assert_eq!(renderer.clears, 0);
    }
}
