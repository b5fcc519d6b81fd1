//! Post-run bookkeeping: a run log for every campaign, and an alert email
//! written by the text model when fewer creatives came back than expected.

use chrono::Utc;
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::core::{sanitize_name, CampaignBrief, CreativeError};
use crate::creative::TextModel;

/// What the reporter found and wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub expected: usize,
    pub actual: usize,
    pub log_path: PathBuf,
    pub alert_path: Option<PathBuf>,
}

impl RunReport {
    pub fn is_short(&self) -> bool {
        self.actual < self.expected
    }
}

pub struct Reporter {
    logs_dir: PathBuf,
    alerts_dir: PathBuf,
    text_model: Option<Arc<dyn TextModel>>,
}

impl Reporter {
    pub fn new(
        logs_dir: impl Into<PathBuf>,
        alerts_dir: impl Into<PathBuf>,
        text_model: Option<Arc<dyn TextModel>>,
    ) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            alerts_dir: alerts_dir.into(),
            text_model,
        }
    }

    /// Write the run log and, if the run came up short, try to write an alert.
    ///
    /// Only a failure to write the log is returned; alerting is best-effort.
    pub async fn run_post_process_checks(
        &self,
        brief: &CampaignBrief,
        urls: &[String],
    ) -> Result<RunReport, CreativeError> {
        let expected = brief.expected_creatives();
        let actual = urls.len();
        let safe_name = file_stem(brief);

        fs::create_dir_all(&self.logs_dir).await?;
        let log_path = self.logs_dir.join(format!("{}.log", safe_name));
        fs::write(&log_path, render_log(brief, urls, expected, actual)?).await?;
        tracing::info!("Campaign results logged to: {}", log_path.display());

        let mut report = RunReport {
            expected,
            actual,
            log_path,
            alert_path: None,
        };

        if report.is_short() {
            report.alert_path = self.generate_alert(brief, &report).await;
        }

        Ok(report)
    }

    async fn generate_alert(&self, brief: &CampaignBrief, report: &RunReport) -> Option<PathBuf> {
        let Some(model) = &self.text_model else {
            tracing::error!("Cannot generate AI alert because the text model is not available.");
            return None;
        };

        tracing::warn!(
            expected = report.expected,
            actual = report.actual,
            "Issue detected. Triggering AI Alerter..."
        );

        let prompt = alert_prompt(brief, report);
        let result = async {
            let email = model.generate_text(&prompt).await?;
            fs::create_dir_all(&self.alerts_dir).await?;
            let path = self.alerts_dir.join(format!("ALERT_{}.txt", file_stem(brief)));
            fs::write(&path, email).await?;
            Ok::<_, CreativeError>(path)
        }
        .await;

        match result {
            Ok(path) => {
                tracing::info!("Successfully generated and saved alert to: {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::error!("Failed to generate AI alert: {}", e);
                None
            }
        }
    }
}

fn file_stem(brief: &CampaignBrief) -> String {
    let name = sanitize_name(&brief.campaign_name);
    if name.is_empty() {
        "campaign".to_string()
    } else {
        name
    }
}

fn render_log(
    brief: &CampaignBrief,
    urls: &[String],
    expected: usize,
    actual: usize,
) -> Result<String, CreativeError> {
    let status = if actual >= expected {
        "SUCCESS"
    } else {
        "FLAGGED INSUFFICIENT ASSETS"
    };

    let mut log = String::new();
    let _ = writeln!(log, "Campaign Generation Log");
    let _ = writeln!(log, "-------------------------");
    let _ = writeln!(log, "Campaign Name: {}", brief.campaign_name);
    let _ = writeln!(log, "Timestamp (UTC): {}", Utc::now().to_rfc3339());
    let _ = writeln!(log, "Status: {}\n", status);
    let _ = writeln!(log, "Metrics:");
    let _ = writeln!(log, "  - Expected Creatives: {}", expected);
    let _ = writeln!(log, "  - Generated Creatives: {}\n", actual);
    let _ = writeln!(log, "Brief Details:\n{}\n", serde_json::to_string_pretty(brief)?);
    let _ = writeln!(log, "Generated File URLs:");
    for url in urls {
        let _ = writeln!(log, "  - {}", url);
    }
    Ok(log)
}

fn alert_prompt(brief: &CampaignBrief, report: &RunReport) -> String {
    let context = json!({
        "campaign_name": brief.campaign_name,
        "status": "FLAGGED_INSUFFICIENT_ASSETS",
        "severity": "Warning",
        "details": {
            "expected_variant_count": report.expected,
            "generated_variant_count": report.actual,
            "message": brief.message,
            "products": brief.products.names(),
        },
        "suggested_action": format!(
            "Review the campaign log at '{}' for potential errors.",
            display_path(&report.log_path)
        ),
    });

    format!(
        "You are a production assistant AI for a busy marketing team. \
         Based on the following structured JSON data report, write a simple, clear, and human-readable email alert. \
         The email should be suitable for saving as a text file. Do not include the JSON in your response. \
         Start the email with a clear subject line.\n\n\
         JSON REPORT:\n{}",
        serde_json::to_string_pretty(&context).unwrap_or_default()
    )
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::creative::testing::brief;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Text model that records prompts and optionally fails
    #[derive(Default)]
    pub(crate) struct RecordingTextModel {
        pub fail: bool,
        pub prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextModel for RecordingTextModel {
        async fn generate_text(&self, prompt: &str) -> Result<String, CreativeError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(CreativeError::api("quota exceeded"));
            }
            Ok("Subject: Campaign needs attention\n\nHi team, ...".to_string())
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example.com/{}.png?raw=1", i)).collect()
    }

    #[tokio::test]
    async fn full_run_logs_without_alert() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(RecordingTextModel::default());
        let reporter = Reporter::new(dir.path().join("logs"), dir.path().join("alerts"), Some(model.clone()));

        let report = reporter
            .run_post_process_checks(&brief(&["Soda"]), &urls(3))
            .await
            .unwrap();

        assert_eq!((report.expected, report.actual), (3, 3));
        assert!(report.alert_path.is_none());
        assert!(model.prompts.lock().unwrap().is_empty());

        let log = std::fs::read_to_string(&report.log_path).unwrap();
        assert!(report.log_path.ends_with("Summer_Sale_2024.log"));
        assert!(log.contains("Status: SUCCESS"));
        assert!(log.contains("  - https://example.com/2.png?raw=1"));
    }

    #[tokio::test]
    async fn short_run_writes_alert() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(RecordingTextModel::default());
        let reporter = Reporter::new(dir.path().join("logs"), dir.path().join("alerts"), Some(model.clone()));

        let report = reporter
            .run_post_process_checks(&brief(&["Soda"]), &urls(2))
            .await
            .unwrap();

        assert!(report.is_short());
        let alert = report.alert_path.unwrap();
        assert!(alert.ends_with("ALERT_Summer_Sale_2024.txt"));
        assert!(std::fs::read_to_string(alert).unwrap().starts_with("Subject:"));

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("\"expected_variant_count\": 3"));
        assert!(prompts[0].contains("\"generated_variant_count\": 2"));

        let log = std::fs::read_to_string(&report.log_path).unwrap();
        assert!(log.contains("FLAGGED INSUFFICIENT ASSETS"));
    }

    #[tokio::test]
    async fn alert_failures_are_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(RecordingTextModel {
            fail: true,
            ..Default::default()
        });
        let reporter = Reporter::new(dir.path().join("logs"), dir.path().join("alerts"), Some(model.clone()));

        let report = reporter
            .run_post_process_checks(&brief(&["Soda", "Chips"]), &[])
            .await
            .unwrap();

        assert_eq!(report.expected, 6);
        assert!(report.alert_path.is_none());
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
        assert!(report.log_path.exists());
    }

    #[tokio::test]
    async fn missing_text_model_still_logs() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new(dir.path().join("logs"), dir.path().join("alerts"), None);

        let report = reporter
            .run_post_process_checks(&brief(&["Soda"]), &urls(1))
            .await
            .unwrap();

        assert!(report.alert_path.is_none());
        assert!(report.log_path.exists());
    }
}
