//! Capture orchestration. One run drives the whole pipeline: snapshot, field
//! extraction, contact reveal, screenshot, bundle assembly, delivery, and
//! the metadata ledger entry. Degraded steps are absorbed into the record;
//! only an unobtainable page or a delivery that ships nothing abort the run.

use chrono::Utc;
use itertools::Itertools;
use rusqlite::Connection;
use scraper::Html;

use crate::bundle::{self, BundleMeta, DeliveryReport};
use crate::error::CaptureError;
use crate::extract::contact::ContactReport;
use crate::extract::{self, ProfileFields, SiteKind};
use crate::page::{PageSession, ViewCamera};
use crate::reveal;
use crate::settings::Settings;
use crate::sink::ArtifactSink;
use crate::store;

/// Everything one capture run learned about a page.
#[derive(Debug)]
pub struct ProfileRecord {
    pub site: SiteKind,
    pub url: String,
    pub fields: ProfileFields,
    pub contact: ContactReport,
    pub page_snapshot: String,
    pub screenshot: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct CaptureResult {
    pub profile_name: String,
    pub bundle_path: String,
    pub artifacts_written: Vec<String>,
    pub artifacts_failed: Vec<(String, String)>,
    pub contact_status: String,
    pub fields_located: usize,
}

pub struct Capturer<'a> {
    session_id: String,
    sequence: u32,
    settings: &'a Settings,
    conn: &'a Connection,
}

impl<'a> Capturer<'a> {
    pub fn new(settings: &'a Settings, conn: &'a Connection) -> Self {
        Capturer {
            session_id: Utc::now().timestamp_millis().to_string(),
            sequence: 0,
            settings,
            conn,
        }
    }

    /// Runs one capture against an open page. `site_hint` overrides URL
    /// based detection when the caller knows better.
    pub async fn capture(
        &mut self,
        page: &dyn PageSession,
        camera: &dyn ViewCamera,
        sink: &dyn ArtifactSink,
        site_hint: Option<SiteKind>,
    ) -> Result<CaptureResult, CaptureError> {
        self.sequence += 1;
        let now = Utc::now();

        // Ledger upkeep rides along with every capture.
        if let Err(e) = store::sweep_expired(self.conn, now) {
            tracing::warn!(error = %e, "opportunistic sweep failed");
        }

        let url = match page.url().await {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(error = %e, "page url unavailable");
                String::new()
            }
        };
        let site = site_hint.unwrap_or_else(|| SiteKind::detect(&url));
        tracing::info!(
            site = site.label(),
            url = %url,
            capture = self.sequence,
            "capture started"
        );

        let snapshot =
            page.content()
                .await
                .map_err(|e| CaptureError::NoRecordProducible {
                    reason: format!("page content unobtainable: {e}"),
                })?;

        let fields = {
            let html = Html::parse_document(&snapshot);
            extract::extract_fields(site, &html)
        };
        let profile_name = sanitize_name(fields.name.as_deref().unwrap_or(""));

        let outcome = reveal::run(page, site, self.settings).await;
        tracing::info!(
            terminal = ?outcome.terminal,
            status = outcome.report.status.label(),
            "reveal workflow finished"
        );

        // The reveal may have mutated the DOM; prefer a fresh snapshot and
        // fall back to the pre-reveal one.
        let page_snapshot = match page.content().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "post-reveal snapshot failed, keeping earlier one");
                snapshot
            }
        };

        let screenshot = match camera.capture_png().await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "screenshot failed, continuing without");
                None
            }
        };

        let record = ProfileRecord {
            site,
            url,
            fields,
            contact: outcome.report,
            page_snapshot,
            screenshot,
        };
        let meta = BundleMeta {
            session_id: self.session_id.clone(),
            capture_number: self.sequence,
            captured_at: now,
            profile_name: profile_name.clone(),
        };

        let bundle =
            bundle::assemble(&record, &meta).map_err(|e| CaptureError::BundleDeliveryFailure {
                reason: format!("assembly: {e}"),
            })?;

        let report = bundle::submit_all(&bundle, sink).await;
        if report.written.is_empty() {
            return Err(CaptureError::BundleDeliveryFailure {
                reason: delivery_failure_reason(&report),
            });
        }
        for (name, err) in &report.failed {
            tracing::warn!(artifact = %name, error = %err, "bundle delivered without artifact");
        }

        let entry = store::MetadataEntry::new(
            profile_name.clone(),
            site.label().to_string(),
            record.url.clone(),
            bundle.base_path.clone(),
            now,
            self.settings.retention(),
        );
        if let Err(e) = store::put_entry(self.conn, &entry) {
            tracing::warn!(error = %e, "metadata entry not recorded");
        }

        Ok(CaptureResult {
            profile_name,
            bundle_path: bundle.base_path,
            artifacts_written: report.written,
            artifacts_failed: report.failed,
            contact_status: record.contact.status.label(),
            fields_located: record.fields.located_count(),
        })
    }
}

fn delivery_failure_reason(report: &DeliveryReport) -> String {
    if report.failed.is_empty() {
        return "no artifacts produced".to_string();
    }
    report
        .failed
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .join("; ")
}

/// Folder-safe profile name: alphanumerics and spaces only, runs of
/// whitespace become single underscores, capped at 50 chars. Anything that
/// sanitizes to nothing becomes `Unknown`.
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let capped: String = joined.chars().take(50).collect();
    if capped.is_empty() {
        "Unknown".to_string()
    } else {
        capped
    }
}
