//! Export bundle assembly and delivery. A capture becomes a fixed-order set
//! of artifacts under one dated folder. Delivery is append-only: a failed
//! artifact is recorded and skipped, never rolled back.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::capture::ProfileRecord;
use crate::sink::ArtifactSink;

#[derive(Debug, Clone)]
pub struct BundleMeta {
    pub session_id: String,
    pub capture_number: u32,
    pub captured_at: DateTime<Utc>,
    pub profile_name: String,
}

#[derive(Debug)]
pub struct Artifact {
    pub name: &'static str,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
pub struct ExportBundle {
    /// Folder the artifacts land under, relative to the sink root:
    /// `ProfileCapture_<date>/<name>_<time>`.
    pub base_path: String,
    pub artifacts: Vec<Artifact>,
}

/// Builds the bundle in its fixed artifact order. The screenshot slot is
/// omitted when no screenshot was captured; every other artifact is always
/// present, even for an empty record.
pub fn assemble(record: &ProfileRecord, meta: &BundleMeta) -> anyhow::Result<ExportBundle> {
    let base_path = format!(
        "ProfileCapture_{}/{}_{}",
        meta.captured_at.format("%Y%m%d"),
        meta.profile_name,
        meta.captured_at.format("%H%M%S"),
    );

    let metadata = json!({
        "url": record.url,
        "timestamp": meta.captured_at.to_rfc3339(),
        "site_type": record.site.label(),
        "session_id": meta.session_id,
        "capture_number": meta.capture_number,
        "profile_name": meta.profile_name,
        "contact_status": record.contact.status.label(),
        "fields_located": record.fields.located_count(),
        "screenshot_included": record.screenshot.is_some(),
    });

    let extracted = json!({
        "fields": record.fields,
        "contact_info": record.contact.details,
    });

    let mut artifacts = vec![
        Artifact {
            name: "metadata.json",
            payload: serde_json::to_vec_pretty(&metadata)?,
        },
        Artifact {
            name: "extracted_data.json",
            payload: serde_json::to_vec_pretty(&extracted)?,
        },
        Artifact {
            name: "full_page.html",
            payload: record.page_snapshot.clone().into_bytes(),
        },
    ];
    if let Some(shot) = &record.screenshot {
        artifacts.push(Artifact {
            name: "screenshot.png",
            payload: shot.clone(),
        });
    }
    artifacts.push(Artifact {
        name: "parsing_guide.md",
        payload: parsing_guide(record, meta).into_bytes(),
    });

    Ok(ExportBundle {
        base_path,
        artifacts,
    })
}

/// Human-readable companion file describing what landed in the folder and
/// where to look when a field is missing.
fn parsing_guide(record: &ProfileRecord, meta: &BundleMeta) -> String {
    let mut lines = vec![
        format!("# Capture guide: {}", meta.profile_name),
        String::new(),
        format!(
            "Captured {} from <{}> ({} page).",
            meta.captured_at.to_rfc3339(),
            record.url,
            record.site.label()
        ),
        format!(
            "Session {}, capture #{}.",
            meta.session_id, meta.capture_number
        ),
        String::new(),
        "## Files".to_string(),
        String::new(),
        "- `metadata.json`: capture provenance (source URL, timestamp, session id).".to_string(),
        "- `extracted_data.json`: structured profile fields plus contact info.".to_string(),
        "- `full_page.html`: rendered page snapshot; re-parse it when a field below is missing."
            .to_string(),
    ];
    if record.screenshot.is_some() {
        lines.push("- `screenshot.png`: visible tab at capture time.".to_string());
    }
    lines.push("- `parsing_guide.md`: this file.".to_string());
    lines.push(String::new());
    lines.push("## Extraction summary".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- Profile fields located: {}",
        record.fields.located_count()
    ));
    lines.push(format!(
        "- Contact info: {}",
        record.contact.status.label()
    ));
    if !record.fields.experience.is_empty() {
        lines.push(format!(
            "- Experience entries: {}",
            record.fields.experience.len()
        ));
    }
    if !record.fields.skills.is_empty() {
        lines.push(format!("- Skills: {}", record.fields.skills.join(", ")));
    }
    lines.push(String::new());
    lines.push(
        "Fields absent from `extracted_data.json` were not present in the page markup \
         at capture time."
            .to_string(),
    );
    lines.join("\n")
}

// ── Delivery ──

#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub written: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Writes every artifact in bundle order. A failed write is recorded and the
/// rest still go out; nothing already written is removed.
pub async fn submit_all(bundle: &ExportBundle, sink: &dyn ArtifactSink) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for artifact in &bundle.artifacts {
        let rel = format!("{}/{}", bundle.base_path, artifact.name);
        match sink.submit(&rel, &artifact.payload).await {
            Ok(receipt) => report.written.push(receipt.path),
            Err(e) => {
                tracing::warn!(artifact = artifact.name, error = %e, "artifact delivery failed");
                report
                    .failed
                    .push((artifact.name.to_string(), e.to_string()));
            }
        }
    }
    report
}
