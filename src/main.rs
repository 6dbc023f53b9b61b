mod browser;
mod bundle;
mod capture;
mod error;
mod extract;
mod page;
mod reveal;
mod selectors;
mod settings;
mod sink;
mod store;
#[cfg(test)]
mod testutil;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand};

use crate::browser::CdpSession;
use crate::capture::Capturer;
use crate::extract::SiteKind;
use crate::sink::{ArtifactSink, DiskSink};

#[derive(Parser)]
#[command(
    name = "profile_capture",
    about = "Profile page capture over the Chrome debug protocol"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture one profile page into an export bundle
    Capture {
        /// Profile page URL
        #[arg(long)]
        url: String,
        /// Force the site kind instead of detecting it from the URL
        /// (linkedin, google-contacts, unknown)
        #[arg(long)]
        site: Option<String>,
        /// Attach to a running browser (ws:// or http://host:9222) instead of launching one
        #[arg(long)]
        attach: Option<String>,
        /// Bundle output directory (default: from config)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Remove expired metadata entries from the store
    Sweep,
    /// List stored capture metadata
    List {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Also write a dated capture summary JSON under the output directory
        #[arg(long)]
        export: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Capture {
            url,
            site,
            attach,
            out_dir,
        } => cmd_capture(url, site, attach, out_dir).await,
        Commands::Sweep => cmd_sweep(),
        Commands::List { limit, export } => cmd_list(limit, export).await,
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

async fn cmd_capture(
    url: String,
    site: Option<String>,
    attach: Option<String>,
    out_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut settings = settings::load()?;
    if let Some(dir) = out_dir {
        settings.output_root = dir;
    }
    let site_hint = site.as_deref().map(parse_site).transpose()?;

    let conn = store::connect(&settings.store_path)?;
    let sink = DiskSink::new(settings.output_root.clone());

    let endpoint = attach.or_else(|| settings.attach_url.clone());
    let session = match &endpoint {
        Some(endpoint) => CdpSession::attach(endpoint, &url).await?,
        None => CdpSession::launch(&url).await?,
    };

    let mut capturer = Capturer::new(&settings, &conn);
    let outcome = capturer.capture(&session, &session, &sink, site_hint).await;
    drop(session);
    let result = outcome?;

    println!("Captured:  {}", result.profile_name);
    println!(
        "Bundle:    {}",
        settings.output_root.join(&result.bundle_path).display()
    );
    println!("Contact:   {}", result.contact_status);
    println!("Fields:    {} located", result.fields_located);
    println!("Artifacts: {} written", result.artifacts_written.len());
    for (name, err) in &result.artifacts_failed {
        println!("  failed: {} ({})", name, err);
    }
    Ok(())
}

fn cmd_sweep() -> anyhow::Result<()> {
    let settings = settings::load()?;
    let conn = store::connect(&settings.store_path)?;
    let removed = store::sweep_expired(&conn, chrono::Utc::now())?;
    let remaining = store::fetch_entries(&conn)?.len();
    println!("Swept {} expired entries ({} remaining).", removed, remaining);
    Ok(())
}

async fn cmd_list(limit: usize, export: bool) -> anyhow::Result<()> {
    let settings = settings::load()?;
    let conn = store::connect(&settings.store_path)?;
    let entries = store::fetch_entries(&conn)?;
    if entries.is_empty() {
        println!("No capture metadata stored.");
        return Ok(());
    }

    println!(
        "{:>3} | {:<24} | {:<16} | {:<19} | {:<40}",
        "#", "Profile", "Site", "Captured", "Folder"
    );
    println!("{}", "-".repeat(112));
    for (i, e) in entries.iter().take(limit).enumerate() {
        println!(
            "{:>3} | {:<24} | {:<16} | {:<19} | {:<40}",
            i + 1,
            truncate(&e.profile_name, 24),
            e.site,
            e.timestamp.format("%Y-%m-%d %H:%M:%S"),
            truncate(&e.folder_path, 40),
        );
    }
    println!("\n{} entries total", entries.len());

    if export {
        let summary: Vec<_> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.profile_name,
                    "site": e.site,
                    "url": e.url,
                    "folder": e.folder_path,
                    "captured_at": e.timestamp.to_rfc3339(),
                })
            })
            .collect();
        let name = format!(
            "profile_capture_summary_{}.json",
            chrono::Utc::now().format("%Y-%m-%d")
        );
        let sink = DiskSink::new(settings.output_root.clone());
        let receipt = sink.submit(&name, &serde_json::to_vec_pretty(&summary)?).await?;
        println!("Summary exported to {}", receipt.path);
    }
    Ok(())
}

fn parse_site(raw: &str) -> anyhow::Result<SiteKind> {
    match raw.to_lowercase().as_str() {
        "linkedin" => Ok(SiteKind::Linkedin),
        "google-contacts" | "google_contacts" | "contacts" => Ok(SiteKind::GoogleContacts),
        "unknown" => Ok(SiteKind::Unknown),
        other => bail!("unknown site kind '{other}' (expected linkedin, google-contacts, unknown)"),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
