//! Interactive reveal workflow. Contact details live behind an in-page
//! trigger; this module clicks it, waits for the panel to render, extracts,
//! and always dismisses the panel afterwards so the page is left usable.

use scraper::Html;

use crate::extract::contact::{self, ContactDetails, ContactReport, ContactStatus};
use crate::extract::{chains, SiteKind};
use crate::page::PageSession;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Triggering,
    AwaitingRender,
    Extracting,
    Dismissing,
    Done,
    SkippedNoTrigger,
    FailedTimeout,
}

#[derive(Debug)]
pub struct RevealOutcome {
    pub terminal: RevealState,
    pub report: ContactReport,
}

/// Runs the workflow to a terminal state. Never returns an error: every
/// failure mode maps to a terminal state and a contact status, and any run
/// that reached the rendered panel dismisses it exactly once on the way out.
pub async fn run(page: &dyn PageSession, site: SiteKind, settings: &Settings) -> RevealOutcome {
    let mut state = RevealState::Idle;
    let mut status = ContactStatus::NotFound;
    let mut details = ContactDetails::default();
    let mut timed_out = false;

    loop {
        state = match state {
            RevealState::Idle => RevealState::Triggering,

            RevealState::Triggering => {
                match first_present(page, chains::trigger_selectors(site)).await {
                    Some(trigger) => match page.click(&trigger).await {
                        Ok(()) => RevealState::AwaitingRender,
                        Err(e) => {
                            tracing::warn!(selector = %trigger, error = %e, "trigger click failed");
                            RevealState::SkippedNoTrigger
                        }
                    },
                    None => RevealState::SkippedNoTrigger,
                }
            }

            RevealState::AwaitingRender => {
                let mut rendered = false;
                for _ in 0..settings.max_poll_attempts {
                    if first_present(page, chains::PANEL).await.is_some() {
                        rendered = true;
                        break;
                    }
                    tokio::time::sleep(settings.poll_interval()).await;
                }
                if rendered {
                    // Give the panel body a beat to fill in.
                    tokio::time::sleep(settings.settle()).await;
                    RevealState::Extracting
                } else {
                    tracing::warn!(site = site.label(), "reveal panel never rendered");
                    status = ContactStatus::Timeout;
                    timed_out = true;
                    RevealState::Dismissing
                }
            }

            RevealState::Extracting => {
                match page.content().await {
                    Ok(snapshot) => {
                        let html = Html::parse_document(&snapshot);
                        if let Some(panel) = contact::find_panel(&html) {
                            let denied = contact::access_denied(panel);
                            let (found, errors) = contact::extract_from_panel(panel);
                            status = if !found.is_empty() {
                                ContactStatus::Populated
                            } else if denied {
                                ContactStatus::AccessDenied
                            } else if !errors.is_empty() {
                                ContactStatus::ExtractionError(errors.join("; "))
                            } else {
                                ContactStatus::NotFound
                            };
                            details = found;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "snapshot for panel extraction failed");
                        status = ContactStatus::ExtractionError(e.to_string());
                    }
                }
                RevealState::Dismissing
            }

            RevealState::Dismissing => {
                dismiss(page).await;
                tokio::time::sleep(settings.settle()).await;
                if timed_out {
                    RevealState::FailedTimeout
                } else {
                    RevealState::Done
                }
            }

            terminal @ (RevealState::Done
            | RevealState::SkippedNoTrigger
            | RevealState::FailedTimeout) => {
                return RevealOutcome {
                    terminal,
                    report: ContactReport { status, details },
                };
            }
        };

        // Pages without a trigger still surface whatever sits inline.
        if state == RevealState::SkippedNoTrigger && details.is_empty() {
            if let Ok(snapshot) = page.content().await {
                let html = Html::parse_document(&snapshot);
                details = contact::extract_inline(site, &html);
            }
            status = if details.is_empty() {
                ContactStatus::NotFound
            } else {
                ContactStatus::Populated
            };
        }
    }
}

/// First selector from the list that matches on the live page. Probe errors
/// count as absent.
async fn first_present(page: &dyn PageSession, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        match page.exists(raw).await {
            Ok(true) => return Some((*raw).to_string()),
            Ok(false) => {}
            Err(e) => tracing::warn!(selector = raw, error = %e, "selector probe failed"),
        }
    }
    None
}

/// Closes the panel through its dismiss button, or Escape when no button is
/// reachable.
async fn dismiss(page: &dyn PageSession) {
    if let Some(button) = first_present(page, chains::DISMISS).await {
        match page.click(&button).await {
            Ok(()) => return,
            Err(e) => tracing::warn!(selector = %button, error = %e, "dismiss click failed"),
        }
    }
    if let Err(e) = page.press_escape().await {
        tracing::warn!(error = %e, "escape fallback failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture, test_settings, FakePage};

    #[tokio::test]
    async fn revealed_panel_reaches_done_with_details() {
        let page = FakePage::new(&fixture("linkedin_modern"))
            .with_trigger("a[href*=\"overlay/contact-info\"]")
            .with_revealed(&fixture("linkedin_contact_modal"));
        let settings = test_settings();

        let outcome = run(&page, SiteKind::Linkedin, &settings).await;

        assert_eq!(outcome.terminal, RevealState::Done);
        assert_eq!(outcome.report.status, ContactStatus::Populated);
        assert_eq!(
            outcome.report.details.email.as_deref(),
            Some("jordan.rivera@nimbus.dev")
        );
        assert_eq!(page.dismiss_actions(), 1);
    }

    #[tokio::test]
    async fn render_timeout_still_dismisses_exactly_once() {
        let page = FakePage::new(&fixture("linkedin_modern"))
            .with_trigger("a[href*=\"overlay/contact-info\"]")
            .with_revealed(&fixture("linkedin_contact_modal"))
            .with_render_delay(u32::MAX);
        let settings = test_settings();

        let outcome = run(&page, SiteKind::Linkedin, &settings).await;

        assert_eq!(outcome.terminal, RevealState::FailedTimeout);
        assert_eq!(outcome.report.status, ContactStatus::Timeout);
        assert!(outcome.report.details.is_empty());
        assert_eq!(page.dismiss_actions(), 1);
    }

    #[tokio::test]
    async fn delayed_render_is_polled_through() {
        let page = FakePage::new(&fixture("linkedin_modern"))
            .with_trigger("a[href*=\"overlay/contact-info\"]")
            .with_revealed(&fixture("linkedin_contact_modal"))
            .with_render_delay(3);
        let settings = test_settings();

        let outcome = run(&page, SiteKind::Linkedin, &settings).await;

        assert_eq!(outcome.terminal, RevealState::Done);
        assert_eq!(outcome.report.status, ContactStatus::Populated);
    }

    #[tokio::test]
    async fn missing_trigger_falls_back_to_inline_extraction() {
        let page = FakePage::new(&fixture("google_contact"))
            .with_url("https://contacts.google.com/person/c42");
        let settings = test_settings();

        let outcome = run(&page, SiteKind::GoogleContacts, &settings).await;

        assert_eq!(outcome.terminal, RevealState::SkippedNoTrigger);
        assert_eq!(outcome.report.status, ContactStatus::Populated);
        assert_eq!(
            outcome.report.details.email.as_deref(),
            Some("priya.sharma@example.org")
        );
        assert_eq!(page.dismiss_actions(), 0);
    }

    #[tokio::test]
    async fn missing_trigger_without_inline_data_is_not_found() {
        let page = FakePage::new(&fixture("linkedin_legacy"));
        let settings = test_settings();

        let outcome = run(&page, SiteKind::Linkedin, &settings).await;

        assert_eq!(outcome.terminal, RevealState::SkippedNoTrigger);
        assert_eq!(outcome.report.status, ContactStatus::NotFound);
        assert!(outcome.report.details.is_empty());
        assert_eq!(page.dismiss_actions(), 0);
    }

    #[tokio::test]
    async fn denied_panel_reports_access_denied_and_dismisses() {
        let page = FakePage::new(&fixture("linkedin_modern"))
            .with_trigger("a[href*=\"overlay/contact-info\"]")
            .with_revealed(&fixture("linkedin_denied_modal"));
        let settings = test_settings();

        let outcome = run(&page, SiteKind::Linkedin, &settings).await;

        assert_eq!(outcome.terminal, RevealState::Done);
        assert_eq!(outcome.report.status, ContactStatus::AccessDenied);
        assert!(outcome.report.details.is_empty());
        assert_eq!(page.dismiss_actions(), 1);
    }
}
