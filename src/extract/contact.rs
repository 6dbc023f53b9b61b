//! Contact detail extraction. Three independent strategies run over the
//! reveal panel and merge first-writer-wins, so a layout change that breaks
//! one strategy degrades the result instead of zeroing it.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use super::{chains, SiteKind};
use crate::selectors::{attr_rule, element_text, SelectorChain};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap());
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s().\-]{6,}\d").unwrap());
static YEAR_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}\s*-\s*\d{4}$").unwrap());

static TEL_HREF: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new("phone", &[attr_rule("a[href^=\"tel:\"]", "href")]));

// ── Outcome types ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactStatus {
    Populated,
    NotFound,
    Timeout,
    AccessDenied,
    ExtractionError(String),
}

impl ContactStatus {
    pub fn label(&self) -> String {
        match self {
            ContactStatus::Populated => "populated".into(),
            ContactStatus::NotFound => "not-found".into(),
            ContactStatus::Timeout => "timeout".into(),
            ContactStatus::AccessDenied => "access-denied".into(),
            ContactStatus::ExtractionError(detail) => format!("extraction-error: {detail}"),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ContactDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub websites: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
}

impl ContactDetails {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.profile_url.is_none()
            && self.websites.is_empty()
            && self.birthday.is_none()
    }

    /// Fills only the holes; values already present stay.
    pub fn absorb(&mut self, other: ContactDetails) {
        if self.email.is_none() {
            self.email = other.email;
        }
        if self.phone.is_none() {
            self.phone = other.phone;
        }
        if self.profile_url.is_none() {
            self.profile_url = other.profile_url;
        }
        if self.websites.is_empty() {
            self.websites = other.websites;
        }
        if self.birthday.is_none() {
            self.birthday = other.birthday;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContactReport {
    pub status: ContactStatus,
    pub details: ContactDetails,
}

// ── Panel extraction ──

type Strategy = fn(ElementRef<'_>) -> anyhow::Result<ContactDetails>;

const PANEL_STRATEGIES: &[(&str, Strategy)] = &[
    ("labelled-sections", labelled_sections),
    ("text-patterns", text_patterns),
    ("header-walk", header_walk),
];

// Free-text patterns stay out of the inline set: over a whole page they
// misread date ranges as phone numbers.
const INLINE_STRATEGIES: &[(&str, Strategy)] = &[
    ("labelled-sections", labelled_sections),
    ("header-walk", header_walk),
];

/// Locates the reveal panel in a page snapshot.
pub fn find_panel(html: &Html) -> Option<ElementRef<'_>> {
    for raw in chains::PANEL {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(panel) = html.select(&selector).next() {
            return Some(panel);
        }
    }
    None
}

/// Runs every panel strategy, merging results in strategy order. A failing
/// strategy is reported and skipped; the rest still run.
pub fn extract_from_panel(panel: ElementRef<'_>) -> (ContactDetails, Vec<String>) {
    run_strategies(panel, PANEL_STRATEGIES)
}

/// Extraction for pages that carry contact data inline, without a reveal
/// step. Structural strategies only, run over the page root.
pub fn extract_inline(site: SiteKind, html: &Html) -> ContactDetails {
    let mut details = ContactDetails::default();

    if site == SiteKind::GoogleContacts {
        details.phone = TEL_HREF
            .first_match(html.root_element())
            .map(|href| href.trim_start_matches("tel:").trim().to_string())
            .filter(|t| !t.is_empty());
    }

    let (found, _errors) = run_strategies(html.root_element(), INLINE_STRATEGIES);
    details.absorb(found);
    details
}

/// True when the panel carries a sign-in or upsell wall instead of data.
pub fn access_denied(el: ElementRef<'_>) -> bool {
    const DENIED_MARKERS: &[&str] = &["sign in", "join now", "upgrade to premium"];
    let text = element_text(el).to_lowercase();
    DENIED_MARKERS.iter().any(|m| text.contains(m))
}

fn run_strategies(
    root: ElementRef<'_>,
    strategies: &[(&str, Strategy)],
) -> (ContactDetails, Vec<String>) {
    let mut merged = ContactDetails::default();
    let mut errors = Vec::new();
    for (name, strategy) in strategies {
        match strategy(root) {
            Ok(found) => merged.absorb(found),
            Err(e) => {
                tracing::warn!(strategy = name, error = %e, "contact strategy failed");
                errors.push(format!("{name}: {e}"));
            }
        }
    }
    (merged, errors)
}

fn sel(raw: &str) -> anyhow::Result<Selector> {
    Selector::parse(raw).map_err(|e| anyhow::anyhow!("selector `{raw}`: {e}"))
}

// ── Strategies ──

/// Typed sections: each contact kind renders as a section with an `<h3>`
/// label and a value span (or links) beside it.
fn labelled_sections(root: ElementRef<'_>) -> anyhow::Result<ContactDetails> {
    let mut details = ContactDetails::default();

    let mailto = sel("a[href^=\"mailto:\"]")?;
    if let Some(a) = root.select(&mailto).next() {
        if let Some(href) = a.value().attr("href") {
            let addr = href.trim_start_matches("mailto:");
            let addr = addr.split('?').next().unwrap_or(addr).trim();
            if !addr.is_empty() {
                details.email = Some(addr.to_string());
            }
        }
    }

    let h3 = sel("h3")?;
    let value_span = sel(".t-14.t-black.t-normal")?;
    let anchor = sel("a[href]")?;
    for header in root.select(&h3) {
        let label = element_text(header);
        let Some(section) = closest_contact_section(header) else {
            continue;
        };
        if label.contains("Phone") && details.phone.is_none() {
            details.phone = section
                .select(&value_span)
                .map(element_text)
                .find(|t| !t.is_empty());
        } else if label.contains("Website") && details.websites.is_empty() {
            details.websites = external_links(section, &anchor);
        } else if label.contains("Birthday") && details.birthday.is_none() {
            details.birthday = section
                .select(&value_span)
                .map(element_text)
                .find(|t| !t.is_empty())
                .or_else(|| text_without_label(section, &label));
        }
    }

    let profile = sel("a[href*=\"linkedin.com/in/\"]")?;
    if let Some(a) = root.select(&profile).next() {
        details.profile_url = a.value().attr("href").map(str::to_string);
    }

    Ok(details)
}

/// Free-text patterns over the panel's visible text.
fn text_patterns(root: ElementRef<'_>) -> anyhow::Result<ContactDetails> {
    let text = element_text(root);
    Ok(ContactDetails {
        email: EMAIL_RE.find(&text).map(|m| m.as_str().to_string()),
        phone: first_plausible_phone(&text),
        ..ContactDetails::default()
    })
}

/// Generic traversal: small headers whose text names a contact kind, value
/// read from the surrounding block.
fn header_walk(root: ElementRef<'_>) -> anyhow::Result<ContactDetails> {
    let headers = sel("h2, h3, h4, strong")?;
    let anchor = sel("a[href]")?;
    let mut details = ContactDetails::default();

    for header in root.select(&headers) {
        let key = element_text(header).to_lowercase();
        let Some(block) = header.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let block_text = element_text(block);

        if key.contains("email") && details.email.is_none() {
            details.email = EMAIL_RE.find(&block_text).map(|m| m.as_str().to_string());
        } else if key.contains("phone") && details.phone.is_none() {
            details.phone = first_plausible_phone(&block_text);
        } else if key.contains("website") && details.websites.is_empty() {
            details.websites = external_links(block, &anchor);
        } else if key.contains("birthday") && details.birthday.is_none() {
            details.birthday = text_without_label(block, &element_text(header));
        } else if key.contains("profile") && details.profile_url.is_none() {
            details.profile_url = block
                .select(&anchor)
                .filter_map(|a| a.value().attr("href"))
                .find(|href| href.contains("linkedin.com/in/"))
                .map(str::to_string);
        }
    }
    Ok(details)
}

// ── Shared readers ──

/// Phone candidates must keep at least seven digits, and a pair of years
/// joined by a dash is an employment range, not a number.
fn first_plausible_phone(text: &str) -> Option<String> {
    PHONE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .find(|c| {
            c.chars().filter(char::is_ascii_digit).count() >= 7 && !YEAR_RANGE_RE.is_match(c)
        })
}

fn external_links(scope: ElementRef<'_>, anchor: &Selector) -> Vec<String> {
    scope
        .select(anchor)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with("http") && !href.contains("linkedin.com"))
        .map(str::to_string)
        .unique()
        .collect()
}

fn text_without_label(scope: ElementRef<'_>, label: &str) -> Option<String> {
    let rest = element_text(scope).replace(label, "");
    let rest = rest.trim().to_string();
    (!rest.is_empty()).then_some(rest)
}

fn closest_contact_section(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors().filter_map(ElementRef::wrap).find(|a| {
        a.value().attr("class").is_some_and(|c| {
            c.split_whitespace()
                .any(|k| k == "pv-contact-info__contact-type")
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fixture;

    #[test]
    fn panel_extraction_reads_all_labelled_sections() {
        let html = Html::parse_document(&fixture("linkedin_contact_modal"));
        let panel = find_panel(&html).unwrap();
        let (details, errors) = extract_from_panel(panel);

        assert!(errors.is_empty());
        assert_eq!(details.email.as_deref(), Some("jordan.rivera@nimbus.dev"));
        assert_eq!(details.phone.as_deref(), Some("+351 912 555 010"));
        assert!(details
            .profile_url
            .as_deref()
            .unwrap()
            .contains("linkedin.com/in/jordan-rivera"));
        assert_eq!(
            details.websites,
            vec!["https://nimbus.dev", "https://jordanrivera.io"]
        );
        assert_eq!(details.birthday.as_deref(), Some("May 14"));
    }

    #[test]
    fn mailto_query_string_is_stripped() {
        let html = Html::parse_document(
            r#"<div><a href="mailto:a@b.co?subject=hello">email me</a></div>"#,
        );
        let details = labelled_sections(html.root_element()).unwrap();
        assert_eq!(details.email.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn phone_pattern_rejects_year_ranges() {
        assert!(first_plausible_phone("Jan 2019 - 2024 at Acme").is_none());
        assert_eq!(
            first_plausible_phone("call +44 20 7946 0958 today").as_deref(),
            Some("+44 20 7946 0958")
        );
    }

    #[test]
    fn header_walk_reads_generic_blocks() {
        let html = Html::parse_document(
            r#"<div>
                 <div><h4>Email</h4><p>pat@example.net</p></div>
                 <div><h4>Birthday</h4><p>March 3</p></div>
               </div>"#,
        );
        let details = header_walk(html.root_element()).unwrap();
        assert_eq!(details.email.as_deref(), Some("pat@example.net"));
        assert_eq!(details.birthday.as_deref(), Some("March 3"));
    }

    #[test]
    fn denied_panel_is_detected_and_empty() {
        let html = Html::parse_document(&fixture("linkedin_denied_modal"));
        let panel = find_panel(&html).unwrap();
        assert!(access_denied(panel));
        let (details, _) = extract_from_panel(panel);
        assert!(details.is_empty());
    }

    #[test]
    fn inline_extraction_reads_google_contact_page() {
        let html = Html::parse_document(&fixture("google_contact"));
        let details = extract_inline(SiteKind::GoogleContacts, &html);
        assert_eq!(details.email.as_deref(), Some("priya.sharma@example.org"));
        assert_eq!(details.phone.as_deref(), Some("+14155550123"));
    }

    #[test]
    fn absorb_keeps_first_writer() {
        let mut first = ContactDetails {
            email: Some("keep@ex.co".into()),
            ..ContactDetails::default()
        };
        first.absorb(ContactDetails {
            email: Some("drop@ex.co".into()),
            phone: Some("+1 202 555 0100".into()),
            ..ContactDetails::default()
        });
        assert_eq!(first.email.as_deref(), Some("keep@ex.co"));
        assert_eq!(first.phone.as_deref(), Some("+1 202 555 0100"));
    }

    #[test]
    fn status_labels_are_stable() {
        assert_eq!(ContactStatus::Populated.label(), "populated");
        assert_eq!(ContactStatus::NotFound.label(), "not-found");
        assert_eq!(ContactStatus::Timeout.label(), "timeout");
        assert_eq!(ContactStatus::AccessDenied.label(), "access-denied");
        assert_eq!(
            ContactStatus::ExtractionError("boom".into()).label(),
            "extraction-error: boom"
        );
    }
}
