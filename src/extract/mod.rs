//! Profile field extraction. Pure reads over a parsed document: a field that
//! is not in the markup is simply absent, never an error.

pub mod chains;
pub mod contact;
pub mod sections;

use scraper::Html;
use serde::Serialize;

// ── Site detection ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    Linkedin,
    GoogleContacts,
    Unknown,
}

impl SiteKind {
    pub fn detect(url: &str) -> Self {
        if url.contains("linkedin.com") {
            SiteKind::Linkedin
        } else if url.contains("contacts.google.com") {
            SiteKind::GoogleContacts
        } else {
            SiteKind::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SiteKind::Linkedin => "linkedin",
            SiteKind::GoogleContacts => "google-contacts",
            SiteKind::Unknown => "unknown",
        }
    }
}

// ── Extracted fields ──

#[derive(Debug, Default, Clone, Serialize)]
pub struct ProfileFields {
    pub name: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub about: Option<String>,
    pub connections: Option<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
    pub skills: Vec<String>,
}

impl ProfileFields {
    /// Number of fields that produced at least one value.
    pub fn located_count(&self) -> usize {
        [
            self.name.is_some(),
            self.headline.is_some(),
            self.location.is_some(),
            self.about.is_some(),
            self.connections.is_some(),
            !self.experience.is_empty(),
            !self.education.is_empty(),
            !self.skills.is_empty(),
        ]
        .into_iter()
        .filter(|&hit| hit)
        .count()
    }
}

/// Reads every profile field the site's chains and sections can produce.
pub fn extract_fields(site: SiteKind, html: &Html) -> ProfileFields {
    let chains = chains::site_chains(site);
    let root = html.root_element();

    let mut fields = ProfileFields {
        name: chains.name.first_match(root),
        headline: chains.headline.first_match(root),
        location: chains.location.first_match(root),
        connections: chains.connections.first_match(root),
        ..ProfileFields::default()
    };

    if site == SiteKind::Linkedin {
        fields.about =
            sections::find_section(html, chains::ABOUT_ANCHORS).and_then(sections::narrative_text);
        // Anchored sections first; pages without them fall back to the flat
        // list-item chains of the older layouts.
        fields.experience = sections::find_section(html, chains::EXPERIENCE_ANCHORS)
            .map(sections::item_entries)
            .unwrap_or_else(|| chains.experience_items.collect_all(root));
        fields.education = sections::find_section(html, chains::EDUCATION_ANCHORS)
            .map(sections::item_entries)
            .unwrap_or_else(|| chains.education_items.collect_all(root));
        fields.skills = sections::find_section(html, chains::SKILLS_ANCHORS)
            .map(sections::item_leads)
            .unwrap_or_else(|| chains.skill_items.collect_all(root));
    }

    tracing::debug!(
        site = site.label(),
        located = fields.located_count(),
        "field extraction finished"
    );
    fields
}
