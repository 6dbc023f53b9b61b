//! Built-in selector chains per supported site. Rule order is priority and
//! mirrors the layout generations the capture still has to cope with.

use std::sync::LazyLock;

use crate::selectors::{rule, rule_v, RuleSpec, SelectorChain, Validator};

pub struct SiteChains {
    pub name: SelectorChain,
    pub headline: SelectorChain,
    pub location: SelectorChain,
    pub connections: SelectorChain,
    /// Flat list-item chains for layout generations that predate the
    /// anchored profile sections.
    pub experience_items: SelectorChain,
    pub education_items: SelectorChain,
    pub skill_items: SelectorChain,
}

const LINKEDIN_NAME: &[RuleSpec] = &[
    rule("h1[data-anonymize=\"person-name\"]"),
    rule(".pv-text-details__left-panel h1"),
    rule("h1.break-words"),
    rule(".mt2 h1"),
];

// Headlines under 200 chars only; feed posts leaking into the top card tend
// to carry "hashtag" text.
const HEADLINE_VALIDATORS: &[Validator] =
    &[Validator::MaxLen(200), Validator::RejectContains("hashtag")];

const LINKEDIN_HEADLINE: &[RuleSpec] = &[
    rule_v(
        ".pv-text-details__left-panel .text-body-medium:first-child",
        HEADLINE_VALIDATORS,
    ),
    rule_v(
        ".pv-top-card--list .text-body-medium:first-child",
        HEADLINE_VALIDATORS,
    ),
    rule_v(".mt2 .text-body-medium", HEADLINE_VALIDATORS),
];

// The contact-info link renders with the same small-text classes as the
// locality line in some generations.
const LOCATION_VALIDATORS: &[Validator] = &[Validator::RejectContains("Contact info")];

const LINKEDIN_LOCATION: &[RuleSpec] = &[
    rule_v(
        ".pv-text-details__left-panel .text-body-small.inline.t-black--light",
        LOCATION_VALIDATORS,
    ),
    rule_v(
        "span.text-body-small.inline.t-black--light.break-words",
        LOCATION_VALIDATORS,
    ),
    rule_v(".mt2 .text-body-small.t-black--light", LOCATION_VALIDATORS),
];

const LINKEDIN_CONNECTIONS: &[RuleSpec] = &[
    rule_v(
        ".pv-top-card--list-bullet li",
        &[Validator::RequireContains("connection"), Validator::MaxLen(60)],
    ),
    rule_v(
        "li.text-body-small.t-black--light",
        &[Validator::RequireContains("connection"), Validator::MaxLen(60)],
    ),
];

const LINKEDIN_EXPERIENCE_ITEMS: &[RuleSpec] = &[
    rule(".experience-section .pv-entity__summary-info h3"),
    rule(".experience-section li h3"),
];

const LINKEDIN_EDUCATION_ITEMS: &[RuleSpec] = &[
    rule(".education-section .pv-entity__school-name"),
    rule(".education-section li h3"),
];

const LINKEDIN_SKILL_ITEMS: &[RuleSpec] = &[
    rule(".pv-skill-category-entity__name-text"),
    rule(".skills-section .pv-skill-entity__skill-name"),
];

pub static LINKEDIN: LazyLock<SiteChains> = LazyLock::new(|| SiteChains {
    name: SelectorChain::new("name", LINKEDIN_NAME),
    headline: SelectorChain::new("headline", LINKEDIN_HEADLINE),
    location: SelectorChain::new("location", LINKEDIN_LOCATION),
    connections: SelectorChain::new("connections", LINKEDIN_CONNECTIONS),
    experience_items: SelectorChain::new("experience", LINKEDIN_EXPERIENCE_ITEMS),
    education_items: SelectorChain::new("education", LINKEDIN_EDUCATION_ITEMS),
    skill_items: SelectorChain::new("skills", LINKEDIN_SKILL_ITEMS),
});

pub static GOOGLE_CONTACTS: LazyLock<SiteChains> = LazyLock::new(|| SiteChains {
    name: SelectorChain::new(
        "name",
        &[
            rule("[data-test-id=\"contact-details-name\"]"),
            rule("[role=\"main\"] h1"),
        ],
    ),
    headline: SelectorChain::new("headline", &[]),
    location: SelectorChain::new("location", &[]),
    connections: SelectorChain::new("connections", &[]),
    experience_items: SelectorChain::new("experience", &[]),
    education_items: SelectorChain::new("education", &[]),
    skill_items: SelectorChain::new("skills", &[]),
});

pub static GENERIC: LazyLock<SiteChains> = LazyLock::new(|| SiteChains {
    name: SelectorChain::new("name", &[rule("main h1"), rule("h1")]),
    headline: SelectorChain::new("headline", &[]),
    location: SelectorChain::new("location", &[]),
    connections: SelectorChain::new("connections", &[]),
    experience_items: SelectorChain::new("experience", &[]),
    education_items: SelectorChain::new("education", &[]),
    skill_items: SelectorChain::new("skills", &[]),
});

// ── Section anchors (in-page anchor div, climbed to the enclosing <section>) ──

pub const ABOUT_ANCHORS: &[&str] = &["#about"];
pub const EXPERIENCE_ANCHORS: &[&str] = &["#experience"];
pub const EDUCATION_ANCHORS: &[&str] = &["#education"];
pub const SKILLS_ANCHORS: &[&str] = &["#skills"];

// ── Live-page control selectors for the reveal workflow ──

pub const LINKEDIN_TRIGGER: &[&str] = &[
    "a[href*=\"overlay/contact-info\"]",
    "#top-card-text-details-contact-info",
];

pub const PANEL: &[&str] = &["[data-test-modal-container]", ".artdeco-modal-overlay"];

pub const DISMISS: &[&str] = &[".artdeco-modal__dismiss", "[data-test-modal-close-btn]"];

pub fn site_chains(site: super::SiteKind) -> &'static SiteChains {
    match site {
        super::SiteKind::Linkedin => &LINKEDIN,
        super::SiteKind::GoogleContacts => &GOOGLE_CONTACTS,
        super::SiteKind::Unknown => &GENERIC,
    }
}

pub fn trigger_selectors(site: super::SiteKind) -> &'static [&'static str] {
    match site {
        super::SiteKind::Linkedin => LINKEDIN_TRIGGER,
        // Contact data is inline on these pages; there is nothing to reveal.
        super::SiteKind::GoogleContacts | super::SiteKind::Unknown => &[],
    }
}
