//! Structural section readers. Profile pages hang an empty anchor div
//! (`#experience` and friends) just inside the `<section>` that actually
//! holds the content, so lookups climb from the anchor to the section and
//! read list items from there.
//!
//! Rendered lists duplicate every string in a `visually-hidden` span for
//! screen readers; reading only `aria-hidden="true"` spans keeps each value
//! once.

use std::sync::LazyLock;

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};

use crate::selectors::element_text;

static LI: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static HIDDEN_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span[aria-hidden=\"true\"]").unwrap());

/// Finds the `<section>` enclosing the first matching anchor.
pub fn find_section<'a>(html: &'a Html, anchors: &[&str]) -> Option<ElementRef<'a>> {
    for raw in anchors {
        let Ok(selector) = Selector::parse(raw) else {
            tracing::warn!(selector = raw, "invalid section anchor, skipping");
            continue;
        };
        if let Some(anchor) = html.select(&selector).next() {
            return enclosing_section(anchor);
        }
    }
    None
}

fn enclosing_section(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if el.value().name() == "section" {
        return Some(el);
    }
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "section")
}

/// One string per list item: the item's visible span texts joined with a
/// separator, or the squashed item text when no spans are present.
pub fn item_entries(section: ElementRef<'_>) -> Vec<String> {
    section
        .select(&LI)
        .filter_map(|li| {
            let parts: Vec<String> = li
                .select(&HIDDEN_SPAN)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .unique()
                .collect();
            let entry = if parts.is_empty() {
                element_text(li)
            } else {
                parts.join(" · ")
            };
            (!entry.is_empty()).then_some(entry)
        })
        .unique()
        .collect()
}

/// The first visible span per list item. Skill lists carry an endorsement
/// count in their trailing spans, so only the lead span names the skill.
pub fn item_leads(section: ElementRef<'_>) -> Vec<String> {
    section
        .select(&LI)
        .filter_map(|li| {
            li.select(&HIDDEN_SPAN)
                .map(element_text)
                .find(|t| !t.is_empty())
        })
        .unique()
        .collect()
}

/// The longest visible span outside any heading. About sections keep their
/// body copy in one such span next to the "About" header span.
pub fn narrative_text(section: ElementRef<'_>) -> Option<String> {
    section
        .select(&HIDDEN_SPAN)
        .filter(|span| {
            !span
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| matches!(a.value().name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
        })
        .map(element_text)
        .filter(|t| !t.is_empty())
        .max_by_key(String::len)
}
