use itertools::Itertools;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};

/// Where a rule reads its value from once the selector matched.
#[derive(Debug, Clone, Copy)]
pub enum Source {
    Text,
    Attr(&'static str),
}

/// Accept/reject check applied to a candidate before the rule counts as a hit.
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    MaxLen(usize),
    RejectContains(&'static str),
    RequireContains(&'static str),
}

impl Validator {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Validator::MaxLen(n) => value.chars().count() < *n,
            Validator::RejectContains(marker) => !value.contains(marker),
            Validator::RequireContains(marker) => value.contains(marker),
        }
    }
}

/// One ranked rule of a chain, before compilation.
pub struct RuleSpec {
    pub selector: &'static str,
    pub source: Source,
    pub validators: &'static [Validator],
}

pub const fn rule(selector: &'static str) -> RuleSpec {
    RuleSpec {
        selector,
        source: Source::Text,
        validators: &[],
    }
}

pub const fn rule_v(selector: &'static str, validators: &'static [Validator]) -> RuleSpec {
    RuleSpec {
        selector,
        source: Source::Text,
        validators,
    }
}

pub const fn attr_rule(selector: &'static str, attr: &'static str) -> RuleSpec {
    RuleSpec {
        selector,
        source: Source::Attr(attr),
        validators: &[],
    }
}

struct FieldRule {
    raw: &'static str,
    selector: Selector,
    source: Source,
    validators: &'static [Validator],
}

impl FieldRule {
    fn read(&self, el: ElementRef<'_>) -> Option<String> {
        let value = match self.source {
            Source::Text => element_text(el),
            Source::Attr(name) => el.value().attr(name)?.trim().to_string(),
        };
        (!value.is_empty()).then_some(value)
    }

    fn validates(&self, value: &str) -> bool {
        self.validators.iter().all(|v| v.accepts(value))
    }
}

/// Ranked list of (selector, validators) rules for one logical field. Layout
/// generations still seen in the wild each contribute a rule; rule order is
/// priority.
pub struct SelectorChain {
    field: &'static str,
    rules: Vec<FieldRule>,
}

impl SelectorChain {
    /// Compiles the rule specs, skipping any selector that fails to parse.
    /// A chain of zero valid rules is legal and simply never matches.
    pub fn new(field: &'static str, specs: &[RuleSpec]) -> Self {
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            match Selector::parse(spec.selector) {
                Ok(selector) => rules.push(FieldRule {
                    raw: spec.selector,
                    selector,
                    source: spec.source,
                    validators: spec.validators,
                }),
                Err(e) => warn!("skipping selector '{}' for {}: {}", spec.selector, field, e),
            }
        }
        SelectorChain { field, rules }
    }

    /// Single-value policy: the first rule whose first match yields a
    /// non-empty, valid candidate wins. A rejected candidate moves on to the
    /// next rule, not the next element.
    pub fn first_match(&self, root: ElementRef<'_>) -> Option<String> {
        for rule in &self.rules {
            let Some(el) = root.select(&rule.selector).next() else {
                continue;
            };
            let Some(value) = rule.read(el) else {
                continue;
            };
            if rule.validates(&value) {
                debug!("{} matched via '{}'", self.field, rule.raw);
                return Some(value);
            }
        }
        None
    }

    /// Multi-value policy: the union of every rule's valid candidates, order
    /// preserving, duplicates removed.
    pub fn collect_all(&self, root: ElementRef<'_>) -> Vec<String> {
        self.rules
            .iter()
            .flat_map(|rule| {
                root.select(&rule.selector)
                    .filter_map(|el| rule.read(el))
                    .filter(|value| rule.validates(value))
                    .collect::<Vec<_>>()
            })
            .unique()
            .collect()
    }
}

/// Element text with whitespace squashed to single spaces.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().flat_map(str::split_whitespace).join(" ")
}

// ── Tests ──
