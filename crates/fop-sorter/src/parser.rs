use std::ops::Range;

use fop_core::selector::canonicalize;
use fop_core::types::{
    canonical_domains, canonical_options, ElementRule, FilterRule, OptionToken, Rule, Separator,
    ALLOWLIST_PREFIX, DOMAIN_OPTION, ELEMENT_DOMAIN_SEPARATOR, ELEMENT_FORBIDDEN,
    FILTER_DOMAIN_SEPARATOR,
};

/// Upper bound on re-tidying a line whose first tidy changed its grammar.
const MAX_TIDY_PASSES: usize = 4;

/// Grammar a raw line was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMatch<'a> {
    /// `domains##selector` or `domains#@#selector`
    Element {
        domains: &'a str,
        separator: Separator,
        selector: &'a str,
    },
    /// `body$option,option`
    Filter { body: &'a str, options: &'a str },
    /// Anything else; tidied as an opaque filter body.
    Plain(&'a str),
}

impl LineMatch<'_> {
    pub fn is_element(&self) -> bool {
        matches!(self, LineMatch::Element { .. })
    }
}

pub fn classify(line: &str) -> LineMatch<'_> {
    if let Some(element) = match_element(line) {
        return element;
    }
    match split_rule_options(line) {
        Some((body, options)) => LineMatch::Filter { body, options },
        None => LineMatch::Plain(line),
    }
}

/// Tidy one raw line into its canonical rule.
pub fn tidy(line: &str) -> Rule {
    match classify(line) {
        LineMatch::Element {
            domains,
            separator,
            selector,
        } => Rule::Element(tidy_element(domains, separator, selector)),
        LineMatch::Filter { body, options } => Rule::Filter(tidy_filter(line, body, options)),
        LineMatch::Plain(text) => Rule::Filter(FilterRule::plain(remove_unnecessary_wildcards(text))),
    }
}

/// Tidy until the rendered text stops changing.
///
/// Trimming wildcards can turn a filter into an element rule (`*##.ad`), so a
/// single tidy is not always canonical.
pub fn normalize(line: &str) -> Rule {
    let mut rule = tidy(line);
    let mut text = rule.to_string();

    for _ in 1..MAX_TIDY_PASSES {
        let again = tidy(&text);
        let again_text = again.to_string();
        if again_text == text {
            break;
        }
        rule = again;
        text = again_text;
    }

    rule
}

// =============================================================================
// Element hiding rules
// =============================================================================

fn match_element(line: &str) -> Option<LineMatch<'_>> {
    for (pos, _) in line.match_indices('#') {
        let domains = &line[..pos];
        if domains.contains(ELEMENT_FORBIDDEN) {
            return None;
        }
        let Some(separator) = Separator::at_start_of(&line[pos..]) else {
            continue;
        };
        let selector = &line[pos + separator.as_str().len()..];
        if selector.is_empty() || selector.contains(&['{', '}'][..]) {
            continue;
        }
        return Some(LineMatch::Element {
            domains,
            separator,
            selector,
        });
    }
    None
}

fn tidy_element(domains: &str, separator: Separator, selector: &str) -> ElementRule {
    let domains = domains.to_lowercase();
    let domains = if domains.contains(ELEMENT_DOMAIN_SEPARATOR) {
        canonical_domains(domains.split(ELEMENT_DOMAIN_SEPARATOR))
    } else if domains.is_empty() {
        Vec::new()
    } else {
        canonical_domains([domains])
    };

    ElementRule {
        domains,
        separator,
        selector: canonicalize(selector),
    }
}

// =============================================================================
// Blocking filters
// =============================================================================

/// Split `body$options` at the rightmost `$` that starts a valid option list.
fn split_rule_options(line: &str) -> Option<(&str, &str)> {
    line.rmatch_indices('$')
        .map(|(pos, _)| (&line[..pos], &line[pos + 1..]))
        .find(|(_, options)| is_option_list(options))
}

fn is_option_list(text: &str) -> bool {
    !text.is_empty() && text.split(',').all(is_option)
}

/// `~?[\w-]+(=[^,\s]+)?`
fn is_option(raw: &str) -> bool {
    let raw = raw.strip_prefix('~').unwrap_or(raw);
    let name_len = raw
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(raw.len());
    if name_len == 0 {
        return false;
    }

    match raw[name_len..].strip_prefix('=') {
        Some(value) => !value.is_empty() && !value.contains(char::is_whitespace),
        None => name_len == raw.len(),
    }
}

fn tidy_filter(line: &str, body: &str, options_text: &str) -> FilterRule {
    let mut options = Vec::new();
    let mut domains = Vec::new();

    for raw in options_text.split(',') {
        let option = OptionToken::new(raw);

        if let Some(values) = option.as_str().strip_prefix(DOMAIN_OPTION) {
            domains.extend(
                values
                    .split(FILTER_DOMAIN_SEPARATOR)
                    .filter(|domain| !domain.is_empty())
                    .map(str::to_string),
            );
            continue;
        }

        if !option.is_known() {
            log::warn!("option \"{option}\" used on the filter \"{line}\" is not recognised");
        }
        options.push(option);
    }

    FilterRule {
        body: remove_unnecessary_wildcards(body),
        options: canonical_options(options),
        domains: canonical_domains(domains),
    }
}

/// Strip leading and trailing `*` that do not change what a filter matches.
pub fn remove_unnecessary_wildcards(text: &str) -> String {
    let (allowlist, mut rest) = match text.strip_prefix(ALLOWLIST_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut had_star = false;
    while rest.len() > 1 && rest.starts_with('*') && !rest[1..].starts_with(&['|', '!'][..]) {
        rest = &rest[1..];
        had_star = true;
    }
    while rest.len() > 1 && rest.ends_with('*') && !rest[..rest.len() - 1].ends_with(&['|', ' '][..]) {
        rest = &rest[..rest.len() - 1];
        had_star = true;
    }

    let mut out = String::with_capacity(text.len() + 1);
    if allowlist {
        out.push_str(ALLOWLIST_PREFIX);
    }
    if rest != "*" {
        out.push_str(rest);
    }
    // A bare regex must stay unanchored.
    if had_star && rest.starts_with('/') && rest.ends_with('/') {
        out.push('*');
    }
    out
}

// =============================================================================
// Domain slots
// =============================================================================

/// Where the domain restriction list of a tidied line lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainSlot {
    /// The comma separated prefix before `##` / `#@#`.
    Element,
    /// The `|` separated value of a trailing `domain=` option.
    Filter,
}

/// A located domain slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMatch {
    /// Byte range of the domain list itself.
    pub domains: Range<usize>,
    /// Byte range of the whole match, including the separator or option name.
    pub matched: Range<usize>,
}

impl DomainSlot {
    pub fn separator(self) -> char {
        match self {
            DomainSlot::Element => ELEMENT_DOMAIN_SEPARATOR,
            DomainSlot::Filter => FILTER_DOMAIN_SEPARATOR,
        }
    }

    pub fn locate(self, line: &str) -> Option<SlotMatch> {
        match self {
            DomainSlot::Element => locate_element_domains(line),
            DomainSlot::Filter => locate_filter_domains(line),
        }
    }
}

fn locate_element_domains(line: &str) -> Option<SlotMatch> {
    for (pos, _) in line.match_indices('#') {
        if line[..pos].contains(ELEMENT_FORBIDDEN) {
            return None;
        }
        if let Some(separator) = Separator::at_start_of(&line[pos..]) {
            return Some(SlotMatch {
                domains: 0..pos,
                matched: 0..pos + separator.as_str().len(),
            });
        }
    }
    None
}

fn locate_filter_domains(line: &str) -> Option<SlotMatch> {
    for (pos, _) in line.match_indices(DOMAIN_OPTION) {
        if pos == 0 || !line[..pos].ends_with(&['$', ','][..]) {
            continue;
        }
        let start = pos + DOMAIN_OPTION.len();
        let value = &line[start..];
        if value.is_empty() || value.contains(|c: char| c == ',' || c.is_whitespace()) {
            continue;
        }
        return Some(SlotMatch {
            domains: start..line.len(),
            matched: pos - 1..line.len(),
        });
    }
    None
}
