//! Rule model shared by the tidy, merge and section passes.
//!
//! Every rule is rendered back to text through `Display`; the rendered form
//! is what gets sorted, deduplicated and written out.

use std::cmp::Ordering;
use std::fmt;

// =============================================================================
// Filter syntax constants
// =============================================================================

/// Characters that may not appear in the domain prefix of an element rule.
pub const ELEMENT_FORBIDDEN: &[char] = &['/', '*', '|', '@', '"', '!'];

/// Marker that negates a domain or an option.
pub const EXCLUSION_MARKER: char = '~';

/// Prefix of allowlist (exception) blocking filters.
pub const ALLOWLIST_PREFIX: &str = "@@";

/// Name of the domain restriction option, including its value separator.
pub const DOMAIN_OPTION: &str = "domain=";

/// Separates the domains of an element rule prefix.
pub const ELEMENT_DOMAIN_SEPARATOR: char = ',';

/// Separates the values of a `domain=` option.
pub const FILTER_DOMAIN_SEPARATOR: char = '|';

/// Adblock Plus options recognised without a warning. `domain=` is handled
/// separately and never appears here.
pub const KNOWN_OPTIONS: &[&str] = &[
    "collapse",
    "csp",
    "document",
    "elemhide",
    "font",
    "genericblock",
    "generichide",
    "image",
    "match-case",
    "object",
    "media",
    "object-subrequest",
    "other",
    "ping",
    "popup",
    "rewrite=abp-resource:blank-css",
    "rewrite=abp-resource:blank-js",
    "rewrite=abp-resource:blank-html",
    "rewrite=abp-resource:blank-mp3",
    "rewrite=abp-resource:blank-text",
    "rewrite=abp-resource:1x1-transparent-gif",
    "rewrite=abp-resource:2x2-transparent-png",
    "rewrite=abp-resource:3x2-transparent-png",
    "rewrite=abp-resource:32x32-transparent-png",
    "script",
    "stylesheet",
    "subdocument",
    "third-party",
    "websocket",
    "webrtc",
    "xmlhttprequest",
];

// =============================================================================
// Element hiding separators
// =============================================================================

/// Marker between the domain prefix and the selector of an element rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    /// `##` - hide matching elements
    Hide,
    /// `#@#` - exception to a hiding rule
    Exception,
}

impl Separator {
    pub const ALL: [Separator; 2] = [Separator::Exception, Separator::Hide];

    pub fn as_str(self) -> &'static str {
        match self {
            Separator::Hide => "##",
            Separator::Exception => "#@#",
        }
    }

    /// Separator starting at the beginning of `text`, if any.
    pub fn at_start_of(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sep| text.starts_with(sep.as_str()))
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Domain tokens
// =============================================================================

/// A domain restriction, optionally negated with `~`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainToken(String);

impl DomainToken {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_excluded(&self) -> bool {
        self.0.starts_with(EXCLUSION_MARKER)
    }

    /// Domain name with exclusion markers stripped; this is the sort key.
    pub fn name(&self) -> &str {
        self.0.trim_matches(EXCLUSION_MARKER)
    }

    /// Order by stripped name; the plain form of a name precedes its negation.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.name()
            .cmp(other.name())
            .then_with(|| self.is_excluded().cmp(&other.is_excluded()))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl fmt::Display for DomainToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplicate and sort domain tokens into canonical order.
pub fn canonical_domains<I, S>(tokens: I) -> Vec<DomainToken>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut domains: Vec<DomainToken> = tokens.into_iter().map(|token| DomainToken::new(token)).collect();
    domains.sort_by(DomainToken::canonical_cmp);
    domains.dedup();
    domains
}

/// Whether a domain list restricts by inclusion (at least one domain is not
/// negated), as opposed to restricting purely by exclusion.
pub fn has_included_domain<'a>(domains: impl IntoIterator<Item = &'a str>) -> bool {
    domains
        .into_iter()
        .any(|domain| !domain.is_empty() && !domain.starts_with(EXCLUSION_MARKER))
}

pub fn join_domains(domains: &[DomainToken], separator: char) -> String {
    let mut out = String::new();
    for (i, domain) in domains.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(domain.as_str());
    }
    out
}

// =============================================================================
// Filter options
// =============================================================================

/// A blocking filter option, already case folded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionToken(String);

impl OptionToken {
    /// Fold `text` to lower case and map `_` to `-`.
    pub fn new(text: &str) -> Self {
        Self(text.to_lowercase().replace('_', "-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_negated(&self) -> bool {
        self.0.starts_with(EXCLUSION_MARKER)
    }

    pub fn is_known(&self) -> bool {
        KNOWN_OPTIONS.contains(&self.0.trim_matches(EXCLUSION_MARKER))
    }

    /// `image` sorts as `image`, `~image` as `image~`, so a negated option
    /// lands right after its plain form.
    pub fn sort_key(&self) -> String {
        match self.0.strip_prefix(EXCLUSION_MARKER) {
            Some(name) => format!("{name}{EXCLUSION_MARKER}"),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for OptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplicate and sort options into canonical order.
pub fn canonical_options(mut options: Vec<OptionToken>) -> Vec<OptionToken> {
    options.sort_by_cached_key(|option| (option.sort_key(), option.0.clone()));
    options.dedup();
    options
}

// =============================================================================
// Rules
// =============================================================================

/// Element hiding rule: `domains<separator>selector`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRule {
    pub domains: Vec<DomainToken>,
    pub separator: Separator,
    pub selector: String,
}

impl fmt::Display for ElementRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_domains(&self.domains, ELEMENT_DOMAIN_SEPARATOR))?;
        f.write_str(self.separator.as_str())?;
        f.write_str(&self.selector)
    }
}

/// Blocking filter: `body$options,domain=a|b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub body: String,
    pub options: Vec<OptionToken>,
    /// Values of every `domain=` option, rendered as one trailing option.
    pub domains: Vec<DomainToken>,
}

impl FilterRule {
    pub fn plain(body: String) -> Self {
        Self {
            body,
            options: Vec::new(),
            domains: Vec::new(),
        }
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)?;
        if self.options.is_empty() && self.domains.is_empty() {
            return Ok(());
        }
        f.write_str("$")?;
        for (i, option) in self.options.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(option.as_str())?;
        }
        if !self.domains.is_empty() {
            if !self.options.is_empty() {
                f.write_str(",")?;
            }
            f.write_str(DOMAIN_OPTION)?;
            f.write_str(&join_domains(&self.domains, FILTER_DOMAIN_SEPARATOR))?;
        }
        Ok(())
    }
}

/// A tidied line of a filter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Element(ElementRule),
    Filter(FilterRule),
}

impl Rule {
    pub fn is_element(&self) -> bool {
        matches!(self, Rule::Element(_))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Element(rule) => fmt::Display::fmt(rule, f),
            Rule::Filter(rule) => fmt::Display::fmt(rule, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_order_puts_plain_before_negated() {
        let domains = canonical_domains(["b.com", "~a.com", "a.com"]);
        let names: Vec<&str> = domains.iter().map(DomainToken::as_str).collect();
        assert_eq!(names, ["a.com", "~a.com", "b.com"]);
    }

    #[test]
    fn test_domain_dedupe_is_marker_sensitive() {
        let domains = canonical_domains(["a.com", "a.com", "~a.com"]);
        assert_eq!(domains.len(), 2);
    }

    #[test]
    fn test_option_order() {
        let options = ["~image", "image", "script"].map(OptionToken::new).to_vec();
        let sorted: Vec<String> = canonical_options(options).iter().map(|o| o.to_string()).collect();
        assert_eq!(sorted, ["image", "script", "~image"]);
    }

    #[test]
    fn test_option_folding() {
        let option = OptionToken::new("Third_Party");
        assert_eq!(option.as_str(), "third-party");
        assert!(option.is_known());
        assert!(OptionToken::new("~Script").is_known());
        assert!(!OptionToken::new("bogus").is_known());
    }

    #[test]
    fn test_has_included_domain() {
        assert!(has_included_domain(["~a.com", "b.com"]));
        assert!(!has_included_domain(["~a.com", "~b.com"]));
        assert!(!has_included_domain([""]));
    }

    #[test]
    fn test_filter_rule_display() {
        let rule = FilterRule {
            body: "||ads.example.com^".to_string(),
            options: vec![OptionToken::new("script")],
            domains: canonical_domains(["b.com", "a.com"]),
        };
        assert_eq!(rule.to_string(), "||ads.example.com^$script,domain=a.com|b.com");

        let only_domains = FilterRule {
            body: "/ad.js".to_string(),
            options: Vec::new(),
            domains: canonical_domains(["a.com"]),
        };
        assert_eq!(only_domains.to_string(), "/ad.js$domain=a.com");
        assert_eq!(FilterRule::plain("ads".to_string()).to_string(), "ads");
    }

    #[test]
    fn test_element_rule_display() {
        let rule = ElementRule {
            domains: canonical_domains(["b.com", "a.com"]),
            separator: Separator::Exception,
            selector: ".ad".to_string(),
        };
        assert_eq!(rule.to_string(), "a.com,b.com#@#.ad");
    }
}
