//! Splitting a filter list into sections and sorting each one.

use std::fmt;

use fop_core::types::{has_included_domain, Rule};

use crate::merge::merge_domains;
use crate::parser::{normalize, DomainSlot};

/// Data lines sampled per section to choose its sort mode.
pub const CLASSIFY_SAMPLE: usize = 10;

/// Data lines shorter than this are noise.
pub const MIN_RULE_CHARS: usize = 3;

/// How a section is sorted and merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionMode {
    /// Sorted by selector, merged on the element domain prefix.
    Element,
    /// Sorted by lower-cased text, merged on the `domain=` option.
    Filter,
}

impl SectionMode {
    pub fn slot(self) -> DomainSlot {
        match self {
            SectionMode::Element => DomainSlot::Element,
            SectionMode::Filter => DomainSlot::Filter,
        }
    }
}

impl fmt::Display for SectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionMode::Element => f.write_str("element"),
            SectionMode::Filter => f.write_str("filter"),
        }
    }
}

/// Comment, `%include` directive or `[...]` header.
pub fn is_delimiter(line: &str) -> bool {
    line.starts_with('!')
        || line.starts_with("%include")
        || (line.starts_with('[') && line.ends_with(']'))
}

/// Lines of the section being collected, reset on every flush.
#[derive(Debug, Default)]
struct PendingSection {
    lines: Vec<String>,
    sampled: usize,
    element_lines: usize,
    filter_lines: usize,
}

impl PendingSection {
    fn push(&mut self, rule: &Rule, line: String) {
        if self.sampled < CLASSIFY_SAMPLE {
            self.sampled += 1;
            if rule.is_element() {
                self.element_lines += 1;
            } else {
                self.filter_lines += 1;
            }
        }
        self.lines.push(line);
    }

    fn mode(&self) -> SectionMode {
        if self.element_lines > self.filter_lines {
            SectionMode::Element
        } else {
            SectionMode::Filter
        }
    }

    fn flush(&mut self, out: &mut Vec<String>) {
        if self.lines.is_empty() {
            return;
        }
        let section = std::mem::take(self);
        let mode = section.mode();
        let count = section.lines.len();

        let sorted = sort_section(section.lines, mode);
        log::debug!("sorted {mode} section: {count} lines in, {} out", sorted.len());
        out.extend(sorted);
    }
}

/// Sort every section of a filter list, returning the corrected lines.
pub fn sort_lines<'a, I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = Vec::new();
    let mut section = PendingSection::default();

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if is_delimiter(line) {
            section.flush(&mut out);
            out.push(line.to_string());
            continue;
        }

        if line.chars().count() < MIN_RULE_CHARS {
            continue;
        }

        let rule = normalize(line);
        let text = rule.to_string();
        if text.chars().count() < MIN_RULE_CHARS {
            continue;
        }
        // Keep the raw text rather than emit something that reads back as a
        // section boundary.
        let text = if is_delimiter(&text) { line.to_string() } else { text };
        section.push(&rule, text);
    }

    section.flush(&mut out);
    out
}

/// Sort a whole filter list file. Every output line ends with `\n`.
pub fn sort_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in sort_lines(text.split('\n')) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn sort_section(mut lines: Vec<String>, mode: SectionMode) -> Vec<String> {
    lines.sort();
    lines.dedup();

    match mode {
        SectionMode::Element => lines.sort_by_cached_key(|line| element_sort_key(line)),
        SectionMode::Filter => lines.sort_by_cached_key(|line| (line.to_lowercase(), line.clone())),
    }

    merge_domains(lines, mode.slot())
}

/// Selector text first, then the rest of the rule without its domains, then
/// the kind of domain list, so that every group of mergeable rules is
/// contiguous.
fn element_sort_key(line: &str) -> (String, String, u8, String) {
    let Some(slot) = DomainSlot::Element.locate(line) else {
        return (line.to_string(), line.to_string(), 0, line.to_string());
    };

    let selector = line[slot.matched.end..].to_string();
    let masked = format!("{}{}", &line[..slot.domains.start], &line[slot.domains.end..]);
    let domains = &line[slot.domains];
    let kind = if domains.is_empty() {
        0
    } else if has_included_domain(domains.split(DomainSlot::Element.separator())) {
        1
    } else {
        2
    };

    (selector, masked, kind, line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sort(text: &str) -> String {
        sort_text(text)
    }

    #[test]
    fn sorts_filter_section_case_insensitively() {
        assert_eq!(sort("||b.com^\n||A.com^\n||c.com^\n"), "||A.com^\n||b.com^\n||c.com^\n");
    }

    #[test]
    fn keeps_delimiters_in_place() {
        let input = "[Adblock Plus 2.0]\n! Title: test\n||b.com^\n||a.com^\n! Second\n%include other.txt\nz.com##.ad\na.com##.ad\n";
        let expected = "[Adblock Plus 2.0]\n! Title: test\n||a.com^\n||b.com^\n! Second\n%include other.txt\na.com,z.com##.ad\n";
        assert_eq!(sort(input), expected);
    }

    #[test]
    fn drops_blank_and_short_lines() {
        assert_eq!(sort("\n  \nab\n||a.com^\n\n"), "||a.com^\n");
        assert_eq!(sort("***\n||a.com^\n"), "||a.com^\n");
    }

    #[test]
    fn removes_duplicates() {
        assert_eq!(sort("||a.com^\n||a.com^\n||a.com^*\n"), "||a.com^\n");
    }

    #[test]
    fn sorts_element_section_by_selector() {
        let input = "z.com##.alpha\na.com##.gamma\nm.com##.beta\n";
        assert_eq!(sort(input), "z.com##.alpha\nm.com##.beta\na.com##.gamma\n");
    }

    #[test]
    fn element_section_groups_mergeable_rules() {
        let input = "a.com##.x\nb.com#@#.x\nc.com##.x\n~d.com##.x\n~e.com##.x\n";
        assert_eq!(sort(input), "a.com,c.com##.x\n~d.com,~e.com##.x\nb.com#@#.x\n");
    }

    #[test]
    fn merges_filter_domains() {
        let input = "ad.js$domain=c.com\nad.js$domain=a.com\nad.js$domain=~b.com\n";
        assert_eq!(sort(input), "ad.js$domain=a.com|c.com\nad.js$domain=~b.com\n");
    }

    #[test]
    fn classification_samples_first_ten_lines() {
        let mut lines = vec![
            "a.com##.e1", "a.com##.e2", "a.com##.e3", "a.com##.e4", "a.com##.e5", "a.com##.e6",
            "/f1.js", "/f2.js", "/f3.js", "/f4.js",
        ];
        lines.extend(["/f5.js", "/f6.js", "/f7.js", "/f8.js", "/f9.js"]);

        let mut section = PendingSection::default();
        for line in &lines {
            let rule = normalize(line);
            section.push(&rule, rule.to_string());
        }
        assert_eq!(section.sampled, CLASSIFY_SAMPLE);
        assert_eq!(section.mode(), SectionMode::Element);
    }

    #[test]
    fn filter_majority_selects_filter_mode() {
        let mut section = PendingSection::default();
        for line in ["a.com##.e1", "/f1.js", "/f2.js"] {
            let rule = normalize(line);
            section.push(&rule, rule.to_string());
        }
        assert_eq!(section.mode(), SectionMode::Filter);
    }

    #[test]
    fn normalizes_line_endings() {
        assert_eq!(sort("||b.com^\r\n||a.com^\r\n"), "||a.com^\n||b.com^\n");
    }

    #[test]
    fn keeps_lines_that_would_become_delimiters() {
        assert_eq!(sort("*[ads]\n"), "*[ads]\n");
    }

    #[test]
    fn sorting_is_idempotent() {
        let input = "! Section\n*ads*$Script,~IMAGE,image\nB.com,a.com##DIV > *.Ad\n||x.com^$domain=b.com\n||x.com^$domain=a.com|~c.a.com\n*##Span:Hover\n[Adblock]\nexample.com,~sub.example.com##.banner\nexample.org##.banner\n~a.com##.x\n~b.com##.x\nq.com##.x\n";
        let once = sort(input);
        assert_eq!(sort(&once), once);
    }

    #[test]
    fn merged_section_can_change_mode_on_next_run() {
        let input = "a1.com##.x\na2.com##.x\na3.com##.x\na4.com##.x\na5.com##.x\na6.com##.x\n/f1.js\n/f2.js\n/f3.js\n/f4.js\n";
        let merged = "a1.com,a2.com,a3.com,a4.com,a5.com,a6.com##.x";

        let first = sort(input);
        assert_eq!(first, format!("{merged}\n/f1.js\n/f2.js\n/f3.js\n/f4.js\n"));

        // One element rule against four filters now samples as a filter section.
        let second = sort(&first);
        assert_eq!(second, format!("/f1.js\n/f2.js\n/f3.js\n/f4.js\n{merged}\n"));
        assert_eq!(sort(&second), second);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert_eq!(sort(""), "");
        assert_eq!(sort("\n\n"), "");
    }
}
