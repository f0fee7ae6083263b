use fop_core::types::{canonical_domains, has_included_domain, join_domains};

use crate::parser::DomainSlot;

/// Merge consecutive rules that differ only in their domain list.
///
/// Single greedy pass: when rule `i` can merge with rule `i + 1`, the merged
/// line replaces rule `i + 1` and rule `i` is dropped, so a run of mergeable
/// rules folds left into right and collapses to one line. The non-domain text
/// of the merged line is always taken from the left rule.
pub fn merge_domains(mut rules: Vec<String>, slot: DomainSlot) -> Vec<String> {
    let mut merged = Vec::with_capacity(rules.len());

    for i in 0..rules.len() {
        let combined = rules
            .get(i + 1)
            .and_then(|next| combine_pair(&rules[i], next, slot));

        match combined {
            Some(line) => {
                log::debug!("merged domains of \"{}\" into \"{}\"", rules[i], line);
                rules[i + 1] = line;
            }
            None => merged.push(std::mem::take(&mut rules[i])),
        }
    }

    merged
}

fn combine_pair(current: &str, next: &str, slot: DomainSlot) -> Option<String> {
    let first = slot.locate(current)?.domains;
    let second = slot.locate(next)?.domains;
    if first.is_empty() || second.is_empty() {
        return None;
    }

    // Identical apart from the domain list.
    if current[..first.start] != next[..second.start] || current[first.end..] != next[second.end..] {
        return None;
    }

    let separator = slot.separator();
    let left = &current[first.clone()];
    let right = &next[second];

    // An inclusive list and an exclusion-only list restrict differently.
    if has_included_domain(left.split(separator)) != has_included_domain(right.split(separator)) {
        return None;
    }

    let domains = canonical_domains(left.split(separator).chain(right.split(separator)));
    let mut line = String::with_capacity(current.len() + right.len() + 1);
    line.push_str(&current[..first.start]);
    line.push_str(&join_domains(&domains, separator));
    line.push_str(&current[first.end..]);
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merges_filter_domains() {
        let merged = merge_domains(lines(&["ad.js$domain=a.com", "ad.js$domain=c.com"]), DomainSlot::Filter);
        assert_eq!(merged, ["ad.js$domain=a.com|c.com"]);
    }

    #[test]
    fn keeps_inclusive_and_exclusive_apart() {
        let input = lines(&["ad.js$domain=a.com", "ad.js$domain=~b.com"]);
        assert_eq!(merge_domains(input.clone(), DomainSlot::Filter), input);
    }

    #[test]
    fn merges_exclusion_only_lists() {
        let merged = merge_domains(lines(&["ad.js$domain=~b.com", "ad.js$domain=~a.com"]), DomainSlot::Filter);
        assert_eq!(merged, ["ad.js$domain=~a.com|~b.com"]);
    }

    #[test]
    fn requires_identical_remainder() {
        let input = lines(&["ad.js$image,domain=a.com", "ad.js$script,domain=b.com"]);
        assert_eq!(merge_domains(input.clone(), DomainSlot::Filter), input);

        let input = lines(&["a.com##.ad", "b.com#@#.ad"]);
        assert_eq!(merge_domains(input.clone(), DomainSlot::Element), input);
    }

    #[test]
    fn chains_runs_into_one_line() {
        let merged = merge_domains(
            lines(&["a.com##.ad", "c.com##.ad", "b.com,d.com##.ad", "x.com##.other"]),
            DomainSlot::Element,
        );
        assert_eq!(merged, ["a.com,b.com,c.com,d.com##.ad", "x.com##.other"]);
    }

    #[test]
    fn skips_rules_without_domains() {
        let input = lines(&["##.ad", "a.com##.ad", "/ads.js", "/ads.js$domain=a.com"]);
        let merged = merge_domains(input, DomainSlot::Element);
        assert_eq!(merged, ["##.ad", "a.com##.ad", "/ads.js", "/ads.js$domain=a.com"]);
    }

    #[test]
    fn dedupes_overlapping_domains() {
        let merged = merge_domains(
            lines(&["a.com,b.com##.ad", "b.com,~c.b.com##.ad"]),
            DomainSlot::Element,
        );
        assert_eq!(merged, ["a.com,b.com,~c.b.com##.ad"]);
    }
}
