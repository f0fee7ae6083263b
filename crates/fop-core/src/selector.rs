//! Element hiding selector canonicalisation.
//!
//! The selector is bracketed with boundary markers and rewritten by four
//! passes: combinator spacing, removal of redundant universal selectors, tag
//! lower-casing and pseudo-class lower-casing. Each pass locates its matches
//! on the current text and rebuilds the text in a single scan. Quoted
//! attribute values and escape pairs are copied through by position. The
//! combinator and universal selector passes also check each candidate
//! against two views of the selector: the structure (quoted strings removed)
//! and the strings (quoted strings only).

/// Marks both ends of a selector while it is being rewritten.
const BOUNDARY: char = '\0';

/// Explicit CSS combinators.
const COMBINATORS: &[char] = &['+', '>', '~'];

/// Characters after a `*` that make it redundant.
const COMPOUND_OPENERS: &[char] = &['#', '.', '[', ':'];

/// The negation pseudo-class keeps its universal selector.
const NEGATION_PSEUDO: &str = ":not(";

/// Characters that may directly follow a tag name.
const TAG_TERMINATORS: &[char] = &['[', ']', '^', '*', '$', '=', ':', BOUNDARY, '#', '.'];

/// Characters that may follow the next compound's tag after a descendant space.
const NEXT_TAG_TERMINATORS: &[char] = &['[', ':', BOUNDARY, '#', '.'];

/// Characters that may directly follow a pseudo-class name.
const PSEUDO_TERMINATORS: &[char] = &['(', ')', ':', '[', '.', '#', ',', BOUNDARY];

/// Longest CSS unicode escape, in hex digits.
const MAX_ESCAPE_DIGITS: usize = 6;

/// Canonicalise the selector part of an element hiding rule.
pub fn canonicalize(selector: &str) -> String {
    let mut text: Vec<char> = Vec::with_capacity(selector.len() + 2);
    text.push(BOUNDARY);
    text.extend(selector.chars());
    text.push(BOUNDARY);

    let passes: [fn(&[char], &Views) -> Vec<char>; 4] = [
        normalize_combinators,
        remove_universal_selectors,
        lowercase_tags,
        lowercase_pseudo_classes,
    ];
    for pass in passes {
        let views = Views::split(&text);
        text = pass(&text, &views);
    }

    text[1..text.len() - 1].iter().collect()
}

// =============================================================================
// String-aware views
// =============================================================================

struct Views {
    /// Selector with every complete quoted string removed.
    structure: String,
    /// The removed quoted strings, quotes included, concatenated.
    strings: String,
}

impl Views {
    fn split(text: &[char]) -> Self {
        let mut structure = String::with_capacity(text.len());
        let mut strings = String::new();
        let mut i = 0;

        while i < text.len() {
            match text[i] {
                '\\' if i + 1 < text.len() => {
                    structure.push(text[i]);
                    structure.push(text[i + 1]);
                    i += 2;
                }
                quote @ ('"' | '\'') => match closing_quote(text, i, quote) {
                    Some(end) => {
                        strings.extend(&text[i..=end]);
                        i = end + 1;
                    }
                    None => {
                        // An unterminated string ends the search for literals.
                        structure.extend(&text[i..]);
                        break;
                    }
                },
                c => {
                    structure.push(c);
                    i += 1;
                }
            }
        }

        Self { structure, strings }
    }

    /// Present in the structure and absent from every string.
    fn is_structural(&self, candidate: &str) -> bool {
        self.structure.contains(candidate) && !self.strings.contains(candidate)
    }
}

/// Length of the complete quoted string opening at `i`.
fn quoted_len(text: &[char], i: usize) -> Option<usize> {
    match text[i] {
        quote @ ('"' | '\'') => closing_quote(text, i, quote).map(|end| end + 1 - i),
        _ => None,
    }
}

/// Length of an escape pair or a complete quoted string starting at `i`.
fn verbatim_len(text: &[char], i: usize) -> Option<usize> {
    match text[i] {
        '\\' if i + 1 < text.len() => Some(2),
        _ => quoted_len(text, i),
    }
}

fn closing_quote(text: &[char], open: usize, quote: char) -> Option<usize> {
    let mut j = open + 1;
    while j < text.len() {
        match text[j] {
            '\\' if j + 1 < text.len() => j += 2,
            '\\' => return None,
            c if c == quote => return Some(j),
            _ => j += 1,
        }
    }
    None
}

// =============================================================================
// Passes
// =============================================================================

/// `a>b`, `a  >  b` and `a > b` all become `a > b`; runs of descendant
/// whitespace collapse to one space. The character after the combinator must
/// not be a digit, which keeps `2n + 1` arguments intact.
fn normalize_combinators(text: &[char], views: &Views) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        if let Some(len) = quoted_len(text, i) {
            out.extend(&text[i..i + len]);
            i += len;
            continue;
        }

        let lead = match text[i] {
            '\\' if i + 1 < text.len() => 2,
            '\\' => 0,
            c if COMBINATORS.contains(&c) || is_space(c) => 0,
            _ => 1,
        };
        if lead == 0 {
            out.push(text[i]);
            i += 1;
            continue;
        }

        let gap_start = i + lead;
        let gap_end = skip_spaces(text, gap_start);
        let (replacement, next) = match text.get(gap_end) {
            Some(&c) if is_combinator_at(text, gap_end) => {
                (format!(" {c} "), skip_spaces(text, gap_end + 1))
            }
            Some(_) if gap_end > gap_start => (" ".to_string(), gap_end),
            _ => {
                out.push(text[i]);
                i += 1;
                continue;
            }
        };

        match text.get(next) {
            Some(c) if !c.is_ascii_digit() => {}
            _ => {
                out.push(text[i]);
                i += 1;
                continue;
            }
        }

        let matched: String = text[i..=next].iter().collect();
        out.extend(&text[i..gap_start]);
        if views.is_structural(&matched) {
            out.extend(replacement.chars());
        } else {
            out.extend(&text[gap_start..next]);
        }
        i = next;
    }

    out
}

/// `*.ad` and `div > *[id]` lose the redundant `*`.
fn remove_universal_selectors(text: &[char], views: &Views) -> Vec<char> {
    if !views.is_structural("*") {
        return text.to_vec();
    }

    let mut out = Vec::with_capacity(text.len());
    for (i, &c) in text.iter().enumerate() {
        let redundant = c == '*'
            && i > 0
            && (matches!(text[i - 1], BOUNDARY | ',') || is_space(text[i - 1]))
            && text.get(i + 1).is_some_and(|next| COMPOUND_OPENERS.contains(next))
            && !starts_with_at(text, i + 1, NEGATION_PSEUDO);
        if !redundant {
            out.push(c);
        }
    }
    out
}

/// `DIV.Ad` becomes `div.Ad`; class names, ids and quoted text keep their case.
fn lowercase_tags(text: &[char], views: &Views) -> Vec<char> {
    if has_unicode_escape(&views.structure) {
        log::debug!(
            "unicode escape in selector {:?}; tag case left untouched",
            text.iter().collect::<String>()
        );
        return text.to_vec();
    }

    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        if let Some(len) = verbatim_len(text, i) {
            out.extend(&text[i..i + len]);
            i += len;
            continue;
        }

        let starts_tag = i > 0
            && text[i].is_ascii_alphabetic()
            && (matches!(text[i - 1], '[' | BOUNDARY) || is_space(text[i - 1]));
        if !starts_tag {
            out.push(text[i]);
            i += 1;
            continue;
        }

        let end = alnum_end(text, i);
        let token: String = text[i..end].iter().collect();
        let leading_upper = token
            .chars()
            .take_while(char::is_ascii_alphabetic)
            .any(|c| c.is_ascii_uppercase());

        if leading_upper && tag_follows(text, end) {
            out.extend(token.to_ascii_lowercase().chars());
        } else {
            out.extend(token.chars());
        }
        i = end;
    }

    out
}

/// `:Hover` becomes `:hover`.
fn lowercase_pseudo_classes(text: &[char], _views: &Views) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        if let Some(len) = verbatim_len(text, i) {
            out.extend(&text[i..i + len]);
            i += len;
            continue;
        }

        if text[i] != ':' {
            out.push(text[i]);
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < text.len() && (text[end].is_ascii_alphabetic() || text[end] == '-') {
            end += 1;
        }
        let pseudo: String = text[i..end].iter().collect();
        let terminated = text
            .get(end)
            .is_some_and(|&c| PSEUDO_TERMINATORS.contains(&c) || is_space(c));

        if terminated && pseudo.chars().any(|c| c.is_ascii_uppercase()) {
            out.extend(pseudo.to_ascii_lowercase().chars());
            i = end;
        } else {
            out.push(':');
            i += 1;
        }
    }

    out
}

// =============================================================================
// Helpers
// =============================================================================

fn is_space(c: char) -> bool {
    c.is_ascii_whitespace()
}

fn skip_spaces(text: &[char], mut i: usize) -> usize {
    while i < text.len() && is_space(text[i]) {
        i += 1;
    }
    i
}

fn alnum_end(text: &[char], mut i: usize) -> usize {
    while i < text.len() && text[i].is_ascii_alphanumeric() {
        i += 1;
    }
    i
}

fn starts_with_at(text: &[char], at: usize, needle: &str) -> bool {
    let mut i = at;
    for expected in needle.chars() {
        if text.get(i) != Some(&expected) {
            return false;
        }
        i += 1;
    }
    true
}

/// A combinator character that is not the `~=` attribute operator.
fn is_combinator_at(text: &[char], i: usize) -> bool {
    COMBINATORS.contains(&text[i]) && !(text[i] == '~' && text.get(i + 1) == Some(&'='))
}

/// What may follow a tag name: an attribute, pseudo, id, class or boundary,
/// or a single space introducing a combinator, `*`, a tag, an id or a class.
fn tag_follows(text: &[char], end: usize) -> bool {
    let Some(&next) = text.get(end) else {
        return false;
    };
    if TAG_TERMINATORS.contains(&next) {
        return true;
    }
    if !is_space(next) {
        return false;
    }

    match text.get(end + 1) {
        Some(&c) if COMBINATORS.contains(&c) || c == '*' => true,
        Some(&c) if c.is_ascii_alphabetic() => {
            let tag_end = alnum_end(text, end + 1);
            text.get(tag_end)
                .is_some_and(|&t| NEXT_TAG_TERMINATORS.contains(&t) || is_space(t))
        }
        Some('#' | '.') => text.get(end + 2).is_some_and(char::is_ascii_alphabetic),
        _ => false,
    }
}

/// `\31 Foo`-style escapes make identifier boundaries ambiguous.
fn has_unicode_escape(structure: &str) -> bool {
    let chars: Vec<char> = structure.chars().collect();

    chars.iter().enumerate().any(|(i, &c)| {
        if c != '\\' {
            return false;
        }
        let digits = chars[i + 1..]
            .iter()
            .take_while(|d| d.is_ascii_hexdigit())
            .count();
        if digits == 0 || digits > MAX_ESCAPE_DIGITS {
            return false;
        }
        let after = i + 1 + digits;
        if !chars.get(after).is_some_and(|&s| is_space(s)) {
            return false;
        }
        chars[after + 1..]
            .iter()
            .take_while(|l| l.is_ascii_alphabetic())
            .any(char::is_ascii_uppercase)
    })
}
