//! FOP Sorter
//!
//! Tidies, sorts and merges the rules of an Adblock Plus style filter list.
//! A list is processed as a sequence of sections separated by comments,
//! `%include` directives and `[...]` headers; each section is sorted as
//! element hiding rules or as blocking filters depending on what it mostly
//! contains.

pub mod merge;
pub mod parser;
pub mod section;

pub use merge::merge_domains;
pub use parser::{classify, normalize, tidy, DomainSlot, LineMatch, SlotMatch};
pub use section::{is_delimiter, sort_lines, sort_text, SectionMode};
