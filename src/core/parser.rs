//! System query option parsing: `$skip`, `$top`, `$expand`, `$select`.
//!
//! Works on the raw query string, because `$expand` values carry literal
//! commas and separators inside parentheses. Grammar (depth-0 separators only;
//! a missing `)` is closed by end of input):
//!
//! ```text
//! query      = ["?"] option *( "&" option )
//! option     = name "=" value
//! expand     = item *( "," item )
//! item       = name [ "(" nested ")" ]
//! nested     = segment *( ( "," / ";" / "&" ) segment )
//! segment    = [ "$" name "=" ] text        ; no prefix continues the previous option
//! select     = path *( "," path )
//! path       = name *( "/" name )
//! ```
//!
//! Parsing is total: malformed input degrades to defaults rather than failing.

use super::error::{ODataError, Result};
use log::debug;

// ============================================================================
// Parsed options
// ============================================================================

/// One `$expand` term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandItem {
    /// Relationship name
    pub name: String,

    /// Raw content of the parenthesised group, empty when absent
    pub sub_query: String,
}

impl ExpandItem {
    pub fn new(name: impl Into<String>, sub_query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sub_query: sub_query.into(),
        }
    }

    /// Options applying to the expanded relationship.
    pub fn nested(&self) -> QueryOptions {
        QueryOptions::parse_nested(&self.sub_query)
    }

    /// `sub_query` without a leading `$expand=` or `$select=` marker.
    pub fn nested_option(&self) -> &str {
        let trimmed = self.sub_query.trim_start();
        ["$expand=", "$select="]
            .iter()
            .find_map(|marker| trimmed.strip_prefix(marker))
            .unwrap_or(trimmed)
    }
}

/// Parsed system query options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub skip: usize,

    /// `None` means no limit
    pub top: Option<usize>,

    /// Expand terms in declaration order, unique by name
    pub expand: Vec<ExpandItem>,

    /// Selected paths, `/`-delimited
    pub select: Vec<String>,
}

impl QueryOptions {
    /// Parse a raw query string. Never fails.
    pub fn parse(raw: &str) -> Self {
        let mut options = Self::default();
        let mut seen = Seen::default();

        for (name, value) in split_options(raw) {
            match OptionName::from_name(name) {
                Some(OptionName::Skip) if !seen.skip => {
                    seen.skip = true;
                    options.skip = parse_count(value).unwrap_or(0);
                }
                Some(OptionName::Top) if !seen.top => {
                    seen.top = true;
                    options.top = parse_count(value).filter(|&n| n > 0);
                }
                Some(OptionName::Expand) if !seen.expand => {
                    seen.expand = true;
                    options.expand = parse_expand(value);
                }
                Some(OptionName::Select) if !seen.select => {
                    seen.select = true;
                    options.select = parse_select(value);
                }
                _ => {}
            }
        }

        debug!(
            "parsed query options: skip={} top={:?} expand={:?} select={:?}",
            options.skip,
            options.top,
            options.expand.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            options.select
        );
        options
    }

    /// Like [`QueryOptions::parse`], but reports non-numeric `$skip`/`$top`
    /// and unbalanced `$expand`/`$select` values.
    pub fn parse_strict(raw: &str) -> Result<Self> {
        for (name, value) in split_options(raw) {
            let malformed = match OptionName::from_name(name) {
                Some(OptionName::Skip) | Some(OptionName::Top) => {
                    value.trim().parse::<usize>().is_err()
                }
                Some(OptionName::Expand) | Some(OptionName::Select) => !is_balanced(value),
                None => false,
            };
            if malformed {
                return Err(ODataError::MalformedQueryOption {
                    option: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(Self::parse(raw))
    }

    /// Parse the content of an `$expand` item's parentheses.
    ///
    /// Segments without a `$name=` prefix continue the previous option; a
    /// leading bare segment is an expand term.
    pub fn parse_nested(content: &str) -> Self {
        let mut options = Self::default();
        let mut seen = Seen::default();
        let mut current = Some(OptionName::Expand);
        let mut expand_terms = Vec::new();

        let mut scanner = Scanner::new(content);
        loop {
            let mut segment = scanner.take_until(b",;&").trim();
            if let Some((name, value)) = option_prefix(segment) {
                current = OptionName::from_name(name);
                segment = value;
                match current {
                    Some(OptionName::Skip) if seen.skip => current = None,
                    Some(OptionName::Top) if seen.top => current = None,
                    _ => {}
                }
            }

            match current {
                Some(OptionName::Expand) => expand_terms.push(segment),
                Some(OptionName::Select) => {
                    if !segment.is_empty() {
                        options.select.push(segment.to_string());
                    }
                }
                Some(OptionName::Skip) => {
                    seen.skip = true;
                    options.skip = parse_count(segment).unwrap_or(0);
                    current = None;
                }
                Some(OptionName::Top) => {
                    seen.top = true;
                    options.top = parse_count(segment).filter(|&n| n > 0);
                    current = None;
                }
                None => {}
            }

            if !scanner.bump() {
                break;
            }
        }

        for term in expand_terms {
            if let Some(item) = parse_expand_item(term) {
                merge_item(&mut options.expand, item);
            }
        }
        options
    }

    /// Whether `$expand` names this relationship at the top level.
    pub fn expands(&self, relationship: &str) -> bool {
        self.expand.iter().any(|e| e.name == relationship)
    }

    /// Options with no effect on the records they are applied to.
    pub fn is_noop(&self) -> bool {
        self.skip == 0 && self.top.is_none() && self.expand.is_empty() && self.select.is_empty()
    }
}

#[derive(Default)]
struct Seen {
    skip: bool,
    top: bool,
    expand: bool,
    select: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionName {
    Skip,
    Top,
    Expand,
    Select,
}

impl OptionName {
    fn from_name(name: &str) -> Option<Self> {
        let bare = name.trim().strip_prefix('$')?;
        if bare.eq_ignore_ascii_case("skip") {
            Some(Self::Skip)
        } else if bare.eq_ignore_ascii_case("top") {
            Some(Self::Top)
        } else if bare.eq_ignore_ascii_case("expand") {
            Some(Self::Expand)
        } else if bare.eq_ignore_ascii_case("select") {
            Some(Self::Select)
        } else {
            None
        }
    }
}

// ============================================================================
// Scanner
// ============================================================================

/// Byte cursor that treats parenthesised groups as opaque.
struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Consume up to the next depth-0 byte in `stops` (or end of input).
    /// Stray `)` at depth 0 are ordinary bytes.
    fn take_until(&mut self, stops: &[u8]) -> &'a str {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(&b) = bytes.get(self.pos) {
            match b {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                _ if depth == 0 && stops.contains(&b) => break,
                _ => {}
            }
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Step over the separator the last `take_until` stopped at.
    fn bump(&mut self) -> bool {
        if self.pos < self.input.len() {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

/// Split a raw query into `(name, value)` pairs on depth-0 `&`.
fn split_options(raw: &str) -> Vec<(&str, &str)> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut scanner = Scanner::new(raw);
    let mut pairs = Vec::new();
    loop {
        let segment = scanner.take_until(b"&");
        if !segment.is_empty() {
            match segment.split_once('=') {
                Some((name, value)) => pairs.push((name.trim(), value.trim())),
                None => pairs.push((segment.trim(), "")),
            }
        }
        if !scanner.bump() {
            break;
        }
    }
    pairs
}

/// `$name=value` at the start of a nested segment.
fn option_prefix(segment: &str) -> Option<(&str, &str)> {
    if !segment.starts_with('$') {
        return None;
    }
    let eq = segment.find('=')?;
    if segment[..eq].contains('(') {
        return None;
    }
    Some((&segment[..eq], segment[eq + 1..].trim()))
}

// ============================================================================
// Option values
// ============================================================================

/// Leading run of ASCII digits. Anything else yields `None`.
fn parse_count(value: &str) -> Option<usize> {
    let value = value.trim();
    let end = value
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(value.len());
    if end == 0 {
        return None;
    }
    value[..end].parse().ok()
}

fn parse_expand(value: &str) -> Vec<ExpandItem> {
    let mut items = Vec::new();
    let mut scanner = Scanner::new(value);
    loop {
        if let Some(item) = parse_expand_item(scanner.take_until(b",")) {
            merge_item(&mut items, item);
        }
        if !scanner.bump() {
            break;
        }
    }
    items
}

fn parse_expand_item(term: &str) -> Option<ExpandItem> {
    let term = term.trim();
    let (name, sub_query) = match term.find('(') {
        Some(open) => (&term[..open], group_content(&term[open + 1..])),
        None => (term, ""),
    };
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(ExpandItem::new(name, sub_query.trim()))
}

/// Duplicate terms keep the first position and take the later sub-query.
fn merge_item(items: &mut Vec<ExpandItem>, item: ExpandItem) {
    match items.iter_mut().find(|e| e.name == item.name) {
        Some(existing) => existing.sub_query = item.sub_query,
        None => items.push(item),
    }
}

/// Content of a group whose `(` is already consumed; end of input closes it.
fn group_content(rest: &str) -> &str {
    let mut depth = 1usize;
    for (i, b) in rest.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return &rest[..i];
                }
            }
            _ => {}
        }
    }
    rest
}

fn parse_select(value: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut scanner = Scanner::new(value);
    loop {
        let path = scanner.take_until(b",").trim();
        if !path.is_empty() {
            paths.push(path.to_string());
        }
        if !scanner.bump() {
            break;
        }
    }
    paths
}

fn is_balanced(value: &str) -> bool {
    let mut depth = 0i64;
    for b in value.bytes() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
