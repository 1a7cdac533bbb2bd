//! From a CSS `font-family` value to a loaded font
//!
//! `"Noto Sans", 'Foo, Bar', serif` is an ordered fallback chain. Names are
//! trimmed and lower-cased, quoted names may hold commas, and the first name
//! that matches a loaded font wins. When nothing matches, the default font
//! takes over.

use charlay_core::types::{FontId, NO_FONT};

use crate::FontStore;

/// Trim surrounding whitespace and lower-case
pub fn normalize_font_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Split a `font-family` value into normalized names, in order
///
/// Empty entries are dropped. An unterminated quote runs to the end.
pub fn parse_font_family(css: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in css.chars() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, ',') => {
                push_name(&mut names, &current);
                current.clear();
            },
            _ => current.push(c),
        }
    }
    push_name(&mut names, &current);
    names
}

fn push_name(names: &mut Vec<String>, raw: &str) {
    let name = normalize_font_name(raw);
    if !name.is_empty() {
        names.push(name);
    }
}

impl FontStore {
    /// Loaded font whose normalized name equals `name`'s, lowest id first
    pub fn find_by_name(&self, name: &str) -> FontId {
        let wanted = normalize_font_name(name);
        if wanted.is_empty() {
            return NO_FONT;
        }
        self.fonts
            .values()
            .find(|font| normalize_font_name(font.name()) == wanted)
            .map_or(NO_FONT, |font| font.id())
    }

    /// First family member that is loaded, else the default font (maybe 0)
    pub fn resolve_family(&self, css: &str) -> FontId {
        self.resolve_names(&parse_font_family(css))
    }

    /// Same as [`FontStore::resolve_family`] for an already parsed list
    pub fn resolve_names(&self, names: &[String]) -> FontId {
        names
            .iter()
            .map(|name| self.find_by_name(name))
            .find(|&id| id != NO_FONT)
            .unwrap_or(self.default_font)
    }
}
