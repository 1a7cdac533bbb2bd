//! JSON Serializer - four ways to look at the same characters
//!
//! Capture leaves a flat list of [`CharRecord`]s. Canvas code wants
//! different shapes depending on what it draws, so the same list can come out
//! as:
//!
//! - `flat` - the records as captured
//! - `byRow` - rows of records sharing a `y`
//! - `simple` - lines with their metrics
//! - `full` - document, page, block, line and styled run
//!
//! Every mode is a pure function of its input. An empty record list still
//! produces a well-formed, empty container.

use charlay_core::{
    error::{LayoutError, Result},
    types::{CharRecord, Viewport},
};
use serde::Serialize;

pub mod tree;

use tree::{Block, LayoutDocument, Line, Page, SimpleDocument};

/// Version stamped on `simple` and `full` documents
pub const JSON_SCHEMA_VERSION: &str = "2.0";

/// Which view to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputMode {
    #[default]
    Flat,
    ByRow,
    Simple,
    Full,
}

impl OutputMode {
    /// Mode from its name; unknown or missing names mean `flat`
    pub fn parse(mode: Option<&str>) -> Self {
        match mode {
            Some("full") => OutputMode::Full,
            Some("simple") => OutputMode::Simple,
            Some("byRow" | "byrow") => OutputMode::ByRow,
            _ => OutputMode::Flat,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OutputMode::Flat => "flat",
            OutputMode::ByRow => "byRow",
            OutputMode::Simple => "simple",
            OutputMode::Full => "full",
        }
    }
}

impl std::str::FromStr for OutputMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(OutputMode::parse(Some(s)))
    }
}

/// Turns captured characters into JSON text
#[derive(Debug, Clone)]
pub struct LayoutSerializer {
    parser_version: String,
    pretty: bool,
}

impl LayoutSerializer {
    pub fn new(parser_version: impl Into<String>) -> Self {
        Self {
            parser_version: parser_version.into(),
            pretty: false,
        }
    }

    /// Indent the output (handy when eyeballing it)
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn serialize(
        &self,
        records: &[CharRecord],
        viewport: Viewport,
        mode: OutputMode,
    ) -> Result<String> {
        let json = match mode {
            OutputMode::Flat => self.to_json(records)?,
            OutputMode::ByRow => self.to_json(&tree::group_into_rows(records))?,
            OutputMode::Simple => self.to_json(&SimpleDocument {
                version: JSON_SCHEMA_VERSION,
                viewport,
                lines: tree::group_into_lines(records),
            })?,
            OutputMode::Full => self.to_json(&self.document(records, viewport))?,
        };
        log::debug!(
            "Serialized {} characters as {} ({} bytes)",
            records.len(),
            mode.as_str(),
            json.len()
        );
        Ok(json)
    }

    /// The `full` view as a value, before it becomes text
    pub fn document<'a>(
        &'a self,
        records: &'a [CharRecord],
        viewport: Viewport,
    ) -> LayoutDocument<'a> {
        let lines = tree::group_into_lines(records)
            .into_iter()
            .map(Line::into_runs)
            .collect();
        LayoutDocument {
            version: JSON_SCHEMA_VERSION,
            parser_version: &self.parser_version,
            viewport,
            pages: vec![Page {
                page_index: 0,
                width: viewport.width,
                height: viewport.height,
                blocks: vec![Block::single(viewport.width, lines)],
            }],
        }
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        json.map_err(|e| LayoutError::Serialization(e.to_string()))
    }
}

impl Default for LayoutSerializer {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_parse() {
        assert_eq!(OutputMode::parse(Some("full")), OutputMode::Full);
        assert_eq!(OutputMode::parse(Some("simple")), OutputMode::Simple);
        assert_eq!(OutputMode::parse(Some("byRow")), OutputMode::ByRow);
        assert_eq!(OutputMode::parse(Some("byrow")), OutputMode::ByRow);
        assert_eq!(OutputMode::parse(Some("FULL")), OutputMode::Flat);
        assert_eq!(OutputMode::parse(None), OutputMode::Flat);
        assert_eq!("simple".parse::<OutputMode>(), Ok(OutputMode::Simple));
    }

    #[test]
    fn full_document_carries_versions() {
        let serializer = LayoutSerializer::new("9.9.9");
        let json = serializer
            .serialize(&[], Viewport::new(320, 1000), OutputMode::Full)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "2.0");
        assert_eq!(value["parserVersion"], "9.9.9");
        assert_eq!(value["pages"][0]["blocks"][0]["type"], "div");
        assert_eq!(value["pages"][0]["blocks"][0]["width"], 320);
    }

    #[test]
    fn pretty_output_is_still_the_same_json() {
        let record = CharRecord {
            character: "A".into(),
            ..CharRecord::default()
        };
        let records = [record];
        let compact = LayoutSerializer::default()
            .serialize(&records, Viewport::new(100, 100), OutputMode::Flat)
            .unwrap();
        let pretty = LayoutSerializer::default()
            .pretty(true)
            .serialize(&records, Viewport::new(100, 100), OutputMode::Flat)
            .unwrap();
        assert!(pretty.contains('\n'));
        let a: serde_json::Value = serde_json::from_str(&compact).unwrap();
        let b: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
    }
}
