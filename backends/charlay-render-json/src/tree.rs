//! Rows, lines, runs, blocks and pages
//!
//! Everything here is derived from a slice of [`CharRecord`]s and borrows
//! from it. Nothing is kept between serialize calls.

use std::collections::BTreeMap;

use charlay_core::types::{CharRecord, TextDecoration, Viewport};
use serde::Serialize;

/// Characters sharing one exact `y`, ordered by `x`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row<'a> {
    pub row_index: usize,
    pub y: i32,
    pub children: Vec<&'a CharRecord>,
}

/// A line of text with its characters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Line<'a> {
    pub line_index: usize,
    pub y: i32,
    pub baseline: i32,
    pub height: i32,
    pub width: i32,
    pub text_align: &'static str,
    pub characters: Vec<&'a CharRecord>,
}

/// Maximal stretch of same-styled characters within a line
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Run<'a> {
    pub run_index: usize,
    pub x: i32,
    pub font_family: &'a str,
    pub font_size: i32,
    pub font_weight: i32,
    pub font_style: &'a str,
    pub color: &'a str,
    pub background_color: &'a str,
    pub text_decoration: &'a TextDecoration,
    pub characters: Vec<&'a CharRecord>,
}

/// A line split into runs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLine<'a> {
    pub line_index: usize,
    pub y: i32,
    pub baseline: i32,
    pub height: i32,
    pub width: i32,
    pub text_align: &'static str,
    pub runs: Vec<Run<'a>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoxSpacing {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block<'a> {
    pub block_index: usize,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub margin: BoxSpacing,
    pub padding: BoxSpacing,
    pub background_color: &'static str,
    pub border_radius: i32,
    pub lines: Vec<RunLine<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<'a> {
    pub page_index: usize,
    pub width: i32,
    pub height: i32,
    pub blocks: Vec<Block<'a>>,
}

/// Top of the `full` view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument<'a> {
    pub version: &'static str,
    pub parser_version: &'a str,
    pub viewport: Viewport,
    pub pages: Vec<Page<'a>>,
}

/// Top of the `simple` view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleDocument<'a> {
    pub version: &'static str,
    pub viewport: Viewport,
    pub lines: Vec<Line<'a>>,
}

/// Bucket by exact `y`, buckets ascending, members by `x`
fn bucket_by_y(records: &[CharRecord]) -> BTreeMap<i32, Vec<&CharRecord>> {
    let mut buckets: BTreeMap<i32, Vec<&CharRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(record.y).or_default().push(record);
    }
    for members in buckets.values_mut() {
        members.sort_by_key(|record| record.x);
    }
    buckets
}

pub fn group_into_rows(records: &[CharRecord]) -> Vec<Row<'_>> {
    bucket_by_y(records)
        .into_iter()
        .enumerate()
        .map(|(row_index, (y, children))| Row {
            row_index,
            y,
            children,
        })
        .collect()
}

pub fn group_into_lines(records: &[CharRecord]) -> Vec<Line<'_>> {
    bucket_by_y(records)
        .into_iter()
        .enumerate()
        .map(|(line_index, (y, characters))| {
            let height = characters.iter().map(|c| c.height).max().unwrap_or(0);
            let baseline = characters.iter().map(|c| c.baseline).max().unwrap_or(0);
            let width = match (characters.first(), characters.iter().map(|c| c.right()).max()) {
                (Some(first), Some(right)) => right - first.x,
                _ => 0,
            };
            Line {
                line_index,
                y,
                baseline,
                height,
                width,
                text_align: "left",
                characters,
            }
        })
        .collect()
}

pub fn group_into_runs<'a>(characters: &[&'a CharRecord]) -> Vec<Run<'a>> {
    let mut runs: Vec<Run<'a>> = Vec::new();
    for &ch in characters {
        if let Some(run) = runs
            .last_mut()
            .filter(|run| run.characters.last().is_some_and(|prev| prev.same_style(ch)))
        {
            run.characters.push(ch);
            continue;
        }
        let run_index = runs.len();
        runs.push(Run {
            run_index,
            x: ch.x,
            font_family: &ch.font_family,
            font_size: ch.font_size,
            font_weight: ch.font_weight,
            font_style: &ch.font_style,
            color: &ch.color,
            background_color: &ch.background_color,
            text_decoration: &ch.text_decoration,
            characters: vec![ch],
        });
    }
    runs
}

impl<'a> Line<'a> {
    pub fn into_runs(self) -> RunLine<'a> {
        RunLine {
            line_index: self.line_index,
            y: self.y,
            baseline: self.baseline,
            height: self.height,
            width: self.width,
            text_align: self.text_align,
            runs: group_into_runs(&self.characters),
        }
    }
}

impl<'a> Block<'a> {
    /// One `div` spanning the viewport width and the content height
    pub fn single(width: i32, lines: Vec<RunLine<'a>>) -> Self {
        let height = lines.last().map_or(0, |line| line.y + line.height);
        Block {
            block_index: 0,
            kind: "div",
            x: 0,
            y: 0,
            width,
            height,
            margin: BoxSpacing::default(),
            padding: BoxSpacing::default(),
            background_color: "#00000000",
            border_radius: 0,
            lines,
        }
    }
}
