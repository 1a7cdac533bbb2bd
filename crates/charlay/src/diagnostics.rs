//! What a parse produced, what went wrong, and how long it took

use charlay_core::error::{Diagnostic, ErrorCode, LayoutError, Result};
use serde::Serialize;
use serde_json::Value;

/// Timing and size figures for one parse, times in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetrics {
    /// Validation and document preparation
    pub parse_time: f64,
    /// Time spent inside the layout engine
    pub layout_time: f64,
    pub serialize_time: f64,
    pub total_time: f64,
    pub character_count: usize,
    pub input_size: usize,
    pub chars_per_second: f64,
    /// Font bytes plus glyph cache estimate after the pass
    pub memory_used: usize,
}

impl ParseMetrics {
    /// Fill in the throughput from the count and total time
    pub fn with_throughput(mut self) -> Self {
        self.chars_per_second = if self.total_time > 0.0 {
            self.character_count as f64 / (self.total_time / 1000.0)
        } else {
            0.0
        };
        self
    }
}

/// Result of [`crate::HtmlLayoutParser::parse_with_diagnostics`]
///
/// A successful outcome may still carry warnings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseOutcome {
    pub success: bool,
    /// The serialized layout
    pub data: Option<String>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub metrics: Option<ParseMetrics>,
}

#[derive(Serialize)]
struct OutcomeJson<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "no_diagnostics")]
    errors: &'a [Diagnostic],
    #[serde(skip_serializing_if = "no_diagnostics")]
    warnings: &'a [Diagnostic],
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<&'a ParseMetrics>,
}

fn no_diagnostics(list: &&[Diagnostic]) -> bool {
    list.is_empty()
}

impl ParseOutcome {
    pub fn succeeded(data: String, metrics: ParseMetrics) -> Self {
        Self {
            success: true,
            data: Some(data),
            metrics: Some(metrics),
            ..Self::default()
        }
    }

    pub fn failed(error: Diagnostic) -> Self {
        Self {
            success: false,
            errors: vec![error],
            ..Self::default()
        }
    }

    pub fn warn(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.warnings.push(Diagnostic::warning(code, message));
    }

    /// First error code, if the parse failed
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.errors.first().map(|diagnostic| diagnostic.code)
    }

    /// `{success, data?, errors?, warnings?, metrics?}`
    ///
    /// `data` is embedded as a JSON value, not as a quoted string.
    pub fn to_json(&self) -> Result<String> {
        let data = self
            .data
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .map_err(|e| LayoutError::Serialization(e.to_string()))?;
        serde_json::to_string(&OutcomeJson {
            success: self.success,
            data,
            errors: &self.errors,
            warnings: &self.warnings,
            metrics: self.metrics.as_ref(),
        })
        .map_err(|e| LayoutError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_is_embedded_not_quoted() {
        let outcome = ParseOutcome::succeeded("[{\"x\":1}]".to_string(), ParseMetrics::default());
        let value: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"][0]["x"], 1);
        assert!(value.get("errors").is_none());
        assert_eq!(value["metrics"]["characterCount"], 0);
    }

    #[test]
    fn failure_lists_the_error() {
        let outcome = ParseOutcome::failed(LayoutError::EmptyHtml.to_diagnostic());
        let value: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["errors"][0]["code"], "EMPTY_HTML");
        assert_eq!(value["errors"][0]["codeNum"], 1002);
        assert_eq!(value["errors"][0]["severity"], "error");
        assert!(value.get("data").is_none());
        assert_eq!(outcome.error_code(), Some(ErrorCode::EmptyHtml));
    }

    #[test]
    fn throughput_needs_time() {
        let metrics = ParseMetrics {
            character_count: 500,
            total_time: 250.0,
            ..ParseMetrics::default()
        }
        .with_throughput();
        assert_eq!(metrics.chars_per_second, 2000.0);
        assert_eq!(ParseMetrics::default().with_throughput().chars_per_second, 0.0);
    }
}
