//! Error types for charlay
//!
//! Every failure that can reach the host carries a stable [`ErrorCode`].
//! Codes are grouped by category:
//!
//! - `1xxx` input validation
//! - `2xxx` fonts
//! - `3xxx` document parsing and layout
//! - `4xxx` memory
//! - `5xxx` internal

use serde::{Serialize, Serializer};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LayoutError>;

/// Stable numeric error codes shared with every host embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,

    InvalidInput = 1001,
    EmptyHtml = 1002,
    InvalidViewportWidth = 1003,
    InvalidMode = 1004,
    InvalidOptions = 1005,
    HtmlTooLarge = 1006,

    FontNotLoaded = 2001,
    FontLoadFailed = 2002,
    FontDataInvalid = 2003,
    FontNameEmpty = 2004,
    FontIdNotFound = 2005,
    NoDefaultFont = 2006,
    FontMemoryExceeded = 2007,

    ParseFailed = 3001,
    DocumentCreationFailed = 3002,
    RenderFailed = 3003,
    LayoutFailed = 3004,
    CssParseError = 3005,

    MemoryAllocationFailed = 4001,
    MemoryLimitExceeded = 4002,

    InternalError = 5001,
    SerializationFailed = 5002,
    UnknownError = 5999,
}

impl ErrorCode {
    /// Numeric value as exposed to hosts
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Upper snake case name, e.g. `FONT_LOAD_FAILED`
    pub const fn name(self) -> &'static str {
        match self {
            ErrorCode::Success => "SUCCESS",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::EmptyHtml => "EMPTY_HTML",
            ErrorCode::InvalidViewportWidth => "INVALID_VIEWPORT_WIDTH",
            ErrorCode::InvalidMode => "INVALID_MODE",
            ErrorCode::InvalidOptions => "INVALID_OPTIONS",
            ErrorCode::HtmlTooLarge => "HTML_TOO_LARGE",
            ErrorCode::FontNotLoaded => "FONT_NOT_LOADED",
            ErrorCode::FontLoadFailed => "FONT_LOAD_FAILED",
            ErrorCode::FontDataInvalid => "FONT_DATA_INVALID",
            ErrorCode::FontNameEmpty => "FONT_NAME_EMPTY",
            ErrorCode::FontIdNotFound => "FONT_ID_NOT_FOUND",
            ErrorCode::NoDefaultFont => "NO_DEFAULT_FONT",
            ErrorCode::FontMemoryExceeded => "FONT_MEMORY_EXCEEDED",
            ErrorCode::ParseFailed => "PARSE_FAILED",
            ErrorCode::DocumentCreationFailed => "DOCUMENT_CREATION_FAILED",
            ErrorCode::RenderFailed => "RENDER_FAILED",
            ErrorCode::LayoutFailed => "LAYOUT_FAILED",
            ErrorCode::CssParseError => "CSS_PARSE_ERROR",
            ErrorCode::MemoryAllocationFailed => "MEMORY_ALLOCATION_FAILED",
            ErrorCode::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::SerializationFailed => "SERIALIZATION_FAILED",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// How bad a reported condition is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One error or warning attached to a parse outcome
///
/// Line and column are almost never known at this boundary; they stay
/// `None` unless a collaborator reports them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub code_num: u16,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            code,
            code_num: code.as_u16(),
            message: message.into(),
            severity,
            line: None,
            column: None,
            context: None,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message, Severity::Error)
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message, Severity::Warning)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Main error type for charlay
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("HTML string is empty")]
    EmptyHtml,

    #[error("Viewport width must be positive, got: {0}")]
    InvalidViewportWidth(i32),

    #[error("HTML size exceeds maximum allowed ({max} bytes), got: {size} bytes")]
    HtmlTooLarge { size: usize, max: usize },

    #[error("Font loading failed: {0}")]
    FontLoad(#[from] FontLoadError),

    #[error("Font id not found: {0}")]
    FontIdNotFound(u32),

    #[error("Layout engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("A layout pass is already in progress on this instance")]
    PassInProgress,

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LayoutError {
    /// Stable code reported to hosts for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            LayoutError::EmptyHtml => ErrorCode::EmptyHtml,
            LayoutError::InvalidViewportWidth(_) => ErrorCode::InvalidViewportWidth,
            LayoutError::HtmlTooLarge { .. } => ErrorCode::HtmlTooLarge,
            LayoutError::FontLoad(e) => e.code(),
            LayoutError::FontIdNotFound(_) => ErrorCode::FontIdNotFound,
            LayoutError::Engine(e) => e.code(),
            LayoutError::PassInProgress => ErrorCode::InternalError,
            LayoutError::Serialization(_) => ErrorCode::SerializationFailed,
            LayoutError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Error-severity diagnostic carrying this error's code and message
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}

/// Font loading errors
#[derive(Debug, Error)]
pub enum FontLoadError {
    #[error("Font data is empty")]
    EmptyData,

    #[error("Invalid font data: {0}")]
    InvalidData(String),

    #[error("Font name is empty and the face has no family name")]
    NameEmpty,

    #[error("Out of memory while copying {0} bytes of font data")]
    OutOfMemory(usize),
}

impl FontLoadError {
    pub fn code(&self) -> ErrorCode {
        match self {
            FontLoadError::EmptyData | FontLoadError::InvalidData(_) => ErrorCode::FontDataInvalid,
            FontLoadError::NameEmpty => ErrorCode::FontNameEmpty,
            FontLoadError::OutOfMemory(_) => ErrorCode::MemoryAllocationFailed,
        }
    }
}

/// Failures reported by the external layout engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to create document: {0}")]
    DocumentCreation(String),

    #[error("Layout failed: {0}")]
    Layout(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("CSS parse error: {0}")]
    Css(String),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::DocumentCreation(_) => ErrorCode::DocumentCreationFailed,
            EngineError::Layout(_) => ErrorCode::LayoutFailed,
            EngineError::Render(_) => ErrorCode::RenderFailed,
            EngineError::Css(_) => ErrorCode::CssParseError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_keep_their_numbers() {
        assert_eq!(ErrorCode::Success.as_u16(), 0);
        assert_eq!(ErrorCode::EmptyHtml.as_u16(), 1002);
        assert_eq!(ErrorCode::FontMemoryExceeded.as_u16(), 2007);
        assert_eq!(ErrorCode::LayoutFailed.as_u16(), 3004);
        assert_eq!(ErrorCode::UnknownError.as_u16(), 5999);
    }

    #[test]
    fn diagnostic_json_omits_unknown_position() {
        let diag = Diagnostic::warning(ErrorCode::FontMemoryExceeded, "too much");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["code"], "FONT_MEMORY_EXCEEDED");
        assert_eq!(json["codeNum"], 2007);
        assert_eq!(json["severity"], "warning");
        assert!(json.get("line").is_none());
        assert!(json.get("column").is_none());
    }

    #[test]
    fn engine_errors_map_to_parse_codes() {
        let err: LayoutError = EngineError::DocumentCreation("no root".into()).into();
        assert_eq!(err.code(), ErrorCode::DocumentCreationFailed);
        let err: LayoutError = FontLoadError::InvalidData("bad magic".into()).into();
        assert_eq!(err.code(), ErrorCode::FontDataInvalid);
        assert_eq!(LayoutError::FontIdNotFound(7).code(), ErrorCode::FontIdNotFound);
    }

    #[test]
    fn context_is_serialized_when_set() {
        let diag = LayoutError::FontIdNotFound(7)
            .to_diagnostic()
            .with_context("set_default_font");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["code"], "FONT_ID_NOT_FOUND");
        assert_eq!(json["message"], "Font id not found: 7");
        assert_eq!(json["context"], "set_default_font");
    }
}
