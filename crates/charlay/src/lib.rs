//! Charlay - HTML in, one JSON record per character out
//!
//! An external layout engine does the CSS and the boxes. Charlay sits on its
//! font and text callbacks, resolves every character against the fonts you
//! loaded, and hands back the result in one of four JSON shapes:
//!
//! 1. `flat` - every character in drawing order
//! 2. `byRow` - characters grouped by exact `y`
//! 3. `simple` - lines with their metrics
//! 4. `full` - document, page, block, line and styled run
//!
//! # Example
//!
//! ```ignore
//! use charlay::prelude::*;
//!
//! let mut parser = HtmlLayoutParser::new(my_engine);
//! parser.load_font(&font_bytes, "Arial");
//! let json = parser.parse("<p>Hi</p>", None, 800, OutputMode::Simple)?;
//! ```
//!
//! Everything lives inside the [`HtmlLayoutParser`]: no globals, no locks.
//! Create one parser per independent font set.

pub mod capture;
pub mod diagnostics;
pub mod parser;

pub use charlay_core::{config, error, traits, types};
pub use charlay_fontdb as fontdb;
pub use charlay_render_json as render_json;

pub use capture::{CaptureSession, CaptureState, LayoutCapture};
pub use diagnostics::{ParseMetrics, ParseOutcome};
pub use parser::{HtmlLayoutParser, PassReport};

/// Common imports for typical usage
pub mod prelude {
    pub use charlay_core::{
        config::ParserConfig,
        error::{Diagnostic, ErrorCode, LayoutError, Result},
        traits::{DocumentContainer, LayoutEngine},
        types::{CharRecord, FontId, Viewport},
    };
    pub use charlay_render_json::OutputMode;

    pub use crate::{HtmlLayoutParser, ParseOutcome};
}
