//! Error and warning types for pdfpaint.
//!
//! Provides [`PdfError`] for fatal errors that stop processing,
//! [`RenderWarning`] for non-fatal issues that allow best-effort continuation,
//! [`RenderResult`] for pairing a value with collected warnings, and
//! [`RenderOptions`] for configuring resource limits and warning behavior.

use std::fmt;

use crate::unicode_norm::UnicodeNorm;

/// Fatal error types for PDF processing.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Error parsing PDF structure or syntax.
    ParseError(String),
    /// I/O error reading PDF data.
    IoError(String),
    /// A font dictionary is absent or unreadable as a whole.
    FontError(String),
    /// Error during content stream interpretation.
    InterpreterError(String),
    /// The object store could not produce a required object.
    StoreError(String),
    /// A configured resource limit was exceeded.
    ResourceLimitExceeded {
        /// Name of the limit that was exceeded (e.g., "max_stream_bytes").
        limit_name: String,
        /// The configured limit value.
        limit_value: usize,
        /// The actual value that exceeded the limit.
        actual_value: usize,
    },
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
            PdfError::FontError(msg) => write!(f, "font error: {msg}"),
            PdfError::InterpreterError(msg) => write!(f, "interpreter error: {msg}"),
            PdfError::StoreError(msg) => write!(f, "object store error: {msg}"),
            PdfError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
            } => write!(
                f,
                "resource limit exceeded: {limit_name} (limit: {limit_value}, actual: {actual_value})"
            ),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}

/// Machine-readable category of a non-fatal rendering issue.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum WarningCode {
    /// An indirect reference or named resource could not be resolved.
    MissingReference,
    /// An expected key is absent or its value has the wrong shape.
    MalformedDictionary,
    /// A color space, filter, or bit depth that is not implemented.
    UnsupportedEncoding,
    /// A stream failed to decode through its declared filter.
    CorruptStream,
    /// A configured resource limit was reached.
    ResourceLimitReached,
    /// The content stream could not be tokenized to the end.
    TruncatedContent,
    /// Any other warning not covered by specific variants.
    Other(String),
}

impl WarningCode {
    pub fn as_str(&self) -> &str {
        match self {
            WarningCode::MissingReference => "MISSING_REFERENCE",
            WarningCode::MalformedDictionary => "MALFORMED_DICTIONARY",
            WarningCode::UnsupportedEncoding => "UNSUPPORTED_ENCODING",
            WarningCode::CorruptStream => "CORRUPT_STREAM",
            WarningCode::ResourceLimitReached => "RESOURCE_LIMIT_REACHED",
            WarningCode::TruncatedContent => "TRUNCATED_CONTENT",
            WarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal issue encountered while rendering a page.
///
/// The affected feature degraded to an absent or default value and
/// processing continued.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderWarning {
    pub code: WarningCode,
    pub description: String,
    /// Index of the operator in the content stream, if applicable.
    pub operator_index: Option<usize>,
    /// Font resource tag associated with the warning, if applicable.
    pub font_name: Option<String>,
    /// Object the warning refers to, e.g. `"12 0 R"` or `"/Im1"`.
    pub object: Option<String>,
}

impl RenderWarning {
    pub fn new(code: WarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            operator_index: None,
            font_name: None,
            object: None,
        }
    }

    /// Attach an operator index (builder pattern).
    pub fn at_operator(mut self, index: usize) -> Self {
        self.operator_index = Some(index);
        self
    }

    /// Attach a font tag (builder pattern).
    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = Some(font_name.into());
        self
    }

    /// Attach an object label (builder pattern).
    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(ref font_name) = self.font_name {
            write!(f, " [font {font_name}]")?;
        }
        if let Some(ref object) = self.object {
            write!(f, " [object {object}]")?;
        }
        if let Some(index) = self.operator_index {
            write!(f, " [operator #{index}]")?;
        }
        Ok(())
    }
}

/// Result wrapper that pairs a value with collected warnings.
#[derive(Debug, Clone)]
pub struct RenderResult<T> {
    pub value: T,
    pub warnings: Vec<RenderWarning>,
}

impl<T> RenderResult<T> {
    /// A result with no warnings.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<RenderWarning>) -> Self {
        Self { value, warnings }
    }

    /// Returns true if there are no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Transform the value while preserving warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RenderResult<U> {
        RenderResult {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Options controlling rendering behavior and resource limits.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Whether to collect warnings (default: true). Warnings are logged
    /// through `tracing` either way.
    pub collect_warnings: bool,
    /// Maximum number of operators executed per page (default: 1,000,000).
    pub max_operators: usize,
    /// Maximum `width * height` of a decoded image (default: 64 Mi pixels).
    pub max_image_pixels: u64,
    /// Maximum content stream bytes to process (default: 100 MB).
    pub max_stream_bytes: usize,
    /// Unicode normalization applied to emitted text (default: None).
    pub unicode_norm: UnicodeNorm,
    /// Decode DCT images to RGBA instead of passing JPEG bytes through
    /// (default: false). Needs the `jpeg-decoding` feature of the parser.
    pub decode_jpeg: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            collect_warnings: true,
            max_operators: 1_000_000,
            max_image_pixels: 64 * 1024 * 1024,
            max_stream_bytes: 100 * 1024 * 1024,
            unicode_norm: UnicodeNorm::None,
            decode_jpeg: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_error_display() {
        assert_eq!(
            PdfError::ParseError("bad xref".to_string()).to_string(),
            "parse error: bad xref"
        );
        assert_eq!(
            PdfError::StoreError("object 4 0 missing".to_string()).to_string(),
            "object store error: object 4 0 missing"
        );
        assert_eq!(PdfError::Other("boom".to_string()).to_string(), "boom");
    }

    #[test]
    fn pdf_error_resource_limit_display() {
        let err = PdfError::ResourceLimitExceeded {
            limit_name: "max_stream_bytes".to_string(),
            limit_value: 1024,
            actual_value: 2048,
        };
        assert_eq!(
            err.to_string(),
            "resource limit exceeded: max_stream_bytes (limit: 1024, actual: 2048)"
        );
    }

    #[test]
    fn pdf_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let pdf_err: PdfError = io_err.into();
        assert!(matches!(pdf_err, PdfError::IoError(_)));
        assert!(pdf_err.to_string().contains("missing file"));
    }

    #[test]
    fn pdf_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(PdfError::FontError("x".to_string()));
        assert_eq!(err.to_string(), "font error: x");
    }

    #[test]
    fn warning_display_plain() {
        let w = RenderWarning::new(WarningCode::CorruptStream, "bad flate data");
        assert_eq!(w.to_string(), "[CORRUPT_STREAM] bad flate data");
    }

    #[test]
    fn warning_display_with_context() {
        let w = RenderWarning::new(WarningCode::MissingReference, "font not in resources")
            .with_font("F9")
            .with_object("7 0 R")
            .at_operator(12);
        assert_eq!(
            w.to_string(),
            "[MISSING_REFERENCE] font not in resources [font F9] [object 7 0 R] [operator #12]"
        );
        assert_eq!(w.operator_index, Some(12));
    }

    #[test]
    fn corrupt_and_missing_are_distinct_codes() {
        assert_ne!(WarningCode::CorruptStream, WarningCode::MissingReference);
        assert_eq!(WarningCode::Other("x".to_string()).as_str(), "OTHER");
    }

    #[test]
    fn result_helpers() {
        let clean = RenderResult::ok(1);
        assert!(clean.is_clean());
        let dirty = RenderResult::with_warnings(
            10,
            vec![RenderWarning::new(WarningCode::TruncatedContent, "eof")],
        );
        let mapped = dirty.map(|v| v * 2);
        assert_eq!(mapped.value, 20);
        assert_eq!(mapped.warnings.len(), 1);
        assert!(!mapped.is_clean());
    }

    #[test]
    fn options_defaults() {
        let opts = RenderOptions::default();
        assert!(opts.collect_warnings);
        assert_eq!(opts.max_operators, 1_000_000);
        assert_eq!(opts.max_image_pixels, 64 * 1024 * 1024);
        assert_eq!(opts.max_stream_bytes, 100 * 1024 * 1024);
        assert_eq!(opts.unicode_norm, UnicodeNorm::None);
        assert!(!opts.decode_jpeg);
    }
}
