//! Error types for the object store, parsing, and interpreter layers.
//!
//! Uses [`thiserror`] for error derivation. [`BackendError`] converts into
//! the core [`PdfError`] for callers that want one error type.

use pdfpaint_core::{PdfError, WarningCode};
use thiserror::Error;

use crate::store::ObjRef;

/// Failure to produce an object from an [`ObjectStore`](crate::ObjectStore).
///
/// `Clone` so memoized failures can be handed to every requester.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No object with this number and generation exists.
    #[error("object {0} not found")]
    MissingObject(ObjRef),

    /// The object exists but has no stream data.
    #[error("object {0} is not a stream")]
    NotAStream(ObjRef),

    /// Stream data could not be decoded through its filters.
    #[error("failed to decode stream {object}: {message}")]
    Decode { object: ObjRef, message: String },

    /// Any failure reported by the underlying document backend.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this is a decode failure rather than an absent object.
    pub fn is_corrupt_stream(&self) -> bool {
        matches!(self, StoreError::Decode { .. })
    }

    /// Diagnostic category when this failure degrades a field.
    pub fn warning_code(&self) -> WarningCode {
        match self {
            StoreError::Decode { .. } => WarningCode::CorruptStream,
            StoreError::NotAStream(_) => WarningCode::MalformedDictionary,
            StoreError::MissingObject(_) | StoreError::Backend(_) => WarningCode::MissingReference,
        }
    }
}

/// Reason an image was left out of the display list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Filter, color space, or bit depth outside the supported set.
    #[error("unsupported image: {0}")]
    Unsupported(String),

    /// Image data failed its filter or is shorter than its dimensions.
    #[error("corrupt image data: {0}")]
    Corrupt(String),

    /// Dimensions or other required keys are missing or invalid.
    #[error("malformed image dictionary: {0}")]
    Malformed(String),

    /// `width * height` exceeds the configured limit.
    #[error("image of {pixels} pixels exceeds the limit of {limit}")]
    TooLarge { pixels: u64, limit: u64 },
}

impl ImageError {
    /// Diagnostic category for this failure.
    pub fn warning_code(&self) -> WarningCode {
        match self {
            ImageError::Unsupported(_) => WarningCode::UnsupportedEncoding,
            ImageError::Corrupt(_) => WarningCode::CorruptStream,
            ImageError::Malformed(_) => WarningCode::MalformedDictionary,
            ImageError::TooLarge { .. } => WarningCode::ResourceLimitReached,
        }
    }
}

/// Error type for parsing and interpretation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Error from PDF parsing (structure, syntax, object resolution).
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Error reading PDF data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A font dictionary is absent or unreadable as a whole.
    #[error("font error: {0}")]
    Font(String),

    /// Error during content stream interpretation.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// The object store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A core library error.
    #[error(transparent)]
    Core(#[from] PdfError),
}

impl From<BackendError> for PdfError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(msg) => PdfError::ParseError(msg),
            BackendError::Io(e) => PdfError::IoError(e.to_string()),
            BackendError::Font(msg) => PdfError::FontError(msg),
            BackendError::Interpreter(msg) => PdfError::InterpreterError(msg),
            BackendError::Store(e) => PdfError::StoreError(e.to_string()),
            BackendError::Core(e) => e,
        }
    }
}

impl From<lopdf::Error> for BackendError {
    fn from(err: lopdf::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_messages() {
        let r = ObjRef::new(12, 0);
        assert_eq!(
            StoreError::MissingObject(r).to_string(),
            "object 12 0 R not found"
        );
        let decode = StoreError::Decode {
            object: r,
            message: "bad zlib header".to_string(),
        };
        assert_eq!(
            decode.to_string(),
            "failed to decode stream 12 0 R: bad zlib header"
        );
        assert!(decode.is_corrupt_stream());
        assert!(!StoreError::NotAStream(r).is_corrupt_stream());
    }

    #[test]
    fn image_error_categories() {
        assert_eq!(
            ImageError::Unsupported("CCITTFaxDecode".into()).warning_code(),
            WarningCode::UnsupportedEncoding
        );
        assert_eq!(
            ImageError::Corrupt("bad".into()).warning_code(),
            WarningCode::CorruptStream
        );
        let too_large = ImageError::TooLarge {
            pixels: 200,
            limit: 100,
        };
        assert_eq!(too_large.warning_code(), WarningCode::ResourceLimitReached);
        assert_eq!(
            too_large.to_string(),
            "image of 200 pixels exceeds the limit of 100"
        );
    }

    #[test]
    fn backend_error_io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: BackendError = io_err.into();
        assert!(matches!(err, BackendError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn backend_error_from_store_error_is_transparent() {
        let err: BackendError = StoreError::Backend("xref broken".to_string()).into();
        assert_eq!(err.to_string(), "backend error: xref broken");
    }

    #[test]
    fn backend_error_to_pdf_error() {
        let pdf_err: PdfError = BackendError::Parse("bad syntax".to_string()).into();
        assert_eq!(pdf_err, PdfError::ParseError("bad syntax".to_string()));

        let pdf_err: PdfError = BackendError::Font("no dict".to_string()).into();
        assert_eq!(pdf_err, PdfError::FontError("no dict".to_string()));

        let pdf_err: PdfError =
            BackendError::Store(StoreError::MissingObject(ObjRef::new(3, 0))).into();
        assert_eq!(
            pdf_err,
            PdfError::StoreError("object 3 0 R not found".to_string())
        );
    }

    #[test]
    fn core_error_roundtrip() {
        let err: BackendError = PdfError::Other("x".to_string()).into();
        assert!(matches!(err, BackendError::Core(_)));
        let back: PdfError = err.into();
        assert_eq!(back, PdfError::Other("x".to_string()));
    }
}
