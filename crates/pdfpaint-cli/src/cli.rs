use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pdfpaint_parse::pdfpaint_core::{RenderOptions, UnicodeNorm};

/// Dump the display lists and embedded fonts of PDF pages.
#[derive(Debug, Parser)]
#[command(name = "pdfpaint", about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the display list of each page: paths, text, and images
    Render {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Apply Unicode normalization to rendered text
        #[arg(long, value_enum)]
        unicode_norm: Option<UnicodeNormArg>,

        /// Stop interpreting a page after this many operators
        #[arg(long)]
        max_operators: Option<usize>,

        /// Decode JPEG images to RGBA instead of passing them through
        #[arg(long)]
        decode_jpeg: bool,

        /// Print rendering warnings to stderr
        #[arg(long)]
        warnings: bool,
    },

    /// List the fonts each page declares and register their programs
    Fonts {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Print font resolution warnings to stderr
        #[arg(long)]
        warnings: bool,
    },
}

/// Output format for both subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text (tab-separated)
    Text,
    /// JSON output
    Json,
}

/// Unicode normalization form for the `--unicode-norm` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnicodeNormArg {
    /// Canonical Decomposition, followed by Canonical Composition
    Nfc,
    /// Canonical Decomposition
    Nfd,
    /// Compatibility Decomposition, followed by Canonical Composition
    Nfkc,
    /// Compatibility Decomposition
    Nfkd,
}

impl From<UnicodeNormArg> for UnicodeNorm {
    fn from(arg: UnicodeNormArg) -> Self {
        match arg {
            UnicodeNormArg::Nfc => UnicodeNorm::Nfc,
            UnicodeNormArg::Nfd => UnicodeNorm::Nfd,
            UnicodeNormArg::Nfkc => UnicodeNorm::Nfkc,
            UnicodeNormArg::Nfkd => UnicodeNorm::Nfkd,
        }
    }
}

/// Build render options from the `render` flags.
pub fn render_options(
    unicode_norm: Option<UnicodeNormArg>,
    max_operators: Option<usize>,
    decode_jpeg: bool,
) -> RenderOptions {
    let defaults = RenderOptions::default();
    RenderOptions {
        unicode_norm: unicode_norm.map(Into::into).unwrap_or_default(),
        max_operators: max_operators.unwrap_or(defaults.max_operators),
        decode_jpeg,
        ..defaults
    }
}
