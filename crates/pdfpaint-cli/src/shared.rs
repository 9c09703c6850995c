use std::io::{self, IsTerminal, Write};
use std::path::Path;

use pdfpaint_parse::pdfpaint_core::{BBox, RenderWarning};
use pdfpaint_parse::{LopdfStore, PageInput};

use crate::page_range::parse_page_range;

/// Read and parse a PDF file, printing a message and returning exit code 1
/// on failure.
pub fn open_store(file: &Path) -> Result<LopdfStore, i32> {
    let bytes = std::fs::read(file).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            eprintln!("Error: file not found: {}", file.display());
        } else {
            eprintln!("Error: failed to read {}: {e}", file.display());
        }
        1
    })?;
    LopdfStore::load(&bytes).map_err(|e| {
        eprintln!("Error: failed to open PDF: {e}");
        1
    })
}

/// 0-based page indices selected by `--pages`, or every page.
pub fn resolve_pages(pages: Option<&str>, page_count: usize) -> Result<Vec<usize>, i32> {
    match pages {
        Some(range) => parse_page_range(range, page_count).map_err(|e| {
            eprintln!("Error: {e}");
            1
        }),
        None => Ok((0..page_count).collect()),
    }
}

/// Load page `idx` of `store`, reporting failures with the 1-based number.
pub fn load_page(store: &LopdfStore, idx: usize) -> Result<PageInput, i32> {
    store.page(idx).map_err(|e| {
        eprintln!("Error reading page {}: {e}", idx + 1);
        1
    })
}

pub fn print_warnings(page_number: usize, warnings: &[RenderWarning]) {
    for warning in warnings {
        eprintln!("page {page_number}: {warning}");
    }
}

/// `x0 top x1 bottom`, tab-separated, two decimals.
pub fn bbox_columns(bbox: &BBox) -> String {
    format!(
        "{:.2}\t{:.2}\t{:.2}\t{:.2}",
        bbox.x0, bbox.top, bbox.x1, bbox.bottom
    )
}

/// Prints "Rendering page N/M..." to stderr when stderr is a terminal.
pub struct ProgressReporter {
    total: usize,
    is_tty: bool,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            is_tty: io::stderr().is_terminal(),
        }
    }

    /// Report page `current` (1-based position in the selection).
    pub fn report(&self, current: usize) {
        if self.is_tty {
            eprint!("\rRendering page {}/{}...", current, self.total);
            let _ = io::stderr().flush();
        }
    }

    pub fn finish(&self) {
        if self.is_tty {
            eprint!("\r{}\r", " ".repeat(40));
            let _ = io::stderr().flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_by_default() {
        assert_eq!(resolve_pages(None, 3), Ok(vec![0, 1, 2]));
    }

    #[test]
    fn bad_range_is_exit_code_one() {
        assert_eq!(resolve_pages(Some("9"), 3), Err(1));
    }

    #[test]
    fn missing_file_is_exit_code_one() {
        assert_eq!(
            open_store(Path::new("/nonexistent/file.pdf")).map(|_| ()),
            Err(1)
        );
    }

    #[test]
    fn bbox_formatting() {
        let bbox = BBox::new(1.0, 2.5, 3.25, 4.0);
        assert_eq!(bbox_columns(&bbox), "1.00\t2.50\t3.25\t4.00");
    }
}
