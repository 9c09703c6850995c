use std::path::Path;

use pdfpaint_parse::pdfpaint_core::{FontRegistry, RegistrationOutcome};
use pdfpaint_parse::{FontCache, FontResource, MemoStore, PageResources};

use crate::cli::OutputFormat;
use crate::shared::{ProgressReporter, load_page, open_store, print_warnings, resolve_pages};

/// One font of one page, with what registering its program did.
struct FontRow {
    page: usize,
    tag: String,
    subtype: String,
    family: String,
    program: Option<(&'static str, usize)>,
    to_unicode: bool,
    registration: Option<RegistrationOutcome>,
}

impl FontRow {
    fn new(page: usize, font: &FontResource, registry: &mut FontRegistry) -> Self {
        let registration = font
            .program
            .as_ref()
            .map(|program| registry.register(&font.family, program.clone()));
        FontRow {
            page,
            tag: font.tag.clone(),
            subtype: font.subtype.as_str().to_string(),
            family: font.family.clone(),
            program: font.program.as_ref().map(|p| (p.format.as_str(), p.len())),
            to_unicode: font.to_unicode.is_some(),
            registration,
        }
    }

    fn registration_str(&self) -> String {
        match &self.registration {
            None => "-".to_string(),
            Some(RegistrationOutcome::Registered) => "registered".to_string(),
            Some(RegistrationOutcome::Duplicate) => "duplicate".to_string(),
            Some(RegistrationOutcome::Renamed(alias)) => format!("renamed:{alias}"),
        }
    }
}

pub fn run(
    file: &Path,
    pages: Option<&str>,
    format: OutputFormat,
    show_warnings: bool,
) -> Result<(), i32> {
    let store = open_store(file)?;
    let page_indices = resolve_pages(pages, store.page_count())?;
    let progress = ProgressReporter::new(page_indices.len());
    let store = MemoStore::new(store);
    let mut registry = FontRegistry::new();

    let mut rows = Vec::new();
    for (i, &idx) in page_indices.iter().enumerate() {
        progress.report(i + 1);
        let input = load_page(store.inner(), idx)?;
        let resources = PageResources::parse(&input.resources_text, &store);
        let mut cache = FontCache::new();
        let mut warnings = resources.warnings;
        warnings.extend(cache.preload(&resources.value.fonts, &store));
        if show_warnings {
            print_warnings(idx + 1, &warnings);
        }
        rows.extend(
            cache
                .fonts()
                .iter()
                .map(|font| FontRow::new(idx + 1, font, &mut registry)),
        );
    }
    progress.finish();

    match format {
        OutputFormat::Text => {
            write_text(&rows);
            Ok(())
        }
        OutputFormat::Json => write_json(&rows, &registry),
    }
}

fn write_text(rows: &[FontRow]) {
    println!("page\ttag\tsubtype\tfamily\tprogram\tbytes\ttounicode\tregistration");
    for row in rows {
        let (format, bytes) = match row.program {
            Some((format, len)) => (format, len.to_string()),
            None => ("-", "-".to_string()),
        };
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.page,
            row.tag,
            row.subtype,
            row.family,
            format,
            bytes,
            row.to_unicode,
            row.registration_str(),
        );
    }
}

fn write_json(rows: &[FontRow], registry: &FontRegistry) -> Result<(), i32> {
    let fonts: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "page": row.page,
                "tag": row.tag,
                "subtype": row.subtype,
                "family": row.family,
                "program": row.program.map(|(format, len)| serde_json::json!({
                    "format": format,
                    "bytes": len,
                })),
                "to_unicode": row.to_unicode,
                "registration": row.registration_str(),
            })
        })
        .collect();
    let output = serde_json::json!({
        "fonts": fonts,
        "registered_families": registry.families(),
    });
    let json_str = serde_json::to_string(&output).map_err(|e| {
        eprintln!("Error: failed to serialize output: {e}");
        1
    })?;
    println!("{json_str}");
    Ok(())
}
