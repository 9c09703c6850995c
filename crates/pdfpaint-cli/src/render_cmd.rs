use std::path::Path;

use pdfpaint_parse::pdfpaint_core::{
    DisplayItem, ImageItem, PaintMode, PathItem, RenderOptions, TextItem,
};
use pdfpaint_parse::{LopdfStore, MemoStore, RenderedPage, render_page};

use crate::cli::OutputFormat;
use crate::shared::{
    ProgressReporter, bbox_columns, load_page, open_store, print_warnings, resolve_pages,
};

pub fn run(
    file: &Path,
    pages: Option<&str>,
    format: OutputFormat,
    options: &RenderOptions,
    show_warnings: bool,
) -> Result<(), i32> {
    let store = open_store(file)?;
    let page_indices = resolve_pages(pages, store.page_count())?;
    let progress = ProgressReporter::new(page_indices.len());
    let store = MemoStore::new(store);

    let mut rendered = Vec::with_capacity(page_indices.len());
    for (i, &idx) in page_indices.iter().enumerate() {
        progress.report(i + 1);
        let page = render_one(&store, idx, options, show_warnings)?;
        rendered.push((idx + 1, page));
    }
    progress.finish();

    match format {
        OutputFormat::Text => {
            for (page_number, page) in &rendered {
                write_text(*page_number, page);
            }
            Ok(())
        }
        OutputFormat::Json => write_json(&rendered),
    }
}

fn render_one(
    store: &MemoStore<LopdfStore>,
    idx: usize,
    options: &RenderOptions,
    show_warnings: bool,
) -> Result<RenderedPage, i32> {
    let input = load_page(store.inner(), idx)?;
    let result = render_page(store, &input, options);
    if show_warnings {
        print_warnings(idx + 1, &result.warnings);
    }
    Ok(result.value)
}

fn paint_str(paint: PaintMode) -> &'static str {
    match paint {
        PaintMode::Fill => "fill",
        PaintMode::Stroke => "stroke",
        PaintMode::FillAndStroke => "fill+stroke",
    }
}

fn write_text(page_number: usize, page: &RenderedPage) {
    for item in page.display_list.iter() {
        match item {
            DisplayItem::Path(path) => println!("{page_number}\t{}", path_line(path)),
            DisplayItem::Text(text) => println!("{page_number}\t{}", text_line(text)),
            DisplayItem::Image(image) => println!("{page_number}\t{}", image_line(image)),
        }
    }
}

fn path_line(path: &PathItem) -> String {
    let bbox = path
        .bbox()
        .map_or_else(|| "-\t-\t-\t-".to_string(), |b| bbox_columns(&b));
    format!(
        "path\t{}\t{bbox}\t{}\t{}\t{:.2}",
        paint_str(path.paint),
        path.fill_color.to_hex(),
        path.stroke_color.to_hex(),
        path.line_width,
    )
}

fn text_line(text: &TextItem) -> String {
    format!(
        "text\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}\t{}\t{}{}",
        text.position.x,
        text.position.y,
        text.font_size,
        text.rotation_degrees,
        text.font_family,
        text.color.to_hex(),
        text.text,
        if text.invisible { "\t(invisible)" } else { "" },
    )
}

fn image_line(image: &ImageItem) -> String {
    format!(
        "image\t{}\t{}\t{}x{}\t{}",
        image.name,
        bbox_columns(&image.bbox),
        image.pixel_width,
        image.pixel_height,
        image.raster.mime_type(),
    )
}

/// Images are summarized; their pixels are not written out.
fn item_to_json(item: &DisplayItem) -> Result<serde_json::Value, serde_json::Error> {
    match item {
        DisplayItem::Image(image) => Ok(serde_json::json!({
            "kind": "image",
            "name": image.name,
            "transform": image.transform.to_array(),
            "bbox": image.bbox,
            "pixel_width": image.pixel_width,
            "pixel_height": image.pixel_height,
            "mime_type": image.raster.mime_type(),
            "bytes": image.raster.byte_len(),
        })),
        other => serde_json::to_value(other),
    }
}

fn write_json(rendered: &[(usize, RenderedPage)]) -> Result<(), i32> {
    let mut pages = Vec::with_capacity(rendered.len());
    for (page_number, page) in rendered {
        let items = page
            .display_list
            .iter()
            .map(item_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                eprintln!("Error: failed to serialize page {page_number}: {e}");
                1
            })?;
        pages.push(serde_json::json!({
            "page": page_number,
            "truncated": page.truncated,
            "items": items,
        }));
    }
    let json_str = serde_json::to_string(&pages).map_err(|e| {
        eprintln!("Error: failed to serialize output: {e}");
        1
    })?;
    println!("{json_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfpaint_parse::pdfpaint_core::{
        Color, Ctm, GraphicsState, PathBuilder, Point, RasterBuffer, WritingMode,
    };

    fn red_square() -> PathItem {
        let mut builder = PathBuilder::new(Ctm::identity());
        builder.rectangle(10.0, 10.0, 20.0, 20.0);
        let gs = GraphicsState {
            fill_color: Color::new(1.0, 0.0, 0.0),
            ..GraphicsState::default()
        };
        PathItem::from_painted(builder.fill(&gs), &Ctm::identity(), 100.0)
    }

    #[test]
    fn path_columns() {
        assert_eq!(
            path_line(&red_square()),
            "path\tfill\t10.00\t70.00\t30.00\t90.00\t#ff0000\t#000000\t1.00"
        );
    }

    #[test]
    fn text_columns() {
        let text = TextItem {
            position: Point::new(72.0, 100.0),
            rotation_degrees: 0.0,
            font_family: "Helvetica".to_string(),
            font_size: 12.0,
            color: Color::black(),
            text: "Hi".to_string(),
            segments: Vec::new(),
            writing_mode: WritingMode::Horizontal,
            invisible: true,
        };
        assert_eq!(
            text_line(&text),
            "text\t72.00\t100.00\t12.00\t0.00\tHelvetica\t#000000\tHi\t(invisible)"
        );
    }

    #[test]
    fn image_json_omits_pixels() {
        let raster = RasterBuffer::rgba(1, 1, vec![1, 2, 3, 255]).unwrap();
        let image = ImageItem::place("Im0", &Ctm::new(8.0, 0.0, 0.0, 4.0, 0.0, 0.0), 10.0, raster);
        let json = item_to_json(&DisplayItem::Image(image)).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["bytes"], 4);
        assert!(json.get("raster").is_none());
    }

    #[test]
    fn path_json_is_tagged() {
        let json = item_to_json(&DisplayItem::Path(red_square())).unwrap();
        assert_eq!(json["kind"], "path");
    }
}
