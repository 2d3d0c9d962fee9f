use super::{ReportError, ReportSection};
use crate::workflows::ChartOutput;
use image::GenericImageView;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const IMAGE_MARGIN: f32 = 10.0;
const IMAGE_WIDTH: f32 = 190.0;
const BOTTOM_LIMIT: f32 = 20.0;

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 10.0;
const BODY_LINE_HEIGHT: f32 = 5.0;
const HEADING_LINE_HEIGHT: f32 = 10.0;
const WRAP_COLUMNS: usize = 95;

const LAYER_NAME: &str = "Layer 1";

/// Splits text into lines of at most `columns` characters, breaking on spaces
/// where possible and keeping the text's own line breaks.
pub(crate) fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        if raw.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let indent: String = raw.chars().take_while(|c| c.is_whitespace()).collect();
        let mut current = String::new();
        for word in raw.split_whitespace() {
            let candidate_len = if current.is_empty() {
                indent.chars().count() + word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if candidate_len > columns && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if current.is_empty() {
                current.push_str(&indent);
            } else {
                current.push(' ');
            }
            current.push_str(word);

            while current.chars().count() > columns {
                let head: String = current.chars().take(columns).collect();
                let tail: String = current.chars().skip(columns).collect();
                lines.push(head);
                current = tail;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// The built-in PDF fonts only cover Latin-1.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if u32::from(c) <= 0xFF && !c.is_control() { c } else { '?' })
        .collect()
}

fn approximate_width(text: &str, size: f32) -> f32 {
    // Helvetica averages roughly half an em per glyph; 1pt = 0.3528mm.
    text.chars().count() as f32 * size * 0.5 * 0.3528
}

/// What ended up in the written PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfSummary {
    pub pages: usize,
    pub embedded: Vec<PathBuf>,
    pub placeholders: Vec<PathBuf>,
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
    embedded: Vec<PathBuf>,
    placeholders: Vec<PathBuf>,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
            embedded: Vec::new(),
            placeholders: Vec::new(),
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < BOTTOM_LIMIT {
            self.new_page();
        }
    }

    fn text(&mut self, text: &str, size: f32, bold: bool, x: f32, line_height: f32) {
        self.ensure_space(line_height);
        self.y -= line_height;
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(printable(text), size, Mm(x), Mm(self.y), font);
    }

    fn title(&mut self, title: &str) {
        let x = ((PAGE_WIDTH - approximate_width(title, TITLE_SIZE)) / 2.0).max(MARGIN);
        self.text(title, TITLE_SIZE, true, x, HEADING_LINE_HEIGHT);
        self.y -= HEADING_LINE_HEIGHT;
    }

    fn section(&mut self, section: &ReportSection) {
        self.ensure_space(HEADING_LINE_HEIGHT + BODY_LINE_HEIGHT * 2.0);
        self.text(&section.heading, HEADING_SIZE, true, MARGIN, HEADING_LINE_HEIGHT);
        for line in wrap(&section.body, WRAP_COLUMNS) {
            self.text(&line, BODY_SIZE, false, MARGIN, BODY_LINE_HEIGHT);
        }
        self.y -= BODY_LINE_HEIGHT;
    }

    /// One page per chart, scaled to the usable width (or height, for tall
    /// images). Charts not rendered in this run, and unreadable files, get a
    /// placeholder page instead; a file left over from an earlier run is never
    /// embedded.
    fn image_page(&mut self, chart: &ChartOutput) {
        self.new_page();
        let path = chart.path.as_path();
        let name = chart.file_name();

        if let Some(reason) = &chart.error {
            warn!(image = %path.display(), reason = %reason, "chart not produced in this run");
            self.placeholder(path, &format!("Image {name} not found"));
            return;
        }
        if !path.exists() {
            warn!(image = %path.display(), "report image missing");
            self.placeholder(path, &format!("Image {name} not found"));
            return;
        }

        let dynamic = match image::open(path) {
            Ok(dynamic) => dynamic,
            Err(err) => {
                warn!(image = %path.display(), error = %err, "report image unreadable");
                self.placeholder(path, &format!("Image {name} could not be read: {err}"));
                return;
            }
        };

        let (width_px, height_px) = dynamic.dimensions();
        let (width_px, height_px) = (width_px as f32, height_px as f32);
        if width_px == 0.0 || height_px == 0.0 {
            self.placeholder(path, &format!("Image {name} is empty"));
            return;
        }
        let max_height = PAGE_HEIGHT - 2.0 * IMAGE_MARGIN;
        let mut width_mm = IMAGE_WIDTH;
        let mut height_mm = height_px * width_mm / width_px;
        if height_mm > max_height {
            height_mm = max_height;
            width_mm = width_px * height_mm / height_px;
        }
        let dpi = width_px * 25.4 / width_mm;

        Image::from_dynamic_image(&dynamic).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(IMAGE_MARGIN)),
                translate_y: Some(Mm(PAGE_HEIGHT - IMAGE_MARGIN - height_mm)),
                dpi: Some(dpi),
                ..ImageTransform::default()
            },
        );
        debug!(image = %path.display(), width_mm, height_mm, "image embedded");
        self.embedded.push(path.to_path_buf());
    }

    fn placeholder(&mut self, path: &Path, message: &str) {
        self.text(message, HEADING_SIZE, true, IMAGE_MARGIN, HEADING_LINE_HEIGHT);
        self.placeholders.push(path.to_path_buf());
    }

    fn save(self, path: &Path) -> Result<PdfSummary, ReportError> {
        let file = File::create(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let summary = PdfSummary {
            pages: self.pages,
            embedded: self.embedded,
            placeholders: self.placeholders,
        };
        self.doc.save(&mut BufWriter::new(file))?;
        Ok(summary)
    }
}

/// Writes the title, every section and then one page per chart.
pub fn write_report(
    path: &Path,
    title: &str,
    sections: &[ReportSection],
    images: &[ChartOutput],
) -> Result<PdfSummary, ReportError> {
    let mut writer = PageWriter::new(title)?;
    writer.title(title);
    for section in sections {
        writer.section(section);
    }
    for image in images {
        writer.image_page(image);
    }
    writer.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_spaces_and_keeps_blank_lines() {
        let lines = wrap("alpha beta gamma\n\ndelta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma", "", "delta"]);
    }

    #[test]
    fn wrap_keeps_indentation_and_splits_long_words() {
        assert_eq!(wrap("   - item", 20), vec!["   - item"]);
        assert_eq!(wrap("   - abcdefghij", 8), vec!["   -", "   abcde", "fghij"]);
    }

    #[test]
    fn charts_not_rendered_this_run_are_never_embedded() {
        let dir = tempfile::tempdir().expect("temp dir");
        let leftover = dir.path().join("sentiment_analysis_plot.png");
        image::RgbImage::new(4, 4)
            .save(&leftover)
            .expect("leftover chart written");
        let charts = [
            ChartOutput::missing(leftover.clone(), "no posts were fetched"),
            ChartOutput {
                path: dir.path().join("never_written.png"),
                error: None,
            },
        ];

        let summary = write_report(&dir.path().join("report.pdf"), "Report", &[], &charts)
            .expect("report written");
        assert!(summary.embedded.is_empty());
        assert_eq!(
            summary.placeholders,
            vec![leftover, dir.path().join("never_written.png")]
        );
        assert_eq!(summary.pages, 3);
    }

    #[test]
    fn rendered_charts_are_embedded() {
        let dir = tempfile::tempdir().expect("temp dir");
        let chart = dir.path().join("weather_plot.png");
        image::RgbImage::new(8, 4).save(&chart).expect("chart written");

        let summary = write_report(
            &dir.path().join("report.pdf"),
            "Report",
            &[],
            &[ChartOutput {
                path: chart.clone(),
                error: None,
            }],
        )
        .expect("report written");
        assert_eq!(summary.embedded, vec![chart]);
        assert!(summary.placeholders.is_empty());
    }

    #[test]
    fn non_latin_characters_are_replaced() {
        assert_eq!(printable("Karmøy 12°C ✓"), "Karmøy 12°C ?");
    }
}
