//! PDF report for a single submission.
//!
//! The report is laid out in two passes: [`layout_report`] places every cell
//! and image on A4 pages in millimetres (top-left origin), then
//! [`write_pdf`] draws that page model with `lopdf`.

use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lazy_static::lazy_static;
use log::{info, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use regex::Regex;
use std::fs::{self, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::calculator::SubmissionRecord;
use crate::error::{LedgerError, ReportError};
use crate::ledger::{LEDGER_HEADER, LedgerSnapshot};

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap();
}

const REPORT_TITLE: &str = "Carbon Footprint Report";
const GRAPH_MISSING: &str = "Graph file not found. Could not include graph";
const MM_TO_PT: f32 = 72.0 / 25.4;

/// Page geometry, in millimetres
#[derive(Clone, Debug)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub row_height: f32,
    /// A table row ending below this offset starts a new page with a fresh header
    pub table_break_y: f32,
    /// The chart starts on a new page when the offset is past this point
    pub image_break_y: f32,
    /// Content never extends below this offset
    pub bottom_limit: f32,
    pub footer_y: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin: 10.0,
            row_height: 10.0,
            table_break_y: 260.0,
            image_break_y: 200.0,
            bottom_limit: 277.0,
            footer_y: 282.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    fn resource_name(self) -> &'static str {
        match self {
            FontStyle::Regular => "F1",
            FontStyle::Bold => "F2",
            FontStyle::Italic => "F3",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Something placed on a page
#[derive(Clone, Debug, PartialEq)]
pub enum Mark {
    Cell {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        text: String,
        font: FontStyle,
        size: f32,
        align: Align,
        border: bool,
    },
    Image {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub marks: Vec<Mark>,
}

/// Laid-out report, ready to draw
#[derive(Clone, Debug, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
}

impl ReportLayout {
    /// Every piece of text, page by page, in placement order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|page| {
            page.marks.iter().filter_map(|mark| match mark {
                Mark::Cell { text, .. } if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
        })
    }

    pub fn has_image(&self) -> bool {
        self.pages
            .iter()
            .flat_map(|page| &page.marks)
            .any(|mark| matches!(mark, Mark::Image { .. }))
    }
}

/// Mean, maximum and minimum of the ledger's totals
#[derive(Clone, Debug, PartialEq)]
pub enum SummaryStats {
    Unavailable,
    Totals { mean: f64, max: f64, min: f64 },
}

impl SummaryStats {
    pub fn lines(&self) -> Vec<String> {
        match self {
            SummaryStats::Unavailable => vec!["No data available for summary.".to_string()],
            SummaryStats::Totals { mean, max, min } => vec![
                format!("Average Total CO2: {:.2} kg", mean),
                format!("Max Total CO2: {:.2} kg", max),
                format!("Min Total CO2: {:.2} kg", min),
            ],
        }
    }
}

/// Summary statistics over every parseable total in the ledger
pub fn summarize(snapshot: &LedgerSnapshot) -> SummaryStats {
    let totals = snapshot.totals();
    if totals.is_empty() {
        return SummaryStats::Unavailable;
    }

    let mean = totals.iter().sum::<f64>() / totals.len() as f64;
    let max = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = totals.iter().copied().fold(f64::INFINITY, f64::min);
    SummaryStats::Totals { mean, max, min }
}

/// Complete ledger records sorted by name, then year
pub fn history_table(snapshot: &LedgerSnapshot) -> Vec<SubmissionRecord> {
    let mut records = snapshot.complete_records();
    records.sort_by(|a, b| a.name.cmp(&b.name).then(a.year.cmp(&b.year)));
    records
}

/// Deterministic report file name for a submitter and year
///
/// # Examples
/// ```
/// use carbon_footprint::report::report_file_name;
///
/// assert_eq!(report_file_name("Acme", 2024), "Acme_2024_report.pdf");
/// assert_eq!(report_file_name("R&D/Ops", 2024), "R&D_Ops_2024_report.pdf");
/// ```
pub fn report_file_name(name: &str, year: i32) -> String {
    let safe = UNSAFE_FILENAME_CHARS.replace_all(name.trim(), "_");
    format!("{}_{}_report.pdf", safe, year)
}

/// Decoded chart image, ready to embed
pub struct ChartImage {
    pub width: u32,
    pub height: u32,
    rgb: Vec<u8>,
}

impl ChartImage {
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        let image = image::open(path)?.to_rgb8();
        Ok(Self {
            width: image.width(),
            height: image.height(),
            rgb: image.into_raw(),
        })
    }
}

/// Loads the chart if one is there; a missing or unreadable chart is not an error
fn load_chart(path: &Path) -> Option<ChartImage> {
    if !path.exists() {
        warn!("Chart {} not found, report will use a placeholder", path.display());
        return None;
    }
    match ChartImage::open(path) {
        Ok(chart) => Some(chart),
        Err(e) => {
            warn!("Chart {} could not be read: {}", path.display(), e);
            None
        }
    }
}

/// Builds the report for `record` and writes it to `out_dir`
///
/// A missing or unreadable ledger, like a missing chart, degrades its
/// section to a message; only failures to write the output itself are
/// returned as errors. Any previous
/// report for the same name and year is overwritten.
///
/// # Arguments
/// * `record` - The submission being reported
/// * `ledger` - Ledger rows for the historical table and summary, or the read error
/// * `chart_path` - Chart PNG to embed, if present
/// * `out_dir` - Report folder, created if needed
/// * `generated_on` - Date printed on the first page
///
/// # Returns
/// * `Result<PathBuf, ReportError>` - Path of the written PDF
pub fn build_report(
    record: &SubmissionRecord,
    ledger: Result<&LedgerSnapshot, &LedgerError>,
    chart_path: &Path,
    out_dir: &Path,
    generated_on: NaiveDate,
) -> Result<PathBuf, ReportError> {
    let chart = load_chart(chart_path);
    let layout = layout_report(
        record,
        ledger,
        chart.as_ref().map(|c| (c.width, c.height)),
        generated_on,
        &PageSetup::default(),
    );
    let bytes = write_pdf(&layout, chart.as_ref(), &PageSetup::default())?;

    create_dir_all(out_dir)?;
    let path = out_dir.join(report_file_name(&record.name, record.year));
    fs::write(&path, bytes)?;

    info!("PDF report generated: {}", path.display());
    Ok(path)
}

/// Places every section of the report on pages
///
/// `chart_size` is the pixel size of the chart to embed, or `None` for the
/// placeholder. A ledger read error is printed in place of the historical
/// table and the summary.
pub fn layout_report(
    record: &SubmissionRecord,
    ledger: Result<&LedgerSnapshot, &LedgerError>,
    chart_size: Option<(u32, u32)>,
    generated_on: NaiveDate,
    setup: &PageSetup,
) -> ReportLayout {
    let mut composer = Composer::new(setup.clone());

    composer.line(
        &format!("Generated on {}", generated_on.format("%Y-%m-%d")),
        FontStyle::Italic,
        9.0,
    );

    // Input echo
    composer.line("Input Data:", FontStyle::Bold, 12.0);
    composer.row(&[(50.0, "Field"), (70.0, "Value")], FontStyle::Bold, 10.0);
    for (field, value) in record.fields() {
        composer.row(&[(50.0, field), (70.0, value.as_str())], FontStyle::Regular, 10.0);
    }
    composer.feed(10.0);

    // Historical table
    composer.line("Grouped and Sorted Data:", FontStyle::Bold, 12.0);
    match ledger {
        Ok(snapshot) if snapshot.is_no_data() => {
            composer.line("No historical data available.", FontStyle::Regular, 10.0);
        }
        Ok(snapshot) => composer.history(&history_table(snapshot)),
        Err(e) => composer.line(&read_error_line(e), FontStyle::Regular, 10.0),
    }
    composer.feed(10.0);

    // Summary
    composer.line("Summary Statistics:", FontStyle::Bold, 12.0);
    let summary = match ledger {
        Ok(snapshot) => summarize(snapshot).lines(),
        Err(e) => vec![read_error_line(e)],
    };
    for line in summary {
        composer.line(&line, FontStyle::Regular, 10.0);
    }
    composer.feed(10.0);

    // Chart
    composer.line("Carbon Footprint Graph:", FontStyle::Bold, 12.0);
    match chart_size {
        Some((width, height)) if width > 0 && height > 0 => composer.image(width, height),
        _ => composer.line(GRAPH_MISSING, FontStyle::Regular, 10.0),
    }

    composer.finish()
}

fn read_error_line(e: &LedgerError) -> String {
    format!("Error reading or processing data: {}", e)
}

const HISTORY_WIDTHS: [f32; 6] = [35.0, 15.0, 35.0, 35.0, 35.0, 35.0];

/// Cursor-based page builder in the style of a simple PDF writer
struct Composer {
    setup: PageSetup,
    pages: Vec<Page>,
    y: f32,
}

impl Composer {
    fn new(setup: PageSetup) -> Self {
        let mut composer = Self {
            setup,
            pages: Vec::new(),
            y: 0.0,
        };
        composer.add_page();
        composer
    }

    fn add_page(&mut self) {
        self.pages.push(Page::default());
        let number = self.pages.len();
        let width = self.content_width();
        let (margin, footer_y) = (self.setup.margin, self.setup.footer_y);

        self.place(
            margin,
            margin,
            width,
            10.0,
            REPORT_TITLE,
            FontStyle::Bold,
            12.0,
            Align::Center,
            false,
        );
        let footer = format!("Page {}", number);
        self.place(
            margin,
            footer_y,
            width,
            10.0,
            &footer,
            FontStyle::Italic,
            8.0,
            Align::Center,
            false,
        );
        self.y = margin + 20.0;
    }

    fn current_page(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn content_width(&self) -> f32 {
        self.setup.width - 2.0 * self.setup.margin
    }

    #[allow(clippy::too_many_arguments)]
    fn place(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        text: &str,
        font: FontStyle,
        size: f32,
        align: Align,
        border: bool,
    ) {
        let text = fit_text(text, w, size);
        self.current_page().marks.push(Mark::Cell {
            x,
            y,
            w,
            h,
            text,
            font,
            size,
            align,
            border,
        });
    }

    /// Starts a new page if `h` more millimetres would run past the bottom limit
    fn ensure_room(&mut self, h: f32) {
        if self.y + h > self.setup.bottom_limit {
            self.add_page();
        }
    }

    fn line(&mut self, text: &str, font: FontStyle, size: f32) {
        let h = self.setup.row_height;
        self.ensure_room(h);
        let (x, w) = (self.setup.margin, self.content_width());
        self.place(x, self.y, w, h, text, font, size, Align::Left, false);
        self.y += h;
    }

    fn row(&mut self, cells: &[(f32, &str)], font: FontStyle, size: f32) {
        let h = self.setup.row_height;
        self.ensure_room(h);
        let mut x = self.setup.margin;
        for (w, text) in cells {
            self.place(x, self.y, *w, h, text, font, size, Align::Center, true);
            x += w;
        }
        self.y += h;
    }

    fn feed(&mut self, h: f32) {
        self.y += h;
    }

    fn history_header(&mut self) {
        let cells: Vec<(f32, &str)> = HISTORY_WIDTHS
            .iter()
            .copied()
            .zip(LEDGER_HEADER)
            .collect();
        self.row(&cells, FontStyle::Bold, 8.0);
    }

    fn history(&mut self, records: &[SubmissionRecord]) {
        self.history_header();
        for record in records {
            let values = [
                record.name.clone(),
                record.year.to_string(),
                format!("{:.2}", record.electricity_co2),
                format!("{:.2}", record.waste_co2),
                format!("{:.2}", record.travel_co2),
                format!("{:.2}", record.total_co2),
            ];
            let cells: Vec<(f32, &str)> = HISTORY_WIDTHS
                .iter()
                .copied()
                .zip(values.iter().map(String::as_str))
                .collect();
            self.row(&cells, FontStyle::Regular, 9.0);

            if self.y > self.setup.table_break_y {
                self.add_page();
                self.history_header();
            }
        }
    }

    fn image(&mut self, width_px: u32, height_px: u32) {
        let w = self.content_width();
        let h = w * height_px as f32 / width_px as f32;
        if self.y > self.setup.image_break_y || self.y + h > self.setup.bottom_limit {
            self.add_page();
        }
        let (x, y) = (self.setup.margin, self.y);
        self.current_page().marks.push(Mark::Image { x, y, w, h });
        self.y += h;
    }

    fn finish(self) -> ReportLayout {
        ReportLayout { pages: self.pages }
    }
}

// Helvetica averages about half an em per glyph.
fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 / MM_TO_PT
}

/// Truncates `text` with an ellipsis so it fits a `w` millimetre cell
fn fit_text(text: &str, w: f32, size: f32) -> String {
    if approx_text_width(text, size) <= w - 2.0 {
        return text.to_string();
    }
    let mut fitted: String = text.to_string();
    while !fitted.is_empty() && approx_text_width(&format!("{}...", fitted), size) > w - 2.0 {
        fitted.pop();
    }
    format!("{}...", fitted)
}

/// Latin-1 subset of WinAnsi; anything else becomes '?'
fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Draws a laid-out report into PDF bytes
///
/// `chart` must be present whenever the layout holds an image mark.
pub fn write_pdf(
    layout: &ReportLayout,
    chart: Option<&ChartImage>,
    setup: &PageSetup,
) -> Result<Vec<u8>, ReportError> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();

    let font = |base: &str| {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base.to_string(),
            "Encoding" => "WinAnsiEncoding",
        }
    };
    let regular_id = document.add_object(font("Helvetica"));
    let bold_id = document.add_object(font("Helvetica-Bold"));
    let italic_id = document.add_object(font("Helvetica-Oblique"));

    let mut resources = dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
            "F3" => italic_id,
        },
    };
    if let Some(chart) = chart {
        let image_id = document.add_object(image_stream(chart)?);
        resources.set("XObject", dictionary! { "Im1" => image_id });
    }
    let resources_id = document.add_object(resources);

    let page_width = setup.width * MM_TO_PT;
    let page_height = setup.height * MM_TO_PT;

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let content = page_content(page, page_height, chart.is_some());
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&content.encode()?)?;
        let compressed = encoder.finish()?;
        let content_id =
            document.add_object(Stream::new(dictionary! { "Filter" => "FlateDecode" }, compressed));

        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => Object::Array(vec![
                0.into(),
                0.into(),
                page_width.into(),
                page_height.into(),
            ]),
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::from(*id)).collect::<Vec<Object>>(),
        "Count" => page_ids.len() as i64,
    };
    document.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes)?;
    Ok(bytes)
}

fn image_stream(chart: &ChartImage) -> Result<Stream, ReportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&chart.rgb)?;
    let compressed = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => chart.width as i64,
        "Height" => chart.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, compressed))
}

fn page_content(page: &Page, page_height: f32, has_image: bool) -> Content {
    let mut operations = Vec::new();
    let pt = |mm: f32| mm * MM_TO_PT;

    for mark in &page.marks {
        match mark {
            Mark::Cell {
                x,
                y,
                w,
                h,
                text,
                font,
                size,
                align,
                border,
            } => {
                if *border {
                    operations.push(Operation::new("w", vec![0.57_f32.into()]));
                    operations.push(Operation::new(
                        "re",
                        vec![
                            pt(*x).into(),
                            (page_height - pt(y + h)).into(),
                            pt(*w).into(),
                            pt(*h).into(),
                        ],
                    ));
                    operations.push(Operation::new("S", vec![]));
                }
                if text.is_empty() {
                    continue;
                }

                let text_x = match align {
                    Align::Left => x + 1.0,
                    Align::Center => x + (w - approx_text_width(text, *size)) / 2.0,
                };
                // Baseline sits a third of the font size below the cell's middle.
                let baseline = page_height - pt(y + h / 2.0) - size * 0.35;

                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![font.resource_name().into(), (*size).into()],
                ));
                operations.push(Operation::new("Td", vec![pt(text_x).into(), baseline.into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            Mark::Image { x, y, w, h } => {
                if !has_image {
                    continue;
                }
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        pt(*w).into(),
                        0.into(),
                        0.into(),
                        pt(*h).into(),
                        pt(*x).into(),
                        (page_height - pt(y + h)).into(),
                    ],
                ));
                operations.push(Operation::new("Do", vec!["Im1".into()]));
                operations.push(Operation::new("Q", vec![]));
            }
        }
    }

    Content { operations }
}
