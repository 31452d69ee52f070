use log::{error, info, warn};
use plotters::prelude::*;
use std::fmt;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use crate::ledger::LedgerSnapshot;

/// Configuration options for the footprint chart
///
/// This structure contains all the customizable properties of the bar chart
/// summarizing the ledger.
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    /// Creates the default chart configuration
    ///
    /// # Returns
    /// * `ChartOptions` - Configuration with:
    ///   - 1200x600 pixel dimensions
    ///   - Footprint overview title and axis labels
    fn default() -> Self {
        Self {
            title: "Carbon Footprint Overview".to_string(),
            x_label: "Name (Year)".to_string(),
            y_label: "Total Carbon Footprint (kg CO2)".to_string(),
            width: 1200,
            height: 600,
        }
    }
}

/// One bar of the chart: a submitter/year category and its total
#[derive(Clone, Debug, PartialEq)]
pub struct ChartBar {
    pub label: String,
    pub year: i32,
    pub total_co2: f64,
}

/// Why no chart was drawn
#[derive(Clone, Debug, PartialEq)]
pub enum ChartSkip {
    /// The ledger file does not exist
    NoLedger,
    /// The ledger has no row with a name, a year and a total
    Empty,
}

impl fmt::Display for ChartSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartSkip::NoLedger => write!(f, "ledger file not found, could not create chart"),
            ChartSkip::Empty => {
                write!(f, "no chartable data in the ledger, could not create chart")
            }
        }
    }
}

/// Result of a chart render. No error escapes [`render_chart`].
#[derive(Clone, Debug, PartialEq)]
pub enum ChartOutcome {
    Rendered(PathBuf),
    Skipped(ChartSkip),
    Failed(String),
}

impl ChartOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, ChartOutcome::Rendered(_))
    }

    /// Message for the user when the chart is not fresh
    pub fn notice(&self) -> Option<String> {
        match self {
            ChartOutcome::Rendered(_) => None,
            ChartOutcome::Skipped(reason) => Some(format!("Chart not updated: {}.", reason)),
            ChartOutcome::Failed(message) => Some(format!("Chart could not be drawn: {}", message)),
        }
    }
}

/// Extracts the bars to draw from a ledger snapshot
///
/// Rows without a name, a year or a total are dropped. The rest are sorted
/// by year, keeping append order within a year.
///
/// # Examples
/// ```
/// use carbon_footprint::chart::{chart_data, ChartSkip};
/// use carbon_footprint::ledger::LedgerSnapshot;
///
/// assert_eq!(chart_data(&LedgerSnapshot::NoData), Err(ChartSkip::NoLedger));
/// assert_eq!(chart_data(&LedgerSnapshot::Rows(vec![])), Err(ChartSkip::Empty));
/// ```
pub fn chart_data(snapshot: &LedgerSnapshot) -> Result<Vec<ChartBar>, ChartSkip> {
    let rows = match snapshot {
        LedgerSnapshot::NoData => return Err(ChartSkip::NoLedger),
        LedgerSnapshot::Rows(rows) => rows,
    };

    let mut bars: Vec<ChartBar> = rows
        .iter()
        .filter_map(|row| {
            let name = row.name.as_ref()?;
            let year = row.year?;
            let total_co2 = row.total_co2?;
            Some(ChartBar {
                label: format!("{} ({})", name, year),
                year,
                total_co2,
            })
        })
        .collect();

    if bars.is_empty() {
        return Err(ChartSkip::Empty);
    }

    bars.sort_by_key(|bar| bar.year);
    Ok(bars)
}

/// Renders the ledger as a bar chart PNG at `path`
///
/// The previous image is overwritten. Skips and failures are logged and
/// returned as an outcome; callers carry on without a fresh chart.
///
/// # Arguments
/// * `snapshot` - Ledger rows to chart
/// * `path` - Fixed output path of the PNG
/// * `options` - Chart styling options
pub fn render_chart(
    snapshot: &LedgerSnapshot,
    path: &Path,
    options: &ChartOptions,
) -> ChartOutcome {
    info!("Chart rendering started: {}", path.display());

    let bars = match chart_data(snapshot) {
        Ok(bars) => bars,
        Err(reason) => {
            warn!("{}", reason);
            return ChartOutcome::Skipped(reason);
        }
    };

    match draw_bar_chart(&bars, path, options) {
        Ok(()) => {
            info!("Chart successfully created: {}", path.display());
            ChartOutcome::Rendered(path.to_path_buf())
        }
        Err(e) => {
            error!("Error drawing chart {}: {}", path.display(), e);
            ChartOutcome::Failed(e.to_string())
        }
    }
}

/// Draws the bars with one labelled category per bar
///
/// # Implementation Notes
/// * Categories are segments of a discrete axis, labelled by index
/// * The Y-axis starts at 0 and leaves 10% headroom above the tallest bar
fn draw_bar_chart(
    bars: &[ChartBar],
    path: &Path,
    options: &ChartOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_y = bars
        .iter()
        .map(|bar| bar.total_co2)
        .fold(0.0_f64, f64::max);
    let y_top = if max_y > 0.0 { max_y * 1.1 } else { 1.0 };
    let labels: Vec<&str> = bars.iter().map(|bar| bar.label.as_str()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(120)
        .y_label_area_size(60)
        .build_cartesian_2d((0..bars.len()).into_segmented(), 0.0..y_top)?;

    let label_formatter = |value: &SegmentValue<usize>| match value {
        SegmentValue::CenterOf(i) => labels.get(*i).map(|l| l.to_string()).unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&label_formatter)
        .x_label_style(
            ("sans-serif", 12)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    // skyblue
    let bar_color = RGBColor(135, 206, 235);
    chart.draw_series(
        Histogram::vertical(&chart)
            .style(bar_color.filled())
            .margin(4)
            .data(bars.iter().enumerate().map(|(i, bar)| (i, bar.total_co2))),
    )?;

    root.present()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerRow;

    fn row(name: Option<&str>, year: Option<i32>, total: Option<f64>) -> LedgerRow {
        LedgerRow {
            name: name.map(str::to_string),
            year,
            electricity_co2: Some(1.0),
            waste_co2: Some(1.0),
            travel_co2: Some(1.0),
            total_co2: total,
        }
    }

    fn snapshot() -> LedgerSnapshot {
        LedgerSnapshot::Rows(vec![
            row(Some("Zed"), Some(2024), Some(30.0)),
            row(Some("Acme"), Some(2021), Some(10.0)),
            row(None, Some(2020), Some(99.0)),
            row(Some("Bolt"), Some(2024), Some(20.0)),
            row(Some("Acme"), Some(2022), None),
        ])
    }

    #[test]
    fn bars_are_filtered_and_sorted_by_year() {
        let bars = chart_data(&snapshot()).unwrap();
        let labels: Vec<&str> = bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Acme (2021)", "Zed (2024)", "Bolt (2024)"]);
        assert_eq!(bars[0].total_co2, 10.0);
    }

    #[test]
    fn chart_data_is_stable_across_renders() {
        let snapshot = snapshot();
        assert_eq!(chart_data(&snapshot), chart_data(&snapshot));
    }

    #[test]
    fn nothing_to_draw_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static/graph.png");

        let outcome = render_chart(&LedgerSnapshot::NoData, &path, &ChartOptions::default());
        assert_eq!(outcome, ChartOutcome::Skipped(ChartSkip::NoLedger));

        let incomplete = LedgerSnapshot::Rows(vec![row(None, None, Some(5.0))]);
        let outcome = render_chart(&incomplete, &path, &ChartOptions::default());
        assert_eq!(outcome, ChartOutcome::Skipped(ChartSkip::Empty));
        assert!(outcome.notice().is_some());
        assert!(!path.exists());
    }

    #[test]
    fn render_never_panics_and_reports_its_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static/graph.png");

        // Text drawing needs a system font, so a headless host may report Failed.
        match render_chart(&snapshot(), &path, &ChartOptions::default()) {
            ChartOutcome::Rendered(written) => {
                assert_eq!(written, path);
                assert!(path.exists());
            }
            ChartOutcome::Failed(message) => assert!(!message.is_empty()),
            ChartOutcome::Skipped(reason) => panic!("unexpected skip: {}", reason),
        }
    }
}
