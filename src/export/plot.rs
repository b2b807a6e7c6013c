//! Multi-series line charts rendered to PNG at the configured pixel size.

use std::fs;
use std::ops::Range;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use super::fonts::register_plot_fonts;
use crate::config::FigureSize;
use crate::error::{AppResult, BenchError};

/// Series colours, cycled in order.
pub const PALETTE: [RGBColor; 21] = [
    RGBColor(0x00, 0x00, 0xFF), // blue
    RGBColor(0x00, 0x80, 0x00), // green
    RGBColor(0xFF, 0x00, 0x00), // red
    RGBColor(0x00, 0xFF, 0xFF), // cyan
    RGBColor(0xFF, 0x00, 0xFF), // magenta
    RGBColor(0xFF, 0xFF, 0x00), // yellow
    RGBColor(0x00, 0x00, 0x00), // black
    RGBColor(0x80, 0x00, 0x80), // purple
    RGBColor(0xFF, 0xC0, 0xCB), // pink
    RGBColor(0xA5, 0x2A, 0x2A), // brown
    RGBColor(0xFF, 0xA5, 0x00), // orange
    RGBColor(0x00, 0x80, 0x80), // teal
    RGBColor(0xFF, 0x7F, 0x50), // coral
    RGBColor(0xAD, 0xD8, 0xE6), // lightblue
    RGBColor(0x00, 0xFF, 0x00), // lime
    RGBColor(0xE6, 0xE6, 0xFA), // lavender
    RGBColor(0x40, 0xE0, 0xD0), // turquoise
    RGBColor(0x00, 0x64, 0x00), // darkgreen
    RGBColor(0xD2, 0xB4, 0x8C), // tan
    RGBColor(0xFA, 0x80, 0x72), // salmon
    RGBColor(0xFF, 0xD7, 0x00), // gold
];

/// Colour of the `index`-th series.
pub fn series_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

pub(crate) fn plot_error<E: std::fmt::Display>(e: E) -> BenchError {
    BenchError::Plot(e.to_string())
}

/// Axis range covering every finite value, padded by 5%.
pub(crate) fn padded_range<'a>(values: impl Iterator<Item = &'a f64>) -> Option<Range<f64>> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return None;
    }
    let pad = if hi > lo {
        0.05 * (hi - lo)
    } else {
        0.5 * lo.abs().max(1.0)
    };
    Some(lo - pad..hi + pad)
}

/// One labelled curve.
#[derive(Debug, Clone)]
pub struct Series {
    /// Legend text
    pub label: String,
    /// `(x, y)` pairs in drawing order
    pub points: Vec<(f64, f64)>,
}

/// Labeled line chart with grid, axis descriptions, title and legend.
#[derive(Debug, Clone)]
pub struct LineChart {
    title: String,
    x_label: String,
    y_label: String,
    size: FigureSize,
    series: Vec<Series>,
}

impl LineChart {
    /// Empty chart at the default figure size.
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            size: FigureSize::default(),
            series: Vec::new(),
        }
    }

    /// Set the pixel size of the saved PNG.
    pub fn with_size(mut self, size: FigureSize) -> Self {
        self.size = size;
        self
    }

    /// Add one curve; `x` and `y` are paired element-wise.
    pub fn add_series(&mut self, label: impl Into<String>, x: &[f64], y: &[f64]) {
        self.series.push(Series {
            label: label.into(),
            points: x.iter().copied().zip(y.iter().copied()).collect(),
        });
    }

    /// Curves added so far.
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Write the chart as a PNG of exactly `size` pixels.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let (x_range, y_range) = self.ranges()?;
        register_plot_fonts()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        {
            let root = BitMapBackend::new(path, (self.size.width, self.size.height))
                .into_drawing_area();
            self.draw(&root, x_range, y_range)?;
            root.present().map_err(plot_error)?;
        }
        info!(path = %path.display(), series = self.series.len(), "Figure written");
        Ok(())
    }

    fn ranges(&self) -> AppResult<(Range<f64>, Range<f64>)> {
        let no_data = || BenchError::Plot(format!("'{}' has no data to plot", self.title));
        let x_range = padded_range(self.series.iter().flat_map(|s| s.points.iter().map(|p| &p.0)))
            .ok_or_else(no_data)?;
        let y_range = padded_range(self.series.iter().flat_map(|s| s.points.iter().map(|p| &p.1)))
            .ok_or_else(no_data)?;
        Ok((x_range, y_range))
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        x_range: Range<f64>,
        y_range: Range<f64>,
    ) -> AppResult<()> {
        root.fill(&WHITE).map_err(plot_error)?;
        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 32))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()
            .map_err(plot_error)?;

        for (index, series) in self.series.iter().enumerate() {
            let color = series_color(index);
            let finite = series
                .points
                .iter()
                .copied()
                .filter(|(x, y)| x.is_finite() && y.is_finite());
            chart
                .draw_series(LineSeries::new(finite, color.stroke_width(1)))
                .map_err(plot_error)?
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .draw()
            .map_err(plot_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_range() {
        let range = padded_range([0.0, 10.0, f64::NAN].iter()).unwrap();
        assert!((range.start + 0.5).abs() < 1e-12);
        assert!((range.end - 10.5).abs() < 1e-12);

        let flat = padded_range([2.0, 2.0].iter()).unwrap();
        assert!(flat.start < 2.0 && flat.end > 2.0);

        assert!(padded_range([f64::NAN].iter()).is_none());
    }

    #[test]
    fn test_palette_cycles() {
        let (first, wrapped) = (series_color(0), series_color(PALETTE.len()));
        assert_eq!((first.0, first.1, first.2), (wrapped.0, wrapped.1, wrapped.2));
    }

    /// Width and height from the IHDR chunk of a PNG file.
    fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        (width, height)
    }

    #[test]
    fn test_saved_png_has_configured_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figs").join("iv.png");
        let mut chart = LineChart::new("Diramics 2F200 IV Curve", "VDS (V)", "ID (mA)")
            .with_size(FigureSize {
                width: 640,
                height: 480,
            });
        chart.add_series("VGS=-0.20", &[0.0, 0.5, 1.0], &[0.0, 2.0, 3.0]);
        chart.add_series("VGS=-0.15", &[0.0, 0.5, 1.0], &[0.0, 4.0, 6.5]);

        chart.save(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(png_dimensions(&bytes), (640, 480));
        assert_eq!(chart.series().len(), 2);
    }

    #[test]
    fn test_empty_chart_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        let chart = LineChart::new("empty", "x", "y");
        assert!(matches!(chart.save(&path), Err(BenchError::Plot(_))));
        assert!(!path.exists());
    }
}
