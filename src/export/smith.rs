//! 2x2 S-parameter figure: Smith charts for S11/S22, dB traces for S21/S12.
//! Drawn as SVG, then converted to a vector PDF page.
//!
//! Smith chart grid lines are lines of constant resistance or reactance in
//! the normalised impedance plane mapped through `Γ = (z - 1) / (z + 1)`.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fs;
use std::path::Path;

use num_complex::Complex64;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use super::fonts::{register_plot_fonts, svg_options};
use super::plot::{padded_range, plot_error, series_color};
use crate::config::FigureSize;
use crate::error::{AppResult, BenchError};
use crate::rf::{FrequencyUnit, TwoPortNetwork};

const RESISTANCES: [f64; 6] = [0.0, 0.2, 0.5, 1.0, 2.0, 5.0];
const REACTANCES: [f64; 5] = [0.2, 0.5, 1.0, 2.0, 5.0];
const GRID_SAMPLES: usize = 200;
const GRID_COLOR: RGBColor = RGBColor(0xB0, 0xB0, 0xB0);
const SMITH_EXTENT: f64 = 1.1;

/// Reflection coefficient of normalised impedance `z`.
pub fn gamma(z: Complex64) -> Complex64 {
    (z - 1.0) / (z + 1.0)
}

/// Constant-resistance circle, swept over the whole reactance line.
pub fn resistance_circle(r: f64) -> Vec<(f64, f64)> {
    (0..=GRID_SAMPLES)
        .map(|i| {
            let theta = -FRAC_PI_2 + 1e-3 + (PI - 2e-3) * i as f64 / GRID_SAMPLES as f64;
            let g = gamma(Complex64::new(r, theta.tan()));
            (g.re, g.im)
        })
        .collect()
}

/// Constant-reactance arc from `r = 0` towards the open circuit.
pub fn reactance_arc(x: f64) -> Vec<(f64, f64)> {
    (0..=GRID_SAMPLES)
        .map(|i| {
            let phi = (FRAC_PI_2 - 1e-3) * i as f64 / GRID_SAMPLES as f64;
            let g = gamma(Complex64::new(phi.tan(), x));
            (g.re, g.im)
        })
        .collect()
}

/// Every grid line of the chart, the real axis included.
pub fn grid_lines() -> Vec<Vec<(f64, f64)>> {
    let mut lines: Vec<Vec<(f64, f64)>> = RESISTANCES.iter().map(|&r| resistance_circle(r)).collect();
    for x in REACTANCES {
        lines.push(reactance_arc(x));
        lines.push(reactance_arc(-x));
    }
    lines.push(vec![(-1.0, 0.0), (1.0, 0.0)]);
    lines
}

/// The four-panel figure for a set of networks.
pub struct SParameterGrid<'a> {
    title: &'a str,
    networks: &'a [TwoPortNetwork],
    unit: FrequencyUnit,
    size: FigureSize,
}

impl<'a> SParameterGrid<'a> {
    /// Grid over `networks`, frequency axes in `unit`.
    pub fn new(
        title: &'a str,
        networks: &'a [TwoPortNetwork],
        unit: FrequencyUnit,
        size: FigureSize,
    ) -> Self {
        Self {
            title,
            networks,
            unit,
            size,
        }
    }

    /// Draw the figure as an SVG document.
    pub fn render_svg(&self) -> AppResult<String> {
        if self.networks.is_empty() {
            return Err(BenchError::Plot(format!("'{}' has no networks", self.title)));
        }
        register_plot_fonts()?;
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.size.width, self.size.height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(plot_error)?;
            let body = root
                .titled(self.title, ("sans-serif", 40))
                .map_err(plot_error)?;
            let panels = body.split_evenly((2, 2));
            self.smith_panel(&panels[0], "S11", 0, 0)?;
            self.db_panel(&panels[1], "S21", 1, 0, false)?;
            self.db_panel(&panels[2], "S12", 0, 1, true)?;
            self.smith_panel(&panels[3], "S22", 1, 1)?;
            root.present().map_err(plot_error)?;
        }
        Ok(svg)
    }

    /// Single-page PDF of the figure, text embedded from the bundled font.
    pub fn render_pdf(&self) -> AppResult<Vec<u8>> {
        let svg = self.render_svg()?;
        let tree = usvg::Tree::from_str(&svg, &svg_options()).map_err(plot_error)?;
        svg2pdf::to_pdf(
            &tree,
            svg2pdf::ConversionOptions::default(),
            svg2pdf::PageOptions::default(),
        )
        .map_err(plot_error)
    }

    /// Write the PDF to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let pdf = self.render_pdf()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, pdf)?;
        info!(path = %path.display(), networks = self.networks.len(), "S-parameter figure written");
        Ok(())
    }

    fn smith_panel<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        caption: &str,
        m: usize,
        n: usize,
    ) -> AppResult<()> {
        let mut chart = ChartBuilder::on(area)
            .caption(caption, ("sans-serif", 24))
            .margin(15)
            .build_cartesian_2d(-SMITH_EXTENT..SMITH_EXTENT, -SMITH_EXTENT..SMITH_EXTENT)
            .map_err(plot_error)?;

        for line in grid_lines() {
            chart
                .draw_series(LineSeries::new(line, GRID_COLOR.stroke_width(1)))
                .map_err(plot_error)?;
        }
        for (index, network) in self.networks.iter().enumerate() {
            let points: Vec<(f64, f64)> = network
                .s(m, n)
                .into_iter()
                .filter(|c| c.re.is_finite() && c.im.is_finite())
                .map(|c| (c.re, c.im))
                .collect();
            chart
                .draw_series(LineSeries::new(points, series_color(index).stroke_width(2)))
                .map_err(plot_error)?;
        }
        Ok(())
    }

    fn db_panel<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        caption: &str,
        m: usize,
        n: usize,
        legend: bool,
    ) -> AppResult<()> {
        let traces: Vec<(Vec<f64>, Vec<f64>)> = self
            .networks
            .iter()
            .map(|net| (net.frequencies(self.unit), net.s_db(m, n)))
            .collect();
        let no_data = || BenchError::Plot(format!("{} has no finite data", caption));
        let x_range = padded_range(traces.iter().flat_map(|(f, _)| f.iter())).ok_or_else(no_data)?;
        let y_range = padded_range(traces.iter().flat_map(|(_, db)| db.iter())).ok_or_else(no_data)?;

        let mut chart = ChartBuilder::on(area)
            .caption(caption, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(55)
            .build_cartesian_2d(x_range, y_range)
            .map_err(plot_error)?;
        chart
            .configure_mesh()
            .x_desc(format!("Frequency ({})", self.unit))
            .y_desc(format!("|{}| (dB)", caption))
            .draw()
            .map_err(plot_error)?;

        for (index, (network, (freq, db))) in self.networks.iter().zip(&traces).enumerate() {
            let color = series_color(index);
            let points = freq
                .iter()
                .copied()
                .zip(db.iter().copied())
                .filter(|(f, d)| f.is_finite() && d.is_finite());
            let drawn = chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(plot_error)?;
            if legend {
                drawn
                    .label(network.name())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }
        if legend {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .position(SeriesLabelPosition::LowerRight)
                .draw()
                .map_err(plot_error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamma_reference_points() {
        let matched = gamma(Complex64::new(1.0, 0.0));
        assert!(matched.norm() < 1e-12);
        let short = gamma(Complex64::new(0.0, 0.0));
        assert!((short.re + 1.0).abs() < 1e-12);
        let inductive = gamma(Complex64::new(0.0, 1.0));
        assert!((inductive.re).abs() < 1e-12 && (inductive.im - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_stays_on_chart() {
        for line in grid_lines() {
            for (re, im) in line {
                assert!((re * re + im * im).sqrt() <= 1.0 + 1e-9);
            }
        }
        // r = 0 is the unit circle itself.
        for (re, im) in resistance_circle(0.0) {
            assert!(((re * re + im * im).sqrt() - 1.0).abs() < 1e-9);
        }
    }

    fn amplifier(name: &str, gain: f64) -> TwoPortNetwork {
        let freqs = vec![1e9, 2e9, 3e9];
        let s = freqs
            .iter()
            .map(|f| {
                let phase = -f / 1e9;
                [
                    [Complex64::from_polar(0.3, phase), Complex64::from_polar(0.05, phase)],
                    [Complex64::from_polar(gain, phase), Complex64::from_polar(0.4, phase)],
                ]
            })
            .collect();
        TwoPortNetwork::new(name, freqs, s, 50.0, Vec::new())
    }

    #[test]
    fn test_grid_renders_every_panel() {
        let networks = vec![amplifier("lna_bias1", 4.0), amplifier("lna_bias2", 5.0)];
        let grid = SParameterGrid::new(
            "LNA S-Parameters",
            &networks,
            FrequencyUnit::GHz,
            FigureSize {
                width: 800,
                height: 800,
            },
        );
        let svg = grid.render_svg().unwrap();
        for text in ["LNA S-Parameters", "S11", "S21", "S12", "S22", "lna_bias2", "Frequency (GHz)"] {
            assert!(svg.contains(text), "missing {}", text);
        }
    }

    #[test]
    fn test_saved_pdf_is_complete_document() {
        let networks = vec![amplifier("lna_bias1", 4.0)];
        let size = FigureSize {
            width: 800,
            height: 600,
        };
        let grid = SParameterGrid::new("LNA", &networks, FrequencyUnit::GHz, size);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LNA.pdf");
        grid.save(&path).unwrap();

        let pdf = fs::read(&path).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("/MediaBox"));
        assert!(text.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn test_empty_grid_is_error() {
        let grid = SParameterGrid::new("none", &[], FrequencyUnit::GHz, FigureSize::default());
        assert!(matches!(grid.render_svg(), Err(BenchError::Plot(_))));
        assert!(matches!(grid.render_pdf(), Err(BenchError::Plot(_))));
    }

    #[test]
    fn test_unity_resistance_circle_center() {
        // Center (0.5, 0), radius 0.5.
        for (re, im) in resistance_circle(1.0) {
            assert!((((re - 0.5).powi(2) + im * im).sqrt() - 0.5).abs() < 1e-9);
        }
    }
}
