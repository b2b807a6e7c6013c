//! Bundled typeface for figures, so rendering never depends on system fonts.

use once_cell::sync::OnceCell;
use plotters::style::{register_font, FontStyle};

use crate::error::{AppResult, BenchError};

/// DejaVu Sans, shipped under `assets/fonts`.
pub const SANS_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
/// Family name stored in [`SANS_FONT`].
pub const SANS_FAMILY: &str = "DejaVu Sans";

static REGISTERED: OnceCell<Result<(), String>> = OnceCell::new();

/// Register the bundled face as plotters' `sans-serif` family. Idempotent.
pub fn register_plot_fonts() -> AppResult<()> {
    REGISTERED
        .get_or_init(|| {
            register_font("sans-serif", FontStyle::Normal, SANS_FONT)
                .map_err(|_| "invalid font data".to_string())
        })
        .clone()
        .map_err(|e| BenchError::Plot(format!("bundled font rejected: {}", e)))
}

/// SVG parse options resolving every generic family to the bundled face.
pub fn svg_options() -> usvg::Options<'static> {
    let mut options = usvg::Options {
        font_family: SANS_FAMILY.to_string(),
        ..usvg::Options::default()
    };
    let fontdb = options.fontdb_mut();
    fontdb.load_font_data(SANS_FONT.to_vec());
    fontdb.set_sans_serif_family(SANS_FAMILY);
    fontdb.set_serif_family(SANS_FAMILY);
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_is_repeatable() {
        register_plot_fonts().unwrap();
        register_plot_fonts().unwrap();
    }

    #[test]
    fn test_svg_options_know_bundled_face() {
        let options = svg_options();
        assert!(options.fontdb.faces().any(|face| face
            .families
            .iter()
            .any(|(name, _)| name == SANS_FAMILY)));
    }
}
