//! S-parameter viewer: every network file of a directory on one figure.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::config::{bare_extension, ConfigError, SmithViewConfig};
use crate::error::AppResult;
use crate::export::{sanitize, SParameterGrid};
use crate::rf::{natural_cmp, read_touchstone, TwoPortNetwork};

/// Inputs and output of one S-parameter view.
#[derive(Debug, Clone)]
pub struct SmithViewReport {
    /// Network files in plotting order
    pub sources: Vec<PathBuf>,
    /// PDF written
    pub figure: PathBuf,
}

/// Files in `directory` whose extension matches `extension` (leading dot
/// optional, any case), in natural order of their file names.
pub fn list_network_files(directory: &Path, extension: &str) -> AppResult<Vec<PathBuf>> {
    let extension = bare_extension(extension);
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse every network file and write `<output_dir>/<title>.pdf`.
#[instrument(skip_all, fields(title = %config.title, directory = %config.directory.display()))]
pub fn run_smith_view(config: &SmithViewConfig) -> AppResult<SmithViewReport> {
    let sources = list_network_files(&config.directory, &config.extension)?;
    if sources.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "no .{} files in {}",
            bare_extension(&config.extension),
            config.directory.display()
        ))
        .into());
    }

    let networks = sources
        .iter()
        .map(|path| {
            let network = read_touchstone(path)?;
            debug!(name = network.name(), points = network.len(), "Network loaded");
            Ok(network)
        })
        .collect::<AppResult<Vec<TwoPortNetwork>>>()?;
    info!(networks = networks.len(), "Networks loaded");

    let figure = config
        .output_dir
        .join(format!("{}.pdf", sanitize(&config.title)));
    SParameterGrid::new(&config.title, &networks, config.frequency_unit, config.figure)
        .save(&figure)?;

    Ok(SmithViewReport { sources, figure })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["amp_10.s2p", "amp_2.S2P", "amp_1.s2p", "notes.txt", "amp_3.s1p"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("old.s2p")).unwrap();

        let names: Vec<String> = list_network_files(dir.path(), "s2p")
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["amp_1.s2p", "amp_2.S2P", "amp_10.s2p"]);
    }

    #[test]
    fn test_listing_accepts_dotted_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a_1.s2p"), "").unwrap();

        let files = list_network_files(dir.path(), ".s2p").unwrap();
        assert_eq!(files, vec![dir.path().join("a_1.s2p")]);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = list_network_files(&dir.path().join("absent"), "s2p");
        assert!(matches!(result, Err(crate::error::BenchError::Io(_))));
    }
}
