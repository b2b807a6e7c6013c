//! Files written by the workflows: CSV tables, PNG line charts and the PDF
//! S-parameter grid.

pub mod csv_table;
pub mod fonts;
pub mod naming;
pub mod plot;
pub mod smith;

pub use csv_table::CsvTable;
pub use naming::{sanitize, OutputNaming, RunStamp};
pub use plot::{series_color, LineChart, Series, PALETTE};
pub use smith::SParameterGrid;
