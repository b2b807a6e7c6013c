//! Two-port network files for the S-parameter viewer.

pub mod natural_sort;
pub mod network;
pub mod touchstone;

pub use natural_sort::{natural_cmp, natural_sort};
pub use network::{FrequencyUnit, NoiseParameters, TwoPortNetwork};
pub use touchstone::{parse_touchstone, read_touchstone};
