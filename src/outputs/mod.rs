//! Output artifacts written during a run.
//!
//! # Submodules
//!
//! - [`csv`]: Writes one extract file per source with rows for the run date
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── SEBI_Circulars_2026-10-19.csv
//! ├── BSE_Index_2026-10-19.csv
//! └── NSE_Circulars_2026-10-19.csv
//! ```

pub mod csv;
