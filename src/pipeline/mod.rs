//! Monitor run pipeline.
//!
//! - `policy`: per-site seed / notification mode selection
//! - `run`: the sweep over sites, entrances and candidates

pub mod policy;
pub mod run;

pub use policy::{SiteMode, select_mode};
pub use run::{RunOutcome, run_monitor};
