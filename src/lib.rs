//! Yearly statistics of dated archaeological records.
//!
//! Records carry an earliest and a latest possible date. For every year of
//! the observed span the records whose interval covers that year are
//! accumulated into a density per year, a distinct site count or a record
//! count. See [`binning`] for the binning rules.

pub mod analysis;
pub mod binning;
pub mod config;
pub mod density;
pub mod error;
pub mod manager;
pub mod plot;
pub mod series;
pub mod stats;
pub mod table;
