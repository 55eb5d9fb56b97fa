//! slurmtop - live partition and job-queue monitor for Slurm
//!
//! The library half holds the sampling engine: it runs `sinfo`/`squeue`,
//! normalizes their output into typed records, keeps the latest snapshot of
//! each published for readers, and sorts job records by column. The binary
//! (`main.rs`) and the `tui` module are thin consumers of that engine.

pub mod display;
pub mod duration;
pub mod error;
pub mod formatting;
pub mod models;
pub mod refresh;
pub mod sampler;
pub mod slurm;
pub mod sort;
pub mod tui;

#[cfg(test)]
mod testing;
