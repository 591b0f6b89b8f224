//! Drivers for the external tools: `docker compose` for the rendered
//! harness, `sh` for provisioning steps. No tool semantics are
//! reimplemented here; exit status is the only contract.

pub mod compose;
pub mod steps;

pub use compose::ComposeDriver;
pub use steps::StepRunner;
