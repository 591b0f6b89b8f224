//! Rendering: deterministic YAML emission for the two artifacts.

pub mod compose;
pub mod playbook;

pub use compose::render_compose;
pub use playbook::render_playbook;
