// Library crate: the workspace, predictive cache and catalog client, plus the
// headless harness and command protocol used by tests and the driver binary.

pub mod attach;
pub mod cache;
pub mod catalog;
pub mod command;
pub mod fixtures;
pub mod harness;
pub mod render;
pub mod session;
pub mod settings;
pub mod state;
pub mod validation;
