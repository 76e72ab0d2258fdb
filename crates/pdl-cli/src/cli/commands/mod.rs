//! CLI command handlers.

mod download;
mod interrupt;

pub use download::run_download;
#[cfg(test)]
pub(crate) use download::describe;
