//! Binary-side application layer: configuration, retry, output and command runtime.

pub(crate) mod config;
pub(crate) mod output;
pub(crate) mod retry;
pub(crate) mod runtime;
