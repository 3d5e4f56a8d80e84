//! Helpers shared across the crate.

pub(crate) mod logging;
