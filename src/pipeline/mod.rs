//! Frame-processing pipeline: pull, warp, composite, write.

pub(crate) mod cancel;
pub(crate) mod perf;
pub(crate) mod session;
