//! Service layer for format handling and output naming
//!
//! Stateless helpers kept apart from the processing pipeline so they can be
//! exercised on their own.

pub mod codec;
pub mod naming;

pub use codec::ImageCodec;
pub use naming::DownloadNamer;
