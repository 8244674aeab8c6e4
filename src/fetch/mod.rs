//! Hardened fetch pipeline: validation, pinned transport, redirect walking,
//! and bounded decompression.
//!
//! [`SafeFetcher`] is the crate's entry point. A fetch runs as a sequence of
//! hops; each hop validates the target, resolves and pins one approved
//! address, and issues a single GET through a redirect-disabled client. The
//! final response's body is exposed as a [`BodyStream`] that decompresses
//! incrementally and enforces the decompressed-size ceiling.

mod body;
mod constants;
mod error;
mod transport;
mod walker;

pub use body::BodyStream;
pub use error::FetchError;
pub use walker::{FetchedResponse, SafeFetcher};
