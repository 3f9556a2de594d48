#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Shared test helpers used across the rtctl crates.
//! Layout: fixtures.rs (metainfo samples, response builders), mocks.rs (scripted transport).

pub mod fixtures;
pub mod mocks;
