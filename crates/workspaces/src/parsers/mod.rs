//! Lockfile parsers producing a [`ReuseSnapshot`](crate::ReuseSnapshot).
//!
//! Each parser implements the [`LockfileParser`](crate::LockfileParser) trait.
//! Only the Yarn Berry (v2+) format is supported: Yarn Classic lockfiles carry
//! neither workspace entries nor checksums and cannot seed a scoped lockfile.

pub mod yarn_berry;

pub use yarn_berry::YarnBerryLockfileParser;
