//! Output generation for the index document.
//!
//! The document is regenerated in full on every run, never patched
//! incrementally, and built entirely in memory before the single write in
//! `main`. [`markdown`] is the only format.

pub mod markdown;
