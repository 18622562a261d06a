//! # Outcache Server Library
//!
//! Demo application for the Outcache output cache: a small widgets API
//! whose reads are cached and whose writes invalidate them.

pub mod app;
pub mod startup;
pub mod widgets;
