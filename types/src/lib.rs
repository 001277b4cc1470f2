//! Common types used throughout coinbot.

pub mod api;
pub mod casino;
