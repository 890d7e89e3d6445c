//! HTTP route handlers

pub mod error;
pub mod games;
pub mod saves;
pub mod status;
pub mod units;
