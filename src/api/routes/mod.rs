//! API Routes
//!
//! Route handlers organized by functionality.

pub mod dashboard;
pub mod diagnostics;
pub mod health;
