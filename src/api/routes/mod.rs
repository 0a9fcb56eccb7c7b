//! API Routes
//!
//! Route handlers organized by functionality.

pub mod admin;
pub mod health;
pub mod payment;
pub mod public;
