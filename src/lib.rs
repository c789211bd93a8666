//! Mobile Health Measurement (MHM) Library
//!
//! Vitals classification, fixed-layout PDF reports and the intake plumbing
//! around them.

pub mod build_info;
pub mod clinical;
pub mod config;
pub mod db;
pub mod delivery;
pub mod mcp;
pub mod models;
pub mod report;
pub mod tools;
