//! Arcadia Zoo Manager Library
//!
//! Animal care, feeding recommendations and veterinary records.

pub mod access;
pub mod build_info;
pub mod config;
pub mod db;
pub mod diet;
pub mod mcp;
pub mod models;
pub mod tools;
