//! Common library for the PES trophy tracker
//!
//! This crate provides functionality shared by the services: database
//! connectivity, the Redis cache, JWT handling and the domain enums that
//! travel through tokens, rows and payloads.

pub mod cache;
pub mod database;
pub mod error;
pub mod jwt;
pub mod models;
pub mod validation;
