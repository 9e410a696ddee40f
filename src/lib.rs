//! Energy evidence - curated building-energy research database.
//!
//! Records link an urban-form determinant to an energy output and the
//! direction of the effect. This crate filters them by facet, matches
//! spreadsheets of study metadata back onto them and renders moderator
//! analysis charts.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod import;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
pub mod utils;
