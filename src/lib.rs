//! Tutome - a tagged question board
//!
//! Questions carry tags from several taxonomy categories. Per-category rules
//! bound how many tags of each category a new question or a search request
//! may use.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod rules;
pub mod services;
