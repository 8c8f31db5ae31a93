//! Discourse topic sync library.
//!
//! Receives Discourse post webhooks and keeps the comment count and topic
//! link of the matching content items up to date.

pub mod config;
pub mod db;
pub mod sync;
pub mod web;
pub mod webhook;
