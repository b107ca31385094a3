// Library root: re-exports all modules so the CLI and integration tests can
// reach the scoring, projection, lineup and ranking engines.

pub mod config;
pub mod data;
pub mod db;
pub mod lineup;
pub mod position;
pub mod projection;
pub mod scoring;
pub mod waivers;
