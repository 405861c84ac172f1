pub mod config;
pub mod logging;

pub mod archive;
pub mod crawler;
pub mod fetch;
pub mod filetree;
pub mod jobs;
pub mod ledger;
pub mod names;
pub mod orchestrator;
pub mod providers;
