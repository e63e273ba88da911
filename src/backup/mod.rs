pub mod archive;
pub mod catalog;
pub mod command;
pub mod compress;
pub mod file_ext;
pub mod finish;
pub mod job;
pub mod orchestrator;
pub mod remote;
pub mod result_error;
pub mod retention;
pub mod run_config;
pub mod snapshot;
pub mod validate;
