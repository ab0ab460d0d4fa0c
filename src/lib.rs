// Library interface for the records binary and integration tests

#![allow(clippy::enum_variant_names)] // Error variants read better with their suffixes

pub mod cli;
pub mod composer;
pub mod config;
pub mod context;
pub mod download;
pub mod error;
pub mod external;
pub mod hash;
pub mod hashid;
pub mod managed;
pub mod package;
pub mod release;
pub mod repository;
pub mod site;
pub mod storage;
pub mod version;
