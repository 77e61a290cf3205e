// src/lib.rs
#![crate_type = "lib"]
#![crate_name = "linkstash"]

// Core modules
pub mod application;
pub mod domain;
pub mod infrastructure;

pub mod config;
pub mod util;
