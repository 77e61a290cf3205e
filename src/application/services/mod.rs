// src/application/services/mod.rs
pub mod bookmark_service;
pub mod bookmark_service_impl;
pub mod collection_service;
pub mod collection_service_impl;
pub mod factory;
pub mod sync_service;
pub mod sync_service_impl;
