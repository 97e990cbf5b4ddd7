// src/handlers/mod.rs

pub mod cache_admin;
pub mod question;
pub mod quiz;
