//! Core module - Loading and walking the repository tree
//!
//! Build ([`repo`]), classify ([`item`]), resolve ([`resolve`]) and project
//! ([`project`]). Invoking items lives in [`exec`].

pub mod error;
pub mod exec;
pub mod item;
pub mod project;
pub mod repo;
pub mod resolve;
