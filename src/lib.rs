pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod fragment;
pub mod generation;
pub mod import;
pub mod provider;
pub mod render;
pub mod sanitize;
pub mod splice;
pub mod theme;
