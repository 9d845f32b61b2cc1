//! Site-specific scraper configurations

pub mod noon;
