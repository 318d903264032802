// Library exports for softcenter

pub mod catalog;
pub mod config;
pub mod richtext;
pub mod stats;
pub mod store;
pub mod uploads;
pub mod votes;
