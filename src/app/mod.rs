pub mod ports;
pub mod catalog_fetcher;
pub mod mapping;
pub mod sync_use_case;
