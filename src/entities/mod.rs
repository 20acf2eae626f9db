pub mod booking_draft;
pub mod catalog_cache;
