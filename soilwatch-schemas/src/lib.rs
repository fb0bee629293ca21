pub mod feed;
pub mod file_formats;
pub mod reading;
