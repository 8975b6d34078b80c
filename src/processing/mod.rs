pub mod cloud_reader;
pub mod csv_writer;
pub mod error;
pub mod summary;
