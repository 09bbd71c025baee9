pub mod catalog;
pub mod csv;
