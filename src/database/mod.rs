// Database module
// SQLite storage for expense records

pub mod sqlite;

pub use sqlite::*;
