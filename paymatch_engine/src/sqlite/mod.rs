//! SQLite backend for the PayMatch engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
