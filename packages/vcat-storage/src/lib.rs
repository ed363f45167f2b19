pub mod cache;
pub mod db;
pub mod engine;
pub mod history;
pub mod models;
pub mod predicate;
pub mod schema;
pub mod videos;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
