pub mod db;

pub use db::{create_pool, DbConn, DbPool};
