pub mod feed;
pub mod sqlite;
