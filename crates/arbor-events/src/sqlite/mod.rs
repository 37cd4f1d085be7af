//! `SQLite` persistence layer: connections, migrations, row types, repositories.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod row_types;
