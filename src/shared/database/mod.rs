/// データベース接続とテーブル作成
pub mod connection;

pub use connection::{create_tables, open_database, open_worker_connection};
