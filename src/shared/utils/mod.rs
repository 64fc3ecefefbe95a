/// 書類番号の生成
pub mod nanoid;

pub use nanoid::{generate_document_number, is_valid_document_number};
