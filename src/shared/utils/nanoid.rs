use nanoid::nanoid;

/// 書類番号のプレフィックス
const DOCUMENT_NUMBER_PREFIX: &str = "INV-";

/// 書類番号のランダム部分に使用する文字セット（紛らわしい文字を除外）
const DOCUMENT_NUMBER_ALPHABET: [char; 32] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K',
    'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// ランダム部分の長さ
const DOCUMENT_NUMBER_LENGTH: usize = 12;

/// 発行済み書類用の書類番号を生成する
///
/// # 戻り値
/// "INV-" に続く12文字の英数字からなる書類番号
pub fn generate_document_number() -> String {
    format!(
        "{DOCUMENT_NUMBER_PREFIX}{}",
        nanoid!(DOCUMENT_NUMBER_LENGTH, &DOCUMENT_NUMBER_ALPHABET)
    )
}

/// 書類番号が有効な形式かどうかを検証する
///
/// # 検証条件
/// - "INV-" で始まる
/// - 続く部分が12文字で、書類番号用の文字セットのみを含む
pub fn is_valid_document_number(number: &str) -> bool {
    match number.strip_prefix(DOCUMENT_NUMBER_PREFIX) {
        Some(body) => {
            body.chars().count() == DOCUMENT_NUMBER_LENGTH
                && body.chars().all(|c| DOCUMENT_NUMBER_ALPHABET.contains(&c))
        }
        None => false,
    }
}
