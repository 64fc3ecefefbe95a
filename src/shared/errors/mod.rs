use chrono::NaiveDate;
use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
#[derive(Debug, Error)]
pub enum AppError {
    /// データベース関連のエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// バリデーション関連のエラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// リソースが見つからない場合のエラー
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 支払期日ルールが不正、または日付を生成できない場合のエラー
    #[error("不正な支払期日ルール: {0}")]
    InvalidRule(String),

    /// テンプレートの状態遷移が許可されていない場合のエラー
    #[error("不正な状態遷移: {0}")]
    InvalidTransition(String),

    /// 同一テンプレート・同一期日の成功済み生成記録が既に存在する
    #[error("生成済みの期日です: テンプレートID {template_id}, 期日 {due_date}")]
    DuplicateGeneration {
        template_id: i64,
        due_date: NaiveDate,
    },

    /// 外部の書類作成処理が失敗した場合のエラー
    #[error("書類作成に失敗しました: {0}")]
    DocumentCreationFailed(String),

    /// 台帳間の支払状態同期書き込みが完了できなかった場合のエラー
    #[error("支払状態の同期に失敗しました: {0}")]
    SyncWriteFailed(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// 並行処理関連のエラー
    #[error("並行処理エラー: {0}")]
    Concurrency(String),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),
}

/// エラーの重要度を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラー、冪等性シグナルなど）
    Low,
    /// 中重要度（書類作成の一時的な失敗など）
    Medium,
    /// 高重要度（データベースエラーなど）
    High,
    /// 最重要（台帳の不整合につながるエラー）
    Critical,
}

impl AppError {
    /// ユーザーに表示するためのフレンドリーなメッセージを取得
    ///
    /// # 戻り値
    /// ユーザーに表示可能なエラーメッセージ
    pub fn user_message(&self) -> &str {
        match self {
            AppError::Database(_) => "データベース操作でエラーが発生しました",
            AppError::Validation(msg) => msg,
            AppError::NotFound(msg) => msg,
            AppError::InvalidRule(msg) => msg,
            AppError::InvalidTransition(msg) => msg,
            AppError::DuplicateGeneration { .. } => "この期日の請求書は既に作成されています",
            AppError::DocumentCreationFailed(_) => "請求書の作成に失敗しました",
            AppError::SyncWriteFailed(_) => "支払状態の更新に失敗しました",
            AppError::Configuration(_) => "設定エラーが発生しました",
            AppError::Concurrency(_) => "並行処理でエラーが発生しました",
            AppError::Json(_) => "データ形式の解析でエラーが発生しました",
        }
    }

    /// エラーの詳細情報を取得
    ///
    /// # 戻り値
    /// エラーの詳細情報（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// エラーの重要度を取得
    ///
    /// # 戻り値
    /// エラーの重要度レベル
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Database(_) => ErrorSeverity::High,
            AppError::Validation(_) => ErrorSeverity::Low,
            AppError::NotFound(_) => ErrorSeverity::Low,
            AppError::InvalidRule(_) => ErrorSeverity::Low,
            AppError::InvalidTransition(_) => ErrorSeverity::Low,
            AppError::DuplicateGeneration { .. } => ErrorSeverity::Low,
            AppError::DocumentCreationFailed(_) => ErrorSeverity::Medium,
            AppError::SyncWriteFailed(_) => ErrorSeverity::Critical,
            AppError::Configuration(_) => ErrorSeverity::High,
            AppError::Concurrency(_) => ErrorSeverity::High,
            AppError::Json(_) => ErrorSeverity::Medium,
        }
    }

    /// バリデーションエラーを作成するヘルパー関数
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// リソース未発見エラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `resource` - 見つからなかったリソース名
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        AppError::NotFound(format!("{}が見つかりません", resource.into()))
    }

    /// 支払期日ルールエラーを作成するヘルパー関数
    pub fn invalid_rule<S: Into<String>>(message: S) -> Self {
        AppError::InvalidRule(message.into())
    }

    /// 状態遷移エラーを作成するヘルパー関数
    pub fn invalid_transition<S: Into<String>>(message: S) -> Self {
        AppError::InvalidTransition(message.into())
    }

    /// 設定エラーを作成するヘルパー関数
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    /// 並行処理エラーを作成するヘルパー関数
    pub fn concurrency<S: Into<String>>(message: S) -> Self {
        AppError::Concurrency(message.into())
    }

    /// 一意制約違反かどうかを判定する
    ///
    /// # 引数
    /// * `error` - rusqliteのエラー
    ///
    /// # 戻り値
    /// UNIQUE制約違反の場合はtrue
    pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
        matches!(
            error,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

/// rusqlite::ErrorからAppErrorへの変換
impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        AppError::Database(error.to_string())
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;
