use crate::shared::errors::{AppError, AppResult};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 生成ワーカー数のデフォルト値
const DEFAULT_GENERATOR_WORKERS: usize = 4;

/// SQLiteのビジータイムアウトのデフォルト値（ミリ秒）
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// 請求日付の計算に使用するデフォルトのタイムゾーン
const DEFAULT_BILLING_TIMEZONE: &str = "Asia/Tokyo";

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value {
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: Environment,
    /// ログレベル
    pub log_level: String,
    /// データベースファイルのパス
    pub database_path: PathBuf,
    /// 生成サイクルの並行ワーカー数
    pub generator_workers: usize,
    /// 「今日」を決定するタイムゾーン
    pub billing_timezone: Tz,
    /// 書き込みロック待ちのタイムアウト
    pub busy_timeout: Duration,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// 環境設定、または値が不正な場合はエラー
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を読み込む
    ///
    /// # 引数
    /// * `lookup` - キー名から値を返す関数
    ///
    /// # 戻り値
    /// 環境設定、または値が不正な場合はエラー
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|v| Environment::parse(&v))
            .unwrap_or_else(get_environment);

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| match environment {
            Environment::Development => "debug".to_string(),
            Environment::Production => "info".to_string(),
        });

        let database_path = lookup("DATABASE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(get_database_filename(environment)));

        let generator_workers = match lookup("GENERATOR_WORKERS") {
            Some(raw) => {
                let workers: usize = raw.trim().parse().map_err(|_| {
                    AppError::configuration(format!("GENERATOR_WORKERS が数値ではありません: {raw}"))
                })?;
                if workers == 0 {
                    return Err(AppError::configuration(
                        "GENERATOR_WORKERS は1以上である必要があります",
                    ));
                }
                workers
            }
            None => DEFAULT_GENERATOR_WORKERS,
        };

        let timezone_name =
            lookup("BILLING_TIMEZONE").unwrap_or_else(|| DEFAULT_BILLING_TIMEZONE.to_string());
        let billing_timezone: Tz = timezone_name.parse().map_err(|_| {
            AppError::configuration(format!("不明なタイムゾーンです: {timezone_name}"))
        })?;

        let busy_timeout_ms = match lookup("SQLITE_BUSY_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::configuration(format!("SQLITE_BUSY_TIMEOUT_MS が数値ではありません: {raw}"))
            })?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        Ok(Self {
            environment,
            log_level,
            database_path,
            generator_workers,
            billing_timezone,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
        })
    }

    /// プロダクション環境かどうかを判定
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// 開発環境かどうかを判定
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

/// 現在の実行環境を判定する
///
/// # 判定ロジック
/// 1. コンパイル時埋め込み環境変数を最優先
/// 2. 実行時環境変数 ENVIRONMENT を確認
/// 3. デバッグビルドの場合は Development
/// 4. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    // コンパイル時埋め込み環境変数を最優先
    if let Some(embedded_env) = option_env!("EMBEDDED_ENVIRONMENT") {
        let env = Environment::parse(embedded_env);
        log::debug!("環境判定: コンパイル時埋め込み値を使用 -> {embedded_env} -> {env:?}");
        return env;
    }

    // 実行時環境変数を確認
    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = Environment::parse(&env_var);
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    // フォールバック: ビルド設定に基づく判定
    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_recurring_billing.db"
/// - プロダクション環境: "recurring_billing.db"
pub fn get_database_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_recurring_billing.db",
        Environment::Production => "recurring_billing.db",
    }
}

/// 環境に応じた.envファイルを読み込む
///
/// # 処理内容
/// 1. コンパイル時埋め込み環境設定があれば読み込みをスキップ
/// 2. カレントディレクトリの `.env.<environment>` と `.env` を順に読み込み
/// 3. どちらも見つからない場合は直接設定された環境変数のみを使用
pub fn load_environment_variables() {
    if let Some(env) = option_env!("EMBEDDED_ENVIRONMENT") {
        log::info!("コンパイル時埋め込み環境設定を使用: {env}");
        return;
    }

    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    if load_environment_files(Path::new("."), &environment).is_empty() {
        log::warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。");
    }
}

/// 指定ディレクトリの `.env.<environment>` と `.env` を順に読み込む
///
/// 既に設定済みの変数は上書きされないため、環境別ファイルの値が `.env` より優先される。
///
/// # 戻り値
/// 読み込めたファイルのパス
pub fn load_environment_files(dir: &Path, environment: &str) -> Vec<PathBuf> {
    let candidates = [dir.join(format!(".env.{environment}")), dir.join(".env")];

    candidates
        .into_iter()
        .filter(|path| match dotenv::from_path(path) {
            Ok(()) => {
                log::info!("{}ファイルを読み込みました", path.display());
                true
            }
            Err(e) => {
                log::debug!("{}を読み込めませんでした: {e}", path.display());
                false
            }
        })
        .collect()
}

/// ログシステムを初期化する
///
/// # 引数
/// * `config` - 環境設定
pub fn initialize_logging_system(config: &EnvironmentConfig) {
    let log_level = match config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    // 二重初期化はエラーにせず無視する
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init();

    log::info!(
        "ログシステムを初期化しました: level={}, environment={:?}",
        config.log_level,
        config.environment
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_get_database_filename() {
        assert_eq!(
            get_database_filename(Environment::Development),
            "dev_recurring_billing.db"
        );
        assert_eq!(
            get_database_filename(Environment::Production),
            "recurring_billing.db"
        );
    }

    #[test]
    fn test_defaults_for_production() {
        let config = EnvironmentConfig::from_lookup(lookup_from(&[("ENVIRONMENT", "production")]))
            .unwrap();

        assert!(config.is_production());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.database_path, PathBuf::from("recurring_billing.db"));
        assert_eq!(config.generator_workers, DEFAULT_GENERATOR_WORKERS);
        assert_eq!(config.billing_timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(config.busy_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_explicit_values() {
        let config = EnvironmentConfig::from_lookup(lookup_from(&[
            ("ENVIRONMENT", "development"),
            ("LOG_LEVEL", "warn"),
            ("DATABASE_PATH", "/tmp/billing.db"),
            ("GENERATOR_WORKERS", "8"),
            ("BILLING_TIMEZONE", "Europe/Berlin"),
            ("SQLITE_BUSY_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert!(config.is_development());
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.database_path, PathBuf::from("/tmp/billing.db"));
        assert_eq!(config.generator_workers, 8);
        assert_eq!(config.billing_timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_environment_file_takes_precedence_over_base_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".env.production"),
            "RECURRING_BILLING_TEST_SHARED=production\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "RECURRING_BILLING_TEST_SHARED=base\nRECURRING_BILLING_TEST_BASE_ONLY=base\n",
        )
        .unwrap();

        let loaded = load_environment_files(dir.path(), "production");

        assert_eq!(
            loaded,
            vec![dir.path().join(".env.production"), dir.path().join(".env")]
        );
        assert_eq!(
            std::env::var("RECURRING_BILLING_TEST_SHARED").unwrap(),
            "production"
        );
        assert_eq!(
            std::env::var("RECURRING_BILLING_TEST_BASE_ONLY").unwrap(),
            "base"
        );
    }

    #[test]
    fn test_missing_environment_file_falls_back_to_base_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "RECURRING_BILLING_TEST_DEV_FALLBACK=base\n",
        )
        .unwrap();

        let loaded = load_environment_files(dir.path(), "development");

        assert_eq!(loaded, vec![dir.path().join(".env")]);
        assert_eq!(
            std::env::var("RECURRING_BILLING_TEST_DEV_FALLBACK").unwrap(),
            "base"
        );

        let empty = tempfile::TempDir::new().unwrap();
        assert!(load_environment_files(empty.path(), "development").is_empty());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let zero_workers = EnvironmentConfig::from_lookup(lookup_from(&[("GENERATOR_WORKERS", "0")]));
        assert!(matches!(zero_workers, Err(AppError::Configuration(_))));

        let bad_workers = EnvironmentConfig::from_lookup(lookup_from(&[("GENERATOR_WORKERS", "many")]));
        assert!(matches!(bad_workers, Err(AppError::Configuration(_))));

        let bad_tz = EnvironmentConfig::from_lookup(lookup_from(&[("BILLING_TIMEZONE", "Mars/Olympus")]));
        assert!(matches!(bad_tz, Err(AppError::Configuration(_))));
    }
}
