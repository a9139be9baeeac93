pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "WEBSTACK_CONFIG_PATH";

const APP_DIR: &str = "webstack";
const SETTINGS_CANDIDATES: [&str; 4] = [
    "webstack.local.yaml",
    ".webstack.local.yaml",
    "webstack.yaml",
    ".webstack.yaml",
];

/// スタック定義のパラメータ
///
/// すべて省略可能。省略した項目はスタック側のデフォルト値が使われる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// スタック名 (デフォルト: WebServerStack)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,

    /// テンプレートの Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// インスタンスタイプ (例: t2.micro)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,

    /// マシンイメージ (al2023, al2023-arm64, al2, al2-arm64, ami-...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_image: Option<String>,

    /// 使用するアベイラビリティゾーン数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_azs: Option<u32>,

    /// NAT ゲートウェイ数 (省略時はゾーンごとに1つ)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_gateways: Option<u32>,

    /// 組み込みの起動スクリプト名 (例: httpd-hello-world)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_script: Option<String>,

    /// 全リソースに付与するタグ
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// デプロイ先アカウント
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// デプロイ先リージョン
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Settings {
    /// 設定ファイルを探して読み込む
    ///
    /// 見つからない場合はデフォルト値と `None` を返す。
    pub fn load_or_default() -> Result<(Self, Option<PathBuf>)> {
        match find_settings_file() {
            Ok(path) => {
                let settings = load_settings(&path)?;
                Ok((settings, Some(path)))
            }
            Err(ConfigError::SettingsFileNotFound) => {
                tracing::debug!("設定ファイルなし、デフォルト値を使用");
                Ok((Self::default(), None))
            }
            Err(e) => Err(e),
        }
    }
}

/// WebStackのグローバル設定ディレクトリを取得 (~/.config/webstack)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(APP_DIR);
    Ok(config_dir)
}

/// プロジェクトの設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 WEBSTACK_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: webstack.local.yaml, .webstack.local.yaml, webstack.yaml, .webstack.yaml
/// 3. ./.webstack/ ディレクトリ内: 同様の順序
/// 4. ~/.config/webstack/webstack.yaml (グローバル設定)
pub fn find_settings_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} が存在しないパスを指しています: {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in &SETTINGS_CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.webstack/ ディレクトリで検索
    let project_dir = current_dir.join(".webstack");
    if project_dir.is_dir() {
        for filename in &SETTINGS_CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル
    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("webstack.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::SettingsFileNotFound)
}

/// 設定ファイルを読み込む
///
/// 空のファイルはデフォルト値として扱う。
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    tracing::debug!("設定ファイル読み込み: {}", path.display());

    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
