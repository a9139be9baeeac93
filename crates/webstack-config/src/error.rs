use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: webstack.local.yaml, .webstack.local.yaml, webstack.yaml, .webstack.yaml\n\
        - ./.webstack/ ディレクトリ\n\
        - ~/.config/webstack/webstack.yaml\n\
        または WEBSTACK_CONFIG_PATH 環境変数で直接指定できます"
    )]
    SettingsFileNotFound,

    #[error("設定ファイルの解析に失敗しました ({path}): {message}")]
    Parse { path: PathBuf, message: String },

    #[error("IO エラー")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
