use anyhow::Context;
use colored::Colorize;
use std::path::{Path, PathBuf};
use webstack_cloud::{App, Environment, Stack};
use webstack_cloud_aws::ec2::get_builtin_script;
use webstack_cloud_aws::{DEFAULT_STACK_NAME, WebServerProps, WebServerStack};
use webstack_config::Settings;

/// 読み込んだ設定とその出所
pub struct LoadedSettings {
    pub settings: Settings,
    pub path: Option<PathBuf>,
}

/// 設定を読み込む
///
/// `--config` が指定されていればそのファイルを（存在しなければエラー）、
/// なければ WEBSTACK_CONFIG_PATH を含む自動検出の結果を使う。
/// どちらもなければデフォルト値。
pub fn load_settings(config: Option<&Path>) -> anyhow::Result<LoadedSettings> {
    if let Some(path) = config {
        let settings = webstack_config::load_settings(path)
            .with_context(|| format!("設定ファイルを読み込めません: {}", path.display()))?;
        return Ok(LoadedSettings {
            settings,
            path: Some(path.to_path_buf()),
        });
    }

    let (settings, path) = Settings::load_or_default()?;
    Ok(LoadedSettings { settings, path })
}

/// スタック名を決定する（CLI引数 > 設定ファイル > デフォルト）
pub fn determine_stack_name(flag: Option<String>, settings: &Settings) -> String {
    flag.or_else(|| settings.stack_name.clone())
        .unwrap_or_else(|| DEFAULT_STACK_NAME.to_string())
}

/// 設定からスタックのプロパティを組み立てる
pub fn build_props(settings: &Settings) -> anyhow::Result<WebServerProps> {
    let mut props = WebServerProps {
        description: settings.description.clone(),
        environment: Environment::new(settings.account.clone(), settings.region.clone()),
        nat_gateways: settings.nat_gateways,
        tags: settings.tags.clone(),
        ..Default::default()
    };

    if let Some(instance_type) = &settings.instance_type {
        props.instance_type = instance_type.parse()?;
    }
    if let Some(image) = &settings.machine_image {
        props.machine_image = image.parse()?;
    }
    if let Some(max_azs) = settings.max_azs {
        props.max_azs = max_azs;
    }
    if let Some(name) = &settings.user_data_script {
        let script = get_builtin_script(name)
            .ok_or_else(|| anyhow::anyhow!("不明な起動スクリプトです: {}", name))?;
        props.user_data = script.iter().map(|c| c.to_string()).collect();
    }

    Ok(props)
}

/// スタックを定義したAppを作成
pub fn build_app(stack_name: &str, settings: &Settings) -> anyhow::Result<App> {
    let props = build_props(settings)?;
    let mut app = App::new();
    WebServerStack::define(&mut app, stack_name, &props)
        .with_context(|| format!("スタック {} の定義に失敗しました", stack_name))?;
    tracing::debug!("Defined stack {}", stack_name);
    Ok(app)
}

/// App からスタックを取り出す
pub fn find_stack<'a>(app: &'a App, stack_name: &str) -> anyhow::Result<&'a Stack> {
    app.stack(stack_name)
        .ok_or_else(|| anyhow::anyhow!("スタックが見つかりません: {}", stack_name))
}

/// 読み込んだ設定ファイル情報を表示
pub fn print_loaded_settings(loaded: &LoadedSettings) {
    match &loaded.path {
        Some(path) => {
            println!("📄 読み込んだ設定ファイル:");
            println!("  • {}", path.display().to_string().cyan());
        }
        None => println!("{}", "設定ファイルなし（デフォルト値を使用）".dimmed()),
    }
}
