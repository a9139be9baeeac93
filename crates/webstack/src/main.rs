mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "webstack")]
#[command(
    about = "Webサーバー1台のスタックを宣言し、CloudFormation テンプレートとして出力する",
    long_about = None
)]
struct Cli {
    /// 設定ファイルのパス (省略時は WEBSTACK_CONFIG_PATH → 自動検出)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// スタック名 (デフォルト: WebServerStack)
    #[arg(long, global = true, env = "WEBSTACK_STACK_NAME")]
    stack_name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// テンプレートとマニフェストを生成
    Synth {
        /// 出力ディレクトリ
        #[arg(short, long, default_value = "webstack.out")]
        output: PathBuf,
        /// ファイルに書かず、テンプレートを標準出力に表示
        #[arg(long)]
        stdout: bool,
    },
    /// リソースの作成順序を表示
    Plan {
        /// 削除順序を表示
        #[arg(long)]
        destroy: bool,
    },
    /// スタック定義を検証
    Validate,
    /// バージョン情報を表示
    Version,
}

fn main() {
    // ログはstderrに出力（stdoutはテンプレート出力に使う）
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("webstack {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let loaded = utils::load_settings(cli.config.as_deref())?;
    let stack_name = utils::determine_stack_name(cli.stack_name, &loaded.settings);
    let app = utils::build_app(&stack_name, &loaded.settings)?;

    // コマンドディスパッチ
    match cli.command {
        Commands::Synth { output, stdout } => {
            if stdout {
                commands::synth::print_template(&app, &stack_name)?;
            } else {
                utils::print_loaded_settings(&loaded);
                commands::synth::handle(&app, &output)?;
            }
        }
        Commands::Plan { destroy } => {
            utils::print_loaded_settings(&loaded);
            commands::plan::handle(&app, &stack_name, destroy)?;
        }
        Commands::Validate => {
            utils::print_loaded_settings(&loaded);
            commands::validate::handle(&app, &stack_name)?;
        }
        // 設定読み込み前に処理済み
        Commands::Version => {}
    }

    Ok(())
}
