use crate::utils;
use colored::Colorize;
use std::path::Path;
use webstack_cloud::App;

/// クラウドアセンブリを出力ディレクトリに書き出す
pub fn handle(app: &App, output: &Path) -> anyhow::Result<()> {
    println!("{}", "テンプレートを生成中...".blue());

    let written = app.synth(output)?;

    println!();
    println!("{}", "✓ 生成が完了しました！".green().bold());
    for path in &written {
        println!("  • {}", path.display().to_string().cyan());
    }
    println!();
    println!("{}", "次のコマンドでデプロイできます:".bold());
    for stack in app.stacks() {
        println!(
            "  aws cloudformation deploy --template-file {} --stack-name {} --capabilities CAPABILITY_IAM",
            output
                .join(format!("{}.template.json", stack.name()))
                .display(),
            stack.name()
        );
    }

    Ok(())
}

/// テンプレートJSONだけを標準出力に表示
pub fn print_template(app: &App, stack_name: &str) -> anyhow::Result<()> {
    let stack = utils::find_stack(app, stack_name)?;
    let template = stack.synthesize()?;
    println!("{}", template.to_json_pretty()?);
    Ok(())
}
