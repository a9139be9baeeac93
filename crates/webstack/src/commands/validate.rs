use crate::utils;
use colored::Colorize;
use std::collections::BTreeMap;
use webstack_cloud::App;

/// スタック定義を検証してサマリーを表示
pub fn handle(app: &App, stack_name: &str) -> anyhow::Result<()> {
    println!("{}", "スタック定義を検証中...".blue());

    let stack = utils::find_stack(app, stack_name)?;

    // 参照切れ・循環依存のチェック
    let graph = stack.dependency_graph()?;
    let order = graph.creation_order()?;
    let template = stack.synthesize()?;

    println!("{}", "✓ スタック定義は正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  スタック: {} ({})", stack.name().cyan(), stack.environment());

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for resource in stack.resources().values() {
        *counts.entry(resource.resource_type.as_str()).or_default() += 1;
    }
    println!("  リソース: {}個", order.len());
    for (resource_type, count) in &counts {
        println!("    - {} × {}", resource_type.cyan(), count);
    }
    println!("  依存関係: {}本", graph.edge_count());
    println!("  パラメータ: {}個", template.parameters.len());
    println!("  出力: {}個", template.outputs.len());
    for name in template.outputs.keys() {
        println!("    - {}", name.cyan());
    }

    Ok(())
}
