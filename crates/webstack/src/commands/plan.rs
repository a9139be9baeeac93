use crate::utils;
use colored::Colorize;
use webstack_cloud::{ActionType, App, Plan};

/// 作成（または削除）順序を表示
pub fn handle(app: &App, stack_name: &str, destroy: bool) -> anyhow::Result<()> {
    let stack = utils::find_stack(app, stack_name)?;
    let plan = if destroy {
        Plan::teardown(stack)?
    } else {
        Plan::creation(stack)?
    };

    let title = if destroy { "削除順序" } else { "作成順序" };
    println!();
    println!("{} {} ({})", "▶".cyan(), title.bold(), stack.name().cyan());

    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Delete => "-".red(),
        };
        println!(
            "  {:>3}. {} {} {}",
            action.step,
            marker,
            action.resource_id.as_str().bold(),
            format!("({})", action.resource_type).dimmed()
        );
        if !action.waits_for.is_empty() {
            let waits: Vec<&str> = action.waits_for.iter().map(|id| id.as_str()).collect();
            println!("         {} {}", "待機:".dimmed(), waits.join(", ").dimmed());
        }
    }

    println!();
    println!("{}", plan.summary().to_string().bold());

    Ok(())
}
