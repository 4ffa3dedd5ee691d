//! Rules command - List the security rule catalog

use colored::Colorize;

use super::{RulesArgs, RulesFormat};
use crate::error::PveAuditError;
use crate::exit_codes;
use crate::rules::{catalog, Category, SecurityRule};

pub fn execute(args: RulesArgs) -> Result<i32, PveAuditError> {
    let rendered = match args.format {
        RulesFormat::Json => serde_json::to_string_pretty(catalog())?,
        RulesFormat::Terminal => render_terminal(catalog()),
    };
    println!("{rendered}");

    Ok(exit_codes::SUCCESS)
}

fn render_terminal(rules: &[SecurityRule]) -> String {
    let mut output = String::new();

    for category in Category::ALL {
        output.push_str(&format!(
            "{} {}\n",
            category.title().bold(),
            format!("(weight {})", category.weight()).dimmed()
        ));
        for rule in rules.iter().filter(|r| r.category == category) {
            output.push_str(&format!(
                "  {:<24} {:<9} {}\n",
                rule.id.cyan(),
                rule.severity.as_str(),
                rule.title
            ));
        }
        output.push('\n');
    }

    output.push_str(&format!("{} rules\n", rules.len()));
    output
}
