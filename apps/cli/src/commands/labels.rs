//! Emotion category listing.

use anyhow::Result;
use colored::Colorize;
use emotune_core::EmotuneConfig;
use emotune_training::Category;
use serde_json::json;

pub fn execute(config: &EmotuneConfig, json_output: bool) -> Result<()> {
    let taxonomy = config.taxonomy.build()?;

    if json_output {
        let out: Vec<_> = Category::ALL
            .iter()
            .map(|c| {
                json!({
                    "index": c.index(),
                    "name": c.as_str(),
                    "display_name": c.display_name(),
                    "polarity": taxonomy.polarity(*c),
                    "rank": taxonomy.rank(*c),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Emotion Categories ({})", Category::COUNT).bold().cyan());
    println!();
    println!("{:<6} {:<16} {:<10} {}", "Index", "Name", "Polarity", "Rank");
    println!("{}", "─".repeat(42));
    for category in Category::ALL {
        let polarity = taxonomy.polarity(category).as_str();
        let polarity = match polarity {
            "Positive" => polarity.green(),
            "Negative" => polarity.red(),
            _ => polarity.dimmed(),
        };
        let rank = taxonomy.rank(category).map_or_else(|| "-".to_string(), |r| (r + 1).to_string());
        println!("{:<6} {:<16} {:<10} {}", category.index(), category.as_str(), polarity, rank);
    }
    println!();
    Ok(())
}
