use anyhow::Result;

use secwatch_core::AppConfig;

pub fn run(config: &AppConfig) -> Result<()> {
    println!("Sources ({}):\n", config.sources.len());

    for source in &config.sources {
        let keywords = match source.keywords.as_deref() {
            Some(keywords) if !keywords.is_empty() => format!(" [keywords: {}]", keywords.join(", ")),
            _ => String::new(),
        };
        let identify = if source.identify { " [identify]" } else { "" };

        println!("  {} ({}, every {}s){}{}", source.name, source.source_type, source.check_interval, keywords, identify);
        println!("    URL: {}", source.feed);
        println!();
    }

    Ok(())
}
