use std::sync::Arc;

use anyhow::Result;

use secwatch_core::{
    feed::{FeedFetcher, ParserRegistry},
    scheduler::check_sources,
    AppConfig,
};

pub async fn run(config: &AppConfig, only: Option<&str>) -> Result<()> {
    let fetcher = Arc::new(FeedFetcher::new(&config.http)?);
    let parsers = ParserRegistry::standard(fetcher);

    println!("Checking sources...\n");

    let checks = check_sources(config, &parsers, only).await?;
    let mut failed = 0;

    for check in &checks {
        match &check.result {
            Ok(articles) => {
                println!("{} ({} matching articles)", check.source, articles.len());
                for article in articles {
                    println!("  {}", article.title);
                    println!("    {}", article.link);
                }
            }
            Err(e) => {
                failed += 1;
                println!("{} [ERROR: {}]", check.source, e);
            }
        }
        println!();
    }

    println!("Check complete. {} of {} sources failed.", failed, checks.len());

    Ok(())
}
