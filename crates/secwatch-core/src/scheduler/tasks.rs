use tokio::task::JoinSet;

use crate::config::AppConfig;
use crate::feed::{Article, ParserRegistry};
use crate::{Error, Result};

/// Result of polling one source once
pub struct SourceCheck {
    pub source: String,
    pub result: Result<Vec<Article>>,
}

/// Poll sources once, concurrently, without touching history or sinks.
/// Articles are sanitized and keyword filtered the same way the watcher
/// does it. `only` restricts the check to one source by name.
pub async fn check_sources(
    config: &AppConfig,
    parsers: &ParserRegistry,
    only: Option<&str>,
) -> Result<Vec<SourceCheck>> {
    let sources: Vec<_> = config
        .sources
        .iter()
        .filter(|s| only.map_or(true, |name| s.name == name))
        .cloned()
        .collect();

    if let (Some(name), true) = (only, sources.is_empty()) {
        return Err(Error::Config(format!("no source named '{}'", name)));
    }

    let mut join_set = JoinSet::new();
    for (index, source) in sources.into_iter().enumerate() {
        let parser = parsers.get(source.source_type).ok_or_else(|| {
            Error::Config(format!("no parser for type '{}'", source.source_type))
        })?;
        join_set.spawn(async move {
            let result = parser.fetch_and_parse(&source).await.map(|articles| {
                articles
                    .into_iter()
                    .map(Article::sanitized)
                    .filter(|a| source.matches_keywords(&a.title))
                    .collect()
            });
            (index, SourceCheck { source: source.name, result })
        });
    }

    let mut checks = Vec::with_capacity(join_set.len());
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(check) => checks.push(check),
            Err(e) => tracing::error!("Check task failed: {}", e),
        }
    }
    checks.sort_by_key(|(index, _)| *index);

    Ok(checks.into_iter().map(|(_, check)| check).collect())
}
