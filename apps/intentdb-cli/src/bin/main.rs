use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use intentdb_core::config::{expand_path, Config};
use intentdb_core::model_source::DirectoryModelSource;
use intentdb_core::types::{DocumentType, SearchResponse};
use intentdb_embed::get_default_embedder;
use intentdb_hybrid::{HybridSearchEngine, SearchRequest};
use intentdb_vector::{CachedEmbedder, EmbeddingCache};

const USAGE: &str = "Usage: intentdb <command> [args...]

Commands:
  index                         build the index and print a summary
  stats                         build the index and print statistics as JSON
  query <text> [options]        search the page models
      --scope <all|pages|elements|tasks|steps>
      --limit <n>               maximum results
      --min-similarity <f>      threshold for results with no keyword overlap
      --timeout-ms <n>          abort the search after n milliseconds
      --json                    print the raw response as JSON
  page-for-url <url>            find the page owning a URL
  cache-stats                   show embedding cache statistics
  cache-clear                   delete every cached embedding";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn build_engine(config: &Config) -> Result<(HybridSearchEngine, Arc<CachedEmbedder>)> {
    let models_dir = expand_path(config.data()?.models_dir);
    let embedder = Arc::new(CachedEmbedder::from_config(
        get_default_embedder(&config.embedding()?)?,
        &config.cache()?,
    ));
    let engine = HybridSearchEngine::new(
        Box::new(DirectoryModelSource::new(models_dir)),
        embedder.clone(),
        config.search()?,
    );
    Ok((engine, embedder))
}

fn print_response(query: &str, response: &SearchResponse) {
    if let Some(message) = &response.error_message {
        eprintln!("❌ Search failed: {message}");
        return;
    }
    println!(
        "🔍 {} of {} matches for \"{query}\" ({} ms)",
        response.results.len(),
        response.total_matches,
        response.duration_ms
    );
    for (i, result) in response.results.iter().enumerate() {
        println!(
            "\n  {}. score={:.4}  cos={:.4}  bm25={:.4}  [{}] {}",
            i + 1,
            result.score,
            result.similarity,
            result.lexical_score,
            result.doc_type,
            result.page_name
        );
        println!("     📝 \"{}\"", result.matched_utterance);
        if let Some(element) = &result.context.element_name {
            println!("     element: {element}");
        }
        if let Some(task) = &result.context.task_name {
            println!("     task: {task}");
        }
        if let Some(step) = &result.context.step_description {
            println!("     step: {step}");
        }
        if !result.page_url.is_empty() {
            println!("     url: {}", result.page_url);
        }
    }
}

fn flag_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i).map(String::as_str).with_context(|| format!("{flag} requires a value"))
}

fn build_request(config: &Config, args: &[String]) -> Result<(SearchRequest, bool)> {
    let mut query = None;
    let mut json = false;
    let search = config.search()?;
    let mut request = SearchRequest::with_defaults(String::new(), &search);

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--scope" => request = request.scope(flag_value(args, &mut i)?.parse()?),
            "--limit" | "-n" => {
                request = request.max_results(flag_value(args, &mut i)?.parse().context("--limit expects a number")?);
            }
            "--min-similarity" => {
                let threshold = flag_value(args, &mut i)?.parse().context("--min-similarity expects a number")?;
                request = request.min_similarity(threshold);
            }
            "--timeout-ms" => {
                let ms: u64 = flag_value(args, &mut i)?.parse().context("--timeout-ms expects a number")?;
                request = request.timeout(Duration::from_millis(ms));
            }
            "--json" => json = true,
            other if other.starts_with('-') => bail!("unknown option {other}"),
            other => query = Some(other.to_string()),
        }
        i += 1;
    }

    let Some(query) = query else {
        bail!("Usage: intentdb query \"<text>\" [options]");
    };
    request.query = query;
    Ok((request, json))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e:#}");
        e
    })?;
    let (cmd, args) = parse_args();

    match cmd.as_str() {
        "index" => {
            let (engine, embedder) = build_engine(&config)?;
            let stats = engine.initialize().await?;
            println!("✅ Indexed {} utterances", stats.total_documents);
            let per_type: Vec<String> = DocumentType::ALL
                .iter()
                .map(|t| format!("{t}={}", stats.count_for(*t)))
                .collect();
            println!(
                "📊 {} terms={} avg_len={:.2} dim={}",
                per_type.join(" "),
                stats.unique_terms,
                stats.avg_doc_length,
                stats.embedding_dimension.unwrap_or(0)
            );
            println!("💾 embedding cache hits={} misses={}", embedder.hits(), embedder.misses());
        }
        "query" => {
            let (request, json) = build_request(&config, &args)?;
            let (engine, _) = build_engine(&config)?;
            engine.initialize().await?;
            let response = engine.search(&request).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&request.query, &response);
            }
            if !response.is_success() {
                std::process::exit(2);
            }
        }
        "page-for-url" => {
            let Some(url) = args.first() else {
                bail!("Usage: intentdb page-for-url <url>");
            };
            let (engine, _) = build_engine(&config)?;
            engine.initialize().await?;
            match engine.find_page_by_url(url).await {
                Some(page) => println!("{} ({})\n  {}", page.name, page.url, page.description),
                None => {
                    eprintln!("No page matches {url}");
                    std::process::exit(1);
                }
            }
        }
        "cache-stats" => {
            let cache = EmbeddingCache::from_config(&config.cache()?);
            let stats = cache.statistics().await;
            println!("💾 Embedding cache at {}", cache.dir().display());
            println!(
                "  entries={} valid={} expired={} size={}/{} bytes",
                stats.total_entries, stats.valid_entries, stats.expired_entries, stats.total_size_bytes, stats.max_size_bytes
            );
        }
        "cache-clear" => {
            let cache = EmbeddingCache::from_config(&config.cache()?);
            let removed = cache.clear().await?;
            println!("🧹 Removed {removed} cached embeddings from {}", cache.dir().display());
        }
        "stats" => {
            let (engine, _) = build_engine(&config)?;
            engine.initialize().await?;
            println!("{}", serde_json::to_string_pretty(&engine.get_index_statistics().await)?);
        }
        _ => {
            eprintln!("Unknown command: {cmd}\n\n{USAGE}");
            std::process::exit(1);
        }
    }
    Ok(())
}
