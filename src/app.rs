use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use strum::IntoEnumIterator;

use crate::Config;
use crate::agent::{Planner, Runner};
use crate::cli::{Cli, Commands};
use crate::tools::extract::ExtractEvents;
use crate::tools::fetch::{FetchPage, page_client};
use crate::tools::hygiene::{DedupeEvents, ValidateEvents};
use crate::tools::websearch::{CrawlLimits, DuckDuckGo, WebsearchEvents};
use crate::tools::{StopTool, Tool, ToolId, ToolRegistry};

/// Run one discovery pass end to end.
///
/// 1. Creates the LLM provider from config plus CLI overrides.
/// 2. Phrases the run request around the coming weekend window.
/// 3. Builds the tool registry from the configured sources.
/// 4. Plans, executes, and prints the outcome as pretty JSON.
async fn run(
    mut config: Config,
    focus: String,
    city: Option<String>,
    provider_override: Option<String>,
    model_override: Option<String>,
) -> Result<()> {
    if let Some(city) = city {
        config.city = city;
    }
    if let Some(provider) = provider_override {
        config.llm.provider = provider;
    }
    if let Some(model) = model_override {
        config.llm.model = model;
    }

    // 1. Create LLM provider
    let provider = crate::llm::create_provider(&config.llm)?;

    // 2. Phrase the request around the weekend window
    let (friday, sunday) = crate::utils::weekend::weekend_window(Local::now().date_naive());
    let request = format!(
        "Cultural events in {} from {friday} to {sunday}; focus: {focus}",
        config.city
    );

    // 3. Build tool registry
    let registry = Arc::new(build_registry(
        Arc::clone(&provider),
        &config,
        &focus,
        friday,
        sunday,
    ));

    // 4. Plan, execute, print
    let planner = Planner::new(provider, config.planner.max_retries);
    let runner = Runner::new(
        planner,
        registry,
        Duration::from_secs(config.executor.step_timeout_secs),
    );
    let outcome = runner.run(&request).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}

/// The default registry covers the whole tool vocabulary: one fetcher per
/// configured source, the websearch fallback, extraction, hygiene, and stop.
fn build_registry(
    provider: Arc<dyn crate::llm::Provider>,
    config: &Config,
    focus: &str,
    friday: NaiveDate,
    sunday: NaiveDate,
) -> ToolRegistry {
    let client = page_client(config.fetch.timeout_secs);

    // Queries the websearch fallback issues. Portuguese on purpose, the
    // target listings are Brazilian.
    let queries = vec![
        format!("agenda cultural {} fim de semana", config.city),
        format!("eventos {focus} {} {friday}", config.city),
        format!("o que fazer em {} de {friday} a {sunday}", config.city),
    ];

    let tools: Vec<Box<dyn Tool>> = vec![
        Box::new(FetchPage::new(
            ToolId::FetchSympla,
            "sympla",
            &config.sources.sympla,
            client.clone(),
        )),
        Box::new(FetchPage::new(
            ToolId::FetchSesc,
            "sesc",
            &config.sources.sesc,
            client.clone(),
        )),
        Box::new(FetchPage::new(
            ToolId::FetchEventim,
            "eventim",
            &config.sources.eventim,
            client.clone(),
        )),
        Box::new(FetchPage::new(
            ToolId::FetchSaoPauloSecreto,
            "sao_paulo_secreto",
            &config.sources.sao_paulo_secreto,
            client.clone(),
        )),
        Box::new(WebsearchEvents::new(
            Arc::new(DuckDuckGo::new(None, client.clone())),
            client,
            queries,
            CrawlLimits {
                max_results: config.search.max_results,
                recency: config.search.recency,
                max_pages: config.fetch.max_pages,
                concurrency: config.fetch.concurrency,
                delay_ms: config.fetch.delay_ms,
            },
        )),
        Box::new(ExtractEvents::new(
            provider,
            config.extraction.max_retries,
            config.extraction.max_page_chars,
        )),
        Box::new(DedupeEvents),
        Box::new(ValidateEvents::new(&config.city)),
        Box::new(StopTool),
    ];

    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}

/// Print the tool vocabulary and what the default registry registers.
fn list_tools(config: &Config) -> Result<()> {
    let provider = crate::llm::create_provider(&config.llm)?;
    let (friday, sunday) = crate::utils::weekend::weekend_window(Local::now().date_naive());
    let registry = build_registry(provider, config, "samba", friday, sunday);

    println!("Tool vocabulary:");
    for id in ToolId::iter() {
        let status = if registry.contains(id) {
            "registered"
        } else {
            "missing"
        };
        println!("  {status:<11} {id}");
    }

    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            focus,
            city,
            provider,
            model,
        } => run(config, focus, city, provider, model).await,
        Commands::Tools => list_tools(&config),
    }
}
