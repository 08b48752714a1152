//! Search command - prints the retrieval outcome as JSON

use clap::Args;

use crate::config::AppConfig;
use crate::domain::RetrievalOptions;
use crate::infrastructure::logging::init_logging;

use super::components::{build_retriever, load_rules, retrieval_options};
use super::InputArgs;

/// Arguments for the search command
#[derive(Args, Clone, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Strategy name (default, hierarchical, category, doc_type, combined)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Maximum number of results (overrides config)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Minimum similarity score (overrides config)
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Document type for doc-type search, repeatable
    #[arg(long = "doc-type")]
    pub doc_types: Vec<String>,

    /// Append chunk results to category search
    #[arg(long)]
    pub include_chunks: bool,
}

impl SearchArgs {
    /// Apply the overrides to the configured options
    pub fn options(&self, base: RetrievalOptions) -> anyhow::Result<RetrievalOptions> {
        let mut options = base.with_include_chunks(self.include_chunks);

        if let Some(ref name) = self.strategy {
            options = options.with_strategy_name(name)?;
        }
        if let Some(limit) = self.limit {
            options = options.with_limit(limit);
        }
        if let Some(min_score) = self.min_score {
            options = options.with_min_score(min_score);
        }
        if !self.doc_types.is_empty() {
            options = options.with_doc_types(self.doc_types.clone());
        }

        Ok(options)
    }
}

/// Run the search command
pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging);

    let options = args.options(retrieval_options(&config, &args.input))?;
    let rules = load_rules(&args.input.rules).await?;
    let retriever = build_retriever(&config, rules).await?;

    let outcome = retriever.find_relevant_rules(&args.input.text, &options).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
