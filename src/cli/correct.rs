//! Correct command - completes the augmented prompt and prints the result

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::config::AppConfig;
use crate::infrastructure::completion::OpenAiCompletionProvider;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::services::{CorrectionService, PromptEnhancer};

use super::components::{build_retriever, load_rules, load_template, retrieval_options};
use super::InputArgs;

/// Arguments for the correct command
#[derive(Args, Clone, Debug)]
pub struct CorrectArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Template file; `${var:text}` receives the text
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Print the full correction result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the correct command
pub async fn run(args: CorrectArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging);

    let options = retrieval_options(&config, &args.input);
    let template = load_template(args.template.as_deref()).await?;
    let rules = load_rules(&args.input.rules).await?;
    let retriever = build_retriever(&config, rules).await?;
    let enhancer = PromptEnhancer::new(Arc::new(retriever), config.prompt.limits())?;

    let settings = &config.completion;
    let client = HttpClient::with_timeout(Duration::from_secs(settings.timeout_secs))?;
    let provider = OpenAiCompletionProvider::with_base_url(
        client,
        settings.api_key.clone().unwrap_or_default(),
        settings.base_url.clone(),
    )
    .with_default_model(settings.model.clone());

    let service = CorrectionService::new(enhancer, Arc::new(provider))
        .with_completion_options(settings.options())
        .with_retry(settings.retry());

    let result = service
        .correct(&args.input.text, &template, &options)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.corrected_text);
    }

    Ok(())
}
