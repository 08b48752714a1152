//! Prompt command - prints the rule-augmented prompt

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use crate::config::AppConfig;
use crate::domain::{InsertionPoint, PromptLimits};
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::services::PromptEnhancer;

use super::components::{build_retriever, load_rules, load_template, retrieval_options};
use super::InputArgs;

/// Arguments for the prompt command
#[derive(Args, Clone, Debug)]
pub struct PromptArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Template file; `${var:text}` receives the text
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Where the rules go (beginning, end, before_instructions, after_instructions)
    #[arg(long)]
    pub insertion_point: Option<InsertionPoint>,

    /// Hard ceiling for the prompt in characters (overrides config)
    #[arg(long)]
    pub max_prompt_chars: Option<usize>,
}

impl PromptArgs {
    pub fn limits(&self, base: PromptLimits) -> PromptLimits {
        let mut limits = base;

        if let Some(insertion_point) = self.insertion_point {
            limits.insertion_point = insertion_point;
        }
        if let Some(max_prompt_chars) = self.max_prompt_chars {
            limits.max_prompt_chars = max_prompt_chars;
        }

        limits
    }
}

/// Run the prompt command
pub async fn run(args: PromptArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging);

    let options = retrieval_options(&config, &args.input);
    let template = load_template(args.template.as_deref()).await?;
    let rules = load_rules(&args.input.rules).await?;
    let retriever = build_retriever(&config, rules).await?;

    let enhancer = PromptEnhancer::new(Arc::new(retriever), args.limits(config.prompt.limits()))?;
    let prompt = enhancer
        .build_prompt(&template, &args.input.text, &options)
        .await?;

    println!("{}", prompt);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_insertion_point_accepts_both_spellings() {
        for spelling in ["after_instructions", "afterInstructions"] {
            let cli = Cli::parse_from([
                "correction-rag",
                "prompt",
                "--rules",
                "rules.json",
                "--text",
                "맞춤법",
                "--insertion-point",
                spelling,
            ]);

            let Command::Prompt(args) = cli.command else {
                panic!("expected prompt command");
            };
            let limits = args.limits(PromptLimits::default());

            assert_eq!(limits.insertion_point, InsertionPoint::AfterInstructions);
        }
    }

    #[test]
    fn test_limits_keep_config_without_overrides() {
        let cli = Cli::parse_from(["correction-rag", "prompt", "--rules", "r.json", "--text", "t"]);

        let Command::Prompt(args) = cli.command else {
            panic!("expected prompt command");
        };

        assert_eq!(args.limits(PromptLimits::default()), PromptLimits::default());
    }
}
