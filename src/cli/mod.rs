//! CLI module for correction-rag
//!
//! Provides subcommands that run the retrieval pipeline against a rules file:
//! - `search`: print the retrieval outcome as JSON
//! - `prompt`: print the rule-augmented prompt
//! - `correct`: send the prompt to the completion provider

mod components;
pub mod correct;
pub mod prompt;
pub mod search;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// correction-rag - Retrieval-augmented prompts for text correction
#[derive(Parser)]
#[command(name = "correction-rag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Retrieve the rules relevant to a text
    Search(search::SearchArgs),

    /// Build the rule-augmented prompt for a text
    Prompt(prompt::PromptArgs),

    /// Correct a text with the completion provider
    Correct(correct::CorrectArgs),
}

/// Input shared by every subcommand
#[derive(Args, Clone, Debug)]
pub struct InputArgs {
    /// JSON file holding an array of rule documents
    #[arg(long)]
    pub rules: PathBuf,

    /// Text to retrieve rules for
    #[arg(long)]
    pub text: String,

    /// Collection to search (overrides config)
    #[arg(long)]
    pub collection: Option<String>,
}
