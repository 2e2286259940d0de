use clap::Args;
use serde_json::json;
use utility_providers::config::AppConfig;
use utility_providers::error::AppError;
use utility_providers::workflows::utilities::{ProviderSuggestionService, UtilityCategory};

#[derive(Args, Debug)]
pub(crate) struct SuggestArgs {
    /// Free-form property address
    #[arg(long)]
    pub(crate) address: String,
    /// Utility category; repeat for several (defaults to every category)
    #[arg(long = "category")]
    pub(crate) categories: Vec<UtilityCategory>,
}

#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Provider name or alias fragment
    #[arg(long)]
    pub(crate) query: String,
    /// Restrict matches to one utility category
    #[arg(long)]
    pub(crate) category: Option<UtilityCategory>,
}

pub(crate) async fn run_suggest(args: SuggestArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = ProviderSuggestionService::from_config(&config.suggestions)?;

    let categories = if args.categories.is_empty() {
        UtilityCategory::ALL.to_vec()
    } else {
        args.categories
    };

    let suggestions = service
        .get_all_suggestions(&args.address, &categories)
        .await;
    let output = json!({
        "address": args.address,
        "suggestions": suggestions,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub(crate) fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = ProviderSuggestionService::from_config(&config.suggestions)?;

    let providers = service.search_providers(&args.query, args.category);
    let output = json!({
        "query": args.query,
        "providers": providers,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
