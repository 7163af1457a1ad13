use anyhow::Context;
use clap::Parser;
use listing_intake::core::assets::{AssetAdd, AssetCollection};
use listing_intake::domain::model::{AssetStatus, LoadState, Tier};
use listing_intake::utils::error::ErrorSeverity;
use listing_intake::utils::{logger, validation::Validate};
use listing_intake::{
    CascadingLoader, CliConfig, HttpLookupService, ImageCandidate, ImageValidator, IntakeConfig,
    TracingNotifier,
};
use listing_intake::config::Command;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = IntakeConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    // 初始化日誌
    let verbose = cli.verbose || config.verbose_logs();
    if config.json_logs() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting listing-intake CLI");
    tracing::debug!("CLI args: {:?}", cli);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Browse { industry, category } => browse(&config, industry, category).await,
        Command::CheckImages { files } => check_images(&config, files).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ listing-intake failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn print_tier(loader: &CascadingLoader, tier: Tier, parent: Option<&str>, state: LoadState) {
    let items = loader.items(tier, parent);
    match state {
        LoadState::Loaded => {
            println!("{} options ({}):", tier, items.len());
            for item in items {
                println!("  {:<24} {}", item.id, item.name);
            }
        }
        other => println!("{} options unavailable ({:?})", tier, other),
    }
}

async fn browse(
    config: &IntakeConfig,
    industry: Option<String>,
    category: Option<String>,
) -> listing_intake::Result<()> {
    let lookup = Arc::new(HttpLookupService::from_config(&config.lookup)?);
    let loader = CascadingLoader::new(lookup, Arc::new(TracingNotifier))
        .with_policy(config.retry_policy());

    let state = loader.ensure_loaded(Tier::Industry, None).await?;
    print_tier(&loader, Tier::Industry, None, state);

    if let Some(industry_id) = industry.as_deref() {
        let state = loader.ensure_loaded(Tier::Category, Some(industry_id)).await?;
        print_tier(&loader, Tier::Category, Some(industry_id), state);
    }

    if let Some(category_id) = category.as_deref() {
        let state = loader.ensure_loaded(Tier::Subcategory, Some(category_id)).await?;
        print_tier(&loader, Tier::Subcategory, Some(category_id), state);
    }

    Ok(())
}

async fn check_images(config: &IntakeConfig, files: Vec<PathBuf>) -> listing_intake::Result<()> {
    let mut candidates = Vec::with_capacity(files.len());
    for path in &files {
        candidates.push(ImageCandidate::from_path(path).await?);
    }

    let validator = ImageValidator::new(config.image_rules());
    let results = validator.validate_batch(candidates, &TracingNotifier).await;

    let mut collection = AssetCollection::new(config.asset_limits());
    for asset in results {
        match &asset.status {
            AssetStatus::Valid => println!("✅ {} {}x{}", asset.name, asset.width, asset.height),
            AssetStatus::Rejected(reason) => println!("❌ {} {}", asset.name, reason),
            AssetStatus::Pending => println!("⏳ {}", asset.name),
        }
        if collection.add(asset) == AssetAdd::LimitReached {
            println!("⚠️ image limit of {} reached", collection.limits().max);
        }
    }

    let limits = collection.limits();
    if collection.is_complete() {
        println!(
            "📁 {} accepted images, listing is ready ({}-{} required)",
            collection.len(),
            limits.min,
            limits.max
        );
    } else {
        println!(
            "📁 {} accepted images, a listing needs {}-{}",
            collection.len(),
            limits.min,
            limits.max
        );
    }

    Ok(())
}
