use clap::Parser;
use dept_mapper::utils::error::{ErrorSeverity, MapperError};
use dept_mapper::utils::{logger, validation::Validate};
use dept_mapper::{CliConfig, HttpFetcher, LocalStorage, MapperConfig, MapperEngine, MapperPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting dept-mapper");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(&e));
        }
    };

    display_config_summary(&config, &cli);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be fetched");
        return Ok(());
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let fetcher = HttpFetcher::new(&config.http.user_agent)?;
    let storage = LocalStorage::new(config.output.dir.clone());
    let mut pipeline = MapperPipeline::new(storage, fetcher, config)?;
    if let Some(path) = &cli.from_hierarchy {
        pipeline = pipeline
            .with_hierarchy_source(path.clone())
            .with_campus_filter(cli.campuses.clone());
    }

    let engine = MapperEngine::new_with_monitoring(pipeline, cli.monitor).map_only(cli.map_only);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ Mapping completed successfully!");
            println!("✅ Mapping completed successfully!");
            println!(
                "🏫 {} campuses, {} departments, {} boards, {} need manual review",
                summary.campuses, summary.departments, summary.boards, summary.manual_review
            );
            println!("📁 Output saved to: {}", engine.pipeline().config().output.dir);
        }
        Err(e) => {
            tracing::error!(
                "❌ Mapping failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(e: &MapperError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn display_config_summary(config: &MapperConfig, cli: &CliConfig) {
    tracing::info!("📋 Configuration Summary:");
    tracing::info!("  🏛️ Institution: {} ({})", config.institution.domain, config.institution.id_prefix);
    for campus in &config.campuses {
        tracing::info!("  🏫 {}: {}", campus.name, campus.url);
    }
    tracing::info!(
        "  ⏱️ Timeouts: campus {}s, homepage {}s, sitemap {}s",
        config.http.campus_timeout_secs,
        config.http.homepage_timeout_secs,
        config.http.sitemap_timeout_secs
    );
    tracing::info!(
        "  🔑 Keywords: {}",
        config
            .keywords
            .iter()
            .map(|k| format!("{}→{}", k.keyword, k.id))
            .collect::<Vec<_>>()
            .join(", ")
    );
    tracing::info!(
        "  🧩 CMS rules: {}",
        config
            .cms_rules
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    tracing::info!("  📁 Output: {}", config.output.dir);
    if let Some(path) = &cli.from_hierarchy {
        tracing::info!("  📂 Resuming from hierarchy: {}", path);
    }
    if cli.map_only {
        tracing::info!("  🗺️ Map only, board discovery skipped");
    }
}
