use clap::Parser;
use dept_mapper::core::discovery::{is_web_url, BoardDiscoverer, DiscoveryTimeouts};
use dept_mapper::domain::model::DepartmentRef;
use dept_mapper::utils::error::MapperError;
use dept_mapper::utils::{logger, validation::Validate};
use dept_mapper::{HttpFetcher, MapperConfig, SelectorDetector};

#[derive(Parser)]
#[command(name = "probe_boards")]
#[command(about = "Run board discovery against a single department homepage")]
struct Args {
    /// Department homepage URL
    url: String,

    /// Department name used in manual review output
    #[arg(long, default_value = "probe")]
    name: String,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = match MapperConfig::load(args.config.as_deref())
        .and_then(|config| config.validate().map(|_| config))
    {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    if !is_web_url(&args.url) {
        exit_with(&MapperError::InvalidUrl { url: args.url });
    }

    let fetcher = HttpFetcher::new(&config.http.user_agent)?;
    let discoverer = BoardDiscoverer::new(
        fetcher,
        SelectorDetector::new(config.cms_rules.clone()),
        config.keywords.clone(),
        &config.discovery,
        DiscoveryTimeouts::from(&config.http),
    );

    let department = DepartmentRef::new("probe", &args.name);
    let result = discoverer.discover(&department, &args.url).await;

    // 首頁取得成功時回報 CMS 判定結果
    if result.manual_review.is_none() {
        match &result.layout {
            Some(bundle) => tracing::info!("🧩 Homepage layout: {:?}", bundle),
            None => {
                let e = MapperError::SelectorUnresolved {
                    url: args.url.clone(),
                };
                tracing::warn!("⚠️ {} ({})", e, e.recovery_suggestion());
            }
        }
    }

    let report = serde_json::json!({
        "boards": result.boards,
        "manual_review": result.manual_review,
        "layout": result.layout,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn exit_with(e: &MapperError) -> ! {
    tracing::error!("❌ {}", e);
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(1);
}
