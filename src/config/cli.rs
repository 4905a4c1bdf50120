use crate::config::toml_config::MapperConfig;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "dept-mapper")]
#[command(about = "Map campus pages into colleges and departments, then discover department notice boards")]
pub struct CliConfig {
    /// Path to TOML configuration file (defaults to ./dept-mapper.toml, then built-in values)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the output directory from config
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Only map the named campus (repeatable); also filters a file given to --from-hierarchy
    #[arg(long = "campus")]
    pub campuses: Vec<String>,

    /// Stop after writing the department hierarchy
    #[arg(long)]
    pub map_only: bool,

    /// Skip campus mapping and discover boards from a previously written departments file
    #[arg(long)]
    pub from_hierarchy: Option<String>,

    /// Show the loaded configuration without fetching anything
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Log elapsed time and memory per phase")]
    pub monitor: bool,
}

impl CliConfig {
    /// 載入設定檔並套用命令列覆蓋
    pub fn resolve(&self) -> Result<MapperConfig> {
        let mut config = MapperConfig::load(self.config.as_deref())?;

        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        config.retain_campuses(&self.campuses);

        Ok(config)
    }
}
