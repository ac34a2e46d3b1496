use clap::Parser;
use rent_portal_sync::config::cli::DEFAULT_STORE_PATH;
use rent_portal_sync::utils::error::ErrorSeverity;
use rent_portal_sync::utils::{logger, validation::validate_email, validation::Validate};
use rent_portal_sync::{
    CliConfig, ContactRetriever, ContactStore, JsonFileStore, PortalError, PortalRegistry,
    ReqwestConnector, TomlConfig,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting rent-portal-sync");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    match run(&config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(
                "❌ Retrieval failed: {} (Kind: {:?}, Severity: {:?})",
                e,
                e.kind(),
                e.severity()
            );
            for failure in e.failures().iter().skip(1) {
                tracing::error!("❌ Additional failure: {}", failure);
            }
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}

async fn run(config: &CliConfig) -> Result<(), PortalError> {
    config.validate()?;

    let file_config = match &config.config {
        Some(path) => TomlConfig::from_file(path)?,
        None => TomlConfig::default(),
    };
    file_config.validate()?;

    let connector = Arc::new(ReqwestConnector::new(
        file_config.timeout(),
        file_config.user_agent(),
    ));
    let context = file_config.portal_context(connector);

    let retriever = ContactRetriever::new(PortalRegistry::with_builtin_portals(), context)
        .with_timeout(Duration::from_secs(config.timeout_secs));

    let record = retriever.retrieve(&config.request()).await?;
    validate_email("email", &record.email)?;

    println!("{}", serde_json::to_string_pretty(&record)?);

    if !config.no_store {
        // 命令列 > 設定檔 > 預設值
        let store_path = config
            .store_path
            .as_deref()
            .or(file_config.store_path())
            .unwrap_or(DEFAULT_STORE_PATH);
        let store = JsonFileStore::new(store_path);
        store.upsert(&record).await?;
        tracing::info!("📁 Contact saved to: {}", store.path().display());
    }

    Ok(())
}
