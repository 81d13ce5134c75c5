use anyhow::Context;
use blood_calculator::core::protocol::{ErrorResponse, Response};
use blood_calculator::utils::{logger, validation::Validate};
use blood_calculator::{CalcError, CliConfig, Dispatcher, EngineConfig};
use clap::Parser;
use std::io;

fn load_config(cli: &CliConfig) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("validating configuration")?;
    Ok(config)
}

fn main() {
    let cli = CliConfig::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            logger::init_logger(cli.verbose, None, cli.log_json);
            tracing::error!("❌ {:#}", e);

            // 設定錯誤同樣以協定格式回報，呼叫端只需解析 stdout
            let error = e
                .downcast_ref::<CalcError>()
                .map(ErrorResponse::from)
                .unwrap_or_else(|| ErrorResponse {
                    error: format!("{:#}", e),
                    kind: "configuration".to_string(),
                });
            if let Ok(body) = serde_json::to_string(&Response::Error(error)) {
                println!("{}", body);
            }
            let exit_code = e.downcast_ref::<CalcError>().map_or(2, CalcError::exit_code);
            std::process::exit(exit_code);
        }
    };

    logger::init_logger(
        cli.verbose,
        Some(config.logging.level.as_str()),
        config.logging.json,
    );
    tracing::debug!("Engine config: {:?}", config);

    let dispatcher = Dispatcher::new(config.limits);
    let exit_code = dispatcher.run(io::stdin().lock(), io::stdout().lock());

    if exit_code == 0 {
        tracing::info!("✅ Request handled");
    }
    std::process::exit(exit_code);
}
