use anyhow::{Context, Result};
use evaluador::config::DEFAULT_CONFIG_FILE;
use evaluador::utils::logging;
use evaluador::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load(DEFAULT_CONFIG_FILE).context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
