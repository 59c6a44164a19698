use anyhow::{Context, Result};
use question_capture::utils::logging;
use question_capture::{App, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 加载配置（缺少必填项时在打开浏览器之前退出）
    let config_path = Config::resolve_path(std::env::args().nth(1));
    let config = Config::load(&config_path)
        .with_context(|| format!("加载配置失败: {}", config_path.display()))?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let outcome = App::initialize(config).await?.run().await?;

    if !outcome.stop_reason.is_completed() {
        tracing::warn!("⚠️ 运行提前结束: {}", outcome.stop_reason);
    }

    Ok(())
}
