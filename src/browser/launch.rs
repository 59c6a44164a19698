use crate::config::BrowserSettings;
use crate::error::{AppResult, BrowserError};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 启动浏览器并导航到指定 URL
///
/// 非无头模式下窗口最大化，并关闭默认的视口模拟，截图尺寸与窗口一致
pub async fn launch_browser(settings: &BrowserSettings, url: &str) -> AppResult<(Browser, Page)> {
    info!(
        "🚀 启动浏览器 ({})...",
        if settings.headless { "无头模式" } else { "窗口模式" }
    );
    debug!("目标 URL: {}", url);

    let mut builder = BrowserConfig::builder().viewport(None).args(vec![
        "--start-maximized",
        "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
        "--disable-dev-shm-usage", // 防止共享内存不足
    ]);
    builder = if settings.headless {
        builder.new_headless_mode().arg("--window-size=1920,1080")
    } else {
        builder.with_head()
    };
    if let Some(executable) = &settings.chrome_executable {
        debug!("使用指定的浏览器: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        BrowserError::LaunchFailed { source: e.into() }
    })?;

    // 启动浏览器
    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed {
            source: Box::new(e),
        }
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    // 创建新页面并导航
    let page = browser.new_page(url).await.map_err(|e| {
        error!("创建页面失败: {}", e);
        BrowserError::NavigationFailed {
            url: url.to_string(),
            source: Box::new(e),
        }
    })?;

    info!("✅ 浏览器已导航到: {}", url);
    Ok((browser, page))
}
