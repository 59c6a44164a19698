use crate::error::{AppError, AppResult, BrowserError};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到已打开的浏览器并获取页面
///
/// 已有页面的地址以目标地址开头时直接复用（保留登录状态），否则新建页面并导航
pub async fn connect_to_browser_and_page(port: u16, target_url: &str) -> AppResult<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);
    debug!("目标 URL: {}", target_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("浏览器连接成功");

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

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(page_url)) = p.url().await {
            debug!("检查页面地址: {}", page_url);
            if page_url.starts_with(target_url) {
                info!("✓ 复用已打开的页面: {}", page_url);
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("未找到匹配的页面，创建新页面并导航到: {}", target_url);
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        e
    })?;
    page.goto(target_url).await.map_err(|e| {
        error!("导航到 {} 失败: {}", target_url, e);
        BrowserError::NavigationFailed {
            url: target_url.to_string(),
            source: Box::new(e),
        }
    })?;
    info!("已导航到: {}", target_url);

    Ok((browser, page))
}
