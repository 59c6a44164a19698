//! 页面会话 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"等待加载 / 执行 JS / 截图 / 点击"能力

use crate::config::NextControl;
use crate::error::{AppResult, BrowserError, NavigationError};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// 轮询页面状态的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 浏览器协作方
///
/// 提取流程只依赖这个接口，测试时可替换为假页面
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// 等待 document.readyState 变为 complete
    async fn wait_for_load_complete(&self, timeout: Duration) -> AppResult<()>;

    /// 执行 JS 代码并返回 JSON 结果
    async fn evaluate(&self, script: &str) -> AppResult<JsonValue>;

    /// 截取当前视口，返回 PNG 字节
    async fn capture_screenshot(&self) -> AppResult<Vec<u8>>;

    /// 点击控件；超时内找不到或点击失败都返回错误
    async fn click_element(&self, control: &NextControl, timeout: Duration) -> AppResult<()>;

    /// 执行 JS 代码并反序列化为指定类型
    async fn eval_as<T: DeserializeOwned>(&self, script: &str) -> AppResult<T> {
        let json_value = self.evaluate(script).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}

/// 基于 chromiumoxide 的页面会话
pub struct PageSession {
    page: Page,
}

impl PageSession {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn find_control(&self, control: &NextControl) -> Option<Element> {
        let found = match control.to_css() {
            Some(css) => self.page.find_element(css).await,
            None => self.page.find_xpath(control.selector.as_str()).await,
        };
        found.ok()
    }
}

impl PageDriver for PageSession {
    async fn wait_for_load_complete(&self, limit: Duration) -> AppResult<()> {
        let poll = async {
            loop {
                let state: Option<String> = self
                    .eval_as("document.readyState")
                    .await
                    .ok();
                if state.as_deref() == Some("complete") {
                    return;
                }
                sleep(POLL_INTERVAL).await;
            }
        };
        timeout(limit, poll).await.map_err(|_| BrowserError::LoadTimeout {
            timeout_ms: limit.as_millis() as u64,
        })?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> AppResult<JsonValue> {
        let result = self.page.evaluate(script.to_string()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    async fn capture_screenshot(&self) -> AppResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let bytes = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| BrowserError::ScreenshotFailed {
                source: Box::new(e),
            })?;
        debug!("截图完成: {} 字节", bytes.len());
        Ok(bytes)
    }

    async fn click_element(&self, control: &NextControl, limit: Duration) -> AppResult<()> {
        let find = async {
            loop {
                if let Some(element) = self.find_control(control).await {
                    return element;
                }
                sleep(POLL_INTERVAL).await;
            }
        };
        let element = timeout(limit, find)
            .await
            .map_err(|_| NavigationError::ControlNotFound {
                selector: control.selector.clone(),
                kind: control.kind.as_str().to_string(),
                timeout_ms: limit.as_millis() as u64,
            })?;

        let click_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            NavigationError::ClickFailed {
                selector: control.selector.clone(),
                source,
            }
        };
        match timeout(limit, element.click()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(click_failed(Box::new(e)).into()),
            Err(e) => Err(click_failed(Box::new(e)).into()),
        }
    }
}
