//! 浏览器会话
//!
//! 配置了调试端口时连接已打开的浏览器，否则自行启动一个

pub mod connection;
pub mod launch;

pub use connection::connect_to_browser_and_page;
pub use launch::launch_browser;

use crate::config::BrowserSettings;
use crate::error::AppResult;
use chromiumoxide::{Browser, Page};

/// 打开浏览器会话并停在目标页面
pub async fn open_session(settings: &BrowserSettings, url: &str) -> AppResult<(Browser, Page)> {
    match settings.debug_port {
        Some(port) => connect_to_browser_and_page(port, url).await,
        None => launch_browser(settings, url).await,
    }
}
