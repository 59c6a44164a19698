//! 翻页循环 - 编排层
//!
//! ## 职责
//!
//! 按顺序处理 N 道题：等待加载 → 提取 → 点击"下一题"。
//!
//! - 每轮都追加一个 Item，序号等于轮次，提取失败也不缺位
//! - 加载超时只记警告，照常提取
//! - 点击失败立即结束，不重试
//! - 每轮之间检查中断标志，已有结果全部保留
//! - 每提取完一道题就交给调用方（用于即时落盘）

use crate::config::{Config, NextControl};
use crate::infrastructure::PageDriver;
use crate::models::{Item, StopReason};
use crate::services::OcrBackend;
use crate::utils::logging::log_item_start;
use crate::workflow::{ExtractionFlow, ItemCtx};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// 循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    WaitingForLoad(usize),
    Extracting(usize),
    Advancing(usize),
    Done,
}

/// 循环参数
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub total: usize,
    /// 页面加载完成后的额外等待
    pub settle_delay: Duration,
    pub load_timeout: Duration,
    pub click_timeout: Duration,
    pub next_control: NextControl,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            total: config.max_items,
            settle_delay: config.wait_time,
            load_timeout: config.browser.load_timeout,
            click_timeout: config.browser.click_timeout,
            next_control: config.next_control.clone(),
        }
    }
}

/// 一次运行的结果
#[derive(Debug)]
pub struct RunOutcome {
    pub items: Vec<Item>,
    pub stop_reason: StopReason,
}

/// 翻页循环
pub struct NavigationLoop {
    settings: LoopSettings,
    interrupted: Arc<AtomicBool>,
}

impl NavigationLoop {
    pub fn new(settings: LoopSettings, interrupted: Arc<AtomicBool>) -> Self {
        Self {
            settings,
            interrupted,
        }
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// 运行到 Done；返回已提取的全部题目和结束原因
    ///
    /// `on_item` 在每道题提取完成后、翻页之前调用
    pub async fn run<P, B, F>(
        &self,
        page: &P,
        flow: &mut ExtractionFlow<B>,
        mut on_item: F,
    ) -> RunOutcome
    where
        P: PageDriver,
        B: OcrBackend,
        F: FnMut(&Item),
    {
        let total = self.settings.total;
        let mut items = Vec::with_capacity(total);
        let mut state = if total == 0 {
            LoopState::Done
        } else {
            LoopState::WaitingForLoad(1)
        };

        let stop_reason = loop {
            state = match state {
                LoopState::WaitingForLoad(index) => {
                    if self.is_interrupted() {
                        warn!("⏹️ 收到中断信号，停止于第 {} 题之前", index);
                        break StopReason::Interrupted;
                    }
                    let ctx = ItemCtx::new(index, total);
                    log_item_start(&ctx);
                    if let Err(e) = page.wait_for_load_complete(self.settings.load_timeout).await {
                        warn!("{} ⚠️ 等待页面加载失败，继续提取: {}", ctx, e);
                    }
                    sleep(self.settings.settle_delay).await;
                    LoopState::Extracting(index)
                }
                LoopState::Extracting(index) => {
                    let ctx = ItemCtx::new(index, total);
                    let item = flow.extract(page, &ctx).await;
                    info!("{} 📝 来源: {}", ctx, item.source_method);
                    on_item(&item);
                    items.push(item);
                    if ctx.is_last() {
                        LoopState::Done
                    } else {
                        LoopState::Advancing(index)
                    }
                }
                LoopState::Advancing(index) => {
                    if self.is_interrupted() {
                        warn!("⏹️ 收到中断信号，已完成 {} 题", index);
                        break StopReason::Interrupted;
                    }
                    let control = &self.settings.next_control;
                    match page.click_element(control, self.settings.click_timeout).await {
                        Ok(()) => LoopState::WaitingForLoad(index + 1),
                        Err(e) => {
                            error!("[题目 {}/{}] ❌ 翻页失败，提前结束: {}", index, total, e);
                            break StopReason::NavigationFailed(e.to_string());
                        }
                    }
                }
                LoopState::Done => break StopReason::Completed,
            };
        };

        RunOutcome { items, stop_reason }
    }
}
