//! 一次运行的结局与统计

use crate::models::{Item, SourceMethod};
use std::fmt;

/// 循环结束的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// 跑满 N 道题
    Completed,
    /// 点击"下一题"失败，提前结束
    NavigationFailed(String),
    /// 收到 Ctrl-C
    Interrupted,
}

impl StopReason {
    pub fn is_completed(&self) -> bool {
        matches!(self, StopReason::Completed)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => f.write_str("completed"),
            StopReason::NavigationFailed(reason) => write!(f, "navigation failed: {}", reason),
            StopReason::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// 按来源统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub structured: usize,
    pub recognized: usize,
    pub failed: usize,
}

impl RunSummary {
    /// 计入一道已处理的题
    pub fn record(&mut self, item: &Item) {
        self.processed += 1;
        match item.source_method {
            SourceMethod::Structured => self.structured += 1,
            SourceMethod::Recognized => self.recognized += 1,
            SourceMethod::Failed => self.failed += 1,
        }
    }
}
