//! # Question Capture
//!
//! 逐题翻页、把每一屏题目转换成干净文本的自动化工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageSession` - 唯一的 page owner，实现 `PageDriver`（等待加载 / 执行 JS / 截图 / 点击）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单道题
//! - `StructuredExtractor` - DOM 快照 + 启发式规则
//! - `ImagePreprocessor` - 截图增强
//! - `RecognitionEngine` - 多 profile OCR，取最优结果
//! - `text_normalizer` - OCR 文本清洗
//! - `ResultsWriter` - 写结果文件
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的完整提取流程
//! - `ItemCtx` - 上下文封装（题目序号 + 总数）
//! - `ExtractionFlow` - 流程编排（结构化提取 → 截图识别 → 失败占位）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/navigation_loop` - 翻页循环，保证序号连续
//! - `orchestrator/app` - 应用生命周期，管理浏览器资源
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

// 重新导出常用类型
pub use browser::{connect_to_browser_and_page, launch_browser, open_session};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{PageDriver, PageSession};
pub use models::{Item, SourceMethod, StopReason};
pub use orchestrator::{App, NavigationLoop, RunOutcome};
pub use workflow::{ExtractionFlow, ItemCtx};
