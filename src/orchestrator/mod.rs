//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整次运行的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 打开浏览器、等待登录
//! - 管理浏览器资源（Browser、PageSession）
//! - 监听中断、写入结果、输出统计信息
//!
//! ### `navigation_loop` - 翻页循环
//! - 按顺序处理 N 道题（等待加载 → 提取 → 翻页）
//! - 保证序号连续，翻页失败时提前结束
//!
//! ## 层次关系
//!
//! ```text
//! app (持有 Browser / PageSession)
//!     ↓
//! navigation_loop (处理 N 道题)
//!     ↓
//! workflow::ExtractionFlow (处理单道题)
//!     ↓
//! services (能力层：结构化提取 / 预处理 / OCR / 清洗 / 写结果)
//!     ↓
//! infrastructure (基础设施：PageSession)
//! ```

pub mod app;
pub mod navigation_loop;

// 重新导出主要类型
pub use app::App;
pub use navigation_loop::{LoopSettings, LoopState, NavigationLoop, RunOutcome};
