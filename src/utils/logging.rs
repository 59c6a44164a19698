/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use crate::config::Config;
use crate::models::{RunSummary, StopReason};
use crate::workflow::ItemCtx;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 优先使用 RUST_LOG；未设置时为 info，verbose 模式下为 debug
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题目截取模式");
    info!("🌐 目标网址: {}", config.website_url);
    info!("📊 题目数量: {}", config.max_items);
    info!(
        "➡️ 翻页控件: {} ({})",
        config.next_control.selector,
        config.next_control.kind.as_str()
    );
    info!("{}", "=".repeat(60));
}

/// 记录单题开始
pub fn log_item_start(ctx: &ItemCtx) {
    info!("\n{}", "─".repeat(60));
    info!("{} 开始处理", ctx);
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, stop_reason: &StopReason, results_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 已处理: {}", summary.processed);
    info!("🧩 结构化提取: {}", summary.structured);
    info!("🔍 截图识别: {}", summary.recognized);
    info!("❌ 失败: {}", summary.failed);
    info!("⏹️ 结束原因: {}", stop_reason);
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", results_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("一二三四五六", 3), "一二三...");
    }
}
