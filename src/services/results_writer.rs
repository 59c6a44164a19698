//! 结果写入服务 - 业务能力层
//!
//! 页头在开始时写入，每道题处理完立即追加，结尾统计最后写入。
//! 中途退出时文件里已经有处理过的题目。

use crate::error::{AppError, AppResult};
use crate::models::{Item, RunSummary, StopReason};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

const RULE_WIDTH: usize = 60;

#[derive(Debug, Default)]
struct WriterState {
    summary: RunSummary,
    finished: bool,
}

/// 结果写入服务
///
/// 可以在翻页循环和 Ctrl-C 监听之间共享
pub struct ResultsWriter {
    results_path: PathBuf,
    state: Mutex<WriterState>,
}

impl ResultsWriter {
    pub fn new(results_path: impl Into<PathBuf>) -> Self {
        Self {
            results_path: results_path.into(),
            state: Mutex::new(WriterState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.results_path
    }

    /// 覆盖旧文件并写入页头
    pub fn start(&self, source_url: &str) -> AppResult<()> {
        if let Some(parent) = self.results_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }
        fs::write(&self.results_path, render_banner(source_url, Local::now()))
            .map_err(|e| self.write_failed(e))?;

        *self.lock() = WriterState::default();
        debug!("结果文件已创建: {}", self.results_path.display());
        Ok(())
    }

    /// 追加一道题
    pub fn append_item(&self, item: &Item) -> AppResult<()> {
        let mut state = self.lock();
        self.append(&render_item(item))?;
        state.summary.record(item);
        Ok(())
    }

    /// 追加结尾统计，返回本次运行的统计
    ///
    /// 重复调用只写一次
    pub fn finish(&self, stop_reason: &StopReason) -> AppResult<RunSummary> {
        let mut state = self.lock();
        if state.finished {
            return Ok(state.summary);
        }
        self.append(&render_summary(&state.summary, stop_reason))?;
        state.finished = true;

        info!(
            "💾 已写入 {} 道题到 {}",
            state.summary.processed,
            self.results_path.display()
        );
        Ok(state.summary)
    }

    fn append(&self, content: &str) -> AppResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.results_path)
            .map_err(|e| self.write_failed(e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| self.write_failed(e))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_failed(&self, e: std::io::Error) -> AppError {
        AppError::file_write_failed(self.results_path.display().to_string(), e)
    }
}

/// 页头：生成时间与来源
pub fn render_banner(source_url: &str, generated_at: DateTime<Local>) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    // write! 到 String 不会失败
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "QUESTION CAPTURE RESULTS");
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Source: {}", source_url);
    let _ = writeln!(out, "{}", heavy);
    out.push('\n');
    out
}

/// 单道题：序号、来源、截图文件、题目正文
pub fn render_item(item: &Item) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "QUESTION {}", item.index);
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    let _ = writeln!(out, "(source: {})", item.source_method);
    for asset in &item.raw_assets {
        let _ = writeln!(out, "File: {}", asset.display());
    }
    out.push_str(&item.formatted_text());
    out.push('\n');
    out
}

/// 结尾统计
pub fn render_summary(summary: &RunSummary, stop_reason: &StopReason) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "SUMMARY");
    let _ = writeln!(out, "Processed: {}", summary.processed);
    let _ = writeln!(out, "Structured: {}", summary.structured);
    let _ = writeln!(out, "Recognized: {}", summary.recognized);
    let _ = writeln!(out, "Failed: {}", summary.failed);
    let _ = writeln!(out, "Stop reason: {}", stop_reason);
    let _ = writeln!(out, "{}", heavy);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceMethod;
    use chrono::TimeZone;

    fn structured_item() -> Item {
        Item::new(
            1,
            "What is the capital of France?",
            vec!["Paris".into(), "London".into(), "Berlin".into()],
            SourceMethod::Structured,
        )
    }

    #[test]
    fn test_banner_layout() {
        let generated_at = Local.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let text = render_banner("https://example.test/quiz", generated_at);

        assert!(text.starts_with(&"=".repeat(60)));
        assert!(text.contains("QUESTION CAPTURE RESULTS\n"));
        assert!(text.contains("Generated: 2026-03-01 09:30:00\n"));
        assert!(text.contains("Source: https://example.test/quiz\n"));
    }

    #[test]
    fn test_item_layout() {
        assert_eq!(
            render_item(&structured_item()),
            "QUESTION 1\n------------------------------------------------------------\n(source: structured)\nWhat is the capital of France?\n\nA. Paris\nB. London\nC. Berlin\n\n"
        );
        let failed = render_item(&Item::failed(2));
        assert!(failed.contains("(source: failed)\n[EXTRACTION FAILED - question 2 needs manual review]\n"));
    }

    #[test]
    fn test_item_lists_screenshot_files() {
        let item = Item::new(3, "Identify the organelle", vec![], SourceMethod::Recognized)
            .with_assets(vec![
                PathBuf::from("screenshots/item_003_1.png"),
                PathBuf::from("screenshots/item_003_2.png"),
            ]);
        let text = render_item(&item);
        assert!(text.contains(
            "(source: recognized)\nFile: screenshots/item_003_1.png\nFile: screenshots/item_003_2.png\nIdentify the organelle\n"
        ));
    }

    #[test]
    fn test_items_are_on_disk_before_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.txt");
        let writer = ResultsWriter::new(&path);

        writer.start("https://example.test").unwrap();
        writer.append_item(&structured_item()).unwrap();

        // 还没写结尾统计，第一题已经落盘
        let partial = fs::read_to_string(writer.path()).unwrap();
        assert!(partial.contains("Source: https://example.test\n"));
        assert!(partial.contains("QUESTION 1\n"));
        assert!(!partial.contains("SUMMARY"));

        writer.append_item(&Item::failed(2)).unwrap();
        let summary = writer.finish(&StopReason::Interrupted).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);

        let written = fs::read_to_string(writer.path()).unwrap();
        assert!(written.find("QUESTION 1").unwrap() < written.find("QUESTION 2").unwrap());
        assert!(written.contains(
            "Processed: 2\nStructured: 1\nRecognized: 0\nFailed: 1\nStop reason: interrupted\n"
        ));
    }

    #[test]
    fn test_finish_writes_summary_once() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultsWriter::new(dir.path().join("results.txt"));

        writer.start("https://example.test").unwrap();
        writer.finish(&StopReason::Interrupted).unwrap();
        writer.finish(&StopReason::Completed).unwrap();

        let written = fs::read_to_string(writer.path()).unwrap();
        assert_eq!(written.matches("SUMMARY").count(), 1);
        assert!(written.contains("Stop reason: interrupted\n"));
    }

    #[test]
    fn test_start_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        fs::write(&path, "stale content from an older run\n").unwrap();

        let writer = ResultsWriter::new(&path);
        writer.start("https://example.test").unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("stale content"));
    }

    #[test]
    fn test_empty_run_still_has_summary() {
        let text = render_summary(
            &RunSummary::default(),
            &StopReason::NavigationFailed("button missing".into()),
        );
        assert!(text.contains("Processed: 0\n"));
        assert!(text.contains("Stop reason: navigation failed: button missing\n"));
    }
}
