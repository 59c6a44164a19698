//! 应用生命周期 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打印启动信息、打开浏览器、等待人工登录
//! 2. **资源管理**：唯一持有 Browser 和 PageSession
//! 3. **运行循环**：检查 OCR 环境、监听 Ctrl-C、驱动翻页循环
//! 4. **收尾**：每道题即时追加到结果文件，结束时写入统计

use crate::browser;
use crate::config::Config;
use crate::infrastructure::PageSession;
use crate::models::StopReason;
use crate::orchestrator::navigation_loop::{LoopSettings, NavigationLoop, RunOutcome};
use crate::services::{ResultsWriter, TesseractOcr};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::ExtractionFlow;
use anyhow::{Context, Result};
use chromiumoxide::Browser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    session: PageSession,
    interrupted: Arc<AtomicBool>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let (browser, page) = browser::open_session(&config.browser, &config.website_url)
            .await
            .context("打开浏览器会话失败")?;

        if config.pause_for_login {
            wait_for_operator().await?;
        }

        Ok(Self {
            config,
            _browser: browser,
            session: PageSession::new(page),
            interrupted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> Result<RunOutcome> {
        let ocr = TesseractOcr::new(
            self.config.ocr.tessdata_dir.clone(),
            self.config.ocr.language.clone(),
            self.config.ocr.timeout,
        );
        ocr.ensure_available().await;

        let writer = Arc::new(ResultsWriter::new(&self.config.output.results_file));
        writer
            .start(&self.config.website_url)
            .with_context(|| format!("创建结果文件失败: {}", writer.path().display()))?;

        self.listen_for_interrupt(writer.clone());

        let mut flow = ExtractionFlow::new(&self.config, ocr);
        flow.reset_session();

        let navigation = NavigationLoop::new(
            LoopSettings::from_config(&self.config),
            self.interrupted.clone(),
        );
        let outcome = navigation
            .run(&self.session, &mut flow, |item| {
                if let Err(e) = writer.append_item(item) {
                    error!("❌ 第 {} 题写入结果文件失败: {}", item.index, e);
                }
            })
            .await;

        // 结尾统计总会写入，即使提前结束
        let summary = writer
            .finish(&outcome.stop_reason)
            .with_context(|| format!("写入结果文件失败: {}", writer.path().display()))?;

        print_final_stats(&summary, &outcome.stop_reason, writer.path());

        Ok(outcome)
    }

    /// 第一次 Ctrl-C 设置中断标志，循环在两题之间检查；
    /// 第二次 Ctrl-C 写入结尾统计后立即退出
    fn listen_for_interrupt(&self, writer: Arc<ResultsWriter>) {
        let interrupted = self.interrupted.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !interrupted.swap(true, Ordering::SeqCst) {
                    warn!("⏹️ 收到 Ctrl-C，当前题目完成后停止（再按一次立即退出）");
                    continue;
                }
                warn!("⏹️ 再次收到 Ctrl-C，保存结果后退出");
                if let Err(e) = writer.finish(&StopReason::Interrupted) {
                    error!("❌ 写入结尾统计失败: {}", e);
                }
                std::process::exit(130);
            }
        });
    }
}

/// 等待操作者登录后按回车
async fn wait_for_operator() -> Result<()> {
    info!("🔑 请在浏览器中完成登录并打开第一道题，然后按回车继续...");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("读取标准输入失败")?;
    info!("▶️ 开始自动处理");
    Ok(())
}
