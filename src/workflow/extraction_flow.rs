//! 单题提取流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整提取流程
//!
//! 流程顺序：
//! 1. 结构化提取（DOM 快照 → 启发式规则）
//! 2. 截图 → 预处理 → OCR → 文本清洗
//! 3. 失败占位（兜底）
//!
//! 无论哪一步失败，都返回一个 Item，保证序号不缺位

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::GrayImage;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::infrastructure::PageDriver;
use crate::models::{
    ConfidenceSignal, DeduplicationState, ExtractionAttempt, Item, PageMetrics, SourceMethod,
};
use crate::services::structured_extractor::split_enumerated;
use crate::services::text_normalizer;
use crate::services::{ImagePreprocessor, OcrBackend, RecognitionEngine, StructuredExtractor};
use crate::utils::logging::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

const METRICS_SCRIPT: &str =
    "({ scrollHeight: document.documentElement.scrollHeight, viewportHeight: window.innerHeight })";

/// 滚动后等待重绘
const SCROLL_SETTLE: Duration = Duration::from_millis(200);

/// 截图相关设置
#[derive(Debug, Clone)]
struct CaptureSettings {
    scroll_margin_px: f64,
    screenshot_folder: PathBuf,
    save_screenshots: bool,
}

/// 单题提取流程
///
/// - 决定先走结构化提取还是 OCR
/// - 持有去重状态，每接受一道结构化结果更新一次
/// - 不持有 page，只依赖 PageDriver 能力
pub struct ExtractionFlow<B> {
    extractor: StructuredExtractor,
    preprocessor: ImagePreprocessor,
    engine: RecognitionEngine<B>,
    dedup: DeduplicationState,
    capture: CaptureSettings,
}

impl<B: OcrBackend> ExtractionFlow<B> {
    pub fn new(config: &Config, backend: B) -> Self {
        Self {
            extractor: StructuredExtractor::new(&config.extraction),
            preprocessor: ImagePreprocessor::new(config.preprocess),
            engine: RecognitionEngine::new(backend, config.ocr.profiles.clone()),
            dedup: DeduplicationState::new(),
            capture: CaptureSettings {
                scroll_margin_px: f64::from(config.extraction.scroll_capture_margin_px),
                screenshot_folder: config.output.screenshot_folder.clone(),
                save_screenshots: config.output.save_screenshots,
            },
        }
    }

    pub fn dedup_state(&self) -> &DeduplicationState {
        &self.dedup
    }

    pub fn engine(&self) -> &RecognitionEngine<B> {
        &self.engine
    }

    /// 新会话开始时清空去重状态
    pub fn reset_session(&mut self) {
        self.dedup.reset();
    }

    /// 提取一道题，永远返回一个 Item
    pub async fn extract<P: PageDriver>(&mut self, page: &P, ctx: &ItemCtx) -> Item {
        // ========== 流程 1: 结构化提取 ==========
        if let Some(attempt) = self.extractor.try_extract(page, &self.dedup).await {
            info!(
                "{} ✓ 结构化提取成功 ({:?}): {} 个选项",
                ctx,
                attempt.confidence_signal,
                attempt.options.len()
            );
            debug!("{} 题干: {}", ctx, truncate_text(&attempt.stem, 80));
            self.dedup.accept(&attempt.stem);
            return Item::new(ctx.index, attempt.stem, attempt.options, SourceMethod::Structured);
        }

        // ========== 流程 2: 截图 + OCR ==========
        info!("{} 🔍 结构化提取无结果，改用截图识别...", ctx);
        let captures = self.capture_viewports(page, ctx).await;
        let assets = self.save_captures(&captures, ctx).await;

        let mut texts = Vec::with_capacity(captures.len());
        for (part, png) in captures.iter().enumerate() {
            if let Some(text) = self.recognize_capture(png, ctx, part + 1).await {
                texts.push(text);
            }
        }

        let cleaned = text_normalizer::clean(&texts.join("\n\n"));
        if cleaned.is_empty() {
            // ========== 流程 3: 兜底 ==========
            warn!("{} ❌ 截图识别也没有得到文本，写入失败占位", ctx);
            return Item::failed(ctx.index).with_assets(assets);
        }

        let (stem, options) = split_enumerated(&cleaned);
        let attempt = ExtractionAttempt {
            stem,
            options,
            confidence_signal: ConfidenceSignal::WordCount(text_normalizer::word_count(&cleaned)),
        };
        info!(
            "{} ✓ 截图识别完成 ({:?}): {} 个选项",
            ctx,
            attempt.confidence_signal,
            attempt.options.len()
        );
        Item::new(ctx.index, attempt.stem, attempt.options, SourceMethod::Recognized)
            .with_assets(assets)
    }

    /// 截取视口；内容超出视口时再截中部和底部，最后滚回顶部
    async fn capture_viewports<P: PageDriver>(&self, page: &P, ctx: &ItemCtx) -> Vec<Vec<u8>> {
        let metrics = match page.eval_as::<PageMetrics>(METRICS_SCRIPT).await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!("{} ⚠️ 读取页面尺寸失败，只截取当前视口: {}", ctx, e);
                None
            }
        };

        let mut offsets = vec![None];
        if let Some(m) = metrics.filter(|m| m.overflows(self.capture.scroll_margin_px)) {
            debug!(
                "{} 页面高度 {} 超出视口 {}，追加滚动截图",
                ctx, m.scroll_height, m.viewport_height
            );
            offsets.push(Some(m.middle_offset()));
            offsets.push(Some(m.bottom_offset()));
        }

        let mut captures = Vec::with_capacity(offsets.len());
        for offset in &offsets {
            if let Some(y) = offset {
                scroll_to(page, *y, ctx).await;
            }
            match page.capture_screenshot().await {
                Ok(png) => captures.push(png),
                Err(e) => warn!("{} ⚠️ 截图失败，跳过: {}", ctx, e),
            }
        }
        if offsets.len() > 1 {
            scroll_to(page, 0.0, ctx).await;
        }
        captures
    }

    /// 保存截图，返回成功写入的路径
    async fn save_captures(&self, captures: &[Vec<u8>], ctx: &ItemCtx) -> Vec<PathBuf> {
        if !self.capture.save_screenshots || captures.is_empty() {
            return Vec::new();
        }
        let folder = &self.capture.screenshot_folder;
        if let Err(e) = tokio::fs::create_dir_all(folder).await {
            warn!("{} ⚠️ 无法创建截图目录 {}: {}", ctx, folder.display(), e);
            return Vec::new();
        }

        let mut saved = Vec::with_capacity(captures.len());
        for (part, png) in captures.iter().enumerate() {
            let path = asset_path(folder, ctx.index, part + 1);
            match tokio::fs::write(&path, png).await {
                Ok(()) => {
                    debug!("{} 截图已保存: {}", ctx, path.display());
                    saved.push(path);
                }
                Err(e) => warn!("{} ⚠️ 保存截图失败 {}: {}", ctx, path.display(), e),
            }
        }
        saved
    }

    /// 解码 → 预处理 → OCR；解码失败或识别为空时返回 None
    async fn recognize_capture(&self, png: &[u8], ctx: &ItemCtx, part: usize) -> Option<String> {
        let decoded = match image::load_from_memory(png) {
            Ok(image) => image,
            Err(e) => {
                warn!("{} ⚠️ 第 {} 张截图解码失败: {}", ctx, part, e);
                return None;
            }
        };

        let preprocessor = self.preprocessor.clone();
        let enhanced: GrayImage =
            match tokio::task::spawn_blocking(move || preprocessor.enhance(&decoded)).await {
                Ok(image) => image,
                Err(e) => {
                    warn!("{} ⚠️ 第 {} 张截图预处理失败: {}", ctx, part, e);
                    return None;
                }
            };

        let recognition = self.engine.recognize(&enhanced).await;
        debug!(
            "{} 第 {} 张截图: profile {:?}, {} 个单词",
            ctx,
            part,
            recognition.profile.map(|p| p.name),
            recognition.word_count
        );
        Some(recognition.text).filter(|text| !text.trim().is_empty())
    }
}

async fn scroll_to<P: PageDriver>(page: &P, y: f64, ctx: &ItemCtx) {
    let script = format!("window.scrollTo(0, {})", y.round());
    if let Err(e) = page.evaluate(&script).await {
        warn!("{} ⚠️ 滚动到 {} 失败: {}", ctx, y, e);
        return;
    }
    sleep(SCROLL_SETTLE).await;
}

fn asset_path(folder: &Path, index: usize, part: usize) -> PathBuf {
    folder.join(format!("item_{:03}_{}.png", index, part))
}
