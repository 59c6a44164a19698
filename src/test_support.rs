//! 单元测试用的假页面和假 OCR 后端

use crate::config::NextControl;
use crate::error::{AppResult, BrowserError, NavigationError, OcrError};
use crate::infrastructure::PageDriver;
use crate::models::{LabelNode, PageMetrics, PageSnapshot};
use crate::services::recognition::{OcrBackend, RecognitionProfile};
use image::{GrayImage, ImageFormat, Luma};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 已知结构的快照：一个题干段落 + 若干答案标签
pub fn sample_snapshot(stem: &str, options: &[&str]) -> PageSnapshot {
    PageSnapshot {
        schema_paragraphs: vec![stem.to_string()],
        schema_labels: options
            .iter()
            .map(|text| LabelNode {
                text: text.to_string(),
                sr_only: false,
            })
            .collect(),
        ..Default::default()
    }
}

/// 按 profile 名字返回预设结果的 OCR 后端
///
/// 没有预设的 profile 一律失败
#[derive(Default)]
pub struct FakeOcr {
    responses: HashMap<&'static str, Result<String, ()>>,
    calls: Mutex<usize>,
}

impl FakeOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, profile: &'static str, response: Result<&str, ()>) -> Self {
        self.responses
            .insert(profile, response.map(str::to_string));
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl OcrBackend for FakeOcr {
    async fn recognize_text(
        &self,
        _image: &GrayImage,
        profile: &RecognitionProfile,
    ) -> Result<String, OcrError> {
        *self.calls.lock().unwrap() += 1;
        match self.responses.get(profile.name) {
            Some(Ok(text)) => Ok(text.clone()),
            _ => Err(OcrError::BackendFailed {
                profile: profile.name.to_string(),
                reason: "scripted failure".to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
struct FakePageState {
    current: usize,
    loads: usize,
    clicks: usize,
    captures: usize,
    scrolls: usize,
}

/// 假页面
///
/// `pages[i]` 是第 i 次翻页后的 DOM 快照；None 表示快照脚本报错。
/// 每次成功点击前进一页。
pub struct FakePage {
    pages: Vec<Option<PageSnapshot>>,
    metrics: PageMetrics,
    fail_click_at: Option<usize>,
    load_times_out: bool,
    screenshot_fails: bool,
    interrupt_flag: Option<Arc<AtomicBool>>,
    state: Mutex<FakePageState>,
}

impl FakePage {
    pub fn new(pages: Vec<Option<PageSnapshot>>) -> Self {
        Self {
            pages,
            metrics: PageMetrics {
                scroll_height: 800.0,
                viewport_height: 800.0,
            },
            fail_click_at: None,
            load_times_out: false,
            screenshot_fails: false,
            interrupt_flag: None,
            state: Mutex::new(FakePageState::default()),
        }
    }

    pub fn with_metrics(mut self, scroll_height: f64, viewport_height: f64) -> Self {
        self.metrics = PageMetrics {
            scroll_height,
            viewport_height,
        };
        self
    }

    /// 第 n 次点击（从 1 开始）失败
    pub fn failing_click_at(mut self, n: usize) -> Self {
        self.fail_click_at = Some(n);
        self
    }

    pub fn with_load_timeout(mut self) -> Self {
        self.load_times_out = true;
        self
    }

    pub fn with_failing_screenshots(mut self) -> Self {
        self.screenshot_fails = true;
        self
    }

    /// 点击成功的同时置位中断标志
    pub fn interrupt_on_click(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt_flag = Some(flag);
        self
    }

    pub fn loads(&self) -> usize {
        self.state.lock().unwrap().loads
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    pub fn captures(&self) -> usize {
        self.state.lock().unwrap().captures
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    fn scripted_failure(reason: &str) -> crate::error::AppError {
        BrowserError::ScriptExecutionFailed {
            source: reason.to_string().into(),
        }
        .into()
    }
}

impl PageDriver for FakePage {
    async fn wait_for_load_complete(&self, timeout: Duration) -> AppResult<()> {
        self.state.lock().unwrap().loads += 1;
        if self.load_times_out {
            return Err(BrowserError::LoadTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }
            .into());
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> AppResult<JsonValue> {
        let mut state = self.state.lock().unwrap();
        if script.contains("scrollTo") {
            state.scrolls += 1;
            return Ok(JsonValue::Null);
        }
        if script.contains("viewportHeight") {
            return Ok(json!({
                "scrollHeight": self.metrics.scroll_height,
                "viewportHeight": self.metrics.viewport_height,
            }));
        }
        match self.pages.get(state.current).cloned().flatten() {
            Some(snapshot) => Ok(serde_json::to_value(snapshot)?),
            None => Err(Self::scripted_failure("no snapshot for this page")),
        }
    }

    async fn capture_screenshot(&self) -> AppResult<Vec<u8>> {
        self.state.lock().unwrap().captures += 1;
        if self.screenshot_fails {
            return Err(BrowserError::ScreenshotFailed {
                source: "scripted failure".into(),
            }
            .into());
        }
        let image = GrayImage::from_pixel(8, 8, Luma([200u8]));
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(OcrError::from)?;
        Ok(png)
    }

    async fn click_element(&self, control: &NextControl, timeout: Duration) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.clicks += 1;
        if self.fail_click_at == Some(state.clicks) {
            return Err(NavigationError::ControlNotFound {
                selector: control.selector.clone(),
                kind: control.kind.as_str().to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
            .into());
        }
        state.current += 1;
        if let Some(flag) = &self.interrupt_flag {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}
