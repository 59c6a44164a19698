//! 程序配置
//!
//! 从 TOML 文件读取，再用环境变量覆盖部分字段。
//! 必填项缺失时在打开浏览器之前直接失败。

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::services::image_preprocessor::PreprocessSettings;
use crate::services::recognition::RecognitionProfile;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "capture.toml";

/// "下一题"控件的选择器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    #[default]
    Css,
    Xpath,
    Id,
    Class,
    Name,
}

impl SelectorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectorKind::Css => "css",
            SelectorKind::Xpath => "xpath",
            SelectorKind::Id => "id",
            SelectorKind::Class => "class",
            SelectorKind::Name => "name",
        }
    }
}

/// 翻页控件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextControl {
    pub selector: String,
    pub kind: SelectorKind,
}

impl NextControl {
    /// 转换为 CSS 选择器；XPath 返回 None
    pub fn to_css(&self) -> Option<String> {
        match self.kind {
            SelectorKind::Css => Some(self.selector.clone()),
            SelectorKind::Id => Some(format!("#{}", self.selector)),
            SelectorKind::Class => Some(format!(".{}", self.selector.trim_start_matches('.'))),
            SelectorKind::Name => Some(format!("[name=\"{}\"]", self.selector)),
            SelectorKind::Xpath => None,
        }
    }
}

/// 浏览器会话配置
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// 调试端口；设置时连接已打开的浏览器，否则自行启动
    pub debug_port: Option<u16>,
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    pub load_timeout: Duration,
    pub click_timeout: Duration,
}

/// 输出配置
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub results_file: PathBuf,
    pub screenshot_folder: PathBuf,
    pub save_screenshots: bool,
}

/// OCR 配置
#[derive(Debug, Clone)]
pub struct OcrSettings {
    /// tessdata 目录；None 时由 Tesseract 按 TESSDATA_PREFIX 查找
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,
    pub timeout: Duration,
    pub profiles: Vec<RecognitionProfile>,
}

/// 结构化提取配置
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub stem_container_selector: String,
    pub answer_label_selector: String,
    pub screen_reader_selector: String,
    /// 页面高度超出视口多少像素时追加滚动截图
    pub scroll_capture_margin_px: u32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            stem_container_selector: ".lrn_stimulus_content, .lrn-question-stem, .question-stem"
                .to_string(),
            answer_label_selector: ".lrn-label, .lrn_contentWrapper label, .answer-label"
                .to_string(),
            screen_reader_selector: ".sr-only, .lrn_sr_only".to_string(),
            scroll_capture_margin_px: 200,
        }
    }
}

/// 程序配置
#[derive(Debug, Clone)]
pub struct Config {
    /// 起始页面
    pub website_url: String,
    /// 需要处理的题目数量 N
    pub max_items: usize,
    /// 每题加载完成后的等待时间
    pub wait_time: Duration,
    /// 开始前等待用户登录
    pub pause_for_login: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub next_control: NextControl,
    pub browser: BrowserSettings,
    pub output: OutputSettings,
    pub ocr: OcrSettings,
    pub preprocess: PreprocessSettings,
    pub extraction: ExtractionSettings,
}

// ========== TOML 原始结构 ==========

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    website_url: Option<String>,
    max_items: Option<usize>,
    wait_time_secs: Option<f64>,
    pause_for_login: Option<bool>,
    verbose_logging: Option<bool>,
    browser: RawBrowser,
    next_button: RawNextButton,
    output: RawOutput,
    ocr: RawOcr,
    preprocess: PreprocessSettings,
    extraction: RawExtraction,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBrowser {
    debug_port: Option<u16>,
    chrome_executable: Option<PathBuf>,
    headless: Option<bool>,
    load_timeout_secs: Option<u64>,
    click_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNextButton {
    selector: Option<String>,
    kind: SelectorKind,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOutput {
    results_file: Option<PathBuf>,
    screenshot_folder: Option<PathBuf>,
    save_screenshots: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOcr {
    tessdata_dir: Option<PathBuf>,
    language: Option<String>,
    timeout_secs: Option<u64>,
    profiles: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExtraction {
    stem_container_selector: Option<String>,
    answer_label_selector: Option<String>,
    screen_reader_selector: Option<String>,
    scroll_capture_margin_px: Option<u32>,
}

impl Config {
    /// 读取配置文件并应用环境变量覆盖
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(FileError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let mut raw: RawConfig = toml::from_str(&content).map_err(|e| FileError::TomlParseFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        raw.apply_env()?;
        Self::from_raw(raw)
    }

    /// 解析 TOML 字符串（不读取环境变量）
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| FileError::TomlParseFailed {
            path: String::new(),
            source: Box::new(e),
        })?;
        Self::from_raw(raw)
    }

    /// 配置文件路径：命令行第一个参数 > CAPTURE_CONFIG > 默认值
    pub fn resolve_path(cli_arg: Option<String>) -> PathBuf {
        cli_arg
            .or_else(|| std::env::var("CAPTURE_CONFIG").ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    fn from_raw(raw: RawConfig) -> AppResult<Self> {
        let website_url = raw
            .website_url
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::missing_config("website_url"))?;
        let max_items = raw
            .max_items
            .ok_or_else(|| AppError::missing_config("max_items"))?;
        if max_items == 0 {
            return Err(invalid("max_items", "0", "至少需要 1 道题"));
        }
        let selector = raw
            .next_button
            .selector
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::missing_config("next_button.selector"))?;

        let wait_secs = raw.wait_time_secs.unwrap_or(1.0);
        let wait_time = Duration::try_from_secs_f64(wait_secs)
            .map_err(|_| invalid("wait_time_secs", &wait_secs.to_string(), "必须为有限的非负数"))?;

        let profiles = match raw.ocr.profiles {
            Some(names) => parse_profiles(&names)?,
            None => RecognitionProfile::ALL.to_vec(),
        };

        let defaults = ExtractionSettings::default();

        Ok(Self {
            website_url,
            max_items,
            wait_time,
            pause_for_login: raw.pause_for_login.unwrap_or(true),
            verbose_logging: raw.verbose_logging.unwrap_or(false),
            next_control: NextControl {
                selector,
                kind: raw.next_button.kind,
            },
            browser: BrowserSettings {
                debug_port: raw.browser.debug_port,
                chrome_executable: raw.browser.chrome_executable,
                headless: raw.browser.headless.unwrap_or(false),
                load_timeout: Duration::from_secs(raw.browser.load_timeout_secs.unwrap_or(15)),
                click_timeout: Duration::from_secs(raw.browser.click_timeout_secs.unwrap_or(10)),
            },
            output: OutputSettings {
                results_file: raw
                    .output
                    .results_file
                    .unwrap_or_else(|| PathBuf::from("ocr_results.txt")),
                screenshot_folder: raw
                    .output
                    .screenshot_folder
                    .unwrap_or_else(|| PathBuf::from("screenshots")),
                save_screenshots: raw.output.save_screenshots.unwrap_or(true),
            },
            ocr: OcrSettings {
                tessdata_dir: raw.ocr.tessdata_dir,
                language: raw.ocr.language.unwrap_or_else(|| "eng".to_string()),
                timeout: Duration::from_secs(raw.ocr.timeout_secs.unwrap_or(30)),
                profiles,
            },
            preprocess: raw.preprocess.clamped(),
            extraction: ExtractionSettings {
                stem_container_selector: raw
                    .extraction
                    .stem_container_selector
                    .unwrap_or(defaults.stem_container_selector),
                answer_label_selector: raw
                    .extraction
                    .answer_label_selector
                    .unwrap_or(defaults.answer_label_selector),
                screen_reader_selector: raw
                    .extraction
                    .screen_reader_selector
                    .unwrap_or(defaults.screen_reader_selector),
                scroll_capture_margin_px: raw
                    .extraction
                    .scroll_capture_margin_px
                    .unwrap_or(defaults.scroll_capture_margin_px),
            },
        })
    }
}

impl RawConfig {
    /// 环境变量覆盖
    fn apply_env(&mut self) -> AppResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(v) = lookup("CAPTURE_WEBSITE_URL") {
            self.website_url = Some(v);
        }
        if let Some(v) = parse_env::<usize>(&lookup, "CAPTURE_MAX_ITEMS", "usize")? {
            self.max_items = Some(v);
        }
        if let Some(v) = parse_env::<f64>(&lookup, "CAPTURE_WAIT_TIME", "f64")? {
            self.wait_time_secs = Some(v);
        }
        if let Some(v) = parse_env::<u16>(&lookup, "BROWSER_DEBUG_PORT", "u16")? {
            self.browser.debug_port = Some(v);
        }
        if let Some(v) = parse_env::<bool>(&lookup, "VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = Some(v);
        }
        if let Some(v) = lookup("TESSDATA_DIR") {
            self.ocr.tessdata_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    expected_type: &str,
) -> AppResult<Option<T>> {
    match lookup(var_name) {
        Some(value) => value.parse::<T>().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
        None => Ok(None),
    }
}

fn parse_profiles(names: &[String]) -> AppResult<Vec<RecognitionProfile>> {
    if names.is_empty() || names.len() > RecognitionProfile::ALL.len() {
        return Err(invalid(
            "ocr.profiles",
            &names.join(","),
            "需要 1 到 3 个 profile",
        ));
    }
    names
        .iter()
        .map(|name| {
            RecognitionProfile::by_name(name)
                .ok_or_else(|| invalid("ocr.profiles", name, "未知的 profile"))
        })
        .collect()
}

fn invalid(field: &str, value: &str, reason: &str) -> AppError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
