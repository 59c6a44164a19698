//! 文字识别服务 - 业务能力层
//!
//! 用 1~3 个 profile 分别识别同一张图，取单词数最多的结果。
//! 单个 profile 失败只跳过；全部失败返回空文本，不向上抛错。

use crate::error::OcrError;
use crate::services::text_normalizer::word_count;
use image::{GrayImage, ImageFormat};
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

#[cfg(feature = "ocr")]
use tesseract::{PageSegMode, Tesseract};

/// 识别参数（tesseract 的页面分割模式）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognitionProfile {
    pub name: &'static str,
    pub page_seg_mode: u8,
}

impl RecognitionProfile {
    /// 整块文本
    pub const UNIFORM_BLOCK: Self = Self {
        name: "uniform_block",
        page_seg_mode: 6,
    };
    /// 全自动分割
    pub const FULLY_AUTOMATIC: Self = Self {
        name: "fully_automatic",
        page_seg_mode: 3,
    };
    /// 单列文本
    pub const SINGLE_COLUMN: Self = Self {
        name: "single_column",
        page_seg_mode: 4,
    };

    /// 默认顺序
    pub const ALL: [Self; 3] = [Self::UNIFORM_BLOCK, Self::FULLY_AUTOMATIC, Self::SINGLE_COLUMN];

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name == name)
    }
}

/// OCR 后端
#[allow(async_fn_in_trait)]
pub trait OcrBackend {
    async fn recognize_text(
        &self,
        image: &GrayImage,
        profile: &RecognitionProfile,
    ) -> Result<String, OcrError>;
}

/// 进程内的 Tesseract 引擎（libtesseract 绑定）
///
/// 每次识别新建一个实例，放在阻塞线程池里执行
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    tessdata_dir: Option<PathBuf>,
    language: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(tessdata_dir: Option<PathBuf>, language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tessdata_dir,
            language: language.into(),
            timeout,
        }
    }

    /// 检查语言包能否加载
    ///
    /// 不可用时只记录警告，结构化提取仍可工作
    pub async fn ensure_available(&self) -> bool {
        let tessdata_dir = self.tessdata_dir.clone();
        let language = self.language.clone();
        let check = tokio::task::spawn_blocking(move || init_engine(tessdata_dir.as_ref(), &language).map(drop));
        match check.await {
            Ok(Ok(())) => {
                info!("✓ Tesseract 已就绪 (语言: {})", self.language);
                true
            }
            Ok(Err(e)) => {
                warn!("⚠️ {}，OCR 兜底将不可用", e);
                false
            }
            Err(e) => {
                warn!("⚠️ Tesseract 初始化任务异常: {}", e);
                false
            }
        }
    }
}

impl OcrBackend for TesseractOcr {
    async fn recognize_text(
        &self,
        image: &GrayImage,
        profile: &RecognitionProfile,
    ) -> Result<String, OcrError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let tessdata_dir = self.tessdata_dir.clone();
        let language = self.language.clone();
        let selected = *profile;
        let task = tokio::task::spawn_blocking(move || {
            run_engine(tessdata_dir.as_ref(), &language, &png, &selected)
        });

        timeout(self.timeout, task)
            .await
            .map_err(|_| OcrError::Timeout {
                profile: profile.name.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|e| OcrError::BackendFailed {
                profile: profile.name.to_string(),
                reason: e.to_string(),
            })?
    }
}

#[cfg(feature = "ocr")]
fn init_engine(tessdata_dir: Option<&PathBuf>, language: &str) -> Result<Tesseract, OcrError> {
    let init_failed = |reason: String| OcrError::InitFailed {
        language: language.to_string(),
        reason,
    };
    let datapath = match tessdata_dir {
        Some(dir) => Some(
            dir.to_str()
                .ok_or_else(|| init_failed(format!("tessdata 路径不是合法 UTF-8: {}", dir.display())))?,
        ),
        None => None,
    };
    Tesseract::new(datapath, Some(language)).map_err(|e| init_failed(format!("{e:?}")))
}

#[cfg(feature = "ocr")]
fn run_engine(
    tessdata_dir: Option<&PathBuf>,
    language: &str,
    png: &[u8],
    profile: &RecognitionProfile,
) -> Result<String, OcrError> {
    let failed = |reason: String| OcrError::BackendFailed {
        profile: profile.name.to_string(),
        reason,
    };
    let mut tess = init_engine(tessdata_dir, language)?
        .set_image_from_mem(png)
        .map_err(|e| failed(format!("{e:?}")))?;
    tess.set_page_seg_mode(page_seg_mode(profile.page_seg_mode));
    let text = tess.get_text().map_err(|e| failed(format!("{e:?}")))?;
    Ok(text.trim().to_string())
}

#[cfg(feature = "ocr")]
fn page_seg_mode(code: u8) -> PageSegMode {
    match code {
        3 => PageSegMode::PsmAuto,
        4 => PageSegMode::PsmSingleColumn,
        6 => PageSegMode::PsmSingleBlock,
        _ => PageSegMode::PsmAuto,
    }
}

#[cfg(not(feature = "ocr"))]
fn init_engine(_tessdata_dir: Option<&PathBuf>, _language: &str) -> Result<(), OcrError> {
    Err(OcrError::Unavailable)
}

#[cfg(not(feature = "ocr"))]
fn run_engine(
    _tessdata_dir: Option<&PathBuf>,
    _language: &str,
    _png: &[u8],
    _profile: &RecognitionProfile,
) -> Result<String, OcrError> {
    Err(OcrError::Unavailable)
}

/// 单张图片的识别结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    pub text: String,
    /// 胜出的 profile；全部失败时为 None
    pub profile: Option<RecognitionProfile>,
    pub word_count: usize,
}

/// 识别引擎
pub struct RecognitionEngine<B> {
    backend: B,
    profiles: Vec<RecognitionProfile>,
}

impl<B: OcrBackend> RecognitionEngine<B> {
    pub fn new(backend: B, profiles: Vec<RecognitionProfile>) -> Self {
        let profiles = if profiles.is_empty() {
            RecognitionProfile::ALL.to_vec()
        } else {
            profiles
        };
        Self { backend, profiles }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 依次尝试所有 profile，返回单词数最多的结果（并列时保留靠前的）
    pub async fn recognize(&self, image: &GrayImage) -> Recognition {
        let mut best: Option<Recognition> = None;

        for profile in &self.profiles {
            match self.backend.recognize_text(image, profile).await {
                Ok(text) => {
                    let words = word_count(&text);
                    debug!("OCR profile {} 识别到 {} 个单词", profile.name, words);
                    if best.as_ref().map_or(true, |b| words > b.word_count) {
                        best = Some(Recognition {
                            text,
                            profile: Some(*profile),
                            word_count: words,
                        });
                    }
                }
                Err(e) => {
                    warn!("OCR profile {} 失败，跳过: {}", profile.name, e);
                }
            }
        }

        best.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeOcr;

    fn blank() -> GrayImage {
        GrayImage::new(4, 4)
    }

    #[test]
    fn test_profile_lookup() {
        assert_eq!(
            RecognitionProfile::by_name("fully_automatic"),
            Some(RecognitionProfile::FULLY_AUTOMATIC)
        );
        assert_eq!(RecognitionProfile::by_name("sparse"), None);
    }

    #[tokio::test]
    async fn test_picks_richest_output() {
        let ocr = FakeOcr::new()
            .with("uniform_block", Ok("a b"))
            .with("fully_automatic", Ok("one two three four"))
            .with("single_column", Ok("x y z"));
        let engine = RecognitionEngine::new(ocr, RecognitionProfile::ALL.to_vec());

        let result = engine.recognize(&blank()).await;
        assert_eq!(result.text, "one two three four");
        assert_eq!(result.profile, Some(RecognitionProfile::FULLY_AUTOMATIC));
        assert_eq!(result.word_count, 4);
        assert_eq!(engine.backend().calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_profile_is_skipped() {
        let ocr = FakeOcr::new()
            .with("uniform_block", Err(()))
            .with("fully_automatic", Ok("only survivor"))
            .with("single_column", Err(()));
        let engine = RecognitionEngine::new(ocr, RecognitionProfile::ALL.to_vec());

        let result = engine.recognize(&blank()).await;
        assert_eq!(result.text, "only survivor");
    }

    #[tokio::test]
    async fn test_all_profiles_failing_yields_empty_text() {
        let ocr = FakeOcr::new();
        let engine = RecognitionEngine::new(ocr, RecognitionProfile::ALL.to_vec());

        let result = engine.recognize(&blank()).await;
        assert_eq!(result, Recognition::default());
        assert!(result.text.is_empty());
    }

    #[tokio::test]
    async fn test_tie_keeps_earlier_profile() {
        let ocr = FakeOcr::new()
            .with("single_column", Ok("same words"))
            .with("uniform_block", Ok("other pair"));
        let engine = RecognitionEngine::new(
            ocr,
            vec![RecognitionProfile::SINGLE_COLUMN, RecognitionProfile::UNIFORM_BLOCK],
        );

        let result = engine.recognize(&blank()).await;
        assert_eq!(result.profile, Some(RecognitionProfile::SINGLE_COLUMN));
        assert_eq!(engine.backend().calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_language_data_is_an_error() {
        // 空目录里没有 traineddata，初始化必须失败而不是 panic
        let dir = tempfile::tempdir().unwrap();
        let ocr = TesseractOcr::new(
            Some(dir.path().to_path_buf()),
            "eng",
            Duration::from_secs(5),
        );
        assert!(!ocr.ensure_available().await);
        let result = ocr
            .recognize_text(&blank(), &RecognitionProfile::UNIFORM_BLOCK)
            .await;
        assert!(matches!(
            result,
            Err(OcrError::InitFailed { .. }) | Err(OcrError::Unavailable)
        ));
    }

    #[cfg(feature = "ocr")]
    #[test]
    fn test_profile_page_seg_modes() {
        assert!(matches!(
            page_seg_mode(RecognitionProfile::UNIFORM_BLOCK.page_seg_mode),
            PageSegMode::PsmSingleBlock
        ));
        assert!(matches!(
            page_seg_mode(RecognitionProfile::FULLY_AUTOMATIC.page_seg_mode),
            PageSegMode::PsmAuto
        ));
        assert!(matches!(
            page_seg_mode(RecognitionProfile::SINGLE_COLUMN.page_seg_mode),
            PageSegMode::PsmSingleColumn
        ));
    }
}
