use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 翻页失败（终止本次运行）
    #[error("翻页错误: {0}")]
    Navigation(#[from] NavigationError),
    /// OCR 识别错误
    #[error("OCR错误: {0}")]
    Ocr(#[from] OcrError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed { port: u16, source: BoxError },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed { source: BoxError },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed { url: String, source: BoxError },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed { source: BoxError },
    /// 截图失败
    #[error("截图失败: {source}")]
    ScreenshotFailed { source: BoxError },
    /// 页面在超时时间内未加载完成
    #[error("页面加载超时 ({timeout_ms} ms)")]
    LoadTimeout { timeout_ms: u64 },
}

/// 翻页错误
#[derive(Debug, Error)]
pub enum NavigationError {
    /// 在超时时间内没有找到"下一题"控件
    #[error("未找到翻页控件 {selector} ({kind}), 已等待 {timeout_ms} ms")]
    ControlNotFound {
        selector: String,
        kind: String,
        timeout_ms: u64,
    },
    /// 点击失败
    #[error("点击翻页控件 {selector} 失败: {source}")]
    ClickFailed { selector: String, source: BoxError },
}

/// OCR 识别错误（单个 profile、单张图片）
#[derive(Debug, Error)]
pub enum OcrError {
    /// 识别引擎初始化失败（语言包缺失等）
    #[error("OCR 引擎初始化失败 (语言: {language}): {reason}")]
    InitFailed { language: String, reason: String },
    /// 识别过程出错
    #[error("OCR 识别失败 (profile: {profile}): {reason}")]
    BackendFailed { profile: String, reason: String },
    /// 当前构建未启用 OCR
    #[error("当前构建未启用 ocr 特性")]
    Unavailable,
    /// 识别超时
    #[error("OCR 识别超时 (profile: {profile}, {timeout_ms} ms)")]
    Timeout { profile: String, timeout_ms: u64 },
    /// 图片编码失败
    #[error("图片编码失败: {0}")]
    Encode(#[from] image::ImageError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed { path: String, source: BoxError },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed { path: String, source: BoxError },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed { path: String, source: BoxError },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少必填项
    #[error("缺少必填配置项: {field}")]
    MissingField { field: String },
    /// 配置值不合法
    #[error("配置项 {field} 的值 '{value}' 不合法: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建缺少配置项错误
    pub fn missing_config(field: impl Into<String>) -> Self {
        AppError::Config(ConfigError::MissingField {
            field: field.into(),
        })
    }

    /// 是否为配置错误（启动阶段致命）
    pub fn is_config_error(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
