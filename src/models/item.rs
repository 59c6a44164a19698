use std::fmt;
use std::path::PathBuf;

/// 每道题最多保留的选项数
pub const MAX_OPTIONS: usize = 5;

/// 题目文本的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceMethod {
    /// 从页面 DOM 结构中提取
    Structured,
    /// 截图后 OCR 识别
    Recognized,
    /// 两种方式都没有得到可用文本
    Failed,
}

impl SourceMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceMethod::Structured => "structured",
            SourceMethod::Recognized => "recognized",
            SourceMethod::Failed => "failed",
        }
    }
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一道题的提取结果
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// 从 1 开始的序号，由翻页循环分配
    pub index: usize,
    pub stem: String,
    pub options: Vec<String>,
    pub source_method: SourceMethod,
    /// 本题截图的保存路径，仅用于排查
    pub raw_assets: Vec<PathBuf>,
}

impl Item {
    pub fn new(
        index: usize,
        stem: impl Into<String>,
        mut options: Vec<String>,
        source_method: SourceMethod,
    ) -> Self {
        options.truncate(MAX_OPTIONS);
        Self {
            index,
            stem: stem.into(),
            options,
            source_method,
            raw_assets: Vec::new(),
        }
    }

    /// 提取失败时的占位项，保证序号不缺位
    pub fn failed(index: usize) -> Self {
        Self::new(
            index,
            format!("[EXTRACTION FAILED - question {} needs manual review]", index),
            Vec::new(),
            SourceMethod::Failed,
        )
    }

    pub fn with_assets(mut self, assets: Vec<PathBuf>) -> Self {
        self.raw_assets = assets;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.source_method == SourceMethod::Failed
    }

    /// 题干 + 空行 + "A. 选项" 列表
    pub fn formatted_text(&self) -> String {
        let mut out = String::with_capacity(self.stem.len() + 16 * self.options.len());
        out.push_str(&self.stem);
        out.push('\n');
        if !self.options.is_empty() {
            out.push('\n');
            for (letter, option) in ('A'..='Z').zip(self.options.iter().take(MAX_OPTIONS)) {
                out.push(letter);
                out.push_str(". ");
                out.push_str(option);
                out.push('\n');
            }
        }
        out
    }
}

/// 提取结果的可信度信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceSignal {
    /// 结构化提取命中的启发式规则
    Heuristic(HeuristicKind),
    /// OCR 结果的单词数
    WordCount(usize),
}

/// 结构化提取的启发式规则，按优先级排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicKind {
    KnownSchema,
    GenericPattern,
    FreeText,
}

/// 一次提取尝试，用完即弃
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionAttempt {
    pub stem: String,
    pub options: Vec<String>,
    pub confidence_signal: ConfidenceSignal,
}
