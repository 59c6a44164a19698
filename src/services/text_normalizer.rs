//! 文本清洗服务 - 业务能力层
//!
//! 只用于 OCR 识别出的文本。结构化提取得到的文本来自页面标签本身，
//! 不经过这里，否则像 "Paris" 这样的单词选项可能被当成噪声删掉。
//!
//! `clean` 是纯函数且幂等：`clean(clean(x)) == clean(x)`。

use phf::phf_set;
use regex::Regex;
use std::sync::LazyLock;

/// 作为选项符号出现的装饰字符
static DECORATIVE_GLYPHS: phf::Set<char> = phf_set! {
    '©', '®', '™', '•', '●', '○', '◯', '◦', '▪', '▫', '■', '□', '◆', '◇',
    '►', '▶', '▸', '➤', '➢', '✓', '✔', '✗', '✘', '☐', '☑', '☒', '◉', '◎', '⦿',
};

/// 行首非单词前缀（保留开引号和括号）
static LEADING_NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[^\p{L}\p{N}"'“‘(\[]+"#).expect("valid regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,;:!?)\]])").expect("valid regex"));

/// 竖线后紧跟小写字母时才视为误识别的 "I"
static PIPE_BEFORE_LOWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|(\p{Ll})").expect("valid regex"));

static WORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}{2,}").expect("valid regex"));

/// 单词数低于该值 且 长度低于 MIN_LINE_CHARS 的行视为噪声
pub const MIN_WORD_TOKENS: usize = 2;
pub const MIN_LINE_CHARS: usize = 4;

/// 清洗 OCR 文本
pub fn clean(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !is_decorative(*c)).collect();

    let mut lines: Vec<String> = Vec::new();
    for raw_line in stripped.lines() {
        if raw_line.trim().is_empty() {
            // 空行作为段落分隔，连续空行只保留一个
            if lines.last().is_some_and(|l| !l.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        let line = clean_line(raw_line);
        if line.is_empty() || is_noise_line(&line) {
            continue;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn is_decorative(c: char) -> bool {
    DECORATIVE_GLYPHS.contains(&c)
        // 带圈/带括号的数字和字母
        || ('\u{2460}'..='\u{24FF}').contains(&c)
        || ('\u{2776}'..='\u{2793}').contains(&c)
}

fn clean_line(line: &str) -> String {
    let line = LEADING_NON_WORD.replace(line, "");
    let line = WHITESPACE_RUN.replace_all(&line, " ");
    let line = SPACE_BEFORE_PUNCT.replace_all(&line, "$1");
    let line = PIPE_BEFORE_LOWER.replace_all(&line, "I$1");
    line.trim().to_string()
}

fn is_noise_line(line: &str) -> bool {
    let words = WORD_TOKEN.find_iter(line).count();
    words < MIN_WORD_TOKENS && line.chars().count() < MIN_LINE_CHARS
}

/// 统计单词数（按空白分隔），用于比较 OCR 结果的丰富程度
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
