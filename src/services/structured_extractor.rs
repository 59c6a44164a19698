//! 结构化提取服务 - 业务能力层
//!
//! 一次页面脚本收集 DOM 快照，再按优先级运行三条启发式规则：
//!
//! 1. 已知结构：题干容器 + 答案标签类名
//! 2. 通用模式：带选项标记（字母/圆点）且实际可见的可点击元素
//! 3. 自由文本：正文中带字母编号的行作为选项，段落打分选题干
//!
//! 第一个通过校验（题干 ≥ 20 字符且至少 2 个不同选项）的结果胜出。
//! 题干与上一题相同时返回 None，表示页面还没翻过去。

use crate::config::ExtractionSettings;
use crate::infrastructure::PageDriver;
use crate::models::{
    ConfidenceSignal, DeduplicationState, ExtractionAttempt, HeuristicKind, PageSnapshot,
};
use regex::Regex;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// 校验门槛
pub const MIN_STEM_CHARS: usize = 20;
pub const MIN_DISTINCT_OPTIONS: usize = 2;

/// 已知结构中，不含问号的段落至少要这么长才算题干
const SCHEMA_STEM_MIN_CHARS: usize = 40;
/// 典型题干长度，用于段落打分
const TYPICAL_STEM_CHARS: usize = 150;
/// 可点击元素至少要有这么大才算可见
const MIN_VISIBLE_WIDTH: f64 = 20.0;
const MIN_VISIBLE_HEIGHT: f64 = 10.0;
/// 可点击元素文本长度范围
const MIN_CLICKABLE_CHARS: usize = 3;
const MAX_CLICKABLE_CHARS: usize = 300;

/// 选项标记：A. / A) / (A) / 圆点 / 短横线
static ANSWER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\(?[A-Ea-e][.)]|[•●○◦▪■□\-–])\s+(\S.*)$").expect("valid regex")
});

/// 字母编号行：A. / A) / (A)
static ENUMERATED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\([A-Ea-e]\)|[A-Ea-e][.)])\s+(\S.*)$").expect("valid regex")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// 启发式规则签名
pub type Heuristic = fn(&PageSnapshot) -> Option<ExtractionAttempt>;

/// 按优先级排列的规则
pub const CASCADE: [Heuristic; 3] = [known_schema, generic_pattern, free_text];

const SNAPSHOT_SCRIPT: &str = r#"
(() => {
    const STEM = __STEM_SELECTOR__;
    const LABEL = __LABEL_SELECTOR__;
    const SR = __SR_SELECTOR__;
    const MAX = 400;
    const all = (sel, root = document) => {
        try { return Array.from(root.querySelectorAll(sel)); } catch (e) { return []; }
    };
    const textOf = (el) => ((el.innerText || el.textContent || '') + '').trim();
    const isSrOnly = (el) => { try { return el.matches(SR); } catch (e) { return false; } };
    const visibleText = (el) => {
        const clone = el.cloneNode(true);
        all(SR, clone).forEach((n) => n.remove());
        return ((clone.innerText || clone.textContent || '') + '').trim();
    };

    const schemaParagraphs = [];
    for (const container of all(STEM)) {
        const nodes = all('p, li, div, span', container)
            .filter((n) => n.tagName === 'P' || n.children.length === 0);
        for (const n of (nodes.length ? nodes : [container])) {
            const t = textOf(n);
            if (t) schemaParagraphs.push(t);
        }
    }

    const schemaLabels = all(LABEL).map((el) => ({ text: visibleText(el), srOnly: isSrOnly(el) }));

    const clickables = all('button, [role="button"], [role="radio"], [role="option"], label, a, [onclick]')
        .slice(0, MAX)
        .map((el) => {
            const r = el.getBoundingClientRect();
            return { text: textOf(el), width: r.width, height: r.height };
        })
        .filter((c) => c.text.length > 0);

    const paragraphs = all('p, h1, h2, h3, h4, legend, [role="heading"], div, span')
        .filter((el) => el.tagName === 'P' || el.children.length === 0)
        .map(textOf)
        .filter((t) => t.length > 0)
        .slice(0, MAX * 2);

    return {
        schemaParagraphs,
        schemaLabels,
        clickables,
        paragraphs,
        bodyText: document.body ? document.body.innerText : '',
    };
})()
"#;

/// 结构化提取器
#[derive(Debug, Clone)]
pub struct StructuredExtractor {
    script: String,
}

impl StructuredExtractor {
    pub fn new(settings: &ExtractionSettings) -> Self {
        Self {
            script: build_snapshot_script(settings),
        }
    }

    /// 从页面提取；脚本失败、没有合格结果或内容过期都返回 None
    pub async fn try_extract<P: PageDriver>(
        &self,
        page: &P,
        dedup: &DeduplicationState,
    ) -> Option<ExtractionAttempt> {
        let snapshot: PageSnapshot = match page.eval_as(&self.script).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("⚠️ DOM 快照脚本执行失败: {}", e);
                return None;
            }
        };
        debug!(
            "DOM 快照: 题干段落 {}, 标签 {}, 可点击元素 {}, 段落 {}",
            snapshot.schema_paragraphs.len(),
            snapshot.schema_labels.len(),
            snapshot.clickables.len(),
            snapshot.paragraphs.len()
        );
        extract_from_snapshot(&snapshot, dedup)
    }
}

/// 对快照运行规则链并做去重判断
pub fn extract_from_snapshot(
    snapshot: &PageSnapshot,
    dedup: &DeduplicationState,
) -> Option<ExtractionAttempt> {
    let attempt = run_cascade(snapshot)?;
    if dedup.is_stale(&attempt.stem) {
        info!("⏸️ 题干与上一题相同，页面可能尚未翻页");
        return None;
    }
    Some(attempt)
}

/// 依次运行规则，返回第一个通过校验的结果
pub fn run_cascade(snapshot: &PageSnapshot) -> Option<ExtractionAttempt> {
    CASCADE
        .iter()
        .find_map(|heuristic| heuristic(snapshot).filter(passes_validation))
}

/// 题干 ≥ 20 字符且至少 2 个不同选项
pub fn passes_validation(attempt: &ExtractionAttempt) -> bool {
    let distinct: HashSet<&str> = attempt.options.iter().map(String::as_str).collect();
    attempt.stem.chars().count() >= MIN_STEM_CHARS && distinct.len() >= MIN_DISTINCT_OPTIONS
}

/// 规则 a：已知结构
pub fn known_schema(snapshot: &PageSnapshot) -> Option<ExtractionAttempt> {
    let stem = snapshot
        .schema_paragraphs
        .iter()
        .map(|p| collapse_whitespace(p))
        .find(|p| p.contains('?') || p.chars().count() >= SCHEMA_STEM_MIN_CHARS)?;

    let options = distinct(
        snapshot
            .schema_labels
            .iter()
            .filter(|label| !label.sr_only)
            .map(|label| strip_enumerator(&collapse_whitespace(&label.text)))
            .filter(|text| !text.is_empty()),
    );

    Some(attempt(stem, options, HeuristicKind::KnownSchema))
}

/// 规则 b：带选项标记的可见可点击元素
pub fn generic_pattern(snapshot: &PageSnapshot) -> Option<ExtractionAttempt> {
    let options = distinct(
        snapshot
            .clickables
            .iter()
            .filter(|c| c.width >= MIN_VISIBLE_WIDTH && c.height >= MIN_VISIBLE_HEIGHT)
            .map(|c| collapse_whitespace(&c.text))
            .filter(|text| {
                let len = text.chars().count();
                (MIN_CLICKABLE_CHARS..=MAX_CLICKABLE_CHARS).contains(&len)
            })
            .filter_map(|text| {
                ANSWER_MARKER
                    .captures(&text)
                    .map(|caps| caps[1].trim().to_string())
            }),
    );
    if options.is_empty() {
        return None;
    }

    let stem = best_stem(&snapshot.paragraphs, &options)?;
    Some(attempt(stem, options, HeuristicKind::GenericPattern))
}

/// 规则 c：正文中的字母编号行
pub fn free_text(snapshot: &PageSnapshot) -> Option<ExtractionAttempt> {
    let options = distinct(
        snapshot
            .body_text
            .lines()
            .filter_map(|line| ENUMERATED_LINE.captures(line))
            .map(|caps| collapse_whitespace(&caps[1])),
    );
    if options.is_empty() {
        return None;
    }

    let stem = best_stem(&snapshot.paragraphs, &options)?;
    Some(attempt(stem, options, HeuristicKind::FreeText))
}

/// 段落打分：有问号优先，其次长度最接近典型题干长度
///
/// 太短的通常是界面文字，太长的通常是无关的说明文字
fn best_stem(paragraphs: &[String], options: &[String]) -> Option<String> {
    paragraphs
        .iter()
        .map(|p| collapse_whitespace(p))
        .filter(|p| p.chars().count() >= MIN_STEM_CHARS)
        .filter(|p| !ANSWER_MARKER.is_match(p) && !options.contains(p))
        .min_by_key(|p| {
            (
                Reverse(p.contains('?')),
                p.chars().count().abs_diff(TYPICAL_STEM_CHARS),
            )
        })
}

/// 把 OCR 文本拆成题干和选项
///
/// 少于 2 个编号行时不拆分，整段作为题干
pub fn split_enumerated(text: &str) -> (String, Vec<String>) {
    let mut stem_lines = Vec::new();
    let mut options = Vec::new();
    for line in text.lines() {
        match ENUMERATED_LINE.captures(line) {
            Some(caps) => options.push(caps[1].trim().to_string()),
            None => stem_lines.push(line),
        }
    }
    if options.len() < MIN_DISTINCT_OPTIONS {
        return (text.trim().to_string(), Vec::new());
    }
    (stem_lines.join("\n").trim().to_string(), options)
}

fn attempt(stem: String, options: Vec<String>, kind: HeuristicKind) -> ExtractionAttempt {
    ExtractionAttempt {
        stem,
        options,
        confidence_signal: ConfidenceSignal::Heuristic(kind),
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// 去掉 "A. " / "(B) " 这样的编号前缀
fn strip_enumerator(text: &str) -> String {
    match ENUMERATED_LINE.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.to_string(),
    }
}

/// 保序去重
fn distinct(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

fn build_snapshot_script(settings: &ExtractionSettings) -> String {
    let js_string = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
    SNAPSHOT_SCRIPT
        .replace("__STEM_SELECTOR__", &js_string(&settings.stem_container_selector))
        .replace("__LABEL_SELECTOR__", &js_string(&settings.answer_label_selector))
        .replace("__SR_SELECTOR__", &js_string(&settings.screen_reader_selector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClickableNode, LabelNode};
    use crate::test_support::{sample_snapshot, FakePage};

    fn label(text: &str, sr_only: bool) -> LabelNode {
        LabelNode {
            text: text.to_string(),
            sr_only,
        }
    }

    fn clickable(text: &str, width: f64, height: f64) -> ClickableNode {
        ClickableNode {
            text: text.to_string(),
            width,
            height,
        }
    }

    #[test]
    fn test_known_schema_skips_screen_reader_labels() {
        let snapshot = PageSnapshot {
            schema_paragraphs: vec![
                "Read carefully.".to_string(),
                "Which of the following best describes mitosis?".to_string(),
            ],
            schema_labels: vec![
                label("Option A", true),
                label("Cell division", false),
                label("Cell division", false),
                label("Protein synthesis", false),
            ],
            ..Default::default()
        };
        let attempt = run_cascade(&snapshot).unwrap();
        assert_eq!(attempt.stem, "Which of the following best describes mitosis?");
        assert_eq!(attempt.options, vec!["Cell division", "Protein synthesis"]);
        assert_eq!(
            attempt.confidence_signal,
            ConfidenceSignal::Heuristic(HeuristicKind::KnownSchema)
        );
    }

    #[test]
    fn test_generic_pattern_requires_visible_boxes() {
        let snapshot = PageSnapshot {
            clickables: vec![
                clickable("A. Mercury", 240.0, 32.0),
                clickable("B. Venus", 240.0, 32.0),
                clickable("C. Hidden planet", 0.0, 0.0),
                clickable("Next", 80.0, 30.0),
                clickable(&format!("D. {}", "x".repeat(400)), 240.0, 32.0),
            ],
            paragraphs: vec![
                "Menu".to_string(),
                "Which planet is closest to the Sun in our solar system?".to_string(),
            ],
            ..Default::default()
        };
        let attempt = run_cascade(&snapshot).unwrap();
        assert_eq!(attempt.options, vec!["Mercury", "Venus"]);
        assert_eq!(
            attempt.stem,
            "Which planet is closest to the Sun in our solar system?"
        );
        assert_eq!(
            attempt.confidence_signal,
            ConfidenceSignal::Heuristic(HeuristicKind::GenericPattern)
        );
    }

    #[test]
    fn test_free_text_fallback_scores_stems() {
        let boilerplate = "Terms of service and privacy notice. ".repeat(12);
        let snapshot = PageSnapshot {
            body_text: "Question 3 of 20\nA. 1492\nB. 1776\n(C) 1066\nNext".to_string(),
            paragraphs: vec![
                "Question 3 of 20".to_string(),
                boilerplate,
                "This sentence has no question mark but a good length.".to_string(),
                "In which year did Columbus first reach the Americas?".to_string(),
            ],
            ..Default::default()
        };
        let attempt = run_cascade(&snapshot).unwrap();
        assert_eq!(
            attempt.stem,
            "In which year did Columbus first reach the Americas?"
        );
        assert_eq!(attempt.options, vec!["1492", "1776", "1066"]);
        assert_eq!(
            attempt.confidence_signal,
            ConfidenceSignal::Heuristic(HeuristicKind::FreeText)
        );
    }

    #[test]
    fn test_stem_scoring_prefers_typical_length() {
        let short = "Is this a short one?".to_string();
        let typical = format!("{}?", "w".repeat(149));
        let paragraphs = vec![short, typical.clone()];
        assert_eq!(best_stem(&paragraphs, &[]), Some(typical));
    }

    #[test]
    fn test_validation_gate_rejects_thin_results() {
        // 只有一个选项
        let snapshot = PageSnapshot {
            schema_paragraphs: vec!["Which of these is a prime number?".to_string()],
            schema_labels: vec![label("7", false), label("7", false)],
            ..Default::default()
        };
        assert!(run_cascade(&snapshot).is_none());

        // 题干太短
        let snapshot = PageSnapshot {
            schema_paragraphs: vec!["Pick one?".to_string()],
            schema_labels: vec![label("Yes", false), label("No", false)],
            ..Default::default()
        };
        assert!(run_cascade(&snapshot).is_none());
    }

    #[test]
    fn test_validation_gate_never_passes_invalid() {
        let attempts = [
            ("Short stem?", vec!["a", "b"]),
            ("A stem that is definitely long enough", vec!["only"]),
            ("A stem that is definitely long enough", vec!["same", "same"]),
        ];
        for (stem, options) in attempts {
            let attempt = ExtractionAttempt {
                stem: stem.to_string(),
                options: options.into_iter().map(String::from).collect(),
                confidence_signal: ConfidenceSignal::Heuristic(HeuristicKind::FreeText),
            };
            assert!(!passes_validation(&attempt));
        }
    }

    #[test]
    fn test_empty_snapshot_yields_none() {
        assert!(run_cascade(&PageSnapshot::default()).is_none());
    }

    #[test]
    fn test_same_stem_twice_is_stale() {
        let snapshot = sample_snapshot("What is the capital of France?", &["Paris", "London"]);
        let mut dedup = DeduplicationState::new();

        let first = extract_from_snapshot(&snapshot, &dedup).unwrap();
        dedup.accept(&first.stem);
        assert!(extract_from_snapshot(&snapshot, &dedup).is_none());
    }

    #[test]
    fn test_split_enumerated_text() {
        let (stem, options) =
            split_enumerated("Which gas do plants absorb?\nA. Oxygen\nB) Carbon dioxide\n(C) Helium");
        assert_eq!(stem, "Which gas do plants absorb?");
        assert_eq!(options, vec!["Oxygen", "Carbon dioxide", "Helium"]);

        let (stem, options) = split_enumerated("Explain your reasoning.\nA. Only one");
        assert_eq!(stem, "Explain your reasoning.\nA. Only one");
        assert!(options.is_empty());
    }

    #[test]
    fn test_script_embeds_selectors_as_js_strings() {
        let settings = ExtractionSettings {
            stem_container_selector: "div[data-role=\"stem\"]".to_string(),
            ..Default::default()
        };
        let script = build_snapshot_script(&settings);
        assert!(script.contains(r#"const STEM = "div[data-role=\"stem\"]";"#));
        assert!(!script.contains("__LABEL_SELECTOR__"));
    }

    #[tokio::test]
    async fn test_script_failure_is_none() {
        let page = FakePage::new(vec![]);
        let extractor = StructuredExtractor::new(&ExtractionSettings::default());
        assert!(extractor
            .try_extract(&page, &DeduplicationState::new())
            .await
            .is_none());
    }
}
