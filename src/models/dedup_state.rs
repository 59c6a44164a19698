/// 去重状态：记住上一道已接受题目的题干
///
/// 翻页后页面没有真正刷新时，会再次提取到同一个题干，
/// 这时结构化提取应视为"内容过期"。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeduplicationState {
    last_accepted_stem: String,
}

impl DeduplicationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_accepted_stem(&self) -> &str {
        &self.last_accepted_stem
    }

    /// 题干与上一道相同
    pub fn is_stale(&self, stem: &str) -> bool {
        !self.last_accepted_stem.is_empty() && self.last_accepted_stem == stem
    }

    pub fn accept(&mut self, stem: &str) {
        self.last_accepted_stem = stem.to_string();
    }

    /// 新会话开始时调用
    pub fn reset(&mut self) {
        self.last_accepted_stem.clear();
    }
}
