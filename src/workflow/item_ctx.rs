//! 题目处理上下文
//!
//! 封装"我正在处理第几道题、一共几道"这一信息

use std::fmt::Display;

/// 题目处理上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCtx {
    /// 题目序号（从1开始）
    pub index: usize,

    /// 本次运行的题目总数（仅用于日志显示）
    pub total: usize,
}

impl ItemCtx {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }

    pub fn is_last(&self) -> bool {
        self.index >= self.total
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[题目 {}/{}]", self.index, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctx_display_and_last() {
        let ctx = ItemCtx::new(3, 10);
        assert_eq!(ctx.to_string(), "[题目 3/10]");
        assert!(!ctx.is_last());
        assert!(ItemCtx::new(10, 10).is_last());
    }
}
