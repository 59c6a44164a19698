//! 页面脚本返回的数据结构

use serde::{Deserialize, Serialize};

/// 结构化提取所需的 DOM 快照
///
/// 由一次页面脚本调用收集，之后的启发式规则都是对它的纯函数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSnapshot {
    /// 题干容器内的段落文本
    pub schema_paragraphs: Vec<String>,
    /// 答案标签
    pub schema_labels: Vec<LabelNode>,
    /// 可点击元素
    pub clickables: Vec<ClickableNode>,
    /// 段落类节点文本
    pub paragraphs: Vec<String>,
    /// document.body.innerText
    pub body_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelNode {
    pub text: String,
    /// 仅供屏幕阅读器使用的隐藏文本
    pub sr_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickableNode {
    pub text: String,
    pub width: f64,
    pub height: f64,
}

/// 页面滚动尺寸
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageMetrics {
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl PageMetrics {
    /// 内容高度是否超出视口 margin 像素以上
    pub fn overflows(&self, margin: f64) -> bool {
        self.scroll_height > self.viewport_height + margin
    }

    pub fn middle_offset(&self) -> f64 {
        ((self.scroll_height - self.viewport_height) / 2.0).max(0.0)
    }

    pub fn bottom_offset(&self) -> f64 {
        (self.scroll_height - self.viewport_height).max(0.0)
    }
}
