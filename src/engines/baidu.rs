//! Baidu result extraction.
//!
//! Baidu mixes organic `.result` / `.c-container` blocks with promoted
//! entries (`[cmatchid]`, `.ec_tuiguang_link`) in the same column, plus a
//! right-hand content rail. No block is pinned.

use crate::engine::ResultExtractor;
use crate::types::EngineKind;

/// Baidu result block extractor.
pub struct BaiduExtractor;

impl ResultExtractor for BaiduExtractor {
    fn engine_kind(&self) -> EngineKind {
        EngineKind::Baidu
    }

    fn selectors(&self) -> &'static [&'static str] {
        &[
            "#content_left > div",
            ".result-op",
            ".result",
            "[cmatchid]",
            ".ec_tuiguang_link",
            "#content_right .cr-content",
            ".c-container",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;

    const MOCK_BAIDU_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<div id="content_left">
  <div cmatchid="222">推广 无线鼠标 特价</div>
  <div class="result c-container"><h3>无线鼠标评测</h3></div>
  <div class="result-op c-container"><h3>百科: 鼠标</h3></div>
</div>
<div id="content_right"><div class="cr-content">热搜榜</div></div>
<a class="ec_tuiguang_link">推广链接</a>
</body>
</html>"#;

    #[test]
    fn extracts_left_column_right_rail_and_promoted_links() {
        let page = Page::parse(MOCK_BAIDU_HTML);
        let fragments = BaiduExtractor.extract(&page).expect("extract");
        assert_eq!(fragments.len(), 5);
    }

    #[test]
    fn nothing_is_pinned() {
        let page = Page::parse(MOCK_BAIDU_HTML);
        let fragments = BaiduExtractor.extract(&page).expect("extract");
        assert!(fragments.iter().all(|f| !f.is_pinned));
        assert!(fragments.iter().all(|f| f.engine == EngineKind::Baidu));
    }
}
