// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use htmd::HtmlToMarkdown;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::engines::traits::MarkdownMode;

static IMAGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid image regex"));
static LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link regex"));
static BLANK_LINES_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank lines regex"));

/// 在正文模式下被整体丢弃的元素
const BOILERPLATE_TAGS: [&str; 11] = [
    "script", "style", "noscript", "iframe", "svg", "img", "nav", "header", "footer", "aside",
    "form",
];

const SCRIPT_TAGS: [&str; 3] = ["script", "style", "noscript"];

/// 把渲染后的 HTML 转成 markdown
///
/// `Full` 保留链接，列表页依赖它提取职位链接；`Pruned` 只保留职位正文文本。
pub fn html_to_markdown(html: &str, mode: MarkdownMode) -> String {
    match mode {
        MarkdownMode::Full => convert(html, &SCRIPT_TAGS),
        MarkdownMode::Pruned => {
            let body = main_content(html);
            let markdown = convert(&body, &BOILERPLATE_TAGS);
            let markdown = IMAGE_REGEX.replace_all(&markdown, "");
            let markdown = LINK_REGEX.replace_all(&markdown, "$1");
            BLANK_LINES_REGEX
                .replace_all(markdown.trim(), "\n\n")
                .into_owned()
        }
    }
}

fn convert(html: &str, skip_tags: &[&str]) -> String {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(skip_tags.to_vec())
        .build();

    converter.convert(html).unwrap_or_else(|_| {
        let document = Html::parse_document(html);
        document.root_element().text().collect::<Vec<_>>().join(" ")
    })
}

/// 优先取 `main` / `article`，否则退回整个 `body`
fn main_content(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector_str in ["main", "article", "[role='main']", "body"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                return element.html();
            }
        }
    }

    html.to_string()
}
