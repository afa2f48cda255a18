use async_trait::async_trait;
use nz_core::{Error, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use url::Url;
use super::utils::{collapse_whitespace, parse_url, resolve_url, selector};
use super::{ContentExtractor, ExtractedContent, BROWSER_USER_AGENT};

/// Article-body containers, most specific first.
const CONTENT_SELECTORS: &[&str] = &[
    "#newsct_article",
    "#articleBodyContents",
    ".article_body",
    ".article-view",
    ".view_contents",
    "article",
];

/// Noise removed from whichever region is chosen.
const REGION_NOISE: &str = ".article_btns, .byline, script, style, iframe, .sub_copy, .ad-unit";

/// Page chrome additionally removed when falling back to the whole body.
const PAGE_CHROME: &str = "header, footer, nav, aside, .sidebar, .ad, .ad-unit, .byline, #comment, \
.related-articles, .article_btns, .sub_copy, script, style, iframe";

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "table", "tr", "td", "blockquote", "figure", "figcaption",
];

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Fetches a news page and pulls the article body out of it.
pub struct HtmlExtractor {
    client: Client,
}

impl HtmlExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("{} returned {}", url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read body of {}: {}", url, e)))
    }
}

#[async_trait]
impl ContentExtractor for HtmlExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent> {
        let page_url = parse_url(url)?;
        let html = self.fetch(&page_url).await?;
        let content = extract_from_html(&html, url)?;
        tracing::debug!(url, chars = content.char_len(), thumbnail = ?content.thumbnail_url, "page extracted");
        Ok(content)
    }
}

#[derive(Default)]
struct Collected {
    text: String,
    first_image: Option<String>,
}

fn collect(element: ElementRef, skip: &Selector, out: &mut Collected) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.text.push_str(text),
            Node::Element(el) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                if el.name() == "img" {
                    if out.first_image.is_none() {
                        out.first_image = el
                            .attr("src")
                            .map(str::trim)
                            .filter(|src| !src.is_empty())
                            .map(str::to_string);
                    }
                    continue;
                }
                if skip.matches(&child_ref) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&el.name());
                if block {
                    out.text.push(' ');
                }
                collect(child_ref, skip, out);
                if block {
                    out.text.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Picks the article region of `html` and returns its cleaned text and
/// preview image. `page_url` is only used to absolutize image links.
pub fn extract_from_html(html: &str, page_url: &str) -> Result<ExtractedContent> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let region_noise = selector(REGION_NOISE)?;

    let mut chosen = None;
    for css in CONTENT_SELECTORS {
        let sel = selector(css)?;
        let Some(found) = document.select(&sel).next() else {
            continue;
        };
        // judge the region by what survives noise removal, not raw text nodes
        let mut collected = Collected::default();
        collect(found, &region_noise, &mut collected);
        if !collected.text.trim().is_empty() {
            tracing::trace!(selector = *css, "content region matched");
            chosen = Some(collected);
            break;
        }
    }

    let collected = match chosen {
        Some(collected) => collected,
        None => {
            let body = document
                .select(&selector("body")?)
                .next()
                .unwrap_or_else(|| document.root_element());
            let mut collected = Collected::default();
            collect(body, &selector(PAGE_CHROME)?, &mut collected);
            collected
        }
    };

    let og_image = document
        .select(&selector(r#"meta[property="og:image"]"#)?)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string);

    let thumbnail_url = og_image
        .or(collected.first_image)
        .map(|src| resolve_url(base.as_ref(), &src));

    Ok(ExtractedContent {
        text: collapse_whitespace(&collected.text),
        thumbnail_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://news.example.com/politics/123";

    #[test]
    fn test_primary_selector_wins() {
        let html = r#"
            <html><head><meta property="og:image" content="https://img.example.com/og.jpg"></head>
            <body>
              <nav>메뉴</nav>
              <article>기사 아닌 영역</article>
              <div id="newsct_article">
                <p>여야가 <b>예산안</b>에 합의했다.</p>
                <div class="byline">홍길동 기자</div>
                <script>var x = 1;</script>
                <p>본회의는 내일 열린다.</p>
              </div>
            </body></html>"#;

        let content = extract_from_html(html, PAGE).unwrap();
        assert_eq!(content.text, "여야가 예산안에 합의했다. 본회의는 내일 열린다.");
        assert_eq!(content.thumbnail_url.as_deref(), Some("https://img.example.com/og.jpg"));
    }

    #[test]
    fn test_empty_region_falls_through_to_next_selector() {
        let html = r#"
            <html><body>
              <div id="newsct_article">   </div>
              <div class="article_body">두 번째 후보 본문입니다.</div>
            </body></html>"#;

        let content = extract_from_html(html, PAGE).unwrap();
        assert_eq!(content.text, "두 번째 후보 본문입니다.");
        assert_eq!(content.thumbnail_url, None);
    }

    #[test]
    fn test_script_only_region_falls_back_to_body() {
        let html = r#"
            <html><body>
              <article><script>window.__ad = {slot: 1};</script><style>.a{}</style></article>
              <main><p>국회가 내년도 예산안을 본회의에서 처리했다.</p></main>
            </body></html>"#;

        let content = extract_from_html(html, PAGE).unwrap();
        assert_eq!(content.text, "국회가 내년도 예산안을 본회의에서 처리했다.");
    }

    #[test]
    fn test_body_fallback_strips_chrome() {
        let html = r#"
            <html><body>
              <header>사이트 헤더</header>
              <nav>정치 경제 사회</nav>
              <main>
                <h1>제목</h1>
                <p>본문 첫 문단.</p>
                <div class="related-articles">관련 기사 목록</div>
                <aside class="sidebar">광고</aside>
                <p>본문 둘째 문단.</p>
              </main>
              <div id="comment">댓글</div>
              <footer>저작권</footer>
            </body></html>"#;

        let content = extract_from_html(html, PAGE).unwrap();
        assert_eq!(content.text, "제목 본문 첫 문단. 본문 둘째 문단.");
    }

    #[test]
    fn test_thumbnail_from_first_region_image() {
        let html = r#"
            <html><body>
              <img src="/logo.png">
              <div class="article-view">
                <figure><img src="/photos/1.jpg" alt="사진"></figure>
                <p>사진 설명이 있는 기사 본문.</p>
                <img src="/photos/2.jpg">
              </div>
            </body></html>"#;

        let content = extract_from_html(html, PAGE).unwrap();
        assert_eq!(
            content.thumbnail_url.as_deref(),
            Some("https://news.example.com/photos/1.jpg")
        );
        assert_eq!(content.text, "사진 설명이 있는 기사 본문.");
    }

    #[test]
    fn test_protocol_relative_thumbnail() {
        let html = r#"<html><body><article><img src="//cdn.example.com/a.jpg"><p>짧은 본문 텍스트</p></article></body></html>"#;
        let content = extract_from_html(html, PAGE).unwrap();
        assert_eq!(content.thumbnail_url.as_deref(), Some("https://cdn.example.com/a.jpg"));
    }

    #[test]
    fn test_short_text_is_returned_unchecked() {
        let html = "<html><body><article>짧다</article></body></html>";
        let content = extract_from_html(html, PAGE).unwrap();
        assert_eq!(content.text, "짧다");
        assert_eq!(content.char_len(), 2);
    }

    #[tokio::test]
    async fn test_extract_rejects_invalid_url() {
        let extractor = HtmlExtractor::new(ExtractorConfig::default()).unwrap();
        let err = extractor.extract("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
