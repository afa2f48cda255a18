use async_trait::async_trait;
use nz_core::{AnalysisModel, EnrichmentResult, Error, NewsCategory, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use crate::Config;

const SYSTEM_INSTRUCTION: &str = "You are a news analysis expert. Perform the analysis tasks \
according to the Korean instructions provided in the user prompt and return the result only \
in the specified JSON format.";

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnalysisPayload {
    summary: Option<String>,
    keywords: Option<String>,
    category: Option<String>,
}

/// Structured-output client for the Gemini `generateContent` endpoint.
pub struct GeminiModel {
    client: Client,
    api_key: String,
    config: Config,
}

impl GeminiModel {
    pub fn new(config: Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("Gemini API key is required".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, api_key, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model()
        )
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("model", &self.config.model())
            .finish()
    }
}

/// Cuts `text` to at most `max_chars` chars.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_prompt(article_text: &str) -> String {
    let labels: Vec<&str> = NewsCategory::ALL.iter().map(|c| c.label()).collect();
    format!(
        "제공된 뉴스 기사의 내용을 분석하여 다음 세 가지 항목을 추출하세요:\n\
         1. 'summary': 기사를 한국어로 세 문장 이내로 상세히 요약합니다.\n\
         2. 'keywords': 기사의 핵심 키워드 5개를 쉼표(,)로 구분하여 한 줄로 나열합니다.\n\
         3. 'category': 기사가 다음 카테고리 중 어디에 속하는지 판단하여 추출합니다. \
         다음 카테고리에 있는 걸로만 추출합니다. 다른 카테고리는 사용하지 않습니다.: [{}].\n\n\
         기사 내용: {}",
        labels.join(", "),
        article_text
    )
}

pub fn build_request_body(config: &Config, article_text: &str) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": build_prompt(article_text) }]
        }],
        "generationConfig": {
            "temperature": config.temperature,
            "maxOutputTokens": config.max_output_tokens,
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "object",
                "properties": {
                    "summary": { "type": "string", "description": "기사의 핵심 내용을 한국어로 3줄 요약" },
                    "keywords": { "type": "string", "description": "기사의 핵심 키워드 5개를 쉼표(,)로 구분한 문자열" },
                    "category": { "type": "string", "description": "기사의 카테고리 (예: 경제, 정치, 생활ㆍ문화 등)" }
                },
                "required": ["summary", "keywords", "category"]
            }
        }
    })
}

/// Maps an HTTP status and body to an enrichment or a typed failure.
///
/// 429 is the only status reported as `QuotaExceeded`. Anything that does not
/// validate against the response schema is `MalformedResponse`; there is no
/// placeholder result.
pub fn classify_response(status: StatusCode, body: &str) -> Result<EnrichmentResult> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::QuotaExceeded(body.to_string()));
    }
    if !status.is_success() {
        return Err(Error::Inference(format!("Gemini returned {}: {}", status, body)));
    }

    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("undecodable envelope: {}", e)))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| Error::MalformedResponse("no candidate text".to_string()))?;

    let payload: AnalysisPayload = serde_json::from_str(text.trim())
        .map_err(|e| Error::MalformedResponse(format!("candidate text is not valid JSON: {}", e)))?;

    let summary = required_field(payload.summary, "summary")?;
    let keywords = required_field(payload.keywords, "keywords")?;
    let category = required_field(payload.category, "category")?;
    let category = category
        .parse::<NewsCategory>()
        .map_err(Error::MalformedResponse)?;

    Ok(EnrichmentResult {
        summary,
        keywords,
        category,
    })
}

fn required_field(value: Option<String>, name: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MalformedResponse(format!("missing or blank field: {}", name))),
    }
}

#[async_trait]
impl AnalysisModel for GeminiModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn analyze(&self, text: &str) -> Result<EnrichmentResult> {
        let input = truncate_chars(text, self.config.max_input_chars);
        let body = build_request_body(&self.config, input);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Inference(format!("Failed to read Gemini response: {}", e)))?;

        let result = classify_response(status, &body);
        match &result {
            Ok(enrichment) => tracing::debug!(category = %enrichment.category, "analysis complete"),
            Err(e) if e.is_quota_exceeded() => tracing::warn!(%status, "Gemini quota exceeded"),
            Err(e) => tracing::debug!(%status, error = %e, "analysis failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_model_requires_api_key() {
        let result = GeminiModel::new(Config::default());
        assert!(matches!(result, Err(Error::Config(_))));

        let blank = Config {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(GeminiModel::new(blank).is_err());

        let config = Config {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let model = GeminiModel::new(config).unwrap();
        assert!(!format!("{:?}", model).contains("test-key"));
        assert_eq!(
            model.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let config = Config::default();
        let body = build_request_body(&config, "기사 본문");

        let generation = &body["generationConfig"];
        assert_eq!(generation["temperature"], 0.5);
        assert_eq!(generation["maxOutputTokens"], 2048);
        assert_eq!(generation["responseMimeType"], "application/json");
        assert_eq!(
            generation["responseSchema"]["required"],
            json!(["summary", "keywords", "category"])
        );

        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.ends_with("기사 내용: 기사 본문"));
        assert!(prompt.contains("[정치, 경제, 사회, 생활ㆍ문화, 스포츠, 엔터, ITㆍ과학, 세계]"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("가나다라", 2), "가나");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_classify_success() {
        let body = envelope(r#"{"summary":"정부가 예산안을 발표했다.","keywords":"정부,예산,발표,국회,재정","category":" 경제 "}"#);
        let result = classify_response(StatusCode::OK, &body).unwrap();
        assert_eq!(result.category, NewsCategory::Economy);
        assert_eq!(result.keyword_list().len(), 5);
    }

    #[test]
    fn test_classify_quota_exceeded() {
        let err = classify_response(StatusCode::TOO_MANY_REQUESTS, "{\"error\":{}}").unwrap_err();
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn test_classify_other_failures_are_not_quota() {
        let err = classify_response(StatusCode::INTERNAL_SERVER_ERROR, "oops").unwrap_err();
        assert!(matches!(err, Error::Inference(_)));

        let cases = [
            "not json".to_string(),
            json!({ "candidates": [] }).to_string(),
            envelope("plain words"),
            envelope(r#"{"summary":"요약","keywords":"a,b"}"#),
            envelope(r#"{"summary":"  ","keywords":"a,b","category":"정치"}"#),
            envelope(r#"{"summary":"요약","keywords":"a,b","category":"기타"}"#),
        ];
        for body in cases {
            let err = classify_response(StatusCode::OK, &body).unwrap_err();
            assert!(matches!(err, Error::MalformedResponse(_)), "{}", body);
        }
    }

    #[tokio::test]
    async fn test_analyze_sends_user_agent_and_key() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            // read the head and the whole JSON body before answering
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
                    let body_len = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + body_len {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = "HTTP/1.1 429 Too Many Requests\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}";
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_lowercase()
        });

        let model = GeminiModel::new(Config {
            api_key: Some("test-key".to_string()),
            base_url,
            ..Default::default()
        })
        .unwrap();
        let err = model.analyze("국회가 예산안을 처리했다.").await.unwrap_err();
        assert!(err.is_quota_exceeded());

        let request = server.await.unwrap();
        assert!(request.contains(&format!("user-agent: {}", crate::DEFAULT_USER_AGENT)));
        assert!(request.contains("x-goog-api-key: test-key"));
    }
}
