//! Sanity Content Lake HTTP client.
//!
//! Queries go through the GROQ query endpoint, writes through the mutate
//! endpoint with one patch mutation per transaction. The CDN is never used,
//! so reads observe the worker's own writes.

use std::time::Duration;

use async_trait::async_trait;
use prepnest_shared::{LessonDocument, PrepnestError, Result, WorkerConfig};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

use crate::{ContentStore, LessonPatch};

/// User-Agent string for store requests.
const USER_AGENT: &str = concat!("Prepnest/", env!("CARGO_PKG_VERSION"));

/// Request timeout for store calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// GROQ query selecting up to `limit` lessons eligible for rewriting.
pub fn pending_lessons_query(limit: usize) -> String {
    format!(
        r#"*[
  _type == "lesson" &&
  (aiProcessingStatus == "pending" || !defined(aiProcessingStatus)) &&
  defined(rawContent) && rawContent != ""
][0...{limit}] {{
  _id,
  title,
  lessonNumber,
  rawContent,
  aiProcessingStatus,
  reviewStatus,
  topic-> {{
    _id,
    title,
    educationLevel,
    subject-> {{
      _id,
      name
    }}
  }}
}}"#
    )
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutateResponse {
    #[serde(default)]
    transaction_id: Option<String>,
}

/// HTTP client for one Sanity project dataset.
pub struct SanityStore {
    client: Client,
    base: Url,
    dataset: String,
    api_version: String,
    token: Option<String>,
}

impl SanityStore {
    /// Build a store client from the resolved worker config.
    pub fn new(config: &WorkerConfig) -> Result<Self> {
        let base = config
            .api_host
            .clone()
            .unwrap_or_else(|| format!("https://{}.api.sanity.io", config.project_id));
        Self::with_base_url(
            &base,
            &config.dataset,
            &config.api_version,
            config.store_token.clone(),
        )
    }

    /// Build a store client against an explicit API host.
    pub fn with_base_url(
        base_url: &str,
        dataset: &str,
        api_version: &str,
        token: Option<String>,
    ) -> Result<Self> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| PrepnestError::config(format!("invalid Sanity API host '{base_url}': {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PrepnestError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            dataset: dataset.to_string(),
            api_version: api_version.trim_start_matches('v').to_string(),
            token,
        })
    }

    /// `<base>/v<apiVersion>/data/<action>/<dataset>`
    fn endpoint(&self, action: &str) -> Result<Url> {
        self.base
            .join(&format!(
                "v{}/data/{action}/{}",
                self.api_version, self.dataset
            ))
            .map_err(|e| PrepnestError::config(format!("invalid Sanity endpoint: {e}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Run a GROQ query and deserialize its `result`.
    pub async fn query<T: DeserializeOwned>(&self, groq: &str) -> Result<T> {
        let mut url = self.endpoint("query")?;
        url.query_pairs_mut().append_pair("query", groq);

        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| PrepnestError::Network(format!("{}: {e}", url.path())))?;

        let body = read_success(response).await?;
        let parsed: QueryResponse<T> = serde_json::from_str(&body)
            .map_err(|e| PrepnestError::parse(format!("invalid query response: {e}")))?;
        Ok(parsed.result)
    }

    /// Commit `mutations` as a single transaction.
    pub async fn mutate(&self, mutations: Vec<Value>) -> Result<()> {
        let mut url = self.endpoint("mutate")?;
        url.query_pairs_mut().append_pair("visibility", "sync");

        let transaction_id = Uuid::now_v7().to_string();
        let body = json!({
            "transactionId": transaction_id,
            "mutations": mutations,
        });

        let response = self
            .authorize(self.client.post(url.clone()))
            .json(&body)
            .send()
            .await
            .map_err(|e| PrepnestError::Network(format!("{}: {e}", url.path())))?;

        let text = read_success(response).await?;
        if let Ok(parsed) = serde_json::from_str::<MutateResponse>(&text) {
            debug!(transaction = ?parsed.transaction_id, "mutation committed");
        }
        Ok(())
    }
}

/// Return the body of a 2xx response, or a store error carrying status and body.
async fn read_success(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PrepnestError::Network(format!("failed to read response body: {e}")))?;

    if !status.is_success() {
        let snippet: String = body.chars().take(500).collect();
        return Err(PrepnestError::Store(format!("HTTP {status}: {snippet}")));
    }
    Ok(body)
}

#[async_trait]
impl ContentStore for SanityStore {
    #[instrument(skip(self))]
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<LessonDocument>> {
        let lessons: Vec<LessonDocument> = self.query(&pending_lessons_query(limit)).await?;
        info!(count = lessons.len(), "fetched pending lessons");
        Ok(lessons)
    }

    #[instrument(skip(self, patch), fields(fields = patch.fields().len()))]
    async fn patch(&self, id: &str, patch: &LessonPatch) -> Result<()> {
        let mutation = json!({
            "patch": {
                "id": id,
                "set": patch.fields(),
            }
        });
        self.mutate(vec![mutation]).await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn store(server: &MockServer, token: Option<&str>) -> SanityStore {
        SanityStore::with_base_url(
            &server.uri(),
            "production",
            "2024-01-01",
            token.map(String::from),
        )
        .expect("build store")
    }

    #[test]
    fn query_bounds_and_filters() {
        let q = pending_lessons_query(5);
        assert!(q.contains(r#"_type == "lesson""#));
        assert!(q.contains(r#"aiProcessingStatus == "pending" || !defined(aiProcessingStatus)"#));
        assert!(q.contains(r#"rawContent != """#));
        assert!(q.contains("[0...5]"));
        assert!(q.contains("subject->"));
    }

    #[test]
    fn endpoint_layout() {
        let store = SanityStore::with_base_url("https://abc.api.sanity.io", "production", "v2024-01-01", None)
            .unwrap();
        assert_eq!(
            store.endpoint("query").unwrap().as_str(),
            "https://abc.api.sanity.io/v2024-01-01/data/query/production"
        );
    }

    #[test]
    fn endpoint_keeps_proxy_path() {
        let store =
            SanityStore::with_base_url("http://localhost:8080/sanity/", "staging", "2024-01-01", None)
                .unwrap();
        assert_eq!(
            store.endpoint("mutate").unwrap().as_str(),
            "http://localhost:8080/sanity/v2024-01-01/data/mutate/staging"
        );
    }

    #[tokio::test]
    async fn fetch_pending_parses_result() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2024-01-01/data/query/production"))
            .and(query_param("query", pending_lessons_query(2)))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ms": 4,
                "query": "...",
                "result": [
                    {
                        "_id": "lesson-1",
                        "title": "Photosynthesis",
                        "rawContent": "Plants make food...",
                        "aiProcessingStatus": null,
                        "topic": {
                            "_id": "t1",
                            "title": "Plant Nutrition",
                            "educationLevel": "BECE",
                            "subject": { "_id": "s1", "name": "Integrated Science" }
                        }
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let lessons = store(&server, Some("sk-test")).fetch_pending(2).await.unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].id, "lesson-1");
        assert_eq!(lessons[0].subject_name(), "Integrated Science");
    }

    #[tokio::test]
    async fn patch_sends_single_mutation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2024-01-01/data/mutate/production"))
            .and(query_param("visibility", "sync"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "mutations": [
                    { "patch": { "id": "lesson-1", "set": { "aiProcessingStatus": "processing" } } }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transactionId": "tx-1",
                "results": [{ "id": "lesson-1", "operation": "update" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        store(&server, Some("sk-test"))
            .patch("lesson-1", &LessonPatch::claim())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_mutation_is_store_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string(r#"{"error":"Insufficient permissions"}"#),
            )
            .mount(&server)
            .await;

        let err = store(&server, None)
            .patch("lesson-1", &LessonPatch::failure("boom"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrepnestError::Store(_)));
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("Insufficient permissions"));
    }

    #[tokio::test]
    async fn malformed_query_response_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = store(&server, None).fetch_pending(5).await.unwrap_err();
        assert!(matches!(err, PrepnestError::Parse { .. }));
    }
}
