use std::sync::Arc;

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config_db::ConfigDb,
    embedder::Embedder,
    engine::EnrichedCandidate,
    error,
    ranking::TopK,
    search::{self, SearchParams},
    vector_store::VectorStore,
    weights::FieldWeights,
};

struct CvsearchState {
    config_db: ConfigDb,
    store: VectorStore,
    embedder: Box<dyn Embedder>,
}

#[derive(Clone)]
pub struct CvsearchMcpServer {
    state: Arc<CvsearchState>,
    tool_router: ToolRouter<Self>,
}

impl CvsearchMcpServer {
    fn new(state: CvsearchState) -> Self {
        Self {
            state: Arc::new(state),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router(router = tool_router)]
impl CvsearchMcpServer {
    /// Rank resumes by weighted similarity across all fields.
    #[tool(
        name = "resume_search",
        description = "Search resumes by meaning across summary, skills, work history, project history and education. Returns candidates ranked by weighted score with a per-field breakdown."
    )]
    pub async fn resume_search(
        &self,
        params: Parameters<ResumeSearchParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let state = &self.state;

        let count = match params.limit {
            Some(limit) => TopK::try_from(limit)
                .map_err(|e| rmcp::ErrorData::invalid_params(e.to_string(), None))?,
            None => TopK::DEFAULT,
        };

        state
            .config_db
            .check_embedder(state.embedder.name())
            .map_err(|e| mcp_error("embedder mismatch", e))?;
        let weights = state
            .config_db
            .field_weights()
            .map_err(|e| mcp_error("failed to load field weights", e))?
            .unwrap_or_default();

        let search_params = SearchParams {
            query: params.query,
            count,
            full: params.include_full_record.unwrap_or(false),
        };
        let results = search::execute_search(
            &search_params,
            &state.store,
            state.embedder.as_ref(),
            weights,
        )
        .map_err(|e| mcp_error("search failed", e))?;

        let summary = format_search_summary(&results, &search_params.query);
        let structured = serde_json::to_value(SearchResponse {
            query: search_params.query,
            result_count: results.len(),
            weights,
            results,
        })
        .map_err(|e| mcp_error("failed to serialize search results", e))?;

        Ok(CallToolResult {
            content: vec![Content::text(summary)],
            structured_content: Some(structured),
            is_error: Some(false),
            meta: None,
        })
    }

    /// Fetch one stored resume.
    #[tool(
        name = "resume_get",
        description = "Fetch the full stored resume for a candidate id returned by resume_search."
    )]
    pub async fn resume_get(
        &self,
        params: Parameters<ResumeGetParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let resume_id = params.0.resume_id;
        let record = self
            .state
            .store
            .get_resume(&resume_id)
            .map_err(|e| mcp_error("failed to load resume", e))?;

        let Some(record) = record else {
            return Ok(CallToolResult {
                content: vec![Content::text(format!(
                    "No resume found with id \"{resume_id}\""
                ))],
                structured_content: None,
                is_error: Some(true),
                meta: None,
            });
        };

        let structured = serde_json::to_value(&record)
            .map_err(|e| mcp_error("failed to serialize resume", e))?;
        Ok(CallToolResult {
            content: vec![Content::text(search::format_record(&record))],
            structured_content: Some(structured),
            is_error: Some(false),
            meta: None,
        })
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for CvsearchMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "cvsearch".to_string(),
                title: Some("cvsearch MCP".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Use resume_search to find candidates matching a role description, then resume_get to read a candidate's full resume."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSearchParams {
    /// Free-text description of the candidate you are looking for.
    pub query: String,
    /// Maximum number of candidates (default: 5).
    pub limit: Option<i64>,
    /// Attach each candidate's full stored resume (default: false).
    pub include_full_record: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumeGetParams {
    /// Candidate id as returned by resume_search.
    pub resume_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    query: String,
    result_count: usize,
    weights: FieldWeights,
    results: Vec<EnrichedCandidate>,
}

fn format_search_summary(results: &[EnrichedCandidate], query: &str) -> String {
    if results.is_empty() {
        return format!("No candidates found for \"{query}\"");
    }

    let mut lines = Vec::with_capacity(results.len() + 1);
    let suffix = if results.len() == 1 { "" } else { "s" };
    lines.push(format!(
        "Found {} candidate{} for \"{query}\":",
        results.len(),
        suffix
    ));

    for (i, r) in results.iter().enumerate() {
        let c = &r.candidate;
        lines.push(format!(
            "{}. {} {:.3} ({} fields) #{}",
            i + 1,
            c.name,
            c.total_score,
            c.fields_matched,
            c.candidate_id
        ));
    }

    lines.join("\n")
}

fn mcp_error(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

pub fn run_mcp(
    store: VectorStore,
    config_db: ConfigDb,
    embedder: Box<dyn Embedder>,
) -> error::Result<()> {
    let server = CvsearchMcpServer::new(CvsearchState {
        config_db,
        store,
        embedder,
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            error::Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            error::Error::Config(format!(
                "MCP server initialization failed: {e}"
            ))
        })?;
        running.waiting().await.map_err(|e| {
            error::Error::Config(format!("MCP server error: {e}"))
        })?;
        Ok(())
    })
}
