use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use journey_core::{JourneyStore, QueryError};
use journey_narrate::{LlmGenerator, Narrator};

#[derive(Parser, Debug)]
#[command(name = "journey-mcp", about = "Serve the member journey to MCP clients over stdio")]
struct Args {
    /// Journey data file (JSON array of entries)
    #[arg(long, env = "JOURNEY_DATA", default_value = "journey_data.json")]
    data: PathBuf,
}

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct DecisionRequest {
    /// ID of a journey entry tagged as a decision
    id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct MonthRequest {
    /// Month label in the form "February 2025" (full English month name, four-digit year)
    month: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AskRequest {
    /// Free-form question about the journey
    query: String,
}

// --- Server ---

#[derive(Clone)]
pub struct JourneyServer {
    store: Arc<JourneyStore>,
    narrator: Arc<Narrator>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl JourneyServer {
    pub fn new(store: Arc<JourneyStore>, narrator: Narrator) -> Self {
        Self {
            store,
            narrator: Arc::new(narrator),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "List every journey entry in recorded order. Each entry is {id, timestamp, sender, role, content, tags: {type, linked_id}}."
    )]
    fn list_entries(&self) -> Result<CallToolResult, McpError> {
        Ok(match self.store.all_entries() {
            Ok(entries) => json_result(&entries),
            Err(e) => query_error(e),
        })
    }

    #[tool(description = "List the milestone entries of the journey in recorded order.")]
    fn get_timeline(&self) -> Result<CallToolResult, McpError> {
        Ok(match self.store.timeline() {
            Ok(milestones) if !milestones.is_empty() => json_result(&milestones),
            Ok(_) | Err(QueryError::DataUnavailable) => {
                CallToolResult::error(vec![Content::text("No milestone events found.")])
            }
            Err(e) => query_error(e),
        })
    }

    #[tool(
        description = "Get a decision entry and the reason entries linked to it. Returns {decision, reasons}."
    )]
    fn get_decision(
        &self,
        Parameters(req): Parameters<DecisionRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.store.find_decision_with_reasons(req.id) {
            Ok(found) => json_result(&found),
            Err(QueryError::DataUnavailable) => CallToolResult::error(vec![Content::text(format!(
                "Decision with ID {} not found.",
                req.id
            ))]),
            Err(e) => query_error(e),
        })
    }

    #[tool(description = "List the months covered by the journey, oldest first, e.g. \"January 2025\".")]
    fn list_months(&self) -> Result<CallToolResult, McpError> {
        Ok(match self.store.months() {
            Ok(months) => {
                let labels: Vec<String> = months.iter().map(|m| m.label()).collect();
                CallToolResult::success(vec![Content::text(labels.join("\n"))])
            }
            Err(e) => query_error(e),
        })
    }

    #[tool(description = "List the journey entries dated within one month.")]
    fn get_month(
        &self,
        Parameters(req): Parameters<MonthRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.store.entries_for_month(&req.month) {
            Ok(entries) => json_result(&entries),
            Err(e) => query_error(e),
        })
    }

    #[tool(
        description = "Count care-team interactions per role, excluding the member and their personal assistant."
    )]
    fn get_team_interactions(&self) -> Result<CallToolResult, McpError> {
        Ok(match self.store.count_team_interactions() {
            Ok(counts) => json_result(&counts),
            Err(e) => query_error(e),
        })
    }

    #[tool(
        description = "Monthly average of a keyword-based sentiment score over the member's own messages, from -1 to 1."
    )]
    fn get_sentiment_trend(&self) -> Result<CallToolResult, McpError> {
        Ok(match self.store.sentiment_trend() {
            Ok(trend) => json_result(&trend),
            Err(e) => query_error(e),
        })
    }

    #[tool(
        description = "Generate a narrative analysis of one month: primary goal, friction points, outcome, and the member's persona before and after."
    )]
    async fn analyze_month(
        &self,
        Parameters(req): Parameters<MonthRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.narrator.analyze_month(&req.month).await {
            Ok(analysis) => json_result(&analysis),
            Err(e) => query_error(e),
        })
    }

    #[tool(description = "Generate an HTML summary of the most recent week of the journey.")]
    async fn weekly_report(&self) -> Result<CallToolResult, McpError> {
        Ok(json_result(&self.narrator.weekly_report().await))
    }

    #[tool(description = "Ask a free-form question answered from the full journey transcript.")]
    async fn ask(&self, Parameters(req): Parameters<AskRequest>) -> Result<CallToolResult, McpError> {
        Ok(match self.narrator.chat(&req.query).await {
            Ok(reply) => CallToolResult::success(vec![Content::text(reply.answer)]),
            Err(e) => query_error(e),
        })
    }
}

#[tool_handler]
impl ServerHandler for JourneyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

fn json_result<T: Serialize + ?Sized>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(json) => CallToolResult::success(vec![Content::text(json)]),
        Err(e) => CallToolResult::error(vec![Content::text(format!("Serialization error: {e}"))]),
    }
}

fn query_error(err: QueryError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(err.to_string())])
}

const INSTRUCTIONS: &str = r#"This server exposes a member's health-coaching journey: a fixed, recorded log of messages between the member and their care team.

## Entries
Each entry has an integer `id`, an ISO-8601 `timestamp`, a `sender`, a `role` ("Member", "Personal Assistant", or a care-team role such as "Medical Strategist") and `content`.
`tags.type` marks an entry as a "milestone", a "decision" or a "reason". Reasons carry `tags.linked_id`, the id of the decision they explain.

## Months
Month parameters use the label format "February 2025". Call `list_months` to see which months have data.

## Generated content
`analyze_month`, `weekly_report` and `ask` call a language model. When it is unavailable they return fixed fallback text rather than failing."#;

fn init_logging() {
    let level = std::env::var("JOURNEY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // stdout carries the protocol
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging();

    let (store, _) = JourneyStore::load(&args.data);
    let store = Arc::new(store);

    let settings = journey_core::read_settings();
    if !journey_core::ai_configured(&settings) {
        warn!(event = "ai_not_configured", provider = %settings.provider);
    }
    let generator = LlmGenerator::new(settings);
    let timeout = generator.timeout();
    let narrator = Narrator::new(store.clone(), Arc::new(generator)).with_timeout(timeout);

    info!(event = "mcp_start", entries = store.len());
    let service = JourneyServer::new(store, narrator)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(event = "mcp_error", error = %e))?;
    service.waiting().await?;
    Ok(())
}
