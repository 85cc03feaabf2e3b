use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use systemcraft_core::{
    Connection, Design, FinalEvaluation, Node, Question, Severity, StructuralEvaluation, RULES,
};
use systemcraft_reason::LlmEvaluator;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SYSTEMCRAFT_LOG";

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct EvaluateStructureRequest {
    /// Canvas nodes: [{id, type, label?}]. `type` is the component kind, e.g. "LB", "Server", "SQL", "Cache", "Queue".
    nodes: Vec<Node>,
    /// Directed connections: [{id, from, to}] referencing node ids. Direction does not matter for grading.
    #[serde(default)]
    connections: Vec<Connection>,
    /// Functional requirements of the question, free text
    #[serde(default)]
    requirements: Vec<String>,
    /// Scale/performance constraints of the question, free text
    #[serde(default)]
    constraints: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct CombineRequest {
    /// Output of evaluate_structure
    structural: StructuralEvaluation,
    /// Qualitative review: {score 0-100, strengths, weaknesses, suggestions}. Out-of-range scores are clamped; a missing or non-numeric score counts as 70.
    reasoning: serde_json::Value,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GradeDesignRequest {
    /// The interview question: {prompt, requirements, constraints, trafficProfile?: {users, rps, storage}}
    question: Question,
    /// The submitted canvas: {nodes, connections}
    design: Design,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleSummary {
    id: &'static str,
    description: &'static str,
    weight: u32,
    severity: Severity,
}

// --- Tool bodies (plain functions so they can be exercised without a transport) ---

fn rules_json() -> Result<String, String> {
    let rules: Vec<RuleSummary> = RULES
        .iter()
        .map(|r| RuleSummary {
            id: r.id,
            description: r.description,
            weight: r.weight,
            severity: r.severity,
        })
        .collect();
    serde_json::to_string_pretty(&rules).map_err(|e| e.to_string())
}

fn structure_json(req: &EvaluateStructureRequest) -> Result<String, String> {
    let eval = systemcraft_core::evaluate_structure(
        &req.nodes,
        &req.connections,
        &req.requirements,
        &req.constraints,
    );
    serde_json::to_string_pretty(&eval).map_err(|e| e.to_string())
}

fn combine(req: CombineRequest) -> Result<FinalEvaluation, String> {
    let reasoning =
        systemcraft_reason::review_from_value(req.reasoning).map_err(|e| e.to_string())?;
    Ok(systemcraft_core::combine_evaluations(req.structural, reasoning))
}

fn check_gradable(design: &Design) -> Result<(), String> {
    if design.is_empty() {
        Err("Cannot evaluate an empty canvas. Add components before submitting.".to_string())
    } else {
        Ok(())
    }
}

fn tool_output(result: Result<String, String>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => CallToolResult::error(vec![Content::text(e)]),
    }
}

// --- Server ---

#[derive(Clone)]
pub struct GraderServer {
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GraderServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List the structural grading rules with their weights and severities")]
    fn get_rules(&self) -> Result<CallToolResult, McpError> {
        Ok(tool_output(rules_json()))
    }

    #[tool(
        description = "Run the deterministic structural rules against a design. Returns {score (0-100), passedRules, failedRules, details: [{rule, status: pass|fail, message, severity}]}."
    )]
    fn evaluate_structure(
        &self,
        Parameters(req): Parameters<EvaluateStructureRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tool_output(structure_json(&req)))
    }

    #[tool(
        description = "Combine a structural evaluation with a qualitative review into the final record: finalScore = round(structural * 0.6 + reasoning * 0.4)."
    )]
    fn combine_evaluations(
        &self,
        Parameters(req): Parameters<CombineRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tool_output(combine(req).and_then(|result| {
            serde_json::to_string_pretty(&result).map_err(|e| e.to_string())
        })))
    }

    #[tool(
        description = "Grade a submitted design end to end: structural rules, AI review of the design against the question (neutral fallback when the AI provider is unavailable), and the weighted final score."
    )]
    async fn grade_design(
        &self,
        Parameters(req): Parameters<GradeDesignRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = check_gradable(&req.design) {
            return Ok(CallToolResult::error(vec![Content::text(e)]));
        }
        let evaluator = LlmEvaluator::from_settings();
        let result = systemcraft_reason::grade(&evaluator, &req.question, &req.design).await;
        Ok(tool_output(
            serde_json::to_string_pretty(&result).map_err(|e| e.to_string()),
        ))
    }
}

const INSTRUCTIONS: &str = r#"SystemCraft grades system design interview answers.

A design is a set of nodes ({id, type, label?}) and directed connections ({id, from, to}).
Node `type` is a component kind such as Client, Server, Function, LB, CDN, SQL, Cache, Blob, Queue or Kafka.

## Workflow
1. `evaluate_structure` for the deterministic checklist (safe to call repeatedly, no side effects).
2. `grade_design` for the final grade: it runs the checklist, asks the configured AI provider for a qualitative review, and combines both (60% structural, 40% review).
3. `combine_evaluations` when you already have a qualitative review from elsewhere.

The AI provider is configured in ~/.systemcraft/settings.json ({provider, apiKey, model}); SYSTEMCRAFT_API_KEY overrides the key."#;

#[tool_handler]
impl ServerHandler for GraderServer {
    fn get_info(&self) -> ServerInfo {
        let rules = RULES
            .iter()
            .map(|r| format!("- {} (weight {}): {}", r.id, r.weight, r.description))
            .collect::<Vec<_>>()
            .join("\n");
        let instructions = format!("{}\n\n## Structural rules\n{}", INSTRUCTIONS, rules);
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Logs go to stderr; stdout carries the MCP transport.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    tracing::info!("starting systemcraft-mcp on stdio");

    let service = GraderServer::new()
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}
