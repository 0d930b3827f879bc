/// MCP Tool handlers for lexrag.
///
/// 1. ask             – answer a question from the knowledge base
/// 2. index_file      – index a single `.md`/`.txt` file
/// 3. index_directory – differential sync of a directory
/// 4. list_documents  – list indexed documents
/// 5. delete_document – remove a document from the index
/// 6. thread_history  – messages and memory of a conversation thread
use crate::answer::FileContext;
use crate::chat::{ChatError, ChatRequest};
use crate::mcp::server::McpContext;
use rmcp::handler::server::ServerHandler;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{ErrorData as McpError, handler::server::tool::ToolRouter, model::*, tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

// ── Parameter structs ────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct AskParams {
    /// Question in Arabic or English
    question: String,
    /// Conversation thread to continue (a new one is created if omitted)
    thread_id: Option<String>,
    /// Optional file whose text is used as extra context
    file_path: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
struct FilepathParam {
    /// Path to the `.md` or `.txt` file
    filepath: String,
}

#[derive(Deserialize, JsonSchema)]
struct IndexDirectoryParams {
    /// Directory to index recursively (configured patterns if omitted)
    directory: Option<String>,
    /// Force re-index even if unchanged (default: false)
    force: Option<bool>,
}

#[derive(Deserialize, JsonSchema)]
struct FilenameParam {
    /// Filename as listed by list_documents
    filename: String,
}

#[derive(Deserialize, JsonSchema)]
struct ThreadParam {
    /// Thread id returned by ask
    thread_id: String,
}

// ── Response helpers ─────────────────────────────────────────────────

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )]))
}

fn error_result(msg: &str) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.to_string())]))
}

fn chat_error(e: ChatError) -> Result<CallToolResult, McpError> {
    match e {
        ChatError::Storage(e) => Err(McpError::internal_error(format!("storage failed: {e}"), None)),
        other => error_result(&other.to_string()),
    }
}

// ── Tool implementations ─────────────────────────────────────────────

#[derive(Clone)]
pub struct AppTools {
    pub ctx: McpContext,
    pub tool_router: ToolRouter<Self>,
}

impl ServerHandler for AppTools {}

#[tool_router]
impl AppTools {
    pub fn new(ctx: McpContext) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    // ── Tool 1: ask ─────────────────────────────────────────────────

    #[tool(
        description = "Answer a question from the indexed knowledge base using lexical retrieval. Returns the answer, its sources and the thread_id to continue the conversation."
    )]
    async fn ask(&self, params: Parameters<AskParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;

        let mut request = ChatRequest::new(p.question);
        if let Some(thread_id) = p.thread_id {
            request = request.with_thread(thread_id);
        }
        if let Some(file_path) = p.file_path.filter(|f| !f.is_empty()) {
            match FileContext::from_path(&file_path) {
                Ok(file) => request = request.with_file(file),
                Err(e) => return error_result(&format!("cannot read {file_path}: {e}")),
            }
        }

        match self.ctx.chat().ask(request).await {
            Ok(response) => json_result(&response),
            Err(e) => chat_error(e),
        }
    }

    // ── Tool 2: index_file ──────────────────────────────────────────

    #[tool(description = "Index a specified .md or .txt file")]
    async fn index_file(
        &self,
        params: Parameters<FilepathParam>,
    ) -> Result<CallToolResult, McpError> {
        let filepath = &params.0.filepath;
        if filepath.is_empty() {
            return error_result("filepath is required");
        }
        if !Path::new(filepath).exists() {
            return error_result(&format!("file not found: {filepath}"));
        }

        match self.ctx.indexer().index_file(filepath).await {
            Ok(chunks) => {
                let message = if chunks == 0 {
                    "File is empty, nothing to index"
                } else {
                    "File indexed successfully"
                };
                json_result(&serde_json::json!({
                    "success": true,
                    "chunks": chunks,
                    "message": message,
                }))
            }
            Err(crate::indexer::IndexError::Storage(e)) => Err(McpError::internal_error(
                format!("DB insert failed: {e}"),
                None,
            )),
            Err(e) => error_result(&e.to_string()),
        }
    }

    // ── Tool 3: index_directory ─────────────────────────────────────

    #[tool(description = "Index all .md/.txt files under a directory (differential sync by modification time)")]
    async fn index_directory(
        &self,
        params: Parameters<IndexDirectoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let force = p.force.unwrap_or(false);
        let dirs = match p.directory.filter(|d| !d.is_empty()) {
            Some(dir) => vec![dir.into()],
            None => self.ctx.config.get_base_directories(),
        };

        let indexer = self.ctx.indexer();
        let mut results = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if !dir.is_dir() {
                return error_result(&format!("directory not found: {}", dir.display()));
            }
            let result = indexer
                .index_directory(&dir, force)
                .await
                .map_err(|e| McpError::internal_error(format!("index failed: {e}"), None))?;
            info!("Indexed {}: {:?}", dir.display(), result);
            results.push(serde_json::json!({
                "directory": dir.display().to_string(),
                "result": result,
            }));
        }

        json_result(&serde_json::json!({ "success": true, "results": results }))
    }

    // ── Tool 4: list_documents ──────────────────────────────────────

    #[tool(description = "Retrieve list of indexed documents")]
    async fn list_documents(&self) -> Result<CallToolResult, McpError> {
        let db = self.ctx.db.lock().await;
        let documents = db
            .document_infos()
            .map_err(|e| McpError::internal_error(format!("list failed: {e}"), None))?;

        json_result(&serde_json::json!({ "documents": documents }))
    }

    // ── Tool 5: delete_document ─────────────────────────────────────

    #[tool(description = "Delete a document and its chunks from the index")]
    async fn delete_document(
        &self,
        params: Parameters<FilenameParam>,
    ) -> Result<CallToolResult, McpError> {
        let filename = &params.0.filename;
        if filename.is_empty() {
            return error_result("filename is required");
        }

        let db = self.ctx.db.lock().await;
        let deleted = db
            .delete_document(filename)
            .map_err(|e| McpError::internal_error(format!("delete failed: {e}"), None))?;
        if !deleted {
            return error_result(&format!("document not indexed: {filename}"));
        }

        json_result(&serde_json::json!({
            "success": true,
            "message": "Document deleted successfully",
        }))
    }

    // ── Tool 6: thread_history ──────────────────────────────────────

    #[tool(description = "Show the messages and remembered context of a conversation thread")]
    async fn thread_history(
        &self,
        params: Parameters<ThreadParam>,
    ) -> Result<CallToolResult, McpError> {
        let thread_id = &params.0.thread_id;
        if thread_id.is_empty() {
            return error_result("thread_id is required");
        }

        match self.ctx.chat().history(thread_id).await {
            Ok(history) => json_result(&history),
            Err(e) => chat_error(e),
        }
    }
}
