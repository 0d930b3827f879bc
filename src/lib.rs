//! # lexrag — Local Lexical RAG MCP Server
//!
//! Answers Arabic and English questions from an indexed chunk store with
//! lexical retrieval only: normalization, keyword expansion, fuzzy matching,
//! multi-factor scoring and QA-pair extraction. No embeddings, no LLM.
//!
//! ## Architecture
//!
//! - **[`text`]** — Arabic normalization, tokenization, keyword expansion, fuzzy similarity
//! - **[`retrieval`]** — QA-pair scanner, chunk scorer, ranking, direct answers
//! - **[`answer`]** — Answer composition, attached files, thread memory
//! - **[`indexer`]** — Segmentation, language detection, directory sync
//! - **[`db`]** — SQLite store for documents, chunks, threads and memory
//! - **[`chat`]** — Request flow from question to persisted response
//! - **[`config`]** — Configuration loading and validation
//! - **[`mcp`]** — MCP server with 6 tool handlers (stdio transport via rmcp)

pub mod answer;
pub mod chat;
pub mod config;
pub mod db;
pub mod indexer;
pub mod mcp;
pub mod retrieval;
pub mod text;
