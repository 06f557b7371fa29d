//! Builders for raw progress stream payloads, as the server sends them.

#![allow(dead_code)]

use serde_json::{json, Value};

fn raw(value: Value) -> String {
    value.to_string()
}

pub fn start(total_files: usize) -> String {
    raw(json!({"type": "start", "total_files": total_files}))
}

pub fn file_start(file: &str, index: usize, total: usize) -> String {
    raw(json!({"type": "file_start", "file_name": file, "index": index, "total": total}))
}

pub fn stage(file: &str, stage: &str) -> String {
    raw(json!({
        "type": "stage_progress",
        "file_name": file,
        "stage": stage,
        "step": format!("{} running", stage),
    }))
}

pub fn file_progress(file: &str, step: &str) -> String {
    raw(json!({"type": "file_progress", "file_name": file, "step": step}))
}

pub fn page_progress(file: &str, page_id: &str, step: &str) -> String {
    raw(json!({
        "type": "file_progress",
        "file_name": file,
        "page_id": page_id,
        "is_in_place_update": true,
        "step": step,
    }))
}

pub fn heading(file: &str, title: &str) -> String {
    raw(json!({"type": "accordion_heading", "file_name": file, "title": title}))
}

pub fn body(file: &str, title: &str, content: &str) -> String {
    raw(json!({
        "type": "accordion_body",
        "file_name": file,
        "title": title,
        "content": content,
    }))
}

pub fn file_complete(file: &str, index: usize, total: usize) -> String {
    raw(json!({
        "type": "file_complete",
        "file_name": file,
        "index": index,
        "total": total,
        "result": {"file": file, "chunks": 3},
        "duration": 1.5,
    }))
}

pub fn job_complete(total_files: usize) -> String {
    raw(json!({
        "type": "job_complete",
        "total_files": total_files,
        "processing_time_seconds": 4.2,
        "results": [],
    }))
}

pub fn cancelling() -> String {
    raw(json!({"type": "cancelling", "message": "Cancelling after current page"}))
}

pub fn cancelled(message: &str) -> String {
    raw(json!({"type": "cancelled", "message": message}))
}

pub fn status(message: &str) -> String {
    raw(json!({"type": "status", "message": message}))
}

pub fn waiting(message: &str, elapsed_seconds: f64) -> String {
    raw(json!({"type": "waiting", "message": message, "elapsed_seconds": elapsed_seconds}))
}

pub fn error(message: &str) -> String {
    raw(json!({"type": "error", "message": message}))
}

pub fn file_error(file: &str, message: &str) -> String {
    raw(json!({"type": "error", "message": message, "file_name": file}))
}

/// Stamps a payload with a server job id.
pub fn for_job(payload: &str, job_id: &str) -> String {
    let mut value: Value = serde_json::from_str(payload).expect("builder produced invalid JSON");
    value["job_id"] = json!(job_id);
    raw(value)
}

/// Scenario A: two files through OCR, one through LLM, both complete.
pub fn two_file_run() -> Vec<String> {
    vec![
        start(2),
        file_start("a.pdf", 0, 2),
        file_start("b.pdf", 1, 2),
        stage("a.pdf", "ocr"),
        stage("b.pdf", "ocr"),
        stage("a.pdf", "llm"),
        file_complete("a.pdf", 0, 2),
        file_complete("b.pdf", 1, 2),
        job_complete(2),
    ]
}
