//! Shared HTTP utilities for the video collection workspace.
//!
//! Provides common error bodies and small presentation helpers used by the
//! api-server. Kept framework-agnostic so other HTTP surfaces can reuse it.

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "duplicate_video" => "You already added that video",
        "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Presentation Helpers
// ============================================================================

/// Human summary of a list size: "No videos", "1 video", "4 videos".
pub fn video_count_label(n: usize) -> String {
    match n {
        0 => "No videos".to_string(),
        1 => "1 video".to_string(),
        n => format!("{n} videos"),
    }
}

/// Embeddable player URL for a video id.
pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{video_id}")
}
