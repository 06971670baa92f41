//! Built-in demonstration tools.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{Tool, ToolRegistry, require_str};
use crate::error::{AgentError, Result};
use crate::llm::types::ToolDefinition;

/// Register every built-in tool.
pub fn register_all(registry: &mut ToolRegistry) {
    registry.register(Arc::new(WeatherTool));
    registry.register(Arc::new(WriteFileTool));
}

// ---------------------------------------------------------------------------
// get_weather
// ---------------------------------------------------------------------------

/// Returns a canned weather report for any coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_weather".into(),
            description: "Get current temperature for provided coordinates in celsius.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "latitude": { "type": "number", "description": "The latitude of the location" },
                    "longitude": {
                        "type": "number",
                        "description": "The longitude of the location"
                    }
                },
                "required": ["latitude", "longitude"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, parameters: Map<String, Value>) -> Result<Value> {
        let latitude = parameters.get("latitude").and_then(Value::as_f64);
        let longitude = parameters.get("longitude").and_then(Value::as_f64);
        tracing::debug!(?latitude, ?longitude, "reporting mock weather");

        Ok(json!({
            "temperature": -9,
            "precipitationProbability": "0%",
            "humidity": "27%",
            "windSpeed": "10 km/h",
            "condition": "clear",
        }))
    }
}

// ---------------------------------------------------------------------------
// write_content_to_file
// ---------------------------------------------------------------------------

/// Writes text to a file, creating parent directories as needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteFileTool;

const WRITE_FILE: &str = "write_content_to_file";

#[async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: WRITE_FILE.into(),
            description: "Write a content to a file".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "The content to write to the file"
                    },
                    "file_path": {
                        "type": "string",
                        "description": "The path to the file to write to"
                    }
                },
                "required": ["content", "file_path"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, parameters: Map<String, Value>) -> Result<Value> {
        let content = require_str(&parameters, "content", WRITE_FILE)?;
        let file_path = require_str(&parameters, "file_path", WRITE_FILE)?;
        if file_path.trim().is_empty() {
            return Err(AgentError::ToolExecutionFailed {
                tool_name: WRITE_FILE.into(),
                reason: "`file_path` must not be empty".into(),
            });
        }

        let path = Path::new(file_path);
        tracing::debug!(path = %path.display(), bytes = content.len(), "writing file");

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;

        Ok(json!({
            "success": true,
            "file_path": file_path,
            "bytes_written": content.len(),
        }))
    }
}
