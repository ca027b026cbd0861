//! Current-time tool

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde_json::{json, Value};

use super::{Tool, ToolError};

// IST is a fixed UTC+5:30 offset, no DST.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time in India."
    }

    async fn run(&self, _args: &Value) -> Result<Value, ToolError> {
        let offset = FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is in range");
        let now = Utc::now().with_timezone(&offset);

        Ok(json!({
            "time": now.format("%I:%M %p").to_string(),
            "timezone": "IST (India Standard Time)"
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_ist_time() {
        let result = CurrentTimeTool.run(&json!({})).await.unwrap();

        let time = result["time"].as_str().unwrap();
        assert!(time.contains(':'), "expected hh:mm, got {time}");
        assert!(time.ends_with("AM") || time.ends_with("PM"));
        assert_eq!(result["timezone"], "IST (India Standard Time)");
    }
}
