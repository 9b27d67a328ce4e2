//! Current time tool

use super::Tool;
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Reports the current date and time at a UTC offset
pub struct CurrentTimeTool;

#[derive(Debug, Deserialize)]
struct CurrentTimeInput {
    utc_offset_hours: i32,
}

const SECONDS_PER_HOUR: i32 = 3600;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &'static str {
        "get_current_time"
    }

    fn description(&self) -> String {
        "Get the current date and time at a given UTC offset.".to_string()
    }

    fn parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert(
            "utc_offset_hours".to_string(),
            json!({
                "type": "integer",
                "description": "Offset from UTC in whole hours, e.g. -5 or 9"
            }),
        );
        params
    }

    async fn call(&self, arguments: Value) -> Result<Value, String> {
        let input: CurrentTimeInput =
            serde_json::from_value(arguments).map_err(|e| format!("Invalid input: {e}"))?;
        let offset = FixedOffset::east_opt(input.utc_offset_hours * SECONDS_PER_HOUR)
            .ok_or_else(|| format!("Offset out of range: {}", input.utc_offset_hours))?;
        let now = Utc::now().with_timezone(&offset);
        Ok(json!({
            "datetime": now.to_rfc3339(),
            "weekday": now.format("%A").to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn test_reports_time_at_offset() {
        let result = CurrentTimeTool
            .call(json!({"utc_offset_hours": 9}))
            .await
            .unwrap();
        let datetime = result["datetime"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(datetime).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 9 * 3600);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        assert!(CurrentTimeTool.call(json!({})).await.is_err());
        assert!(CurrentTimeTool
            .call(json!({"utc_offset_hours": 99}))
            .await
            .is_err());
    }
}
