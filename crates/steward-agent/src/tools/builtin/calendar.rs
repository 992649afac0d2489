use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};

use crate::tools::{Tool, ToolContext};

/// Render a timestamp the way the calendar tool reports it
pub fn format_now<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Current Date & Time: {}",
        now.format("%A, %B %d, %Y at %I:%M %p")
    )
}

/// Reports the current local date and time
pub struct CalendarTool;

#[async_trait]
impl Tool for CalendarTool {
    fn name(&self) -> &str {
        "calendar"
    }

    fn description(&self) -> &str {
        "Returns the current real-world date and time. You MUST use this tool before \
         answering any question about the current date, time, or day of the week."
    }

    fn usage(&self) -> String {
        "calendar()".to_string()
    }

    async fn execute(&self, _input: &str, _ctx: &ToolContext) -> Result<String> {
        Ok(format_now(&Local::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(
            format_now(&at),
            "Current Date & Time: Tuesday, March 05, 2024 at 02:07 PM"
        );
    }

    #[tokio::test]
    async fn test_tool_output_prefix() {
        let out = CalendarTool.execute("", &ToolContext::default()).await.unwrap();
        assert!(out.starts_with("Current Date & Time: "));
    }
}
