use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Analytics source failed: {0}")]
    Source(String),
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, AsRefStr, Display, EnumString, EnumIter,
)]
pub enum TimeRange {
    #[serde(rename = "24h")]
    #[strum(serialize = "24h")]
    Last24Hours,
    #[default]
    #[serde(rename = "7d")]
    #[strum(serialize = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    #[strum(serialize = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    #[strum(serialize = "90d")]
    Last90Days,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TopQuestion {
    pub question: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DailyMessages {
    pub date: String,
    pub messages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct HourlyResponseTime {
    pub hour: u8,
    /// Seconds.
    pub avg_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BotPerformance {
    pub name: String,
    pub messages: u32,
    pub satisfaction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnalyticsData {
    pub total_messages: u32,
    pub total_users: u32,
    pub avg_response_time: f64,
    pub satisfaction_score: f64,
    pub top_questions: Vec<TopQuestion>,
    pub messages_by_day: Vec<DailyMessages>,
    pub response_times_by_hour: Vec<HourlyResponseTime>,
    pub chatbot_performance: Vec<BotPerformance>,
}

impl AnalyticsData {
    /// The fixed sample dataset shown until a metrics pipeline exists.
    pub fn sample() -> Self {
        Self {
            total_messages: 1247,
            total_users: 89,
            avg_response_time: 1.2,
            satisfaction_score: 4.6,
            top_questions: [
                ("How do I reset my password?", 45),
                ("What are your business hours?", 38),
                ("How can I contact support?", 32),
                ("Where can I find my order status?", 28),
                ("Do you offer refunds?", 24),
            ]
            .into_iter()
            .map(|(question, count)| TopQuestion {
                question: question.to_string(),
                count,
            })
            .collect(),
            messages_by_day: [
                ("2024-01-15", 156),
                ("2024-01-16", 189),
                ("2024-01-17", 234),
                ("2024-01-18", 198),
                ("2024-01-19", 267),
                ("2024-01-20", 203),
                ("2024-01-21", 178),
            ]
            .into_iter()
            .map(|(date, messages)| DailyMessages {
                date: date.to_string(),
                messages,
            })
            .collect(),
            response_times_by_hour: [0.8, 1.1, 1.4, 1.8, 2.1, 1.6, 1.3, 1.0, 0.9]
                .into_iter()
                .zip(9u8..)
                .map(|(avg_time, hour)| HourlyResponseTime { hour, avg_time })
                .collect(),
            chatbot_performance: [
                ("Support Assistant", 456, 4.8),
                ("Sales Bot", 342, 4.5),
                ("FAQ Helper", 289, 4.3),
                ("Product Guide", 160, 4.7),
            ]
            .into_iter()
            .map(|(name, messages, satisfaction)| BotPerformance {
                name: name.to_string(),
                messages,
                satisfaction,
            })
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    High,
    Medium,
    Low,
}

impl PerformanceTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 4.5 {
            PerformanceTier::High
        } else if score >= 4.0 {
            PerformanceTier::Medium
        } else {
            PerformanceTier::Low
        }
    }
}

/// `1247` → `1.2k`; values under a thousand are printed as is.
pub fn format_number(value: u64) -> String {
    if value >= 1000 {
        format!("{:.1}k", value as f64 / 1000.0)
    } else {
        value.to_string()
    }
}

/// Each value as a percentage of the largest one.
pub fn bar_percentages(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(0.0, f64::max);
    values
        .iter()
        .map(|value| if max > 0.0 { value / max * 100.0 } else { 0.0 })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BotPerformanceRow {
    pub name: String,
    pub messages: u32,
    pub satisfaction: f64,
    pub tier: PerformanceTier,
    /// Share of the busiest bot's volume.
    pub volume_percent: f64,
}

/// Analytics for one range plus the values derived for display.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnalyticsReport {
    pub range: TimeRange,
    pub data: AnalyticsData,
    pub total_messages_label: String,
    pub satisfaction_tier: PerformanceTier,
    pub daily_percent: Vec<f64>,
    pub hourly_percent: Vec<f64>,
    pub bots: Vec<BotPerformanceRow>,
}

impl AnalyticsReport {
    pub fn new(range: TimeRange, data: AnalyticsData) -> Self {
        let daily: Vec<f64> = data
            .messages_by_day
            .iter()
            .map(|day| f64::from(day.messages))
            .collect();
        let hourly: Vec<f64> = data
            .response_times_by_hour
            .iter()
            .map(|hour| hour.avg_time)
            .collect();
        let volumes: Vec<f64> = data
            .chatbot_performance
            .iter()
            .map(|bot| f64::from(bot.messages))
            .collect();
        let bots = data
            .chatbot_performance
            .iter()
            .zip(bar_percentages(&volumes))
            .map(|(bot, volume_percent)| BotPerformanceRow {
                name: bot.name.clone(),
                messages: bot.messages,
                satisfaction: bot.satisfaction,
                tier: PerformanceTier::from_score(bot.satisfaction),
                volume_percent,
            })
            .collect();

        Self {
            range,
            total_messages_label: format_number(u64::from(data.total_messages)),
            satisfaction_tier: PerformanceTier::from_score(data.satisfaction_score),
            daily_percent: bar_percentages(&daily),
            hourly_percent: bar_percentages(&hourly),
            bots,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub content: String,
}

/// Daily message volume as `Date,Messages` CSV. The last row has no
/// trailing newline.
pub fn export_csv(data: &AnalyticsData, range: TimeRange) -> Result<CsvExport, AnalyticsError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(["Date", "Messages"])?;
    for day in &data.messages_by_day {
        writer.write_record([day.date.clone(), day.messages.to_string()])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let mut content = String::from_utf8_lossy(&bytes).into_owned();
    // Rows are newline-joined; only the bare header keeps its terminator.
    if !data.messages_by_day.is_empty() {
        content.pop();
    }

    Ok(CsvExport {
        file_name: format!("chatbot-analytics-{range}.csv"),
        content,
    })
}

#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn load(&self, user_id: &str, range: TimeRange) -> Result<AnalyticsData, AnalyticsError>;
}

/// Serves [`AnalyticsData::sample`] after a simulated loading delay.
pub struct StaticAnalyticsSource {
    delay: Duration,
}

impl StaticAnalyticsSource {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AnalyticsSource for StaticAnalyticsSource {
    async fn load(&self, _user_id: &str, _range: TimeRange) -> Result<AnalyticsData, AnalyticsError> {
        tokio::time::sleep(self.delay).await;
        Ok(AnalyticsData::sample())
    }
}

pub struct AnalyticsService {
    source: Arc<dyn AnalyticsSource>,
}

impl AnalyticsService {
    pub fn new(source: Arc<dyn AnalyticsSource>) -> Self {
        Self { source }
    }

    pub async fn report(&self, user_id: &str, range: TimeRange) -> Result<AnalyticsReport, AnalyticsError> {
        let data = self
            .source
            .load(user_id, range)
            .await
            .inspect_err(|e| tracing::error!(user_id, %range, error = %e, "Failed to load analytics"))?;
        Ok(AnalyticsReport::new(range, data))
    }

    pub async fn export(&self, user_id: &str, range: TimeRange) -> Result<CsvExport, AnalyticsError> {
        let data = self.source.load(user_id, range).await?;
        export_csv(&data, range)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(format_number(1247), "1.2k");
        assert_eq!(format_number(1000), "1.0k");
        assert_eq!(format_number(999), "999");
    }

    #[test]
    fn tiers_follow_score_thresholds() {
        assert_eq!(PerformanceTier::from_score(4.8), PerformanceTier::High);
        assert_eq!(PerformanceTier::from_score(4.5), PerformanceTier::High);
        assert_eq!(PerformanceTier::from_score(4.3), PerformanceTier::Medium);
        assert_eq!(PerformanceTier::from_score(3.9), PerformanceTier::Low);
    }

    #[test]
    fn ranges_parse_from_query_values() {
        assert_eq!(TimeRange::from_str("30d").unwrap(), TimeRange::Last30Days);
        assert_eq!(TimeRange::Last24Hours.to_string(), "24h");
        assert!(TimeRange::from_str("1y").is_err());
    }

    #[test]
    fn csv_export_lists_daily_volume() {
        let export = export_csv(&AnalyticsData::sample(), TimeRange::Last7Days).unwrap();
        assert_eq!(export.file_name, "chatbot-analytics-7d.csv");
        assert_eq!(
            export.content,
            "Date,Messages\n2024-01-15,156\n2024-01-16,189\n2024-01-17,234\n\
             2024-01-18,198\n2024-01-19,267\n2024-01-20,203\n2024-01-21,178"
        );

        let mut empty = AnalyticsData::sample();
        empty.messages_by_day.clear();
        let export = export_csv(&empty, TimeRange::Last24Hours).unwrap();
        assert_eq!(export.content, "Date,Messages\n");
    }

    #[test]
    fn report_derives_display_values() {
        let report = AnalyticsReport::new(TimeRange::Last7Days, AnalyticsData::sample());
        assert_eq!(report.total_messages_label, "1.2k");
        assert_eq!(report.daily_percent[4], 100.0);
        assert_eq!(report.hourly_percent[4], 100.0);
        assert_eq!(report.bots[0].volume_percent, 100.0);
        assert_eq!(report.bots[2].tier, PerformanceTier::Medium);
        assert_eq!(report.data.response_times_by_hour.first().map(|h| h.hour), Some(9));
        assert_eq!(report.data.response_times_by_hour.last().map(|h| h.hour), Some(17));
    }

    #[tokio::test(start_paused = true)]
    async fn static_source_waits_before_answering() {
        let service = AnalyticsService::new(Arc::new(StaticAnalyticsSource::new(Duration::from_secs(1))));
        let started = tokio::time::Instant::now();
        let report = service.report("user_1", TimeRange::Last90Days).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(report.range, TimeRange::Last90Days);
        assert_eq!(report.data.total_users, 89);
    }
}
