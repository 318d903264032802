// Usage tracking and dashboard aggregation
// Event inserts are fire-and-forget; failures are logged and swallowed

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::UsageLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    PageView,
    SoftwareDownload,
    TutorialView,
}

/// One recorded usage event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub kind: UsageKind,
    /// Page name, software id or tutorial id depending on kind
    pub subject: String,
    pub at: DateTime<Utc>,
}

impl UsageEvent {
    pub fn page_view(page: &str) -> Self {
        UsageEvent {
            kind: UsageKind::PageView,
            subject: page.to_string(),
            at: Utc::now(),
        }
    }

    pub fn software_download(software_id: &str) -> Self {
        UsageEvent {
            kind: UsageKind::SoftwareDownload,
            subject: software_id.to_string(),
            at: Utc::now(),
        }
    }

    pub fn tutorial_view(tutorial_id: &str) -> Self {
        UsageEvent {
            kind: UsageKind::TutorialView,
            subject: tutorial_id.to_string(),
            at: Utc::now(),
        }
    }
}

/// Record an event, swallowing any backend failure
pub fn track(log: &dyn UsageLog, event: UsageEvent) {
    if let Err(err) = log.record(event) {
        tracing::warn!("usage tracking failed: {err}");
    }
}

/// Aggregated numbers for the admin dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub visits_today: u64,
    pub visits_week: u64,
    pub visits_month: u64,
    pub software_count: u64,
    pub tutorial_count: u64,
    pub downloads: u64,
    pub tutorial_views: u64,
}

/// Aggregate events into dashboard numbers
/// Visits count page views only: today from the start of the calendar
/// day, week and month as rolling 7 and 30 day windows
pub fn dashboard_stats(
    events: &[UsageEvent],
    software_count: usize,
    tutorial_count: usize,
    now: DateTime<Utc>,
) -> DashboardStats {
    let start_of_today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let start_of_week = now - Duration::days(7);
    let start_of_month = now - Duration::days(30);

    let visits_since = |cutoff: DateTime<Utc>| {
        events
            .iter()
            .filter(|e| e.kind == UsageKind::PageView && e.at >= cutoff)
            .count() as u64
    };

    DashboardStats {
        visits_today: visits_since(start_of_today),
        visits_week: visits_since(start_of_week),
        visits_month: visits_since(start_of_month),
        software_count: software_count as u64,
        tutorial_count: tutorial_count as u64,
        downloads: events
            .iter()
            .filter(|e| e.kind == UsageKind::SoftwareDownload)
            .count() as u64,
        tutorial_views: events
            .iter()
            .filter(|e| e.kind == UsageKind::TutorialView)
            .count() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_at(kind: UsageKind, at: DateTime<Utc>) -> UsageEvent {
        UsageEvent {
            kind,
            subject: "x".to_string(),
            at,
        }
    }

    #[test]
    fn test_dashboard_windows() {
        let now = "2024-06-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let events = vec![
            // Same calendar day
            event_at(UsageKind::PageView, now - Duration::hours(2)),
            // Yesterday, inside the 7 day window
            event_at(UsageKind::PageView, now - Duration::days(1)),
            // Inside the 30 day window only
            event_at(UsageKind::PageView, now - Duration::days(10)),
            // Outside all windows
            event_at(UsageKind::PageView, now - Duration::days(40)),
            // Non-visit events never count as visits
            event_at(UsageKind::SoftwareDownload, now),
            event_at(UsageKind::TutorialView, now - Duration::days(50)),
        ];

        let stats = dashboard_stats(&events, 3, 7, now);
        assert_eq!(stats.visits_today, 1);
        assert_eq!(stats.visits_week, 2);
        assert_eq!(stats.visits_month, 3);
        assert_eq!(stats.software_count, 3);
        assert_eq!(stats.tutorial_count, 7);
        assert_eq!(stats.downloads, 1);
        assert_eq!(stats.tutorial_views, 1);
    }

    #[test]
    fn test_downloads_and_views_count_all_time() {
        let now = "2024-06-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let events = vec![
            event_at(UsageKind::SoftwareDownload, now - Duration::days(400)),
            event_at(UsageKind::SoftwareDownload, now),
            event_at(UsageKind::TutorialView, now - Duration::days(100)),
        ];

        let stats = dashboard_stats(&events, 0, 0, now);
        assert_eq!(stats.downloads, 2);
        assert_eq!(stats.tutorial_views, 1);
    }
}
