//! Due-pipeline evaluation.

use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone};
use cron::Schedule;
use ferry_config::PipelineDefinition;
use tracing::{debug, warn};

use crate::error::{SchedulerError, SchedulerResult};

/// Parse a pipeline schedule, accepting 5-field expressions.
pub fn parse_schedule(pipeline: &PipelineDefinition) -> SchedulerResult<Schedule> {
    let expression = pipeline.cron_expression();
    Schedule::from_str(&expression).map_err(|e| SchedulerError::InvalidSchedule {
        schedule: pipeline.schedule.clone(),
        message: e.to_string(),
    })
}

/// First fire time strictly after `now`.
pub fn next_fire_time<Z: TimeZone>(schedule: &Schedule, now: &DateTime<Z>) -> Option<DateTime<Z>> {
    schedule.after(now).next()
}

/// Whether `pipeline` fires in the tick evaluated at `now`.
///
/// Due when the next fire time lies strictly within `window` of `now`. A
/// schedule that cannot be parsed is logged and never due.
pub fn is_due<Z: TimeZone>(
    pipeline: &PipelineDefinition,
    now: &DateTime<Z>,
    window: Duration,
) -> bool {
    let schedule = match parse_schedule(pipeline) {
        Ok(schedule) => schedule,
        Err(e) => {
            warn!("Invalid cron expression for pipeline '{}': {}", pipeline.name, e);
            return false;
        }
    };

    match next_fire_time(&schedule, now) {
        Some(next) => {
            let due = next.clone() - window < *now && next.clone() + window > *now;
            debug!(
                "Pipeline '{}' next fires at {} (due: {})",
                pipeline.name,
                next.naive_local(),
                due
            );
            due
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ferry_config::Operation;

    fn pipeline(schedule: &str) -> PipelineDefinition {
        PipelineDefinition::new("orders", schedule, "/in/", "/out/", Operation::Copy)
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, h, m, s).unwrap()
    }

    fn window() -> Duration {
        Duration::seconds(60)
    }

    #[test]
    fn test_next_fire_time_is_strictly_after() {
        let schedule = parse_schedule(&pipeline("0 10 * * *")).unwrap();
        assert_eq!(next_fire_time(&schedule, &at(9, 59, 30)), Some(at(10, 0, 0)));
        assert_eq!(
            next_fire_time(&schedule, &at(10, 0, 0)),
            Some(at(10, 0, 0) + Duration::days(1))
        );
    }

    #[test]
    fn test_due_shortly_before_fire_time() {
        assert!(is_due(&pipeline("0 10 * * *"), &at(9, 59, 30), window()));
        assert!(is_due(&pipeline("0 10 * * *"), &at(9, 59, 1), window()));
    }

    #[test]
    fn test_not_due_outside_window() {
        assert!(!is_due(&pipeline("0 10 * * *"), &at(9, 59, 0), window()));
        assert!(!is_due(&pipeline("0 10 * * *"), &at(9, 30, 0), window()));
        // At the fire instant the next occurrence is tomorrow.
        assert!(!is_due(&pipeline("0 10 * * *"), &at(10, 0, 0), window()));
    }

    #[test]
    fn test_every_minute_due_off_the_boundary() {
        for s in [1, 30, 59] {
            assert!(is_due(&pipeline("* * * * *"), &at(12, 0, s), window()));
        }
    }

    #[test]
    fn test_six_field_schedule() {
        assert!(is_due(&pipeline("30 0 10 * * *"), &at(10, 0, 0), window()));
    }

    #[test]
    fn test_malformed_cron_is_not_due() {
        assert!(!is_due(&pipeline("not a cron"), &at(10, 0, 0), window()));
        assert!(!is_due(&pipeline("61 * * * *"), &at(10, 0, 0), window()));
        assert!(matches!(
            parse_schedule(&pipeline("not a cron")),
            Err(SchedulerError::InvalidSchedule { .. })
        ));
    }

    #[test]
    fn test_no_future_occurrence_is_not_due() {
        // 7-field expression pinned to a past year.
        assert!(!is_due(&pipeline("0 0 10 * * * 2020"), &at(9, 59, 30), window()));
    }
}
