//! Next-alarm selection
//!
//! Pure functions over local wall-clock time. `next_occurrence` is shared by
//! the home-screen countdown and the notification scheduler so both always
//! agree on when an alarm rings.

use crate::database::{Alarm, AlarmTime, RepeatDays};
use chrono::{Days, NaiveDateTime};

/// The alarm that rings soonest, with its resolved occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct NextAlarm<'a> {
    pub alarm: &'a Alarm,
    pub occurrence: NaiveDateTime,
    pub minutes_until: i64,
}

impl NextAlarm<'_> {
    pub fn countdown(&self) -> String {
        format_countdown(self.minutes_until)
    }
}

/// Next time `time` applies strictly after `now`.
///
/// An alarm set for exactly `now` counts as already passed and resolves to
/// the same time tomorrow. Repeat days are not consulted.
pub fn next_occurrence(time: AlarmTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time.as_naive_time());

    if today <= now {
        today
            .checked_add_days(Days::new(1))
            .unwrap_or(today)
    } else {
        today
    }
}

/// Whole minutes from `now` until `occurrence`, truncated
pub fn minutes_until(occurrence: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (occurrence - now).num_minutes()
}

/// Pick the enabled alarm that rings soonest.
///
/// Ties keep the alarm that appears first in `alarms`.
pub fn select_next_alarm(alarms: &[Alarm], now: NaiveDateTime) -> Option<NextAlarm<'_>> {
    let mut closest: Option<NextAlarm<'_>> = None;

    for alarm in alarms.iter().filter(|a| a.enabled) {
        let occurrence = next_occurrence(alarm.time, now);
        let minutes = minutes_until(occurrence, now);

        let closer = closest
            .as_ref()
            .map_or(true, |current| minutes < current.minutes_until);

        if closer {
            closest = Some(NextAlarm {
                alarm,
                occurrence,
                minutes_until: minutes,
            });
        }
    }

    closest
}

/// Render a countdown such as `in 7h 5m`
pub fn format_countdown(minutes: i64) -> String {
    let hours = minutes.div_euclid(60);
    let mins = minutes.rem_euclid(60);
    format!("in {}h {}m", hours, mins)
}

/// Summary for alarm lists: `Once`, `Every day` or `Mon, Wed`
pub fn format_repeat_days(days: &RepeatDays) -> String {
    days.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{CreateAlarmRequest, RepeatDays};
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn alarm(time: &str, enabled: bool) -> Alarm {
        let mut alarm = Alarm::from_request(CreateAlarmRequest::new(time.parse().unwrap()));
        alarm.enabled = enabled;
        alarm
    }

    #[test]
    fn test_no_enabled_alarms() {
        assert!(select_next_alarm(&[], at(6, 0, 0)).is_none());

        let alarms = vec![alarm("07:00", false), alarm("08:00", false)];
        assert!(select_next_alarm(&alarms, at(6, 0, 0)).is_none());
    }

    #[test]
    fn test_alarm_later_today() {
        let alarms = vec![alarm("07:00", true)];

        let next = select_next_alarm(&alarms, at(6, 0, 0)).unwrap();

        assert_eq!(next.alarm.id, alarms[0].id);
        assert_eq!(next.minutes_until, 60);
        assert_eq!(next.occurrence, at(7, 0, 0));
    }

    #[test]
    fn test_alarm_at_exactly_now_is_tomorrow() {
        let alarms = vec![alarm("07:00", true)];

        let next = select_next_alarm(&alarms, at(7, 0, 0)).unwrap();

        assert_eq!(next.minutes_until, 1440);
        assert_eq!(next.occurrence.date(), at(0, 0, 0).date().succ_opt().unwrap());
    }

    #[test]
    fn test_earliest_alarm_wins() {
        let alarms = vec![alarm("06:45", true), alarm("06:30", true)];

        let next = select_next_alarm(&alarms, at(6, 0, 0)).unwrap();

        assert_eq!(next.alarm.time.to_string(), "06:30");
        assert_eq!(next.minutes_until, 30);
    }

    #[test]
    fn test_disabled_alarm_ignored_even_if_sooner() {
        let alarms = vec![alarm("06:10", false), alarm("09:00", true)];

        let next = select_next_alarm(&alarms, at(6, 0, 0)).unwrap();

        assert_eq!(next.alarm.time.to_string(), "09:00");
    }

    #[test]
    fn test_ties_resolve_to_first_alarm() {
        let alarms = vec![alarm("07:00", true), alarm("07:00", true)];

        let next = select_next_alarm(&alarms, at(6, 0, 0)).unwrap();

        assert_eq!(next.alarm.id, alarms[0].id);
    }

    #[test]
    fn test_minutes_truncate() {
        let alarms = vec![alarm("07:00", true)];

        let next = select_next_alarm(&alarms, at(6, 58, 30)).unwrap();
        assert_eq!(next.minutes_until, 1);

        let next = select_next_alarm(&alarms, at(6, 59, 59)).unwrap();
        assert_eq!(next.minutes_until, 0);
    }

    #[test]
    fn test_passed_alarm_wraps_to_tomorrow() {
        let alarms = vec![alarm("05:00", true), alarm("23:30", true)];

        let next = select_next_alarm(&alarms, at(23, 45, 0)).unwrap();

        assert_eq!(next.alarm.time.to_string(), "05:00");
        assert_eq!(next.minutes_until, 315);
    }

    #[test]
    fn test_repeat_days_do_not_gate_selection() {
        // 2026-10-17 is a Saturday; the alarm only repeats on Mondays
        let mut monday_only = alarm("07:00", true);
        monday_only.repeat_days = RepeatDays::new([1]).unwrap();

        let alarms = vec![monday_only];
        let next = select_next_alarm(&alarms, at(6, 0, 0)).unwrap();

        assert_eq!(next.minutes_until, 60);
    }

    #[test]
    fn test_minutes_never_negative() {
        let alarms: Vec<Alarm> = (0..24)
            .flat_map(|h| [0, 59].map(move |m| alarm(&format!("{:02}:{:02}", h, m), true)))
            .collect();

        for hour in 0..24 {
            for (minute, second) in [(0, 0), (30, 15), (59, 59)] {
                let now = at(hour, minute, second);
                for a in &alarms {
                    let next = select_next_alarm(std::slice::from_ref(a), now).unwrap();
                    assert!(next.minutes_until >= 0);
                    assert!(next.occurrence > now);
                }
            }
        }
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(60), "in 1h 0m");
        assert_eq!(format_countdown(1440), "in 24h 0m");
        assert_eq!(format_countdown(425), "in 7h 5m");
        assert_eq!(format_countdown(0), "in 0h 0m");
    }

    #[test]
    fn test_format_repeat_days() {
        assert_eq!(format_repeat_days(&RepeatDays::default()), "Once");
        assert_eq!(format_repeat_days(&RepeatDays::every_day()), "Every day");
        assert_eq!(
            format_repeat_days(&RepeatDays::new([3, 1]).unwrap()),
            "Mon, Wed"
        );
    }
}
