use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Utc,
};

/// Day-granularity view of timestamps in a fixed UTC offset.
///
/// Every completion comparison goes through [`Calendar::day_of`], so two
/// timestamps recorded at different times of the same local day count as the
/// same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Captures the host's current offset. Later DST transitions are not tracked.
    pub fn local() -> Self {
        Self {
            offset: Local::now().offset().fix(),
        }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Returns `None` when the offset is a day or more away from UTC.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::with_offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn day_of(&self, timestamp: &DateTime<Utc>) -> NaiveDate {
        timestamp.with_timezone(&self.offset).date_naive()
    }

    /// The instant at which `day` begins in this calendar.
    pub fn start_of(&self, day: NaiveDate) -> DateTime<Utc> {
        let local_midnight = day.and_time(NaiveTime::MIN);
        let shift = i64::from(self.offset.local_minus_utc());
        let utc_midnight = local_midnight
            .checked_sub_signed(Duration::seconds(shift))
            .unwrap_or(if shift > 0 {
                NaiveDateTime::MIN
            } else {
                NaiveDateTime::MAX
            });
        Utc.from_utc_datetime(&utc_midnight)
    }

    pub fn start_of_day(&self, timestamp: &DateTime<Utc>) -> DateTime<Utc> {
        self.start_of(self.day_of(timestamp))
    }

    pub fn start_of_month(&self, timestamp: &DateTime<Utc>) -> DateTime<Utc> {
        let (first, _) = month_bounds(self.day_of(timestamp));
        self.start_of(first)
    }

    pub fn today(&self, now: &DateTime<Utc>) -> NaiveDate {
        self.day_of(now)
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

/// Source of "now" for the service layer.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// First and last day of the month containing `day`.
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let last = day
        .with_day(days_in_month(day.year(), day.month()))
        .unwrap_or(day);
    (first, last)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// `day` minus `days`, saturating at the earliest representable date.
pub fn days_before(day: NaiveDate, days: u64) -> NaiveDate {
    day.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Number of days in the inclusive range, zero when `start > end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        return 0;
    }
    end.signed_duration_since(start).num_days() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_local_day_normalizes_identically() {
        let cal = Calendar::from_offset_minutes(9 * 60).unwrap();
        let morning = Utc.with_ymd_and_hms(2025, 3, 9, 23, 30, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
        assert_eq!(cal.day_of(&morning), date(2025, 3, 10));
        assert_eq!(cal.start_of_day(&morning), cal.start_of_day(&evening));
        assert_eq!(
            cal.start_of_day(&morning),
            Utc.with_ymd_and_hms(2025, 3, 9, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn start_of_round_trips_through_day_of() {
        let cal = Calendar::from_offset_minutes(-5 * 60).unwrap();
        let day = date(2024, 12, 31);
        assert_eq!(cal.day_of(&cal.start_of(day)), day);
    }

    #[test]
    fn start_of_month_lands_on_first_day() {
        let cal = Calendar::utc();
        let ts = Utc.with_ymd_and_hms(2024, 2, 17, 8, 0, 0).unwrap();
        assert_eq!(
            cal.start_of_month(&ts),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn month_bounds_follow_actual_month_length() {
        assert_eq!(
            month_bounds(date(2024, 2, 10)),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            month_bounds(date(2023, 2, 10)),
            (date(2023, 2, 1), date(2023, 2, 28))
        );
        assert_eq!(
            month_bounds(date(2025, 4, 30)),
            (date(2025, 4, 1), date(2025, 4, 30))
        );
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
    }

    #[test]
    fn inclusive_day_count() {
        assert_eq!(days_inclusive(date(2025, 1, 1), date(2025, 1, 1)), 1);
        assert_eq!(days_inclusive(date(2025, 1, 1), date(2025, 1, 7)), 7);
        assert_eq!(days_inclusive(date(2025, 1, 2), date(2025, 1, 1)), 0);
    }

    #[test]
    fn rejects_out_of_range_offsets() {
        assert!(Calendar::from_offset_minutes(24 * 60).is_none());
        assert!(Calendar::from_offset_minutes(-90).is_some());
    }

    #[test]
    fn extreme_dates_saturate() {
        let east = Calendar::from_offset_minutes(60).unwrap();
        let west = Calendar::from_offset_minutes(-60).unwrap();
        assert_eq!(east.start_of(NaiveDate::MIN).naive_utc(), NaiveDateTime::MIN);
        assert_eq!(west.start_of(NaiveDate::MAX).naive_utc(), NaiveDateTime::MAX);
        assert_eq!(days_before(NaiveDate::MIN, 6), NaiveDate::MIN);
        assert_eq!(days_before(date(2025, 3, 1), 1), date(2025, 2, 28));
    }
}
