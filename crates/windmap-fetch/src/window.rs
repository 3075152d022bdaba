//! View navigation and the time window a view covers

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use windmap_core::{bucket_key, BucketKey, IntervalHours};

/// Furthest a view can be paged into the past
pub const MAX_OFFSET_DAYS: i64 = 36_500;

/// Days between the newest shown day and today; never positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ViewOffset(i64);

impl ViewOffset {
    pub const CURRENT: ViewOffset = ViewOffset(0);

    /// Future offsets clamp to the current view, older ones to [`MAX_OFFSET_DAYS`]
    pub fn new(days: i64) -> Self {
        ViewOffset(days.clamp(-MAX_OFFSET_DAYS, 0))
    }

    pub fn days(self) -> i64 {
        self.0
    }

    pub fn is_current(self) -> bool {
        self.0 == 0
    }

    /// One page further into the past
    pub fn back(self, span: u32) -> Self {
        ViewOffset::new(self.0.saturating_sub(i64::from(span)))
    }

    /// One page towards today, stopping at today
    pub fn forward(self, span: u32) -> Self {
        ViewOffset::new(self.0.saturating_add(i64::from(span)))
    }

    pub fn current(self) -> Self {
        ViewOffset::CURRENT
    }
}

/// Query window of one view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    /// Local midnight of the first shown day
    pub start: DateTime<Utc>,
    /// "now" for the current view, else the last millisecond of the last day
    pub end: DateTime<Utc>,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    /// Bucket still being filled; only set for the current view
    pub partial: Option<BucketKey>,
    /// End used to identify cached responses. For the current view this is
    /// the start of the partial bucket, so it holds still until the bucket
    /// rolls over.
    pub cache_end: DateTime<Utc>,
}

impl FetchWindow {
    /// Window of `days` local days ending `offset` days before `now`
    pub fn compute<Tz: TimeZone>(
        now: DateTime<Utc>,
        tz: &Tz,
        offset: ViewOffset,
        days: u32,
        interval: IntervalHours,
    ) -> Self {
        let today = now.with_timezone(tz).date_naive();
        let last_day = shift_days(today, offset.days());
        let first_day = last_day
            .checked_sub_days(Days::new(u64::from(days.max(1) - 1)))
            .unwrap_or(last_day);

        let (end, partial) = if offset.is_current() {
            (now, Some(bucket_key(&now, tz, interval)))
        } else {
            let next_midnight = last_day
                .succ_opt()
                .map(|next| local_midnight(next, tz))
                .unwrap_or(now);
            (next_midnight - Duration::milliseconds(1), None)
        };

        let cache_end = partial
            .map(|bucket| local_hour_start(bucket.date, bucket.hour, tz))
            .unwrap_or(end);

        FetchWindow {
            start: local_midnight(first_day, tz),
            end,
            first_day,
            last_day,
            partial,
            cache_end,
        }
    }
}

fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days < 0 {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// First instant of a local calendar day.
///
/// Where a DST jump skips midnight the day starts at the first wall-clock
/// hour that exists.
pub fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    local_hour_start(date, 0, tz)
}

/// First instant of a local wall-clock hour, or of the next hour that exists
pub fn local_hour_start<Tz: TimeZone>(date: NaiveDate, hour: u32, tz: &Tz) -> DateTime<Utc> {
    (hour..24)
        .filter_map(|h| date.and_hms_opt(h, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| {
            let naive = date
                .and_hms_opt(hour.min(23), 0, 0)
                .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
            Utc.from_utc_datetime(&naive)
        })
}
