// 📅 Random calendar values for replacement dates
//
// All helpers draw uniformly from a closed interval and format as ISO
// calendar dates, which is what the target columns accept verbatim.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use rand::Rng;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `date` shifted back by whole years (Feb 29 clamps to Feb 28).
pub fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(years * 12))
        .unwrap_or(NaiveDate::MIN)
}

/// Uniform date in `[from, to]`. Bounds are swapped if given in reverse.
pub fn date_between<R: Rng>(rng: &mut R, from: NaiveDate, to: NaiveDate) -> NaiveDate {
    let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
    let span = (hi - lo).num_days();
    lo + chrono::Duration::days(rng.gen_range(0..=span))
}

/// Uniform timestamp (second precision) in `[from, to]`.
pub fn datetime_between<R: Rng>(
    rng: &mut R,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> NaiveDateTime {
    let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
    let span = (hi - lo).num_seconds();
    lo + chrono::Duration::seconds(rng.gen_range(0..=span))
}

/// First day of the year `date` falls in.
pub fn start_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

/// Last day of the year `date` falls in.
pub fn end_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_datetime(datetime: NaiveDateTime) -> String {
    datetime.format(DATETIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_years_before() {
        assert_eq!(years_before(ymd(2024, 6, 1), 10), ymd(2014, 6, 1));
        assert_eq!(years_before(ymd(2024, 2, 29), 1), ymd(2023, 2, 28));
    }

    #[test]
    fn test_date_between_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let from = ymd(2014, 6, 1);
        let to = ymd(2024, 6, 1);

        for _ in 0..1000 {
            let d = date_between(&mut rng, from, to);
            assert!(d >= from && d <= to, "{} outside range", d);
        }

        // Degenerate and reversed ranges
        assert_eq!(date_between(&mut rng, to, to), to);
        let d = date_between(&mut rng, to, from);
        assert!(d >= from && d <= to);
    }

    #[test]
    fn test_datetime_between_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let from = ymd(2014, 6, 1).and_hms_opt(0, 0, 0).unwrap();
        let to = ymd(2024, 6, 1).and_hms_opt(12, 30, 0).unwrap();

        for _ in 0..1000 {
            let dt = datetime_between(&mut rng, from, to);
            assert!(dt >= from && dt <= to);
        }
    }

    #[test]
    fn test_year_bounds_and_formatting() {
        let d = ymd(2024, 6, 1);
        assert_eq!(format_date(start_of_year(d)), "2024-01-01");
        assert_eq!(format_date(end_of_year(d)), "2024-12-31");
        assert_eq!(
            format_datetime(d.and_hms_opt(9, 5, 3).unwrap()),
            "2024-06-01 09:05:03"
        );
    }
}
