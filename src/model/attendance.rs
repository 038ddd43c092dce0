use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: Option<String>,
}

pub const ATTENDANCE_NORMAL: &str = "NORMAL";
pub const ATTENDANCE_LATE: &str = "LATE";

/// Work day starts at 09:00; a later check-in counts as LATE.
pub fn derive_status(check_in: NaiveTime) -> &'static str {
    let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    if check_in > start {
        ATTENDANCE_LATE
    } else {
        ATTENDANCE_NORMAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_sharp_is_on_time() {
        assert_eq!(
            derive_status(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            ATTENDANCE_NORMAL
        );
    }

    #[test]
    fn after_nine_is_late() {
        assert_eq!(
            derive_status(NaiveTime::from_hms_opt(9, 0, 1).unwrap()),
            ATTENDANCE_LATE
        );
    }
}
