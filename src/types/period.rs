use chrono::{Datelike, Local, NaiveDate};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A calendar month of a specific year.
///
/// Ordering follows time: `Period::new(2024, 12) < Period::new(2025, 1)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Creates a period, returning `None` when `month` is not in `1..=12`.
    pub fn try_new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Creates a period.
    ///
    /// # Panics
    ///
    /// Panics if `month` is not in `1..=12`.
    pub fn new(year: i32, month: u32) -> Self {
        Self::try_new(year, month).unwrap_or_else(|| panic!("invalid month {month}"))
    }

    /// The period containing today's local date.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// One month back; January wraps to December of the previous year.
    ///
    /// # Examples
    ///
    /// ```
    /// use conagua::Period;
    ///
    /// assert_eq!(Period::new(2025, 1).previous(), Period::new(2024, 12));
    /// assert_eq!(Period::new(2025, 7).previous(), Period::new(2025, 6));
    /// ```
    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// First day of the month.
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
