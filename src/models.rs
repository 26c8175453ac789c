use std::fmt;

use clap::ValueEnum;

/// Attendance status for a single student.
///
/// The wire format stores one-letter codes; anything unrecognized reads as
/// `Unknown`, which is a valid steady state rather than a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Status {
    Unknown,
    InPerson,
    Online,
}

impl Status {
    pub fn from_code(code: &str) -> Status {
        match code {
            "I" => Status::InPerson,
            "O" => Status::Online,
            _ => Status::Unknown,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Status::Unknown => "U",
            Status::InPerson => "I",
            Status::Online => "O",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Unknown => "Unknown",
            Status::InPerson => "In-Person",
            Status::Online => "Online",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Class period, a digit 1 through 7. Period 3 is a conference period and
/// never appears in real data, but it is a legal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period(u8);

impl Period {
    /// The period shown when no class has been picked yet.
    pub const FIRST: Period = Period(1);

    pub fn new(digit: u8) -> Option<Period> {
        (1..=7).contains(&digit).then_some(Period(digit))
    }

    pub fn digit(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One student's record. Identity is (last name, first name, period); the
/// source format has no student ID field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentEntry {
    pub last_name: String,
    pub first_name: String,
    pub period: Period,
    pub status: Status,
}

/// The active view filter. Exactly one criterion is in effect at a time.
///
/// `All` still carries a period: clearing the status filter scopes the view
/// back to the currently selected class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCriterion {
    ByPeriod(Period),
    ByStatus(Status),
    All(Period),
}
