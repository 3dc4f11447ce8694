// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::ops::{Add, AddAssign};

/// The administrative columns, from the coarsest to the finest.
///
/// Each finer label functionally determines all its ancestors.
pub const ADMIN_REGION_COLS: [&str; 5] =
    ["district", "constituency", "subcounty", "parish", "station"];

/// The aggregate counts carried by every row, at every level.
pub const COUNT_COLS: [&str; 4] = ["registered", "valid", "invalid", "total"];

/// The aggregate columns used to describe a group in long form.
pub const AGGREGATE_COLS: [&str; 5] = ["registered", "valid", "invalid", "total", "turnout"];

/// The aggregate counts of a polling station or of a group of stations.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Hash)]
pub struct Counts {
    pub registered: u64,
    pub valid: u64,
    pub invalid: u64,
    pub total: u64,
}

impl Counts {
    pub const EMPTY: Counts = Counts {
        registered: 0,
        valid: 0,
        invalid: 0,
        total: 0,
    };

    /// Percentage of the registered voters who cast a vote.
    ///
    /// Not finite when nobody is registered.
    pub fn turnout(&self) -> f64 {
        crate::turnout(self.total, self.registered)
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Counts) {
        self.registered += rhs.registered;
        self.valid += rhs.valid;
        self.invalid += rhs.invalid;
        self.total += rhs.total;
    }
}

impl Add for Counts {
    type Output = Counts;
    fn add(self, rhs: Counts) -> Counts {
        let mut res = self;
        res += rhs;
        res
    }
}

impl std::iter::Sum for Counts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Counts::EMPTY, |acc, c| acc + c)
    }
}

/// The results of a single polling station, as reported.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StationResult {
    /// The labels, in the order of `ADMIN_REGION_COLS`.
    pub labels: [String; 5],
    /// The votes for each candidate, in the order of the candidates of the fact table.
    pub votes: Vec<u64>,
    pub counts: Counts,
}

/// The base fact table: one row per polling station.
///
/// It can only be assembled through the [`crate::Builder`], which guarantees
/// that every station carries exactly one vote count per candidate.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FactTable {
    pub(crate) candidates: Vec<String>,
    pub(crate) stations: Vec<StationResult>,
}

impl FactTable {
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn stations(&self) -> &[StationResult] {
        &self.stations
    }
}

// ******** Administrative levels *********

/// The levels at which the results are aggregated.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum AdminLevel {
    Station,
    Parish,
    Subcounty,
    Constituency,
    District,
    National,
}

impl AdminLevel {
    /// All the levels, from the finest to the coarsest.
    pub const ALL: [AdminLevel; 6] = [
        AdminLevel::Station,
        AdminLevel::Parish,
        AdminLevel::Subcounty,
        AdminLevel::Constituency,
        AdminLevel::District,
        AdminLevel::National,
    ];

    /// Number of administrative columns in the grouping key.
    pub fn depth(&self) -> usize {
        match self {
            AdminLevel::Station => 5,
            AdminLevel::Parish => 4,
            AdminLevel::Subcounty => 3,
            AdminLevel::Constituency => 2,
            AdminLevel::District => 1,
            AdminLevel::National => 0,
        }
    }

    /// The grouping key of this level. Empty for the national level.
    pub fn key_columns(&self) -> &'static [&'static str] {
        &ADMIN_REGION_COLS[..self.depth()]
    }

    /// The plural name used to label the tables of this level.
    pub fn name(&self) -> &'static str {
        match self {
            AdminLevel::Station => "stations",
            AdminLevel::Parish => "parishes",
            AdminLevel::Subcounty => "subcounties",
            AdminLevel::Constituency => "constituencies",
            AdminLevel::District => "districts",
            AdminLevel::National => "national",
        }
    }

    /// Accepts both the singular column name and the plural table name.
    pub fn from_name(name: &str) -> Option<AdminLevel> {
        let lname = name.trim().to_lowercase();
        AdminLevel::ALL.iter().cloned().find(|level| {
            level.name() == lname
                || (level.depth() > 0 && ADMIN_REGION_COLS[level.depth() - 1] == lname)
        })
    }

    pub(crate) fn position(&self) -> usize {
        AdminLevel::ALL.len() - 1 - self.depth()
    }
}

impl Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ******** Output data structures *********

/// One group of a level in wide form: one vote column per candidate.
#[derive(PartialEq, Debug, Clone)]
pub struct WideRow {
    /// Position of the group in its table. It identifies the group in long form.
    pub group: usize,
    /// The values of the key columns of the level.
    pub labels: Vec<String>,
    /// The votes for each candidate, in candidate order.
    pub votes: Vec<u64>,
    pub counts: Counts,
    pub turnout: f64,
    /// The candidates with the most votes, in candidate order. More than one on ties.
    pub winners: Vec<String>,
}

impl WideRow {
    /// The winners, as a comma separated string.
    pub fn winner(&self) -> String {
        self.winners.join(", ")
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct WideTable {
    pub level: AdminLevel,
    pub candidates: Vec<String>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = self
            .level
            .key_columns()
            .iter()
            .map(|s| s.to_string())
            .collect();
        cols.extend(self.candidates.iter().cloned());
        cols.extend(AGGREGATE_COLS.iter().map(|s| s.to_string()));
        cols.push("winner".to_string());
        cols
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The votes of a candidate in a row, if the candidate exists.
    pub fn votes_for(&self, row: &WideRow, candidate: &str) -> Option<u64> {
        self.candidates
            .iter()
            .position(|c| c == candidate)
            .and_then(|idx| row.votes.get(idx).cloned())
    }
}

/// One (group, candidate) pair of a level in long form.
#[derive(PartialEq, Debug, Clone)]
pub struct LongRow {
    pub group: usize,
    pub labels: Vec<String>,
    pub counts: Counts,
    pub turnout: f64,
    pub candidate: String,
    pub votes: u64,
    /// The candidate has the most votes of the group (possibly tied).
    pub won: bool,
    /// Competition rank by descending votes within the group.
    pub rank: u32,
}

#[derive(PartialEq, Debug, Clone)]
pub struct LongTable {
    pub level: AdminLevel,
    pub rows: Vec<LongRow>,
}

impl LongTable {
    pub fn columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = self
            .level
            .key_columns()
            .iter()
            .map(|s| s.to_string())
            .collect();
        cols.extend(AGGREGATE_COLS.iter().map(|s| s.to_string()));
        for c in ["candidate", "votes", "won", "rank"] {
            cols.push(c.to_string());
        }
        cols
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All the rows of one group, in candidate order.
    pub fn group(&self, group: usize) -> Vec<&LongRow> {
        self.rows.iter().filter(|r| r.group == group).collect()
    }
}

/// Headline numbers for the whole country.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct NationalStatistics {
    pub registered_voters: u64,
    pub valid_voters: u64,
    pub total_votes: u64,
    pub turnout: f64,
}

/// The twelve tables computed from a fact table, one wide and one long per level.
#[derive(PartialEq, Debug, Clone)]
pub struct AggregateResults {
    pub(crate) candidates: Vec<String>,
    // Indexed by the position of the level in AdminLevel::ALL
    pub(crate) wide: Vec<WideTable>,
    pub(crate) long: Vec<LongTable>,
}

impl AggregateResults {
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn wide(&self, level: AdminLevel) -> &WideTable {
        &self.wide[level.position()]
    }

    pub fn long(&self, level: AdminLevel) -> &LongTable {
        &self.long[level.position()]
    }

    /// Reads the headline numbers from the national table.
    pub fn national_statistics(&self) -> Result<NationalStatistics, AggregationErrors> {
        let row = self
            .wide(AdminLevel::National)
            .rows
            .first()
            .ok_or(AggregationErrors::EmptyNational)?;
        Ok(NationalStatistics {
            registered_voters: row.counts.registered,
            valid_voters: row.counts.valid,
            total_votes: row.counts.total,
            turnout: row.turnout,
        })
    }
}

/// Errors that prevent the fact table from being assembled, or the
/// statistics from being read.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AggregationErrors {
    NoCandidates,
    DuplicateCandidate(String),
    VoteCountMismatch {
        station: String,
        expected: usize,
        found: usize,
    },
    EmptyNational,
}

impl Error for AggregationErrors {}

impl Display for AggregationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationErrors::NoCandidates => write!(f, "no candidate columns were provided"),
            AggregationErrors::DuplicateCandidate(name) => {
                write!(f, "candidate {:?} is listed more than once", name)
            }
            AggregationErrors::VoteCountMismatch {
                station,
                expected,
                found,
            } => write!(
                f,
                "station {:?}: expected {} candidate vote counts, found {}",
                station, expected, found
            ),
            AggregationErrors::EmptyNational => write!(f, "the national table has no row"),
        }
    }
}
