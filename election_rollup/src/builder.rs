pub use crate::config::*;

use std::collections::HashSet;

/// A builder for assembling the fact table, one polling station at a time.
///
/// The list of candidates is fixed when the builder is created. Every station
/// added afterwards must report exactly one vote count per candidate.
///
/// ```
/// pub use election_rollup::builder::Builder;
/// pub use election_rollup::Counts;
/// # use election_rollup::AggregationErrors;
///
/// let mut builder = Builder::new(&["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_station(
///     ["Kampala", "Central", "Nakasero", "Parish 1", "School A"].map(String::from),
///     &[30, 20],
///     Counts { registered: 100, valid: 50, invalid: 0, total: 50 },
/// )?;
///
/// let fact_table = builder.build();
/// assert_eq!(fact_table.stations().len(), 1);
/// # Ok::<(), AggregationErrors>(())
/// ```
pub struct Builder {
    pub(crate) _candidates: Vec<String>,
    pub(crate) _stations: Vec<StationResult>,
}

impl Builder {
    /// Fails if no candidate is given or if a candidate appears twice.
    pub fn new(candidates: &[String]) -> Result<Builder, AggregationErrors> {
        if candidates.is_empty() {
            return Err(AggregationErrors::NoCandidates);
        }
        let mut seen: HashSet<&String> = HashSet::new();
        for c in candidates {
            if !seen.insert(c) {
                return Err(AggregationErrors::DuplicateCandidate(c.clone()));
            }
        }
        Ok(Builder {
            _candidates: candidates.to_vec(),
            _stations: Vec::new(),
        })
    }

    /// Adds the results of a polling station.
    ///
    /// labels: district, constituency, subcounty, parish and station, in this order.
    /// votes: the votes for each candidate, in the order given to the builder.
    pub fn add_station(
        &mut self,
        labels: [String; 5],
        votes: &[u64],
        counts: Counts,
    ) -> Result<(), AggregationErrors> {
        self.add_station_2(StationResult {
            labels,
            votes: votes.to_vec(),
            counts,
        })
    }

    pub fn add_station_2(&mut self, station: StationResult) -> Result<(), AggregationErrors> {
        if station.votes.len() != self._candidates.len() {
            return Err(AggregationErrors::VoteCountMismatch {
                station: station.labels.join("/"),
                expected: self._candidates.len(),
                found: station.votes.len(),
            });
        }
        self._stations.push(station);
        Ok(())
    }

    pub fn candidates(&self) -> &[String] {
        &self._candidates
    }

    pub fn build(self) -> FactTable {
        FactTable {
            candidates: self._candidates,
            stations: self._stations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(l: &[&str]) -> Vec<String> {
        l.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_empty_candidates() {
        assert_eq!(Builder::new(&[]).err(), Some(AggregationErrors::NoCandidates));
    }

    #[test]
    fn rejects_duplicate_candidates() {
        let res = Builder::new(&names(&["Anna", "Bob", "Anna"]));
        assert_eq!(
            res.err(),
            Some(AggregationErrors::DuplicateCandidate("Anna".to_string()))
        );
    }

    #[test]
    fn rejects_short_vote_vector() {
        let mut builder = Builder::new(&names(&["Anna", "Bob"])).unwrap();
        let res = builder.add_station(
            ["D", "C", "S", "P", "X"].map(String::from),
            &[12],
            Counts::EMPTY,
        );
        assert_eq!(
            res,
            Err(AggregationErrors::VoteCountMismatch {
                station: "D/C/S/P/X".to_string(),
                expected: 2,
                found: 1
            })
        );
        assert!(builder.build().stations().is_empty());
    }

    #[test]
    fn keeps_stations_in_insertion_order() {
        let mut builder = Builder::new(&names(&["Anna", "Bob"])).unwrap();
        for st in ["B", "A"] {
            builder
                .add_station(
                    ["D", "C", "S", "P", st].map(String::from),
                    &[1, 2],
                    Counts {
                        registered: 10,
                        valid: 3,
                        invalid: 0,
                        total: 3,
                    },
                )
                .unwrap();
        }
        let ft = builder.build();
        assert_eq!(ft.candidates(), names(&["Anna", "Bob"]).as_slice());
        assert_eq!(ft.stations()[0].labels[4], "B");
        assert_eq!(ft.stations()[1].labels[4], "A");
    }
}
