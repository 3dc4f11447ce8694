mod config;
use log::{debug, info, warn};

use std::collections::HashMap;

pub mod builder;
pub mod manual;

pub use crate::builder::Builder;
pub use crate::config::*;

// **** Private structures ****

// Running sums of one group, while the stations are scanned.
#[derive(Eq, PartialEq, Debug, Clone)]
struct GroupAccumulator<'a> {
    key: &'a [String],
    votes: Vec<u64>,
    counts: Counts,
}

impl<'a> GroupAccumulator<'a> {
    fn new(key: &'a [String], num_candidates: usize) -> GroupAccumulator<'a> {
        GroupAccumulator {
            key,
            votes: vec![0; num_candidates],
            counts: Counts::EMPTY,
        }
    }

    fn add(&mut self, station: &StationResult) {
        for (acc, v) in self.votes.iter_mut().zip(station.votes.iter()) {
            *acc += *v;
        }
        self.counts += station.counts;
    }
}

/// Computes all the aggregates of a fact table.
///
/// Stations that did not report any vote (`total == 0`) are dropped first.
/// The remaining stations are sorted by district, constituency, subcounty,
/// parish and station. Every level is then summed from these stations, keeping
/// the groups in the order in which they first appear.
///
/// The result holds one wide and one long table per level. It is a pure
/// function of the fact table: running it twice yields identical tables.
pub fn build(fact_table: &FactTable) -> AggregateResults {
    info!(
        "build: processing {:?} stations, candidates: {:?}",
        fact_table.stations.len(),
        fact_table.candidates
    );

    let stations = prepare_stations(&fact_table.stations);
    info!(
        "build: {} stations with votes, {} dropped",
        stations.len(),
        fact_table.stations.len() - stations.len()
    );

    let mut wide: Vec<WideTable> = Vec::new();
    let mut long: Vec<LongTable> = Vec::new();
    for level in AdminLevel::ALL {
        let wide_table = aggregate_wide(&stations, level, &fact_table.candidates);
        let long_table = make_long(&wide_table);
        info!(
            "build: level {}: {} groups, {} long rows",
            level,
            wide_table.len(),
            long_table.len()
        );
        wide.push(wide_table);
        long.push(long_table);
    }

    AggregateResults {
        candidates: fact_table.candidates.clone(),
        wide,
        long,
    }
}

/// Percentage of the registered voters who cast a vote.
///
/// There is no special case for zero registered voters: the value is then
/// infinite or NaN, and it is up to the consumer to display it.
pub fn turnout(total: u64, registered: u64) -> f64 {
    (total as f64) * 100.0 / (registered as f64)
}

/// The candidates with the maximum number of votes, in candidate order.
///
/// Votes are integers, so ties are exact equalities.
pub fn winners(candidates: &[String], votes: &[u64]) -> Vec<String> {
    let max_votes = match votes.iter().max() {
        Some(m) => *m,
        None => return Vec::new(),
    };
    candidates
        .iter()
        .zip(votes.iter())
        .filter_map(|(name, v)| if *v == max_votes { Some(name.clone()) } else { None })
        .collect()
}

/// Ranks by descending votes. Tied values share the best rank and the
/// following ranks are skipped: [10, 10, 7] gives [1, 1, 3].
pub fn competition_ranks(votes: &[u64]) -> Vec<u32> {
    votes
        .iter()
        .map(|v| 1 + votes.iter().filter(|other| *other > v).count() as u32)
        .collect()
}

fn prepare_stations(stations: &[StationResult]) -> Vec<&StationResult> {
    let mut res: Vec<&StationResult> = stations
        .iter()
        .filter(|s| {
            if s.counts.total == 0 {
                debug!("prepare_stations: dropping station without votes: {:?}", s.labels);
            }
            s.counts.total > 0
        })
        .collect();
    // Stable: stations with identical labels keep their input order.
    res.sort_by(|a, b| a.labels.cmp(&b.labels));
    res
}

fn aggregate_wide(
    stations: &[&StationResult],
    level: AdminLevel,
    candidates: &[String],
) -> WideTable {
    let depth = level.depth();
    let mut index: HashMap<&[String], usize> = HashMap::new();
    let mut groups: Vec<GroupAccumulator> = Vec::new();

    // The whole country is always one row, even without any station.
    if level == AdminLevel::National {
        index.insert(&[], 0);
        groups.push(GroupAccumulator::new(&[], candidates.len()));
    }

    for &station in stations.iter() {
        let key: &[String] = &station.labels[..depth];
        // Stations are never merged, even when their labels repeat.
        let gid = if level == AdminLevel::Station {
            groups.push(GroupAccumulator::new(key, candidates.len()));
            groups.len() - 1
        } else {
            *index.entry(key).or_insert_with(|| {
                groups.push(GroupAccumulator::new(key, candidates.len()));
                groups.len() - 1
            })
        };
        groups[gid].add(station);
    }

    let rows: Vec<WideRow> = groups
        .into_iter()
        .enumerate()
        .map(|(group, acc)| {
            if acc.counts.registered == 0 {
                warn!(
                    "aggregate_wide: level {}: group {:?} has no registered voters",
                    level, acc.key
                );
            }
            WideRow {
                group,
                labels: acc.key.to_vec(),
                turnout: acc.counts.turnout(),
                winners: winners(candidates, &acc.votes),
                votes: acc.votes,
                counts: acc.counts,
            }
        })
        .collect();

    WideTable {
        level,
        candidates: candidates.to_vec(),
        rows,
    }
}

/// Converts a wide table to long form: one row per group and candidate.
///
/// The rows are listed candidate by candidate: first all the groups for the
/// first candidate, then all the groups for the second one, and so on.
/// The rank and the won flag are computed within each group, from the same
/// votes as the winners of the wide table.
pub fn make_long(wide: &WideTable) -> LongTable {
    let ranks: Vec<Vec<u32>> = wide
        .rows
        .iter()
        .map(|r| competition_ranks(&r.votes))
        .collect();
    let max_votes: Vec<u64> = wide
        .rows
        .iter()
        .map(|r| r.votes.iter().max().cloned().unwrap_or(0))
        .collect();

    let mut rows: Vec<LongRow> = Vec::with_capacity(wide.rows.len() * wide.candidates.len());
    for (cidx, candidate) in wide.candidates.iter().enumerate() {
        for (ridx, r) in wide.rows.iter().enumerate() {
            let votes = r.votes[cidx];
            rows.push(LongRow {
                group: r.group,
                labels: r.labels.clone(),
                counts: r.counts,
                turnout: r.turnout,
                candidate: candidate.clone(),
                votes,
                won: votes == max_votes[ridx],
                rank: ranks[ridx][cidx],
            });
        }
    }
    debug!(
        "make_long: level {}: {} rows from {} groups",
        wide.level,
        rows.len(),
        wide.rows.len()
    );

    LongTable {
        level: wide.level,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn names(l: &[&str]) -> Vec<String> {
        l.iter().map(|s| s.to_string()).collect()
    }

    fn full_counts(registered: u64, valid: u64, invalid: u64, total: u64) -> Counts {
        Counts {
            registered,
            valid,
            invalid,
            total,
        }
    }

    fn counts(registered: u64, total: u64) -> Counts {
        Counts {
            registered,
            valid: total,
            invalid: 0,
            total,
        }
    }

    fn station(labels: [&str; 5], votes: &[u64], c: Counts) -> StationResult {
        StationResult {
            labels: labels.map(String::from),
            votes: votes.to_vec(),
            counts: c,
        }
    }

    fn fact_table(candidates: &[&str], stations: Vec<StationResult>) -> FactTable {
        let mut builder = Builder::new(&names(candidates)).unwrap();
        for s in stations {
            builder.add_station_2(s).unwrap();
        }
        builder.build()
    }

    // Two districts, three constituencies, a few parishes.
    fn sample() -> FactTable {
        fact_table(
            &["Anna", "Bob", "Clara"],
            vec![
                station(
                    ["Wakiso", "Busiro", "Nsangi", "Kitemu", "S2"],
                    &[10, 5, 1],
                    full_counts(40, 16, 2, 18),
                ),
                station(
                    ["Gulu", "Aswa", "Bobi", "Lalogi", "S1"],
                    &[3, 9, 0],
                    full_counts(30, 12, 1, 13),
                ),
                station(
                    ["Wakiso", "Busiro", "Nsangi", "Kitemu", "S1"],
                    &[4, 4, 2],
                    full_counts(25, 10, 0, 10),
                ),
                station(
                    ["Wakiso", "Kyadondo", "Nangabo", "Gayaza", "S1"],
                    &[0, 0, 0],
                    full_counts(50, 0, 0, 0),
                ),
                station(
                    ["Wakiso", "Kyadondo", "Nangabo", "Gayaza", "S2"],
                    &[7, 2, 7],
                    full_counts(20, 16, 1, 17),
                ),
                station(
                    ["Gulu", "Aswa", "Bobi", "Palaro", "S1"],
                    &[1, 1, 1],
                    full_counts(0, 3, 0, 3),
                ),
            ],
        )
    }

    #[test]
    fn two_stations_in_one_district() {
        init();
        let ft = fact_table(
            &["Anna", "Bob"],
            vec![
                station(["D", "C1", "S1", "P1", "A"], &[30, 20], counts(100, 50)),
                station(["D", "C2", "S2", "P2", "B"], &[25, 15], counts(80, 40)),
            ],
        );
        let res = build(&ft);
        let districts = res.wide(AdminLevel::District);
        assert_eq!(districts.len(), 1);
        let row = &districts.rows[0];
        assert_eq!(row.labels, names(&["D"]));
        assert_eq!(row.counts.registered, 180);
        assert_eq!(row.counts.total, 90);
        assert_eq!(row.votes, vec![55, 35]);
        assert!((row.turnout - 50.0).abs() < 1e-9);
        assert_eq!(row.winner(), "Anna");

        let long = res.long(AdminLevel::District);
        let group = long.group(row.group);
        assert_eq!(group.len(), 2);
        assert_eq!(group.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(group.iter().map(|r| r.won).collect::<Vec<_>>(), vec![true, false]);
    }

    #[test]
    fn aggregation_is_additive() {
        init();
        let ft = sample();
        let res = build(&ft);
        let kept: Vec<&StationResult> = ft
            .stations()
            .iter()
            .filter(|s| s.counts.total > 0)
            .collect();
        for level in AdminLevel::ALL {
            let table = res.wide(level);
            for row in table.rows.iter() {
                let members: Vec<&&StationResult> = kept
                    .iter()
                    .filter(|s| s.labels[..level.depth()] == row.labels[..])
                    .collect();
                assert!(!members.is_empty(), "{} {:?}", level, row.labels);
                let c: Counts = members.iter().map(|s| s.counts).sum();
                assert_eq!(row.counts, c, "{} {:?}", level, row.labels);
                for (cidx, v) in row.votes.iter().enumerate() {
                    let expected: u64 = members.iter().map(|s| s.votes[cidx]).sum();
                    assert_eq!(*v, expected);
                }
            }
            // Nothing lost between levels.
            let all: Counts = table.rows.iter().map(|r| r.counts).sum();
            assert_eq!(all, kept.iter().map(|s| s.counts).sum::<Counts>());
        }
    }

    #[test]
    fn stations_without_votes_are_dropped() {
        let res = build(&sample());
        let stations = res.wide(AdminLevel::Station);
        assert_eq!(stations.len(), 5);
        assert!(stations.rows.iter().all(|r| r.counts.total > 0));
        let parishes = res.wide(AdminLevel::Parish);
        assert!(parishes.rows.iter().all(|r| r.counts.registered != 50));
        assert_eq!(res.wide(AdminLevel::National).rows[0].counts.registered, 115);
    }

    #[test]
    fn groups_follow_sorted_order() {
        let res = build(&sample());
        let stations: Vec<Vec<String>> = res
            .wide(AdminLevel::Station)
            .rows
            .iter()
            .map(|r| r.labels.clone())
            .collect();
        let mut sorted = stations.clone();
        sorted.sort();
        assert_eq!(stations, sorted);
        assert_eq!(stations[0], names(&["Gulu", "Aswa", "Bobi", "Lalogi", "S1"]));

        let districts: Vec<String> = res
            .wide(AdminLevel::District)
            .rows
            .iter()
            .map(|r| r.labels[0].clone())
            .collect();
        assert_eq!(districts, names(&["Gulu", "Wakiso"]));
        let constituencies: Vec<Vec<String>> = res
            .wide(AdminLevel::Constituency)
            .rows
            .iter()
            .map(|r| r.labels.clone())
            .collect();
        assert_eq!(
            constituencies,
            vec![
                names(&["Gulu", "Aswa"]),
                names(&["Wakiso", "Busiro"]),
                names(&["Wakiso", "Kyadondo"])
            ]
        );
    }

    #[test]
    fn group_ids_are_row_positions() {
        let res = build(&sample());
        for level in AdminLevel::ALL {
            for (idx, row) in res.wide(level).rows.iter().enumerate() {
                assert_eq!(row.group, idx);
                assert_eq!(row.labels.len(), level.depth());
            }
        }
    }

    #[test]
    fn rebuilding_is_stable() {
        // Debug output compares NaN turnouts and the row order as text.
        let ft = sample();
        assert_eq!(format!("{:?}", build(&ft)), format!("{:?}", build(&ft)));

        let empty = fact_table(&["Anna", "Bob"], vec![]);
        let first = build(&empty);
        assert!(first.wide(AdminLevel::National).rows[0].turnout.is_nan());
        assert_eq!(format!("{:?}", first), format!("{:?}", build(&empty)));
    }

    #[test]
    fn same_labels_keep_input_order() {
        let ft = fact_table(
            &["Anna", "Bob"],
            vec![
                station(["D", "C", "S", "P", "X"], &[1, 0], counts(10, 1)),
                station(["D", "C", "S", "P", "X"], &[0, 2], counts(10, 2)),
            ],
        );
        let res = build(&ft);
        let votes: Vec<Vec<u64>> = res
            .wide(AdminLevel::Station)
            .rows
            .iter()
            .map(|r| r.votes.clone())
            .collect();
        assert_eq!(votes, vec![vec![1, 0], vec![0, 2]]);

        let long = res.long(AdminLevel::Station);
        assert_eq!(long.len(), 4);
        assert_eq!(long.group(0).iter().map(|r| r.votes).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(long.group(1).iter().map(|r| r.votes).collect::<Vec<_>>(), vec![0, 2]);

        // Coarser levels still merge them.
        let parishes = res.wide(AdminLevel::Parish);
        assert_eq!(parishes.len(), 1);
        assert_eq!(parishes.rows[0].votes, vec![1, 2]);
        assert_eq!(parishes.rows[0].counts.registered, 20);
    }

    #[test]
    fn winners_on_ties() {
        let cands = names(&["Anna", "Bob", "Clara"]);
        assert_eq!(winners(&cands, &[7, 2, 7]), names(&["Anna", "Clara"]));
        assert_eq!(winners(&cands, &[0, 9, 7]), names(&["Bob"]));
        assert_eq!(winners(&[], &[]), Vec::<String>::new());

        let res = build(&sample());
        let gayaza = res
            .wide(AdminLevel::Parish)
            .rows
            .iter()
            .find(|r| r.labels[3] == "Gayaza")
            .cloned()
            .unwrap();
        assert_eq!(gayaza.winner(), "Anna, Clara");
    }

    #[test]
    fn competition_ranking() {
        assert_eq!(competition_ranks(&[10, 10, 7]), vec![1, 1, 3]);
        assert_eq!(competition_ranks(&[7, 10, 10]), vec![3, 1, 1]);
        assert_eq!(competition_ranks(&[1, 2, 3, 3, 0]), vec![4, 3, 1, 1, 5]);
        assert_eq!(competition_ranks(&[0, 0, 0]), vec![1, 1, 1]);
        assert!(competition_ranks(&[]).is_empty());
    }

    #[test]
    fn winners_match_won_flags() {
        let res = build(&sample());
        for level in AdminLevel::ALL {
            let wide = res.wide(level);
            let long = res.long(level);
            for row in wide.rows.iter() {
                let group = long.group(row.group);
                let won: HashSet<String> = group
                    .iter()
                    .filter(|r| r.won)
                    .map(|r| r.candidate.clone())
                    .collect();
                let expected: HashSet<String> = row.winners.iter().cloned().collect();
                assert_eq!(won, expected, "{} {:?}", level, row.labels);
                for r in group.iter() {
                    assert_eq!(r.won, r.rank == 1);
                    assert_eq!(r.labels, row.labels);
                    assert_eq!(r.counts, row.counts);
                    assert_eq!(Some(r.votes), wide.votes_for(row, &r.candidate));
                }
            }
        }
    }

    #[test]
    fn long_row_count() {
        let res = build(&sample());
        for level in AdminLevel::ALL {
            assert_eq!(
                res.long(level).len(),
                res.wide(level).len() * res.candidates().len()
            );
        }
    }

    #[test]
    fn long_rows_are_candidate_major() {
        let res = build(&sample());
        let long = res.long(AdminLevel::District);
        let order: Vec<(String, usize)> = long
            .rows
            .iter()
            .map(|r| (r.candidate.clone(), r.group))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Anna".to_string(), 0),
                ("Anna".to_string(), 1),
                ("Bob".to_string(), 0),
                ("Bob".to_string(), 1),
                ("Clara".to_string(), 0),
                ("Clara".to_string(), 1),
            ]
        );
    }

    #[test]
    fn groups_with_identical_totals_stay_apart() {
        // Same aggregate counts, different winners.
        let ft = fact_table(
            &["Anna", "Bob"],
            vec![
                station(["D1", "C", "S", "P", "X"], &[6, 4], counts(20, 10)),
                station(["D2", "C", "S", "P", "X"], &[4, 6], counts(20, 10)),
            ],
        );
        let res = build(&ft);
        let long = res.long(AdminLevel::District);
        let ranks = |group: usize| -> Vec<(String, u32)> {
            long.group(group)
                .iter()
                .map(|r| (r.candidate.clone(), r.rank))
                .collect()
        };
        let d1 = ranks(0);
        let d2 = ranks(1);
        assert_eq!(d1, vec![("Anna".to_string(), 1), ("Bob".to_string(), 2)]);
        assert_eq!(d2, vec![("Anna".to_string(), 2), ("Bob".to_string(), 1)]);
    }

    #[test]
    fn turnout_formula() {
        let res = build(&sample());
        for level in AdminLevel::ALL {
            for row in res.wide(level).rows.iter() {
                let t = turnout(row.counts.total, row.counts.registered);
                if row.counts.registered == 0 {
                    assert!(!row.turnout.is_finite());
                } else {
                    let expected =
                        100.0 * row.counts.total as f64 / row.counts.registered as f64;
                    assert!((row.turnout - expected).abs() < 1e-9);
                    assert!((row.turnout - t).abs() < 1e-9);
                }
            }
        }
        assert!(turnout(5, 0).is_infinite());
        assert!(turnout(0, 0).is_nan());
        assert!((turnout(1, 3) - 33.333333333333336).abs() < 1e-9);
    }

    #[test]
    fn zero_registered_is_propagated() {
        let res = build(&sample());
        let palaro = res
            .wide(AdminLevel::Parish)
            .rows
            .iter()
            .find(|r| r.labels[3] == "Palaro")
            .cloned()
            .unwrap();
        assert!(palaro.turnout.is_infinite());
        let long = res.long(AdminLevel::Parish);
        assert!(long.group(palaro.group).iter().all(|r| r.turnout.is_infinite()));
        // The parent subcounty has registered voters from its other parish.
        let bobi = &res.wide(AdminLevel::Subcounty).rows[0];
        assert_eq!(bobi.labels[2], "Bobi");
        assert!((bobi.turnout - 16.0 * 100.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_fact_table() {
        let ft = fact_table(&["Anna", "Bob"], vec![]);
        let res = build(&ft);
        for level in AdminLevel::ALL {
            if level == AdminLevel::National {
                assert_eq!(res.wide(level).len(), 1);
                assert_eq!(res.long(level).len(), 2);
            } else {
                assert!(res.wide(level).is_empty());
                assert!(res.long(level).is_empty());
            }
        }
        let stats = res.national_statistics().unwrap();
        assert_eq!(stats.registered_voters, 0);
        assert!(stats.turnout.is_nan());
    }

    #[test]
    fn national_statistics() {
        let res = build(&sample());
        let stats = res.national_statistics().unwrap();
        assert_eq!(stats.registered_voters, 115);
        assert_eq!(stats.valid_voters, 57);
        assert_eq!(stats.total_votes, 61);
        assert!((stats.turnout - 6100.0 / 115.0).abs() < 1e-9);
        let national = &res.wide(AdminLevel::National).rows[0];
        assert!(national.labels.is_empty());
        assert_eq!(national.votes, vec![25, 21, 11]);
        assert_eq!(national.winner(), "Anna");
    }

    #[test]
    fn national_statistics_need_a_row() {
        let mut res = build(&sample());
        res.wide[AdminLevel::National.position()].rows.clear();
        assert_eq!(
            res.national_statistics(),
            Err(AggregationErrors::EmptyNational)
        );
    }

    #[test]
    fn columns_per_level() {
        let res = build(&sample());
        assert_eq!(
            res.wide(AdminLevel::National).columns(),
            names(&[
                "Anna",
                "Bob",
                "Clara",
                "registered",
                "valid",
                "invalid",
                "total",
                "turnout",
                "winner"
            ])
        );
        assert_eq!(
            res.long(AdminLevel::Constituency).columns(),
            names(&[
                "district",
                "constituency",
                "registered",
                "valid",
                "invalid",
                "total",
                "turnout",
                "candidate",
                "votes",
                "won",
                "rank"
            ])
        );
    }

    #[test]
    fn level_names() {
        assert_eq!(AdminLevel::from_name("district"), Some(AdminLevel::District));
        assert_eq!(AdminLevel::from_name("Subcounties"), Some(AdminLevel::Subcounty));
        assert_eq!(AdminLevel::from_name("national"), Some(AdminLevel::National));
        assert_eq!(AdminLevel::from_name("country"), None);
        for level in AdminLevel::ALL {
            assert_eq!(AdminLevel::from_name(level.name()), Some(level));
        }
    }
}
