/*!

This is the long-form manual for `election_rollup` and the `rollup` command.

## The fact table

The input is one table with one row per polling station. Each row contains:
* the administrative labels: `district`, `constituency`, `subcounty`, `parish`, `station`.
  Each label is only meaningful together with its ancestors (two parishes of two different
  subcounties may share the same name).
* one column per candidate with the number of votes. The candidates depend on the election
  and are never hard-coded.
* the counts `registered`, `valid`, `invalid` and `total`.

Stations with `total == 0` did not report any vote. They are dropped before anything else.

## Levels

The results are summed at the following levels:

| level          | grouping key                                     |
|----------------|--------------------------------------------------|
| stations       | (none, one row per station)                      |
| parishes       | district, constituency, subcounty, parish        |
| subcounties    | district, constituency, subcounty                |
| constituencies | district, constituency                           |
| districts      | district                                         |
| national       | (none, always exactly one row)                   |

Two stations with the same labels stay two rows at the station level.
The groups are listed in the order of the sorted stations, which is the geographic order
of the dataset rather than an alphabetical order of the group names.

## Wide form

One row per group, one column per candidate, plus:
* `turnout`: `100 * total / registered`. When no voter is registered, the value is not finite.
  It is kept as such, never replaced by zero.
* `winner`: the candidate with the most votes. On an exact tie, all the tied candidates are
  listed, separated by a comma.

## Long form

One row per group and per candidate, with the columns:
* the key columns of the level and the aggregate columns of the group
* `candidate`, `votes`
* `won`: the candidate has the most votes in the group. It always agrees with `winner`.
* `rank`: competition ranking by descending votes. Tied candidates share the best rank,
  the next ranks are skipped: votes `[10, 10, 7]` are ranked `[1, 1, 3]`.

Each group carries an explicit identifier (its position in the wide table). The rank and the
won flag are computed per identifier, so two groups that happen to have the same totals are
never mixed together.

## Input formats (`rollup` command)

* `csv`: a comma separated file with a header row.
* `xlsx`: an Excel workbook. The first worksheet is read, unless another one is named with
  `--excel-worksheet-name`.

The candidate columns are found, in this order:
1. from the `candidates` list of the configuration, or the `--candidates` flags;
2. from the `firstCandidateColumnIndex` and `lastCandidateColumnIndex` options (1-based,
   both included);
3. otherwise, every column that is not an administrative column or a count column.

If a listed candidate or a required column is missing from the header, the program stops
before computing anything.

## Configuration

```json
{
  "outputSettings": {
    "datasetName": "Presidential 2021",
    "outputDirectory": "output",
    "format": "json",
    "levels": ["districts", "national"],
    "candidateColors": {"Kyagulanyi": "#E41E2F", "Museveni": "#F3C02A"}
  },
  "dataSource": {
    "provider": "csv",
    "filePath": "polling-station-results.csv",
    "firstCandidateColumnIndex": 6,
    "lastCandidateColumnIndex": 16
  },
  "columns": {
    "registered": "Registered Voters"
  }
}
```

The `columns` section renames the administrative and count columns when the header of the
dataset uses other names. The file path is relative to the configuration file.
`candidateColors` gives the colour of the bar of each candidate in the national chart data;
the other candidates are `gray`.

## Outputs

* `json`: the national statistics and all the requested tables, named `<level>_wide` and
  `<level>_long`. A turnout that is not finite is written as `null`. The district summary
  and the national chart data are added when their level is requested.
* `csv`: one `<level>_wide.csv` and one `<level>_long.csv` file per requested level.
* `summary`: the district summary table and the national votes per candidate,
  printed on the console.
*/
