/*!

This is the long-form manual for `spatial_voting` and `winmap`.

## The model

Voters and candidates live in the unit square of a two-dimensional opinion
space. A voter prefers the candidates closest to its own position: the
ranking of a voter is the list of candidates sorted by increasing Euclidean
distance. When two candidates are at exactly the same distance, the one
listed first in the candidate list is preferred. The same rule breaks every
other tie in the library (equal tallies, equal fewest votes in a runoff).

## Voting methods

The following methods are supported. The name in parentheses is the name used
in configuration files and on the command line.

### Plurality (`plurality`)

Each voter votes for the closest candidate. The candidate with the most votes
wins.

### Approval (`approval`)

Each voter approves of every candidate strictly closer than the approval
threshold. An approval does not count fully: it is weighted by a cosine
falloff that is 1 at distance 0 and 0 at the threshold. A voter who finds no
candidate close enough votes for the closest one with full weight instead of
abstaining.

### Borda count (`borda`)

With `n` candidates, the candidate ranked at position `i` (starting from 0)
gets `n - 1 - i` points. Points are summed across voters.

### Instant-runoff voting (`irv`)

Each voter's ranking is used as a ranked ballot. In each round the first
remaining preference of every ballot is counted. A candidate with strictly
more than half of the votes of the round wins. Otherwise the candidate with
the fewest votes is eliminated and the count starts again. When a single
candidate remains, it wins by default.

The elimination order and the tally of every round are reported in the
result.

### Smith//Approval (`smithApproval`)

The Smith set is the smallest group of candidates that beat every candidate
outside of it in head-to-head contests. The method first computes the Smith
set, then runs approval among its members only. For a single voter the Smith
set is always the closest candidate. For a population, preferences may form
cycles (A beats B, B beats C, C beats A), in which case the whole cycle stays
in the Smith set.

## Voting at a point of the map

The win map asks, for every sample point of the square, who would win if the
electorate was concentrated around that point. With an influence radius, the
point is replaced by a lattice of voters around it whose weight fades with
the same cosine falloff as approvals. Without a radius, the point is a single
voter.

## Configuration

`winmap` reads a JSON configuration file:

```text
{
  "outputSettings": { "contestName": "Three way race" },
  "method": "irv",
  "approvalThreshold": 0.3,
  "candidates": [
    { "id": "A", "x": 0.2, "y": 0.3, "name": "Alice", "color": "#e41a1c" },
    { "id": "B", "x": 0.7, "y": 0.4 },
    { "id": "C", "x": 0.5, "y": 0.8 }
  ],
  "voterSources": [
    { "provider": "csv", "filePath": "voters.csv", "firstVoterRowIndex": 2,
      "xColumnIndex": 1, "yColumnIndex": 2, "weightColumnIndex": 3 }
  ],
  "winMap": { "width": 40, "height": 20, "influenceRadius": 0.1, "influenceSteps": 3 }
}
```

- `method` (string): one of the method names above.
- `approvalThreshold` (number, optional, default 0.25): must be positive.
- `candidates` (array, non-empty): the identifiers must be unique and the
  positions within the unit square. The order of the list is the tie-break
  order.
- `voterSources` (array, optional): CSV files of voter positions. The column
  and row indexes start at 1. Positions are clamped to the unit square.
  `weightColumnIndex` is optional; voters count once by default.
- `winMap` (optional): the dimensions of the map, at most 4096 per side.
  `influenceRadius` and `influenceSteps` (at most 32) are optional; without
  them every sample point is a single voter.

*/
