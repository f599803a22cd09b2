// Unit tests for Random Coffee

use chrono::{DateTime, Duration, TimeZone, Utc};
use random_coffee::core::{extract_seen_pairs, parse_pairs, render, Matcher, DEFAULT_SEARCH_BUDGET};
use random_coffee::models::{Assignment, HistoryRecord, OddPolicy, Pair, Participant, SeenSet};
use std::collections::{HashMap, HashSet};

fn participants(ids: &[&str]) -> Vec<Participant> {
    ids.iter().map(|id| Participant::from(*id)).collect()
}

fn pair(a: &str, b: &str) -> Pair {
    Pair::new(a.into(), b.into()).unwrap()
}

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn group(size: usize) -> Vec<Participant> {
    (0..size).map(|i| Participant::new(format!("<@U{:03}>", i))).collect()
}

/// Every participant appears in exactly one pair, the odd-one-out in none
fn assert_partition(assignment: &Assignment, members: &[Participant]) {
    let mut counts: HashMap<&Participant, usize> = HashMap::new();
    for p in &assignment.pairs {
        *counts.entry(p.first()).or_default() += 1;
        *counts.entry(p.second()).or_default() += 1;
    }

    for member in members {
        let expected = if assignment.odd_one_out.as_ref() == Some(member) { 0 } else { 1 };
        assert_eq!(counts.get(member).copied().unwrap_or(0), expected, "member {}", member);
    }
    assert_eq!(counts.values().sum::<usize>(), assignment.pairs.len() * 2);
}

/// Brute force: is there a perfect matching of `members` avoiding `seen`?
fn novelty_complete_exists(members: &[Participant], seen: &SeenSet) -> bool {
    if members.is_empty() {
        return true;
    }
    let first = &members[0];
    (1..members.len()).any(|i| {
        if seen.contains(&Pair::new(first.clone(), members[i].clone()).unwrap()) {
            return false;
        }
        let rest: Vec<Participant> = members[1..]
            .iter()
            .enumerate()
            .filter(|(j, _)| j + 1 != i)
            .map(|(_, p)| p.clone())
            .collect();
        novelty_complete_exists(&rest, seen)
    })
}

#[test]
fn test_even_groups_are_partitioned() {
    let matcher = Matcher::with_defaults();
    for size in [2, 4, 6, 10, 24] {
        let members = group(size);
        for seed in 0..20 {
            let assignment = matcher
                .compute_assignment_seeded(&members, &SeenSet::new(), Some(seed))
                .unwrap();
            assert_eq!(assignment.pairs.len(), size / 2);
            assert!(assignment.odd_one_out.is_none());
            assert_partition(&assignment, &members);
        }
    }
}

#[test]
fn test_odd_groups_have_one_odd_one_out() {
    let matcher = Matcher::with_defaults();
    for size in [1, 3, 5, 9, 25] {
        let members = group(size);
        for seed in 0..20 {
            let assignment = matcher
                .compute_assignment_seeded(&members, &SeenSet::new(), Some(seed))
                .unwrap();
            assert_eq!(assignment.pairs.len(), (size - 1) / 2);
            assert!(assignment.odd_one_out.is_some());
            assert_partition(&assignment, &members);
        }
    }
}

#[test]
fn test_avoids_seen_pairs_when_possible() {
    let matcher = Matcher::with_defaults();
    let members = group(8);

    for seed in 0..50 {
        // Two earlier rounds of history
        let first = matcher
            .compute_assignment_seeded(&members, &SeenSet::new(), Some(seed))
            .unwrap();
        let mut seen: SeenSet = first.pairs.iter().cloned().collect();
        let second = matcher.compute_assignment_seeded(&members, &seen, Some(seed + 1000)).unwrap();
        for p in &second.pairs {
            seen.record(p.clone(), None);
        }

        assert!(novelty_complete_exists(&members, &seen));
        let third = matcher.compute_assignment_seeded(&members, &seen, Some(seed + 2000)).unwrap();
        assert!(
            third.pairs.iter().all(|p| !seen.contains(p)),
            "seed {} repeated a pair",
            seed
        );
    }
}

#[test]
fn test_finds_matching_greedy_would_miss() {
    // Taking any unseen partner for @a first can strand @c with @d
    let matcher = Matcher::with_defaults();
    let members = participants(&["@a", "@b", "@c", "@d"]);
    let seen: SeenSet = [pair("@c", "@d")].into_iter().collect();

    for seed in 0..100 {
        let assignment = matcher.compute_assignment_seeded(&members, &seen, Some(seed)).unwrap();
        assert!(!assignment.pairs.contains(&pair("@c", "@d")), "seed {}", seed);
    }
}

#[test]
fn test_finds_matching_when_most_pairs_are_seen() {
    // Each @y has met everyone except its own @x; the @x group is fresh
    let xs: Vec<Participant> = (0..12).map(|i| Participant::new(format!("@x{:02}", i))).collect();
    let ys: Vec<Participant> = (0..12).map(|i| Participant::new(format!("@y{:02}", i))).collect();

    let mut seen = SeenSet::new();
    for (i, y) in ys.iter().enumerate() {
        for other in ys.iter().skip(i + 1) {
            seen.record(Pair::new(y.clone(), other.clone()).unwrap(), None);
        }
        for (j, x) in xs.iter().enumerate() {
            if i != j {
                seen.record(Pair::new(x.clone(), y.clone()).unwrap(), None);
            }
        }
    }

    let ys_first: Vec<Participant> = ys.iter().chain(xs.iter()).cloned().collect();
    assert!(novelty_complete_exists(&ys_first, &seen));

    let members: Vec<Participant> = xs.iter().chain(ys.iter()).cloned().collect();
    let matcher = Matcher::with_defaults();
    for seed in 0..50 {
        let assignment = matcher.compute_assignment_seeded(&members, &seen, Some(seed)).unwrap();
        assert_partition(&assignment, &members);
        assert!(
            assignment.pairs.iter().all(|p| !seen.contains(p)),
            "seed {} repeated a pair",
            seed
        );
    }
}

#[test]
fn test_never_pairs_a_with_b() {
    let matcher = Matcher::with_defaults();
    let members = participants(&["A", "B", "C", "D"]);
    let seen: SeenSet = [pair("A", "B")].into_iter().collect();

    let mut outcomes = HashSet::new();
    for seed in 0..200 {
        let assignment = matcher.compute_assignment_seeded(&members, &seen, Some(seed)).unwrap();
        let mut pairs = assignment.pairs.clone();
        pairs.sort();
        assert!(
            pairs == vec![pair("A", "C"), pair("B", "D")] || pairs == vec![pair("A", "D"), pair("B", "C")],
            "unexpected assignment {:?}",
            pairs
        );
        outcomes.insert(pairs);
    }
    assert_eq!(outcomes.len(), 2, "both valid assignments should occur");
}

#[test]
fn test_odd_one_out_is_uniform() {
    let matcher = Matcher::with_defaults();
    let members = participants(&["A", "B", "C"]);
    let trials = 3000;

    let mut counts: HashMap<Participant, usize> = HashMap::new();
    for _ in 0..trials {
        let assignment = matcher.compute_assignment_seeded(&members, &SeenSet::new(), None).unwrap();
        assert_eq!(assignment.pairs.len(), 1);
        *counts.entry(assignment.odd_one_out.unwrap()).or_default() += 1;
    }

    for member in &members {
        let share = counts.get(member).copied().unwrap_or(0) as f64 / trials as f64;
        assert!((share - 1.0 / 3.0).abs() < 0.06, "{} was odd one out {:.3} of the time", member, share);
    }
}

#[test]
fn test_unseeded_assignments_are_roughly_uniform() {
    // Four people have exactly three perfect matchings
    let matcher = Matcher::with_defaults();
    let members = participants(&["A", "B", "C", "D"]);
    let trials = 3000;

    let mut counts: HashMap<Vec<Pair>, usize> = HashMap::new();
    for _ in 0..trials {
        let mut pairs = matcher
            .compute_assignment_seeded(&members, &SeenSet::new(), None)
            .unwrap()
            .pairs;
        pairs.sort();
        *counts.entry(pairs).or_default() += 1;
    }

    assert_eq!(counts.len(), 3);
    for (pairs, count) in &counts {
        let share = *count as f64 / trials as f64;
        assert!((share - 1.0 / 3.0).abs() < 0.06, "{:?} drawn {:.3} of the time", pairs, share);
    }
}

#[test]
fn test_seeded_runs_are_deterministic() {
    let matcher = Matcher::with_defaults();
    let members = group(12);
    let seen: SeenSet = [pair("<@U000>", "<@U001>"), pair("<@U002>", "<@U003>")].into_iter().collect();

    let first = matcher.compute_assignment_seeded(&members, &seen, Some(2024)).unwrap();
    for _ in 0..10 {
        assert_eq!(matcher.compute_assignment_seeded(&members, &seen, Some(2024)).unwrap(), first);
    }
}

#[test]
fn test_all_pairs_seen_falls_back_to_oldest() {
    let matcher = Matcher::with_defaults();
    let members = participants(&["A", "B", "C", "D"]);

    let mut seen = SeenSet::new();
    seen.record(pair("A", "B"), Some(as_of() - Duration::days(1)));
    seen.record(pair("C", "D"), Some(as_of() - Duration::days(1)));
    seen.record(pair("A", "C"), Some(as_of() - Duration::days(2)));
    seen.record(pair("B", "D"), Some(as_of() - Duration::days(2)));
    seen.record(pair("A", "D"), Some(as_of() - Duration::days(20)));
    seen.record(pair("B", "C"), Some(as_of() - Duration::days(20)));

    for seed in 0..50 {
        let assignment = matcher.compute_assignment_seeded(&members, &seen, Some(seed)).unwrap();
        assert_partition(&assignment, &members);

        // Whoever goes first takes the partner they met longest ago
        let mut pairs = assignment.pairs.clone();
        pairs.sort();
        assert_eq!(pairs, vec![pair("A", "D"), pair("B", "C")], "seed {}", seed);
    }
}

#[test]
fn test_extractor_window_boundaries() {
    let lookback = Duration::days(28);
    let cutoff = as_of() - lookback;
    let text = |a: &str, b: &str| format!("This week's random coffees are:\n 1. {} and {}", a, b);

    let records = vec![
        HistoryRecord::new(text("@at", "@cutoff"), cutoff),
        HistoryRecord::new(text("@just", "@before"), cutoff - Duration::seconds(1)),
        HistoryRecord::new(text("@just", "@after"), cutoff + Duration::seconds(1)),
        HistoryRecord::new(text("@right", "@now"), as_of()),
        HistoryRecord::new(text("@long", "@ago"), as_of() - Duration::days(90)),
    ];

    let seen = extract_seen_pairs(&records, lookback, as_of()).unwrap();

    assert!(seen.contains(&pair("@at", "@cutoff")));
    assert!(seen.contains(&pair("@just", "@after")));
    assert!(seen.contains(&pair("@right", "@now")));
    assert!(!seen.contains(&pair("@just", "@before")));
    assert!(!seen.contains(&pair("@long", "@ago")));
    assert_eq!(seen.len(), 3);
}

#[test]
fn test_announcement_round_trip() {
    for (size, policy) in [(6, OddPolicy::SitOut), (7, OddPolicy::SitOut), (7, OddPolicy::JoinPair)] {
        let members = group(size);
        let matcher = Matcher::new(policy, DEFAULT_SEARCH_BUDGET);
        let assignment = matcher.compute_assignment_seeded(&members, &SeenSet::new(), Some(11)).unwrap();

        let text = render(&assignment, policy).unwrap();
        let parsed: HashSet<Pair> = parse_pairs(&text).unwrap().into_iter().collect();
        let expected: HashSet<Pair> = assignment.pairs.iter().cloned().collect();
        assert_eq!(parsed, expected);

        let seen = extract_seen_pairs(&[HistoryRecord::new(text, as_of())], Duration::days(28), as_of()).unwrap();
        let from_history: HashSet<Pair> = seen.pairs().cloned().collect();
        assert_eq!(from_history, expected);
    }
}

#[test]
fn test_duplicate_participant_message() {
    let matcher = Matcher::with_defaults();
    let err = matcher
        .compute_assignment_seeded(&participants(&["<@U1>", "<@U2>", "<@U1>"]), &SeenSet::new(), Some(0))
        .unwrap_err();
    assert_eq!(err.to_string(), "duplicate participant <@U1>");
}
