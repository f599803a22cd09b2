use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

use crate::core::error::InvalidInputError;
use crate::models::{Assignment, OddPolicy, Pair, Participant, SeenSet};

/// Default number of partner attempts the novelty search may spend
pub const DEFAULT_SEARCH_BUDGET: usize = 10_000;

/// Repeat-avoiding random pairing
///
/// # Algorithm
/// 1. Validate and sort the participants, then shuffle them
/// 2. For odd counts, draw one participant uniformly as the odd-one-out
/// 3. Search for a matching made only of unseen pairs, always expanding the
///    participant with the fewest unseen partners left and backtracking
///    within the search budget
/// 4. If none is found, pair greedily: each participant in order takes the
///    first unseen partner, else the partner they met longest ago
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    odd_policy: OddPolicy,
    search_budget: usize,
}

impl Matcher {
    pub fn new(odd_policy: OddPolicy, search_budget: usize) -> Self {
        Self {
            odd_policy,
            search_budget,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(OddPolicy::default(), DEFAULT_SEARCH_BUDGET)
    }

    pub fn odd_policy(&self) -> OddPolicy {
        self.odd_policy
    }

    /// Pair up `participants`, avoiding the pairs in `seen` where possible
    ///
    /// The result depends only on the participant set, `seen` and the RNG
    /// stream; input order is irrelevant.
    ///
    /// # Errors
    /// `DuplicateParticipant` or `InvalidParticipant` if the participant list
    /// is not a set of well-formed identifiers.
    pub fn compute_assignment<R: Rng>(
        &self,
        participants: &[Participant],
        seen: &SeenSet,
        rng: &mut R,
    ) -> Result<Assignment, InvalidInputError> {
        let mut pool = validate_participants(participants)?;
        pool.shuffle(rng);

        let odd_one_out = if pool.len() % 2 == 1 {
            let index = rng.random_range(0..pool.len());
            Some(pool.remove(index))
        } else {
            None
        };

        let mut pairs = match self.find_novel_matching(&pool, seen) {
            Some(pairs) => pairs,
            None => {
                tracing::debug!(
                    "No repeat-free matching found for {} participants, falling back to least recently seen pairs",
                    pool.len()
                );
                greedy_matching(&pool, seen)
            }
        };

        if let (OddPolicy::JoinPair, Some(odd)) = (self.odd_policy, &odd_one_out) {
            let candidates: Vec<&Participant> = pool.iter().collect();
            if let Some(index) = pick_partner(odd, &candidates, seen) {
                pairs.push(Pair::ordered(odd, candidates[index]));
            }
        }

        Ok(Assignment { pairs, odd_one_out })
    }

    /// Same as [`Matcher::compute_assignment`] with a ChaCha RNG seeded from
    /// `seed`, or from the OS when no seed is given
    pub fn compute_assignment_seeded(
        &self,
        participants: &[Participant],
        seen: &SeenSet,
        seed: Option<u64>,
    ) -> Result<Assignment, InvalidInputError> {
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        self.compute_assignment(participants, seen, &mut rng)
    }

    /// Backtracking search for a perfect matching that avoids every seen pair
    fn find_novel_matching(&self, pool: &[Participant], seen: &SeenSet) -> Option<Vec<Pair>> {
        let n = pool.len();
        let mut blocked = vec![vec![false; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let is_seen = seen.contains(&Pair::ordered(&pool[i], &pool[j]));
                blocked[i][j] = is_seen;
                blocked[j][i] = is_seen;
            }
        }

        let mut search = NoveltySearch {
            blocked: &blocked,
            used: vec![false; n],
            matched: Vec::with_capacity(n / 2),
            budget: self.search_budget,
        };

        if search.extend() {
            Some(
                search
                    .matched
                    .iter()
                    .map(|&(i, j)| Pair::ordered(&pool[i], &pool[j]))
                    .collect(),
            )
        } else {
            None
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

struct NoveltySearch<'a> {
    blocked: &'a [Vec<bool>],
    used: Vec<bool>,
    matched: Vec<(usize, usize)>,
    budget: usize,
}

impl NoveltySearch<'_> {
    /// Match the most constrained free participant and recurse; false on
    /// dead end or exhausted budget
    fn extend(&mut self) -> bool {
        let Some(first) = self.most_constrained() else {
            return self.used.iter().all(|&used| used);
        };
        self.used[first] = true;

        for partner in 0..self.used.len() {
            if self.used[partner] || self.blocked[first][partner] {
                continue;
            }
            if self.budget == 0 {
                break;
            }
            self.budget -= 1;

            self.used[partner] = true;
            self.matched.push((first, partner));
            if self.extend() {
                return true;
            }
            self.matched.pop();
            self.used[partner] = false;
        }

        self.used[first] = false;
        false
    }

    /// Free participant with the fewest unseen free partners, earliest in
    /// shuffled order on ties
    ///
    /// `None` when nobody is free, or when someone free has no unseen
    /// partner left and the branch is dead.
    fn most_constrained(&self) -> Option<usize> {
        let free: Vec<usize> = (0..self.used.len()).filter(|&i| !self.used[i]).collect();

        let mut best: Option<(usize, usize)> = None;
        for &i in &free {
            let options = free.iter().filter(|&&j| j != i && !self.blocked[i][j]).count();
            if options == 0 {
                return None;
            }
            if best.map_or(true, |(_, fewest)| options < fewest) {
                best = Some((i, options));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Pair participants in order, always taking the best available partner
fn greedy_matching(pool: &[Participant], seen: &SeenSet) -> Vec<Pair> {
    let mut remaining: Vec<&Participant> = pool.iter().collect();
    let mut pairs = Vec::with_capacity(pool.len() / 2);

    while remaining.len() >= 2 {
        let first = remaining.remove(0);
        // Non-empty, so a partner always exists
        let index = pick_partner(first, &remaining, seen).unwrap_or(0);
        let partner = remaining.remove(index);
        pairs.push(Pair::ordered(first, partner));
    }

    pairs
}

/// Index of the preferred partner for `who` among `candidates`
///
/// Unseen pairs win; then the pair seen longest ago, then the one seen least
/// often. Remaining ties go to the earliest candidate, which is uniformly
/// random because candidates arrive in shuffled order.
fn pick_partner(who: &Participant, candidates: &[&Participant], seen: &SeenSet) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(_, candidate)| partner_rank(seen, &Pair::ordered(who, candidate)))
        .map(|(index, _)| index)
}

fn partner_rank(seen: &SeenSet, pair: &Pair) -> (bool, Option<DateTime<Utc>>, u32) {
    match seen.history(pair) {
        None => (false, None, 0),
        Some(history) => (true, history.last_seen, history.count),
    }
}

/// Reject duplicates and malformed identifiers; return the participants sorted
fn validate_participants(participants: &[Participant]) -> Result<Vec<Participant>, InvalidInputError> {
    let mut unique = HashSet::with_capacity(participants.len());
    for participant in participants {
        if !participant.is_well_formed() {
            return Err(InvalidInputError::InvalidParticipant(participant.to_string()));
        }
        if !unique.insert(participant) {
            return Err(InvalidInputError::DuplicateParticipant(participant.to_string()));
        }
    }

    let mut sorted = participants.to_vec();
    sorted.sort();
    Ok(sorted)
}

/// Parse a run seed given as decimal or `0x`-prefixed hex
pub fn parse_seed(text: &str) -> Result<u64, InvalidInputError> {
    let trimmed = text.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| InvalidInputError::MalformedSeed(text.to_string()))
}
