/*
 * Initial Configuration Selector
 *
 * Chooses the configurations saturation starts from and builds the seed
 * automaton: one edge Control(val) -stmt-> Accept per seed, weighted with
 * (START → START, "constructor").
 *
 * Strategies:
 *   FirstEvent    per tracked variable, the earliest rule whose weight
 *                 leaves START. A variable with no incoming flow from
 *                 another variable whose first weighted operation comes
 *                 before any START event (or has none) is seeded at that
 *                 operation instead, so a missing first operation is
 *                 still checked.
 *   Declarations  every rule reading the uninitialized marker
 *
 * No seed found: warning and an empty automaton (empty result, no error).
 */

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::config::SeedStrategy;
use crate::features::order_analysis::domain::{
    AutState, AutTransition, NormalRule, Rule, Stmt, Val, Weight, WeightedAutomaton, Wpds,
};

/// Seed configuration `(val, stmt)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Seed {
    pub val: Val,
    pub stmt: Stmt,
}

/// Seed automaton plus the seeds it encodes
#[derive(Debug, Clone)]
pub struct InitialConfiguration {
    pub automaton: WeightedAutomaton<Weight>,
    pub seeds: Vec<Seed>,
}

impl InitialConfiguration {
    pub fn create(strategy: SeedStrategy, wpds: &Wpds<Weight>) -> Self {
        let seeds = match strategy {
            SeedStrategy::FirstEvent => Self::first_events(wpds),
            SeedStrategy::Declarations => Self::declarations(wpds),
        };

        if seeds.is_empty() {
            warn!(?strategy, "No initial configuration found for order analysis");
        }
        for seed in &seeds {
            debug!("Initial configuration: {} at {}", seed.val, seed.stmt);
        }

        Self::from_seeds(seeds)
    }

    /// Seed automaton for explicit configurations
    pub fn from_seeds(seeds: Vec<Seed>) -> Self {
        let mut automaton = WeightedAutomaton::new();
        for seed in &seeds {
            automaton.add_transition(
                AutTransition::new(
                    AutState::Control(seed.val.clone()),
                    seed.stmt.clone(),
                    AutState::Accept,
                ),
                Weight::constructor(),
            );
        }
        Self { automaton, seeds }
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    fn first_events(wpds: &Wpds<Weight>) -> Vec<Seed> {
        // tracked variable → (position of the triggering statement, seed)
        let mut starts: FxHashMap<Val, ((u32, u32, u32), Seed)> = FxHashMap::default();
        let mut operations: FxHashMap<Val, ((u32, u32, u32), Seed)> = FxHashMap::default();
        let mut has_inflow: FxHashSet<Val> = FxHashSet::default();

        for rule in wpds.rules() {
            match rule {
                Rule::Normal(r) => {
                    if r.from_val != r.to_val && !r.from_val.is_marker() {
                        has_inflow.insert(r.to_val.clone());
                    }
                    if r.to_val.is_synthetic() || !matches!(r.weight, Weight::Transitions(_)) {
                        continue;
                    }
                    let key = r.to_stmt.position_key();
                    let target = if r.weight.leaves_start() {
                        &mut starts
                    } else {
                        &mut operations
                    };
                    Self::keep_earliest(target, r, key);
                }
                Rule::Push(r) => {
                    has_inflow.insert(r.to_val.clone());
                }
                Rule::Pop(_) => {}
            }
        }

        for (val, (key, seed)) in operations {
            if has_inflow.contains(&val) {
                continue;
            }
            let earlier = match starts.get(&val) {
                Some((start_key, _)) => key < *start_key,
                None => true,
            };
            if earlier {
                debug!("{} is used before its first START event; seeding at that use", val);
                starts.insert(val, (key, seed));
            }
        }

        let mut seeds: Vec<(Val, (u32, u32, u32), Seed)> = starts
            .into_iter()
            .map(|(val, (key, seed))| (val, key, seed))
            .collect();

        seeds.sort_by(|a, b| (&a.0.scope, a.1, &a.0.variable).cmp(&(&b.0.scope, b.1, &b.0.variable)));
        let mut unique = Vec::new();
        for (_, _, seed) in seeds {
            if !unique.contains(&seed) {
                unique.push(seed);
            }
        }
        unique
    }

    fn keep_earliest(
        map: &mut FxHashMap<Val, ((u32, u32, u32), Seed)>,
        rule: &NormalRule<Weight>,
        key: (u32, u32, u32),
    ) {
        let seed = Seed {
            val: rule.from_val.clone(),
            stmt: rule.from_stmt.clone(),
        };
        match map.get(&rule.to_val) {
            Some((existing, _)) if *existing <= key => {}
            _ => {
                map.insert(rule.to_val.clone(), (key, seed));
            }
        }
    }

    fn declarations(wpds: &Wpds<Weight>) -> Vec<Seed> {
        let mut seeds: Vec<Seed> = Vec::new();
        let mut declarations: Vec<&NormalRule<Weight>> =
            wpds.normal_rules().filter(|r| r.from_val.is_marker()).collect();
        declarations.sort_by_key(|r| (r.from_stmt.scope.clone(), r.to_stmt.position_key()));

        for rule in declarations {
            let seed = Seed {
                val: rule.from_val.clone(),
                stmt: rule.from_stmt.clone(),
            };
            if !seeds.contains(&seed) {
                seeds.push(seed);
            }
        }
        seeds
    }
}
