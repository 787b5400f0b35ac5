use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use torq_db::corridors::TorqDbCorridorOperations;
use torq_types::prelude::{Corridor, CorridorKey, CorridorType};

use crate::errors::Result;

/// Corridors of one priority, grouped by reference id.
#[derive(Debug, Default)]
struct PriorityBucket {
    priority: u8,
    by_reference: HashMap<i64, Vec<Corridor>>,
}

/// Live rule set of one corridor type, most specific priority first.
#[derive(Debug, Default)]
struct RuleSet {
    buckets: Vec<PriorityBucket>,
}

impl RuleSet {
    fn build(corridor_type: CorridorType, corridors: Vec<Corridor>) -> Self {
        let mut by_priority: HashMap<u8, HashMap<i64, Vec<Corridor>>> = HashMap::new();

        for mut corridor in corridors {
            if corridor.corridor_type != corridor_type {
                tracing::warn!(
                    corridor_id = corridor.corridor_id,
                    expected = ?corridor_type,
                    actual = ?corridor.corridor_type,
                    "corridor of another type skipped"
                );
                continue;
            }

            let computed = corridor.discriminators.priority();
            if corridor.priority != computed {
                tracing::warn!(
                    corridor_id = corridor.corridor_id,
                    stored = corridor.priority,
                    computed,
                    "corridor priority does not match its discriminators, using the computed one"
                );
                corridor.priority = computed;
            }
            if corridor.inverse {
                tracing::warn!(corridor_id = corridor.corridor_id, "inverse corridors are not supported, ignoring the flag");
                corridor.inverse = false;
            }

            by_priority
                .entry(computed)
                .or_default()
                .entry(corridor.reference_id)
                .or_default()
                .push(corridor);
        }

        let mut buckets: Vec<PriorityBucket> = by_priority
            .into_iter()
            .map(|(priority, by_reference)| PriorityBucket { priority, by_reference })
            .collect();
        buckets.sort_unstable_by(|a, b| b.priority.cmp(&a.priority));

        Self { buckets }
    }

    fn best(&self, key: &CorridorKey) -> Option<&Corridor> {
        self.buckets.iter().find_map(|bucket| {
            bucket.by_reference.get(&key.reference_id).and_then(|corridors| {
                corridors
                    .iter()
                    .find(|c| c.discriminators.matches_within(&key.discriminators, bucket.priority))
            })
        })
    }

    fn len(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|b| b.by_reference.values())
            .map(Vec::len)
            .sum()
    }
}

#[derive(Debug, Default)]
struct Rules {
    tag: RwLock<RuleSet>,
    auto_fee: RwLock<RuleSet>,
}

impl Rules {
    fn of(&self, corridor_type: CorridorType) -> &RwLock<RuleSet> {
        match corridor_type {
            CorridorType::Tag => &self.tag,
            CorridorType::AutoFee => &self.auto_fee,
        }
    }
}

/// Precedence rule engine deciding which flag applies to a directed channel.
///
/// Every corridor type has its own rule set. Within a rule set, corridors are
/// bucketed by priority (the bitmask of the discriminators they set) and a lookup
/// probes the buckets from the most specific to the least specific one.
#[derive(Debug, Clone, Default)]
pub struct CorridorEngine {
    rules: Arc<Rules>,
}

impl CorridorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the live rule set of `corridor_type` with `corridors`.
    pub fn load(&self, corridor_type: CorridorType, corridors: Vec<Corridor>) {
        let staged = RuleSet::build(corridor_type, corridors);
        let count = staged.len();
        *self.rules.of(corridor_type).write() = staged;
        tracing::debug!(?corridor_type, count, "corridor cache swapped");
    }

    /// Reloads the rule set of `corridor_type` from the database.
    pub async fn refresh_corridor_cache_by_type<Db>(&self, db: &Db, corridor_type: CorridorType) -> Result<()>
    where
        Db: TorqDbCorridorOperations + Sync,
    {
        let corridors = db.get_corridors(None, corridor_type).await?;
        self.load(corridor_type, corridors);
        Ok(())
    }

    /// Reloads the rule sets of all corridor types.
    pub async fn refresh_all<Db>(&self, db: &Db) -> Result<()>
    where
        Db: TorqDbCorridorOperations + Sync,
    {
        for corridor_type in CorridorType::ALL {
            self.refresh_corridor_cache_by_type(db, corridor_type).await?;
        }
        Ok(())
    }

    /// Returns the most specific corridor matching the key, or the default corridor of the type.
    pub fn get_best_corridor(&self, key: &CorridorKey) -> Corridor {
        self.rules
            .of(key.corridor_type)
            .read()
            .best(key)
            .cloned()
            .unwrap_or_else(|| Corridor::default_for(key.corridor_type, key.reference_id))
    }

    pub fn get_best_corridor_flag(&self, key: &CorridorKey) -> i32 {
        self.get_best_corridor(key).flag
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use torq_types::prelude::{CorridorDiscriminators, priority};

    use super::*;

    fn corridor(reference_id: i64, discriminators: CorridorDiscriminators, flag: i32) -> Corridor {
        Corridor::new(CorridorType::Tag, reference_id, discriminators, flag)
    }

    fn from_node(node_id: i64) -> CorridorDiscriminators {
        CorridorDiscriminators {
            from_node_id: Some(node_id),
            ..Default::default()
        }
    }

    fn precedence_engine() -> CorridorEngine {
        let engine = CorridorEngine::new();
        engine.load(
            CorridorType::Tag,
            vec![
                corridor(5, from_node(1), 1),
                corridor(
                    5,
                    CorridorDiscriminators {
                        from_node_id: Some(1),
                        channel_id: Some(1),
                        ..Default::default()
                    },
                    0,
                ),
            ],
        );
        engine
    }

    #[rstest]
    #[case(CorridorKey::new(CorridorType::Tag, 5).from_node(1), 1)]
    #[case(CorridorKey::new(CorridorType::Tag, 5).from_node(1).channel(1), 0)]
    #[case(CorridorKey::new(CorridorType::Tag, 5).from_node(3), 0)]
    #[case(CorridorKey::new(CorridorType::Tag, 6).from_node(1), 0)]
    #[case(CorridorKey::new(CorridorType::AutoFee, 5).from_node(1), 0)]
    fn test_corridor_precedence(#[case] key: CorridorKey, #[case] expected: i32) {
        assert_eq!(precedence_engine().get_best_corridor_flag(&key), expected);
    }

    #[test]
    fn test_unmatched_key_gets_default_corridor() {
        let best = precedence_engine().get_best_corridor(&CorridorKey::new(CorridorType::Tag, 5).from_node(3));

        assert_eq!(best.corridor_id, 0);
        assert_eq!(best.priority, 0);
        assert_eq!(best.flag, CorridorType::Tag.default_flag());
    }

    #[test]
    fn test_stored_priority_is_recomputed_and_inverse_ignored() {
        let engine = CorridorEngine::new();
        let mut stale = corridor(5, from_node(1), 1);
        stale.priority = priority::CHANNEL;
        stale.inverse = true;
        engine.load(CorridorType::Tag, vec![stale]);

        let best = engine.get_best_corridor(&CorridorKey::new(CorridorType::Tag, 5).from_node(1));
        assert_eq!(best.priority, priority::FROM_NODE);
        assert!(!best.inverse);
        assert_eq!(best.flag, 1);
    }

    #[test]
    fn test_adding_a_more_specific_match_never_lowers_the_winner() {
        let key = CorridorKey::new(CorridorType::Tag, 9)
            .from_tag(1)
            .from_node(2)
            .to_tag(3)
            .to_node(4)
            .channel(5);
        let full = key.discriminators;

        // every subset of the key's discriminators is a matching rule
        let subsets: Vec<CorridorDiscriminators> = (0u8..32)
            .map(|mask| CorridorDiscriminators {
                from_tag_id: full.from_tag_id.filter(|_| mask & priority::FROM_TAG != 0),
                from_node_id: full.from_node_id.filter(|_| mask & priority::FROM_NODE != 0),
                to_tag_id: full.to_tag_id.filter(|_| mask & priority::TO_TAG != 0),
                to_node_id: full.to_node_id.filter(|_| mask & priority::TO_NODE != 0),
                channel_id: full.channel_id.filter(|_| mask & priority::CHANNEL != 0),
            })
            .collect();

        let engine = CorridorEngine::new();
        let mut rules = Vec::new();
        let mut winner = 0u8;
        for (i, d) in subsets.iter().enumerate() {
            rules.push(corridor(9, *d, i as i32));
            engine.load(CorridorType::Tag, rules.clone());

            let best = engine.get_best_corridor(&key);
            assert!(best.priority >= winner);
            winner = best.priority;
        }
        assert_eq!(winner, 31);
    }

    #[test]
    fn test_refresh_swaps_the_rule_set() {
        let engine = precedence_engine();
        engine.load(CorridorType::Tag, vec![]);

        assert_eq!(
            engine.get_best_corridor_flag(&CorridorKey::new(CorridorType::Tag, 5).from_node(1)),
            0
        );
    }

    #[tokio::test]
    async fn test_refresh_from_database() -> anyhow::Result<()> {
        let db = torq_db::db::TorqDb::new_in_memory().await?;
        db.upsert_corridor(None, corridor(5, from_node(1), 1)).await?;

        let engine = CorridorEngine::new();
        engine.refresh_all(&db).await?;

        assert_eq!(
            engine.get_best_corridor_flag(&CorridorKey::new(CorridorType::Tag, 5).from_node(1)),
            1
        );
        Ok(())
    }
}
