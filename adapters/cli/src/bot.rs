use flower_rush_core::TokenId;
use flower_rush_world::{query, World};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Scripted player that clicks one token per turn.
///
/// With probability `accuracy` the bot aims for a token the order still
/// needs; otherwise it clicks any live token, which usually misses.
#[derive(Debug)]
pub(crate) struct Bot {
    accuracy: f64,
    rng: ChaCha8Rng,
}

impl Bot {
    /// Creates a bot; `accuracy` is clamped to `0.0..=1.0`.
    pub(crate) fn new(accuracy: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            accuracy: accuracy.clamp(0.0, 1.0),
            rng,
        }
    }

    /// Picks the token to activate this turn, if any is on the field.
    pub(crate) fn choose(&mut self, world: &World) -> Option<TokenId> {
        let tokens = query::token_view(world).into_vec();
        if tokens.is_empty() {
            return None;
        }

        let order = query::order(world);
        let wanted: Vec<TokenId> = tokens
            .iter()
            .filter(|token| {
                order
                    .lines()
                    .iter()
                    .any(|line| line.kind().id() == &token.kind && !line.is_fulfilled())
            })
            .map(|token| token.id)
            .collect();

        if !wanted.is_empty() && self.rng.gen_bool(self.accuracy) {
            return wanted.choose(&mut self.rng).copied();
        }
        tokens.choose(&mut self.rng).map(|token| token.id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use flower_rush_core::{
        Command, DifficultyConfig, DifficultyKey, FieldPosition, FlowerKind, FlowerKindId, Order,
        OrderLine, Timestamp,
    };
    use flower_rush_world as world;

    use super::*;

    fn field_with(kinds: &[&str]) -> World {
        let order = Order::new(vec![OrderLine::new(FlowerKind::new("rose", "Rose", "🌹"), 2)])
            .expect("valid order");
        let mut world = World::new();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::StartSession {
                difficulty: DifficultyKey::Easy,
                config: DifficultyConfig::easy(),
                order,
                now: Timestamp::ZERO,
            },
            &mut events,
        );
        for kind in kinds {
            world::apply(
                &mut world,
                Command::SpawnToken {
                    kind: FlowerKindId::new(*kind),
                    position: FieldPosition::new(50, 50),
                    size: 30,
                    ttl: Duration::from_secs(2),
                },
                &mut events,
            );
        }
        world
    }

    fn kind_of(world: &World, token: TokenId) -> FlowerKindId {
        query::token_view(world)
            .iter()
            .find(|snapshot| snapshot.id == token)
            .map(|snapshot| snapshot.kind.clone())
            .expect("chosen token is live")
    }

    #[test]
    fn perfect_bot_always_picks_wanted_kind() {
        let world = field_with(&["tulip", "daisy", "rose", "lily"]);
        let mut bot = Bot::new(1.0, Some(5));

        for _ in 0..20 {
            let token = bot.choose(&world).expect("field has tokens");
            assert_eq!(kind_of(&world, token).as_str(), "rose");
        }
    }

    #[test]
    fn empty_field_yields_nothing() {
        let world = field_with(&[]);
        let mut bot = Bot::new(0.5, Some(1));
        assert_eq!(bot.choose(&world), None);
    }

    #[test]
    fn clicks_decoys_when_nothing_is_wanted() {
        let world = field_with(&["tulip"]);
        let mut bot = Bot::new(1.0, Some(2));
        let token = bot.choose(&world).expect("field has a token");
        assert_eq!(kind_of(&world, token).as_str(), "tulip");
    }
}
