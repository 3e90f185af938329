//! Player state, resource hands, development cards, and building costs.

use crate::board::{EdgeId, NodeId, PlayerId, Resource};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Settlement pieces per player
pub const MAX_SETTLEMENTS: usize = 5;
/// City pieces per player
pub const MAX_CITIES: usize = 4;
/// Road pieces per player
pub const MAX_ROADS: usize = 15;

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DevelopmentCard {
    /// Move robber and steal, counts toward Largest Army
    Knight,
    /// Worth 1 VP, hidden from opponents, never "played"
    VictoryPoint,
    /// Build up to 2 roads for free
    RoadBuilding,
    /// Take any 2 resources from the bank
    YearOfPlenty,
    /// Take all of one resource type from every other player
    Monopoly,
}

impl DevelopmentCard {
    /// The standard 25-card deck: 14 knights, 5 victory points, 2 each of
    /// the progress cards.
    pub fn standard_deck() -> Vec<DevelopmentCard> {
        let mut deck = Vec::with_capacity(25);
        deck.extend(std::iter::repeat(DevelopmentCard::Knight).take(14));
        deck.extend(std::iter::repeat(DevelopmentCard::VictoryPoint).take(5));
        deck.extend(std::iter::repeat(DevelopmentCard::RoadBuilding).take(2));
        deck.extend(std::iter::repeat(DevelopmentCard::YearOfPlenty).take(2));
        deck.extend(std::iter::repeat(DevelopmentCard::Monopoly).take(2));
        deck
    }

    /// Whether this card can be played (VP cards are only counted)
    pub fn is_playable(&self) -> bool {
        !matches!(self, DevelopmentCard::VictoryPoint)
    }
}

/// A hand of resource cards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    pub wood: u32,
    pub brick: u32,
    pub sheep: u32,
    pub wheat: u32,
    pub ore: u32,
}

impl ResourceHand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_amounts(wood: u32, brick: u32, sheep: u32, wheat: u32, ore: u32) -> Self {
        Self {
            wood,
            brick,
            sheep,
            wheat,
            ore,
        }
    }

    /// A hand holding a single resource type
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    pub fn total(&self) -> u32 {
        self.wood + self.brick + self.sheep + self.wheat + self.ore
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Brick => self.brick,
            Resource::Sheep => self.sheep,
            Resource::Wheat => self.wheat,
            Resource::Ore => self.ore,
        }
    }

    pub fn set(&mut self, resource: Resource, count: u32) {
        match resource {
            Resource::Wood => self.wood = count,
            Resource::Brick => self.brick = count,
            Resource::Sheep => self.sheep = count,
            Resource::Wheat => self.wheat = count,
            Resource::Ore => self.ore = count,
        }
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        self.set(resource, self.get(resource) + amount);
    }

    pub fn add_hand(&mut self, other: &ResourceHand) {
        for resource in Resource::ALL {
            self.add(resource, other.get(resource));
        }
    }

    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL.iter().all(|&r| self.get(r) >= cost.get(r))
    }

    /// Subtract a cost (panics if insufficient; callers validate first)
    pub fn subtract(&mut self, cost: &ResourceHand) {
        assert!(self.can_afford(cost), "cannot afford this cost");
        for resource in Resource::ALL {
            self.set(resource, self.get(resource) - cost.get(resource));
        }
    }

    /// Remove one uniformly-random card (robber steal). Returns `None`
    /// on an empty hand.
    pub fn steal_random<R: Rng>(&mut self, rng: &mut R) -> Option<Resource> {
        let mut cards: Vec<Resource> = Vec::with_capacity(self.total() as usize);
        for resource in Resource::ALL {
            cards.extend(std::iter::repeat(resource).take(self.get(resource) as usize));
        }
        let stolen = *cards.choose(rng)?;
        self.set(stolen, self.get(stolen) - 1);
        Some(stolen)
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// Road: 1 wood, 1 brick
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// Settlement: 1 wood, 1 brick, 1 sheep, 1 wheat
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 1, 1, 0)
    }

    /// City upgrade: 2 wheat, 3 ore
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 0, 2, 3)
    }

    /// Development card: 1 sheep, 1 wheat, 1 ore
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// A single player's state. Board ownership is tracked as sets of arena
/// ids; piece limits derive from the set sizes (a city upgrade frees the
/// settlement piece).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub resources: ResourceHand,
    /// Nodes carrying this player's settlements
    pub settlements: BTreeSet<NodeId>,
    /// Nodes carrying this player's cities
    pub cities: BTreeSet<NodeId>,
    /// Edges carrying this player's roads
    pub roads: BTreeSet<EdgeId>,
    /// Development cards in hand (playable)
    pub dev_cards: Vec<DevelopmentCard>,
    /// Cards bought this turn; promoted to `dev_cards` at end of turn
    pub dev_cards_bought_this_turn: Vec<DevelopmentCard>,
    /// Knights played so far (Largest Army)
    pub knights_played: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            resources: ResourceHand::new(),
            settlements: BTreeSet::new(),
            cities: BTreeSet::new(),
            roads: BTreeSet::new(),
            dev_cards: Vec::new(),
            dev_cards_bought_this_turn: Vec::new(),
            knights_played: 0,
        }
    }

    pub fn settlements_remaining(&self) -> usize {
        MAX_SETTLEMENTS - self.settlements.len()
    }

    pub fn cities_remaining(&self) -> usize {
        MAX_CITIES - self.cities.len()
    }

    pub fn roads_remaining(&self) -> usize {
        MAX_ROADS - self.roads.len()
    }

    /// Victory-point cards held, counting cards bought this turn (they
    /// score even though they cannot be played).
    pub fn victory_point_cards(&self) -> u32 {
        self.dev_cards
            .iter()
            .chain(self.dev_cards_bought_this_turn.iter())
            .filter(|c| matches!(c, DevelopmentCard::VictoryPoint))
            .count() as u32
    }

    /// Whether a card of this type is in the playable hand (not bought
    /// this turn).
    pub fn has_playable_card(&self, card: DevelopmentCard) -> bool {
        self.dev_cards.contains(&card)
    }

    /// Remove a card of this type from the playable hand; knights count
    /// toward Largest Army when played.
    pub fn play_card(&mut self, card: DevelopmentCard) -> bool {
        if let Some(pos) = self.dev_cards.iter().position(|c| *c == card) {
            self.dev_cards.remove(pos);
            if card == DevelopmentCard::Knight {
                self.knights_played += 1;
            }
            true
        } else {
            false
        }
    }

    /// End of turn: bought cards become playable
    pub fn promote_bought_cards(&mut self) {
        self.dev_cards.append(&mut self.dev_cards_bought_this_turn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_total_and_empty() {
        let hand = ResourceHand::with_amounts(1, 2, 3, 4, 5);
        assert_eq!(hand.total(), 15);
        assert!(!hand.is_empty());
        assert!(ResourceHand::new().is_empty());
    }

    #[test]
    fn test_hand_can_afford_and_subtract() {
        let mut hand = ResourceHand::with_amounts(2, 2, 2, 2, 2);
        let cost = costs::settlement();
        assert!(hand.can_afford(&cost));
        hand.subtract(&cost);
        assert_eq!(hand, ResourceHand::with_amounts(1, 1, 1, 1, 2));

        assert!(!hand.can_afford(&ResourceHand::with_amounts(2, 0, 0, 0, 0)));
    }

    #[test]
    fn test_building_costs() {
        assert_eq!(costs::road().total(), 2);
        assert_eq!(costs::settlement().total(), 4);
        assert_eq!(costs::city().total(), 5);
        assert_eq!(costs::development_card().total(), 3);
    }

    #[test]
    fn test_standard_deck_composition() {
        let deck = DevelopmentCard::standard_deck();
        assert_eq!(deck.len(), 25);
        let count = |card| deck.iter().filter(|c| **c == card).count();
        assert_eq!(count(DevelopmentCard::Knight), 14);
        assert_eq!(count(DevelopmentCard::VictoryPoint), 5);
        assert_eq!(count(DevelopmentCard::RoadBuilding), 2);
        assert_eq!(count(DevelopmentCard::YearOfPlenty), 2);
        assert_eq!(count(DevelopmentCard::Monopoly), 2);
    }

    #[test]
    fn test_steal_random_single_card() {
        let mut hand = ResourceHand::single(Resource::Wheat, 1);
        let mut rng = rand::thread_rng();
        assert_eq!(hand.steal_random(&mut rng), Some(Resource::Wheat));
        assert!(hand.is_empty());
        assert_eq!(hand.steal_random(&mut rng), None);
    }

    #[test]
    fn test_piece_accounting() {
        let mut player = Player::new(0, "Test".to_string());
        assert_eq!(player.settlements_remaining(), 5);
        assert_eq!(player.cities_remaining(), 4);
        assert_eq!(player.roads_remaining(), 15);

        player.settlements.insert(10);
        player.cities.insert(11);
        player.roads.insert(3);
        assert_eq!(player.settlements_remaining(), 4);
        assert_eq!(player.cities_remaining(), 3);
        assert_eq!(player.roads_remaining(), 14);
    }

    #[test]
    fn test_bought_cards_not_playable_until_promoted() {
        let mut player = Player::new(0, "Test".to_string());
        player
            .dev_cards_bought_this_turn
            .push(DevelopmentCard::Knight);

        assert!(!player.has_playable_card(DevelopmentCard::Knight));
        player.promote_bought_cards();
        assert!(player.has_playable_card(DevelopmentCard::Knight));
        assert!(player.dev_cards_bought_this_turn.is_empty());
    }

    #[test]
    fn test_play_knight_counts_toward_army() {
        let mut player = Player::new(0, "Test".to_string());
        player.dev_cards.push(DevelopmentCard::Knight);

        assert!(player.play_card(DevelopmentCard::Knight));
        assert_eq!(player.knights_played, 1);
        assert!(!player.play_card(DevelopmentCard::Knight));
    }

    #[test]
    fn test_victory_point_cards_count_hidden_and_bought() {
        let mut player = Player::new(0, "Test".to_string());
        player.dev_cards.push(DevelopmentCard::VictoryPoint);
        player
            .dev_cards_bought_this_turn
            .push(DevelopmentCard::VictoryPoint);
        assert_eq!(player.victory_point_cards(), 2);
    }
}
