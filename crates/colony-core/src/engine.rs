//! The rules engine: validates and applies commands.
//!
//! Every command either fully applies, returning the events it caused,
//! or fails with a [`GameError`] leaving the state untouched. Handlers
//! therefore validate everything up front and only then mutate.

use crate::actions::{Command, GameEvent, PendingTrade, TradeOffer};
use crate::board::{EdgeId, NodeId, PlayerId, Resource, TileId};
use crate::player::{costs, DevelopmentCard, ResourceHand};
use crate::state::{GameConfig, GameState, Phase, TurnPhase};
use crate::trade;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum qualifying road length for the Longest Road award
pub const LONGEST_ROAD_THRESHOLD: u32 = 5;
/// Minimum knights played for the Largest Army award
pub const LARGEST_ARMY_THRESHOLD: u32 = 3;
/// Hand size above which a 7 forces a discard
pub const DISCARD_LIMIT: u32 = 7;

/// Why a command was rejected. All variants are caller errors; none is
/// retryable without changing the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("command is not legal in the current phase")]
    InvalidPhase,
    #[error("it is not this player's turn")]
    NotCurrentPlayer,
    #[error("placement violates the board rules")]
    IllegalPlacement,
    #[error("player cannot afford this")]
    InsufficientResources,
    #[error("no pieces of that kind remain")]
    BuildingLimitReached,
    #[error("target is invalid for this command")]
    InvalidTarget,
    #[error("player does not hold that card")]
    CardNotHeld,
    #[error("the development deck is empty")]
    DeckEmpty,
}

pub type GameResult = Result<Vec<GameEvent>, GameError>;

/// The engine owns the state and the random source. One command is
/// applied to completion before the next is accepted.
#[derive(Debug)]
pub struct Engine {
    state: GameState,
    rng: StdRng,
}

impl Engine {
    /// Start a new game with an entropy-seeded random source
    pub fn new(config: GameConfig, player_names: Vec<String>) -> Self {
        Self::with_seed(config, player_names, rand::random())
    }

    /// Start a new game with a fixed seed. Identical seeds and command
    /// sequences replay identically.
    pub fn with_seed(config: GameConfig, player_names: Vec<String>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let state = GameState::new(config, player_names, &mut rng);
        Self { state, rng }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    // ==================== Command Dispatch ====================

    /// Apply a command issued by `player`
    pub fn apply(&mut self, player: PlayerId, command: Command) -> GameResult {
        if self.state.is_finished() {
            return Err(GameError::InvalidPhase);
        }
        if self.state.player(player).is_none() {
            return Err(GameError::InvalidTarget);
        }

        match command {
            Command::PlaceInitialSettlement(node) => self.place_initial_settlement(player, node),
            Command::PlaceInitialRoad(edge) => self.place_initial_road(player, edge),
            Command::RollDice => self.roll_dice(player),
            Command::DiscardCards(cards) => self.discard_cards(player, cards),
            Command::MoveRobber { tile, victim } => self.move_robber(player, tile, victim),
            Command::BuildRoad(edge) => self.build_road(player, edge),
            Command::BuildSettlement(node) => self.build_settlement(player, node),
            Command::BuildCity(node) => self.build_city(player, node),
            Command::BuyDevelopmentCard => self.buy_development_card(player),
            Command::PlayKnight => self.play_knight(player),
            Command::PlayRoadBuilding { first, second } => {
                self.play_road_building(player, first, second)
            }
            Command::PlayYearOfPlenty(a, b) => self.play_year_of_plenty(player, a, b),
            Command::PlayMonopoly(resource) => self.play_monopoly(player, resource),
            Command::TradeWithBank { give, receive } => self.trade_with_bank(player, give, receive),
            Command::ProposeTrade(offer) => self.propose_trade(player, offer),
            Command::AcceptTrade => self.accept_trade(player),
            Command::RejectTrade => self.reject_trade(player),
            Command::CancelTrade => self.cancel_trade(player),
            Command::EndTurn => self.end_turn(player),
        }
    }

    fn require_current(&self, player: PlayerId) -> Result<(), GameError> {
        if self.state.current_player != player {
            return Err(GameError::NotCurrentPlayer);
        }
        Ok(())
    }

    fn require_actions_phase(&self, player: PlayerId) -> Result<(), GameError> {
        if self.state.phase != Phase::MainGame || self.state.turn_phase != TurnPhase::Actions {
            return Err(GameError::InvalidPhase);
        }
        self.require_current(player)
    }

    // ==================== Setup ====================

    fn place_initial_settlement(&mut self, player: PlayerId, node: NodeId) -> GameResult {
        if self.state.phase != Phase::Setup || self.state.setup_settlement.is_some() {
            return Err(GameError::InvalidPhase);
        }
        self.require_current(player)?;
        if self.state.players[player as usize].settlements.len() >= self.state.setup_round as usize
        {
            return Err(GameError::InvalidPhase);
        }
        let node_ref = self.state.board.node(node).ok_or(GameError::InvalidTarget)?;
        if node_ref.building.owner().is_some() || !self.state.board.satisfies_distance_rule(node) {
            return Err(GameError::IllegalPlacement);
        }

        let adjacent_tiles = node_ref.adjacent_tiles.clone();
        self.state.board.place_settlement(node, player);
        self.state.players[player as usize].settlements.insert(node);
        self.state.setup_settlement = Some(node);

        let mut events = vec![GameEvent::SettlementPlaced { player, node }];

        // The round-2 settlement is the only one that produces starting
        // resources: one card per adjacent non-desert tile.
        if self.state.setup_round == 2 {
            let mut granted: Vec<(PlayerId, Resource, u32)> = Vec::new();
            for tile_id in adjacent_tiles {
                if let Some(resource) = self.state.board.tiles()[tile_id].resource {
                    self.state.players[player as usize].resources.add(resource, 1);
                    granted.push((player, resource, 1));
                }
            }
            if !granted.is_empty() {
                events.push(GameEvent::ResourcesDistributed {
                    distributions: granted,
                });
            }
        }

        Ok(events)
    }

    fn place_initial_road(&mut self, player: PlayerId, edge: EdgeId) -> GameResult {
        if self.state.phase != Phase::Setup {
            return Err(GameError::InvalidPhase);
        }
        self.require_current(player)?;
        let settlement = self.state.setup_settlement.ok_or(GameError::InvalidPhase)?;
        let edge_ref = self.state.board.edge(edge).ok_or(GameError::InvalidTarget)?;
        if edge_ref.road.is_some() {
            return Err(GameError::IllegalPlacement);
        }
        if !edge_ref.nodes.contains(&settlement) {
            return Err(GameError::IllegalPlacement);
        }

        self.state.board.place_road(edge, player);
        self.state.players[player as usize].roads.insert(edge);
        self.state.setup_settlement = None;
        self.advance_setup_draft();

        Ok(vec![GameEvent::RoadPlaced { player, edge }])
    }

    /// Snake draft: forward in round 1, the last player goes twice, then
    /// reverse in round 2 until player 0 finishes the game setup.
    fn advance_setup_draft(&mut self) {
        let last = (self.state.player_count() - 1) as PlayerId;
        if self.state.setup_direction > 0 {
            if self.state.current_player == last {
                self.state.setup_round = 2;
                self.state.setup_direction = -1;
            } else {
                self.state.current_player += 1;
            }
        } else if self.state.current_player == 0 {
            self.state.phase = Phase::MainGame;
            self.state.turn_phase = TurnPhase::DiceRoll;
            self.state.turn_number = 1;
        } else {
            self.state.current_player -= 1;
        }
    }

    // ==================== Dice and Robber ====================

    fn roll_dice(&mut self, player: PlayerId) -> GameResult {
        if self.state.phase != Phase::MainGame || self.state.turn_phase != TurnPhase::DiceRoll {
            return Err(GameError::InvalidPhase);
        }
        self.require_current(player)?;

        let die1: u8 = self.rng.gen_range(1..=6);
        let die2: u8 = self.rng.gen_range(1..=6);
        let total = die1 + die2;
        self.state.dice_roll = Some((die1, die2));

        let mut events = vec![GameEvent::DiceRolled {
            player,
            die1,
            die2,
            total,
        }];

        if total == 7 {
            self.state.pending_discards = self
                .state
                .players
                .iter()
                .filter(|p| p.resources.total() > DISCARD_LIMIT)
                .map(|p| (p.id, p.resources.total() / 2))
                .collect();
            self.state.turn_phase = if self.state.pending_discards.is_empty() {
                TurnPhase::RobberPlacement
            } else {
                TurnPhase::DiscardCards
            };
        } else {
            let produced = self.state.board.resources_for_roll(total);
            let mut distributions = Vec::new();
            for id in 0..self.state.player_count() as PlayerId {
                if let Some(by_resource) = produced.get(&id) {
                    for resource in Resource::ALL {
                        if let Some(&count) = by_resource.get(&resource) {
                            self.state.players[id as usize].resources.add(resource, count);
                            distributions.push((id, resource, count));
                        }
                    }
                }
            }
            if !distributions.is_empty() {
                events.push(GameEvent::ResourcesDistributed { distributions });
            }
            self.state.turn_phase = TurnPhase::Actions;
        }

        Ok(events)
    }

    fn discard_cards(&mut self, player: PlayerId, cards: ResourceHand) -> GameResult {
        if self.state.turn_phase != TurnPhase::DiscardCards {
            return Err(GameError::InvalidPhase);
        }
        let required = *self
            .state
            .pending_discards
            .get(&player)
            .ok_or(GameError::InvalidPhase)?;
        if cards.total() != required {
            return Err(GameError::InvalidTarget);
        }
        if !self.state.players[player as usize].resources.can_afford(&cards) {
            return Err(GameError::CardNotHeld);
        }

        self.state.players[player as usize].resources.subtract(&cards);
        self.state.pending_discards.remove(&player);
        if self.state.pending_discards.is_empty() {
            self.state.turn_phase = TurnPhase::RobberPlacement;
        }

        Ok(vec![GameEvent::CardsDiscarded {
            player,
            count: required,
        }])
    }

    fn move_robber(
        &mut self,
        player: PlayerId,
        tile: TileId,
        victim: Option<PlayerId>,
    ) -> GameResult {
        if self.state.turn_phase != TurnPhase::RobberPlacement {
            return Err(GameError::InvalidPhase);
        }
        self.require_current(player)?;
        if self.state.board.tile(tile).is_none() || tile == self.state.board.robber_tile() {
            return Err(GameError::InvalidTarget);
        }
        if let Some(v) = victim {
            if v == player || self.state.player(v).is_none() {
                return Err(GameError::InvalidTarget);
            }
            if !self.state.board.players_adjacent_to_tile(tile).contains(&v) {
                return Err(GameError::InvalidTarget);
            }
        }

        self.state.board.move_robber(tile);
        self.state.turn_phase = TurnPhase::Actions;

        let mut events = vec![GameEvent::RobberMoved {
            player,
            tile,
            victim,
        }];
        if let Some(v) = victim {
            let stolen = self.state.players[v as usize]
                .resources
                .steal_random(&mut self.rng);
            if let Some(resource) = stolen {
                self.state.players[player as usize].resources.add(resource, 1);
            }
            events.push(GameEvent::ResourceStolen {
                thief: player,
                victim: v,
                resource: stolen,
            });
        }

        Ok(events)
    }

    // ==================== Building ====================

    fn build_road(&mut self, player: PlayerId, edge: EdgeId) -> GameResult {
        self.require_actions_phase(player)?;
        if self.state.players[player as usize].roads_remaining() == 0 {
            return Err(GameError::BuildingLimitReached);
        }
        let edge_ref = self.state.board.edge(edge).ok_or(GameError::InvalidTarget)?;
        if edge_ref.road.is_some() || !self.state.board.is_connected_to_network(edge, player) {
            return Err(GameError::IllegalPlacement);
        }
        let cost = costs::road();
        if !self.state.players[player as usize].resources.can_afford(&cost) {
            return Err(GameError::InsufficientResources);
        }

        self.state.players[player as usize].resources.subtract(&cost);
        self.state.board.place_road(edge, player);
        self.state.players[player as usize].roads.insert(edge);

        let mut events = vec![GameEvent::RoadPlaced { player, edge }];
        self.check_longest_road(&mut events);
        self.check_victory(&mut events);
        Ok(events)
    }

    fn build_settlement(&mut self, player: PlayerId, node: NodeId) -> GameResult {
        self.require_actions_phase(player)?;
        if self.state.players[player as usize].settlements_remaining() == 0 {
            return Err(GameError::BuildingLimitReached);
        }
        let node_ref = self.state.board.node(node).ok_or(GameError::InvalidTarget)?;
        if node_ref.building.owner().is_some()
            || !self.state.board.satisfies_distance_rule(node)
            || !self.state.board.is_connected_to_road(node, player)
        {
            return Err(GameError::IllegalPlacement);
        }
        let cost = costs::settlement();
        if !self.state.players[player as usize].resources.can_afford(&cost) {
            return Err(GameError::InsufficientResources);
        }

        self.state.players[player as usize].resources.subtract(&cost);
        self.state.board.place_settlement(node, player);
        self.state.players[player as usize].settlements.insert(node);

        let mut events = vec![GameEvent::SettlementPlaced { player, node }];
        // A new settlement can sever an opponent's road
        self.check_longest_road(&mut events);
        self.check_victory(&mut events);
        Ok(events)
    }

    fn build_city(&mut self, player: PlayerId, node: NodeId) -> GameResult {
        self.require_actions_phase(player)?;
        if self.state.players[player as usize].cities_remaining() == 0 {
            return Err(GameError::BuildingLimitReached);
        }
        let node_ref = self.state.board.node(node).ok_or(GameError::InvalidTarget)?;
        if node_ref.building != crate::board::Building::Settlement(player) {
            return Err(GameError::IllegalPlacement);
        }
        let cost = costs::city();
        if !self.state.players[player as usize].resources.can_afford(&cost) {
            return Err(GameError::InsufficientResources);
        }

        self.state.players[player as usize].resources.subtract(&cost);
        self.state.board.upgrade_to_city(node, player);
        self.state.players[player as usize].settlements.remove(&node);
        self.state.players[player as usize].cities.insert(node);

        let mut events = vec![GameEvent::CityUpgraded { player, node }];
        self.check_victory(&mut events);
        Ok(events)
    }

    // ==================== Development Cards ====================

    fn buy_development_card(&mut self, player: PlayerId) -> GameResult {
        self.require_actions_phase(player)?;
        if self.state.dev_deck_remaining() == 0 {
            return Err(GameError::DeckEmpty);
        }
        let cost = costs::development_card();
        if !self.state.players[player as usize].resources.can_afford(&cost) {
            return Err(GameError::InsufficientResources);
        }

        self.state.players[player as usize].resources.subtract(&cost);
        let card = self.state.dev_deck[self.state.dev_deck_cursor];
        self.state.dev_deck_cursor += 1;
        self.state.players[player as usize]
            .dev_cards_bought_this_turn
            .push(card);

        Ok(vec![GameEvent::DevelopmentCardPurchased { player }])
    }

    /// Common checks for playing a development card: actions phase,
    /// card held (and not bought this turn), one play of each kind per
    /// turn.
    fn validate_card_play(&self, player: PlayerId, card: DevelopmentCard) -> Result<(), GameError> {
        self.require_actions_phase(player)?;
        if self.state.cards_played_this_turn.contains(&card) {
            return Err(GameError::InvalidPhase);
        }
        if !self.state.players[player as usize].has_playable_card(card) {
            return Err(GameError::CardNotHeld);
        }
        Ok(())
    }

    fn play_knight(&mut self, player: PlayerId) -> GameResult {
        self.validate_card_play(player, DevelopmentCard::Knight)?;

        self.state.players[player as usize].play_card(DevelopmentCard::Knight);
        self.state.cards_played_this_turn.insert(DevelopmentCard::Knight);
        self.state.turn_phase = TurnPhase::RobberPlacement;

        let mut events = vec![GameEvent::KnightPlayed { player }];
        self.check_largest_army(player, &mut events);
        self.check_victory(&mut events);
        Ok(events)
    }

    fn play_road_building(
        &mut self,
        player: PlayerId,
        first: EdgeId,
        second: Option<EdgeId>,
    ) -> GameResult {
        self.validate_card_play(player, DevelopmentCard::RoadBuilding)?;
        let needed = 1 + second.is_some() as usize;
        if self.state.players[player as usize].roads_remaining() < needed {
            return Err(GameError::BuildingLimitReached);
        }

        let board = &self.state.board;
        let first_ref = board.edge(first).ok_or(GameError::InvalidTarget)?;
        if first_ref.road.is_some() || !board.is_connected_to_network(first, player) {
            return Err(GameError::IllegalPlacement);
        }
        // The second road is judged as if the first were already placed,
        // so it may hang off the first through an unblocked shared node.
        if let Some(second) = second {
            if second == first {
                return Err(GameError::InvalidTarget);
            }
            let second_ref = board.edge(second).ok_or(GameError::InvalidTarget)?;
            if second_ref.road.is_some() {
                return Err(GameError::IllegalPlacement);
            }
            let extends_first = first_ref.nodes.iter().any(|&n| {
                second_ref.nodes.contains(&n)
                    && board.nodes()[n].building.owner().map_or(true, |o| o == player)
            });
            if !board.is_connected_to_network(second, player) && !extends_first {
                return Err(GameError::IllegalPlacement);
            }
        }

        self.state.players[player as usize].play_card(DevelopmentCard::RoadBuilding);
        self.state
            .cards_played_this_turn
            .insert(DevelopmentCard::RoadBuilding);

        let mut events = vec![GameEvent::RoadBuildingPlayed { player }];
        for edge in std::iter::once(first).chain(second) {
            self.state.board.place_road(edge, player);
            self.state.players[player as usize].roads.insert(edge);
            events.push(GameEvent::RoadPlaced { player, edge });
        }

        self.check_longest_road(&mut events);
        self.check_victory(&mut events);
        Ok(events)
    }

    fn play_year_of_plenty(&mut self, player: PlayerId, a: Resource, b: Resource) -> GameResult {
        self.validate_card_play(player, DevelopmentCard::YearOfPlenty)?;

        self.state.players[player as usize].play_card(DevelopmentCard::YearOfPlenty);
        self.state
            .cards_played_this_turn
            .insert(DevelopmentCard::YearOfPlenty);
        self.state.players[player as usize].resources.add(a, 1);
        self.state.players[player as usize].resources.add(b, 1);

        Ok(vec![GameEvent::YearOfPlentyPlayed {
            player,
            resources: (a, b),
        }])
    }

    fn play_monopoly(&mut self, player: PlayerId, resource: Resource) -> GameResult {
        self.validate_card_play(player, DevelopmentCard::Monopoly)?;

        self.state.players[player as usize].play_card(DevelopmentCard::Monopoly);
        self.state
            .cards_played_this_turn
            .insert(DevelopmentCard::Monopoly);

        let mut total_taken = 0;
        for id in 0..self.state.player_count() {
            if id as PlayerId == player {
                continue;
            }
            let held = self.state.players[id].resources.get(resource);
            self.state.players[id].resources.set(resource, 0);
            total_taken += held;
        }
        self.state.players[player as usize]
            .resources
            .add(resource, total_taken);

        Ok(vec![GameEvent::MonopolyPlayed {
            player,
            resource,
            total_taken,
        }])
    }

    // ==================== Trading ====================

    fn trade_with_bank(
        &mut self,
        player: PlayerId,
        give: ResourceHand,
        receive: ResourceHand,
    ) -> GameResult {
        self.require_actions_phase(player)?;
        if !self.state.players[player as usize].resources.can_afford(&give) {
            return Err(GameError::InsufficientResources);
        }
        if !trade::validate_bank_trade(&self.state, player, &give, &receive) {
            return Err(GameError::InvalidTarget);
        }

        trade::execute_bank_trade(&mut self.state, player, &give, &receive);
        Ok(vec![GameEvent::BankTradeCompleted {
            player,
            gave: give,
            received: receive,
        }])
    }

    fn propose_trade(&mut self, player: PlayerId, offer: TradeOffer) -> GameResult {
        self.require_actions_phase(player)?;
        if self.state.pending_trade.is_some() {
            return Err(GameError::InvalidTarget);
        }
        if offer.from != player
            || self.state.player(offer.to).is_none()
            || !offer.is_well_formed()
        {
            return Err(GameError::InvalidTarget);
        }
        if !self.state.players[player as usize].resources.can_afford(&offer.give) {
            return Err(GameError::InsufficientResources);
        }

        self.state.pending_trade = Some(PendingTrade {
            offer: offer.clone(),
            expires_on_turn: self.state.turn_number,
        });
        Ok(vec![GameEvent::TradeProposed { offer }])
    }

    fn accept_trade(&mut self, player: PlayerId) -> GameResult {
        let pending = self
            .state
            .pending_trade
            .as_ref()
            .ok_or(GameError::InvalidTarget)?;
        if pending.offer.to != player || self.state.turn_number > pending.expires_on_turn {
            return Err(GameError::InvalidTarget);
        }
        // Hands may have changed since the offer was made
        if !trade::both_sides_can_pay(&self.state, &pending.offer) {
            return Err(GameError::InsufficientResources);
        }

        let offer = pending.offer.clone();
        trade::execute_peer_trade(&mut self.state, &offer);
        self.state.pending_trade = None;
        Ok(vec![GameEvent::TradeAccepted {
            from: offer.from,
            to: offer.to,
        }])
    }

    fn reject_trade(&mut self, player: PlayerId) -> GameResult {
        let pending = self
            .state
            .pending_trade
            .as_ref()
            .ok_or(GameError::InvalidTarget)?;
        if pending.offer.to != player {
            return Err(GameError::InvalidTarget);
        }

        self.state.pending_trade = None;
        Ok(vec![GameEvent::TradeRejected { by: player }])
    }

    fn cancel_trade(&mut self, player: PlayerId) -> GameResult {
        let pending = self
            .state
            .pending_trade
            .as_ref()
            .ok_or(GameError::InvalidTarget)?;
        if pending.offer.from != player {
            return Err(GameError::InvalidTarget);
        }

        self.state.pending_trade = None;
        Ok(vec![GameEvent::TradeCancelled])
    }

    // ==================== Turn End ====================

    fn end_turn(&mut self, player: PlayerId) -> GameResult {
        self.require_actions_phase(player)?;

        self.state.pending_trade = None;
        self.state.players[player as usize].promote_bought_cards();
        self.state.cards_played_this_turn.clear();
        self.state.dice_roll = None;

        let next = (player + 1) % self.state.player_count() as PlayerId;
        self.state.current_player = next;
        self.state.turn_number += 1;
        self.state.turn_phase = TurnPhase::DiceRoll;

        let mut events = vec![GameEvent::TurnEnded {
            player,
            next_player: next,
        }];
        self.check_victory(&mut events);
        Ok(events)
    }

    // ==================== Awards and Victory ====================

    /// Recompute Longest Road for all players and re-award it. A tie
    /// never takes the award from the holder unless configured to.
    fn check_longest_road(&mut self, events: &mut Vec<GameEvent>) {
        let lengths: Vec<u32> = (0..self.state.player_count() as PlayerId)
            .map(|p| self.state.board.longest_road(p))
            .collect();

        let previous = self.state.longest_road_owner;
        let mut owner = previous;
        let mut owner_len = owner.map_or(0, |o| lengths[o as usize]);
        if owner_len < LONGEST_ROAD_THRESHOLD {
            owner = None;
            owner_len = 0;
        }

        for (id, &len) in lengths.iter().enumerate() {
            let id = id as PlayerId;
            if Some(id) == owner || len < LONGEST_ROAD_THRESHOLD {
                continue;
            }
            let beats = len > owner_len
                || (self.state.config.transfer_awards_on_tie
                    && owner.is_some()
                    && len == owner_len);
            if beats {
                owner = Some(id);
                owner_len = len;
            }
        }

        self.state.longest_road_owner = owner;
        self.state.longest_road_length = owner_len;
        if owner != previous {
            events.push(GameEvent::LongestRoadChanged {
                previous,
                current: owner,
                length: owner_len,
            });
        }
    }

    /// Re-evaluate Largest Army after `player` plays a knight
    fn check_largest_army(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) {
        let knights = self.state.players[player as usize].knights_played;
        if knights < LARGEST_ARMY_THRESHOLD {
            return;
        }
        let previous = self.state.largest_army_owner;
        let takes = match previous {
            None => true,
            Some(holder) if holder == player => false,
            Some(holder) => {
                let holder_knights = self.state.players[holder as usize].knights_played;
                knights > holder_knights
                    || (self.state.config.transfer_awards_on_tie && knights == holder_knights)
            }
        };
        if takes {
            self.state.largest_army_owner = Some(player);
            events.push(GameEvent::LargestArmyChanged {
                previous,
                current: Some(player),
                knights,
            });
        }
    }

    /// End the game the moment any player reaches the threshold. The
    /// current player is checked first since their action triggered it.
    fn check_victory(&mut self, events: &mut Vec<GameEvent>) {
        if self.state.is_finished() {
            return;
        }
        let n = self.state.player_count() as PlayerId;
        let current = self.state.current_player;
        for offset in 0..n {
            let id = (current + offset) % n;
            let vp = self.state.victory_points(id);
            if vp >= self.state.config.victory_threshold {
                self.state.phase = Phase::GameOver { winner: id };
                events.push(GameEvent::GameWon {
                    player: id,
                    victory_points: vp,
                });
                return;
            }
        }
    }

    // ==================== Legal Move Enumeration ====================

    /// Every command `player` could legally issue right now. Peer trade
    /// proposals are open-ended and not enumerated; discards are
    /// represented by one canonical largest-pile-first hand.
    pub fn valid_commands(&self, player: PlayerId) -> Vec<Command> {
        let state = &self.state;
        let mut commands = Vec::new();
        if state.is_finished() || state.player(player).is_none() {
            return commands;
        }

        if let Some(pending) = &state.pending_trade {
            if pending.offer.to == player && state.turn_number <= pending.expires_on_turn {
                if trade::both_sides_can_pay(state, &pending.offer) {
                    commands.push(Command::AcceptTrade);
                }
                commands.push(Command::RejectTrade);
            }
            if pending.offer.from == player {
                commands.push(Command::CancelTrade);
            }
        }

        if state.turn_phase == TurnPhase::DiscardCards {
            if let Some(&required) = state.pending_discards.get(&player) {
                let hand = &state.players[player as usize].resources;
                commands.push(Command::DiscardCards(greedy_discard(hand, required)));
            }
            return commands;
        }

        if state.current_player != player {
            return commands;
        }

        if state.phase == Phase::Setup {
            match state.setup_settlement {
                None => {
                    for node in state.board.valid_settlement_spots(player, true) {
                        commands.push(Command::PlaceInitialSettlement(node));
                    }
                }
                Some(settlement) => {
                    for edge in &state.board.nodes()[settlement].incident_edges {
                        if state.board.edges()[*edge].road.is_none() {
                            commands.push(Command::PlaceInitialRoad(*edge));
                        }
                    }
                }
            }
            return commands;
        }

        match state.turn_phase {
            TurnPhase::DiceRoll => commands.push(Command::RollDice),
            TurnPhase::RobberPlacement => {
                for tile in state.board.tiles() {
                    if tile.id == state.board.robber_tile() {
                        continue;
                    }
                    commands.push(Command::MoveRobber {
                        tile: tile.id,
                        victim: None,
                    });
                    for victim in state.board.players_adjacent_to_tile(tile.id) {
                        if victim != player {
                            commands.push(Command::MoveRobber {
                                tile: tile.id,
                                victim: Some(victim),
                            });
                        }
                    }
                }
            }
            TurnPhase::Actions => {
                let me = &state.players[player as usize];

                if me.resources.can_afford(&costs::road()) && me.roads_remaining() > 0 {
                    for edge in state.board.valid_road_spots(player) {
                        commands.push(Command::BuildRoad(edge));
                    }
                }
                if me.resources.can_afford(&costs::settlement()) && me.settlements_remaining() > 0 {
                    for node in state.board.valid_settlement_spots(player, false) {
                        commands.push(Command::BuildSettlement(node));
                    }
                }
                if me.resources.can_afford(&costs::city()) && me.cities_remaining() > 0 {
                    for node in state.board.valid_city_spots(player) {
                        commands.push(Command::BuildCity(node));
                    }
                }
                if me.resources.can_afford(&costs::development_card())
                    && state.dev_deck_remaining() > 0
                {
                    commands.push(Command::BuyDevelopmentCard);
                }

                if !state.cards_played_this_turn.contains(&DevelopmentCard::Knight)
                    && me.has_playable_card(DevelopmentCard::Knight)
                {
                    commands.push(Command::PlayKnight);
                }
                if !state
                    .cards_played_this_turn
                    .contains(&DevelopmentCard::RoadBuilding)
                    && me.has_playable_card(DevelopmentCard::RoadBuilding)
                    && me.roads_remaining() > 0
                {
                    for edge in state.board.valid_road_spots(player) {
                        commands.push(Command::PlayRoadBuilding {
                            first: edge,
                            second: None,
                        });
                    }
                }
                if !state
                    .cards_played_this_turn
                    .contains(&DevelopmentCard::YearOfPlenty)
                    && me.has_playable_card(DevelopmentCard::YearOfPlenty)
                {
                    for (i, a) in Resource::ALL.into_iter().enumerate() {
                        for b in Resource::ALL.into_iter().skip(i) {
                            commands.push(Command::PlayYearOfPlenty(a, b));
                        }
                    }
                }
                if !state
                    .cards_played_this_turn
                    .contains(&DevelopmentCard::Monopoly)
                    && me.has_playable_card(DevelopmentCard::Monopoly)
                {
                    for resource in Resource::ALL {
                        commands.push(Command::PlayMonopoly(resource));
                    }
                }

                for give in Resource::ALL {
                    let ratio = trade::best_ratio(&state.board, player, give);
                    if me.resources.get(give) < ratio {
                        continue;
                    }
                    for receive in Resource::ALL {
                        if receive != give {
                            commands.push(Command::TradeWithBank {
                                give: ResourceHand::single(give, ratio),
                                receive: ResourceHand::single(receive, 1),
                            });
                        }
                    }
                }

                commands.push(Command::EndTurn);
            }
            TurnPhase::DiscardCards => {}
        }

        commands
    }
}

/// Discard `count` cards taking from the largest pile each time
fn greedy_discard(hand: &ResourceHand, count: u32) -> ResourceHand {
    let mut pool = hand.clone();
    let mut out = ResourceHand::new();
    for _ in 0..count {
        let largest = Resource::ALL
            .into_iter()
            .max_by_key(|&r| pool.get(r))
            .filter(|&r| pool.get(r) > 0);
        match largest {
            Some(r) => {
                pool.set(r, pool.get(r) - 1);
                out.add(r, 1);
            }
            None => break,
        }
    }
    out
}
