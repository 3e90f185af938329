//! The authoritative game state.
//!
//! `GameState` is plain data plus derived queries. It is created once at
//! game start and mutated exclusively by [`crate::engine::Engine`]
//! command handlers (single-writer discipline); once the phase reaches
//! `GameOver` no command touches it again.

use crate::actions::PendingTrade;
use crate::board::{Board, NodeId, PlayerId};
use crate::player::{DevelopmentCard, Player};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Game lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Snake-draft initial placement
    Setup,
    /// Normal turns
    MainGame,
    /// Terminal; the state is read-only from here on
    GameOver { winner: PlayerId },
}

/// Sub-phase within a main-game turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Waiting for the current player to roll
    DiceRoll,
    /// A 7 was rolled (or a knight played); the robber must move
    RobberPlacement,
    /// Players over 7 cards must discard before the robber moves
    DiscardCards,
    /// Build, trade, play cards, end turn
    Actions,
}

/// Tunable rule knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Victory points needed to win
    pub victory_threshold: u32,
    /// Whether tying the current holder's longest road / largest army
    /// transfers the award. Standard rules say no.
    pub transfer_awards_on_tie: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            victory_threshold: 10,
            transfer_awards_on_tie: false,
        }
    }
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub players: Vec<Player>,
    pub phase: Phase,
    pub turn_phase: TurnPhase,
    /// Index into `players`
    pub current_player: PlayerId,
    /// Setup draft round (1 or 2)
    pub setup_round: u8,
    /// +1 on the forward pass, -1 on the reverse pass
    pub setup_direction: i8,
    /// Settlement just placed during setup, awaiting its road
    pub setup_settlement: Option<NodeId>,
    /// Turn counter, 1-based once the main game starts
    pub turn_number: u32,
    /// Last dice roll of the current turn
    pub dice_roll: Option<(u8, u8)>,
    /// Shuffled development deck; cards before `dev_deck_cursor` have
    /// been drawn and no longer exist as far as the rules are concerned
    pub dev_deck: Vec<DevelopmentCard>,
    pub dev_deck_cursor: usize,
    /// Outstanding discard requirements after a 7 (player -> count)
    pub pending_discards: BTreeMap<PlayerId, u32>,
    pub pending_trade: Option<PendingTrade>,
    pub longest_road_owner: Option<PlayerId>,
    /// Qualifying length held by `longest_road_owner`
    pub longest_road_length: u32,
    pub largest_army_owner: Option<PlayerId>,
    /// Card types the current player has played this turn
    pub cards_played_this_turn: BTreeSet<DevelopmentCard>,
    pub config: GameConfig,
}

impl GameState {
    /// Create a fresh game: board generated, deck shuffled, snake draft
    /// about to start with player 0.
    pub fn new<R: Rng>(config: GameConfig, player_names: Vec<String>, rng: &mut R) -> Self {
        assert!(
            (2..=4).contains(&player_names.len()),
            "must have 2-4 players"
        );

        let players: Vec<Player> = player_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as PlayerId, name))
            .collect();

        let mut dev_deck = DevelopmentCard::standard_deck();
        dev_deck.shuffle(rng);

        Self {
            board: Board::generate_with_rng(rng),
            players,
            phase: Phase::Setup,
            turn_phase: TurnPhase::DiceRoll,
            current_player: 0,
            setup_round: 1,
            setup_direction: 1,
            setup_settlement: None,
            turn_number: 0,
            dice_roll: None,
            dev_deck,
            dev_deck_cursor: 0,
            pending_discards: BTreeMap::new(),
            pending_trade: None,
            longest_road_owner: None,
            longest_road_length: 0,
            largest_army_owner: None,
            cards_played_this_turn: BTreeSet::new(),
            config,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id as usize)
    }

    /// Cards left in the development deck
    pub fn dev_deck_remaining(&self) -> usize {
        self.dev_deck.len() - self.dev_deck_cursor
    }

    /// Total victory points, including hidden VP cards: settlements x1,
    /// cities x2, VP cards x1, +2 for each held award.
    pub fn victory_points(&self, player: PlayerId) -> u32 {
        let p = match self.player(player) {
            Some(p) => p,
            None => return 0,
        };

        let mut vp = p.settlements.len() as u32 + 2 * p.cities.len() as u32;
        vp += p.victory_point_cards();
        if self.longest_road_owner == Some(player) {
            vp += 2;
        }
        if self.largest_army_owner == Some(player) {
            vp += 2;
        }
        vp
    }

    /// Victory points visible to opponents (excludes unrevealed VP cards)
    pub fn public_victory_points(&self, player: PlayerId) -> u32 {
        self.victory_points(player)
            - self
                .player(player)
                .map_or(0, |p| p.victory_point_cards())
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::GameOver { .. })
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            Phase::GameOver { winner } => Some(winner),
            _ => None,
        }
    }
}
