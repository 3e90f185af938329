//! Commands players can issue and the domain events they produce.
//!
//! Every state change flows through [`crate::engine::Engine::apply`],
//! which either mutates the state and returns the resulting events, or
//! fails with a typed error and changes nothing. The returned event list
//! is the engine's only notification mechanism: observers drain it, no
//! callbacks are registered.

use crate::board::{EdgeId, NodeId, PlayerId, Resource, TileId};
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};

/// All commands a player can issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    // ==================== Setup Phase ====================
    /// Place a settlement during the snake draft
    PlaceInitialSettlement(NodeId),
    /// Place a road touching the settlement just placed
    PlaceInitialRoad(EdgeId),

    // ==================== Turn Phases ====================
    /// Roll the dice at the start of a turn
    RollDice,
    /// Discard the required cards after a 7 (hand over 7 cards)
    DiscardCards(ResourceHand),
    /// Move the robber, optionally stealing from a player with a
    /// building on the target tile
    MoveRobber {
        tile: TileId,
        victim: Option<PlayerId>,
    },

    // ==================== Building ====================
    BuildRoad(EdgeId),
    BuildSettlement(NodeId),
    BuildCity(NodeId),
    BuyDevelopmentCard,

    // ==================== Development Cards ====================
    /// Play a knight: move the robber next, counts toward Largest Army
    PlayKnight,
    /// Play road building: place 1-2 roads free of cost. The second
    /// road's connectivity is judged with the first already in place.
    PlayRoadBuilding {
        first: EdgeId,
        second: Option<EdgeId>,
    },
    /// Take any 2 resources from the bank (duplicates allowed)
    PlayYearOfPlenty(Resource, Resource),
    /// Take all of one resource type from every other player
    PlayMonopoly(Resource),

    // ==================== Trading ====================
    /// Trade with the bank at the best available ratio (4:1 bank, 3:1
    /// generic port, 2:1 resource port). Each given resource count must
    /// be an exact multiple of that resource's ratio.
    TradeWithBank {
        give: ResourceHand,
        receive: ResourceHand,
    },
    /// Offer a trade to a named player
    ProposeTrade(TradeOffer),
    /// Accept the pending offer (only the named receiver)
    AcceptTrade,
    /// Reject the pending offer (only the named receiver)
    RejectTrade,
    /// Withdraw your own pending offer
    CancelTrade,

    // ==================== Turn Management ====================
    EndTurn,
}

/// A proposed exchange between two named players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    pub from: PlayerId,
    pub to: PlayerId,
    /// What `from` gives away
    pub give: ResourceHand,
    /// What `from` receives
    pub receive: ResourceHand,
}

impl TradeOffer {
    pub fn new(from: PlayerId, to: PlayerId, give: ResourceHand, receive: ResourceHand) -> Self {
        Self {
            from,
            to,
            give,
            receive,
        }
    }

    /// Both sides must be non-empty and the parties distinct
    pub fn is_well_formed(&self) -> bool {
        self.from != self.to && !self.give.is_empty() && !self.receive.is_empty()
    }
}

/// A pending offer awaiting a response. Dies at the end of the turn it
/// was proposed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTrade {
    pub offer: TradeOffer,
    /// Last turn number on which the offer may be accepted
    pub expires_on_turn: u32,
}

/// Events describing what a successful command changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    DiceRolled {
        player: PlayerId,
        die1: u8,
        die2: u8,
        total: u8,
    },

    /// Resource cards granted by production or setup
    ResourcesDistributed {
        distributions: Vec<(PlayerId, Resource, u32)>,
    },

    SettlementPlaced {
        player: PlayerId,
        node: NodeId,
    },

    CityUpgraded {
        player: PlayerId,
        node: NodeId,
    },

    RoadPlaced {
        player: PlayerId,
        edge: EdgeId,
    },

    DevelopmentCardPurchased {
        player: PlayerId,
    },

    KnightPlayed {
        player: PlayerId,
    },

    RoadBuildingPlayed {
        player: PlayerId,
    },

    YearOfPlentyPlayed {
        player: PlayerId,
        resources: (Resource, Resource),
    },

    MonopolyPlayed {
        player: PlayerId,
        resource: Resource,
        total_taken: u32,
    },

    RobberMoved {
        player: PlayerId,
        tile: TileId,
        victim: Option<PlayerId>,
    },

    /// `resource` is `None` when the victim's hand was empty
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Option<Resource>,
    },

    CardsDiscarded {
        player: PlayerId,
        count: u32,
    },

    TradeProposed {
        offer: TradeOffer,
    },

    TradeAccepted {
        from: PlayerId,
        to: PlayerId,
    },

    TradeRejected {
        by: PlayerId,
    },

    TradeCancelled,

    BankTradeCompleted {
        player: PlayerId,
        gave: ResourceHand,
        received: ResourceHand,
    },

    LongestRoadChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        length: u32,
    },

    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        knights: u32,
    },

    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}
