//! Colony - a hex-based settlement board game engine
//!
//! This crate provides the complete rules core, including:
//! - Axial hex coordinate system with pixel projection
//! - Deduplicated board topology (tiles, nodes, edges, ports)
//! - Player state, resource hands, and building budgets
//! - A command-driven state machine with full rule enforcement
//! - Bank, port, and peer-to-peer trading
//!
//! # Architecture
//!
//! The engine is synchronous and single-writer: construct an
//! [`engine::Engine`], feed it [`actions::Command`]s, and read the
//! resulting [`actions::GameEvent`]s. A failing command never mutates
//! the state. All public types serialize with serde, so snapshots can
//! cross any process boundary.
//!
//! # Modules
//!
//! - [`hex`]: Axial coordinates and corner quantization
//! - [`board`]: Board generation and graph topology
//! - [`player`]: Player state, resources, development cards
//! - [`actions`]: Commands, events, and trade offers
//! - [`state`]: The game state and derived queries
//! - [`trade`]: Bank and peer trade validation
//! - [`engine`]: Command validation and application

pub mod actions;
pub mod board;
pub mod engine;
pub mod hex;
pub mod player;
pub mod state;
pub mod trade;

// Re-export commonly used types
pub use actions::{Command, GameEvent, PendingTrade, TradeOffer};
pub use board::{
    Board, Building, Edge, EdgeId, Node, NodeId, PlayerId, Port, PortKind, Resource, Tile, TileId,
};
pub use engine::{Engine, GameError, GameResult};
pub use hex::HexCoord;
pub use player::{costs, DevelopmentCard, Player, ResourceHand};
pub use state::{GameConfig, GameState, Phase, TurnPhase};
