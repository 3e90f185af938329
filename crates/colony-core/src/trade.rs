//! Bank and peer trade validation.
//!
//! Bank trades resolve the best available ratio per resource: 2:1 with
//! a matching resource port, 3:1 with a generic port, 4:1 otherwise.
//! Peer trades are validated here; the engine owns the offer lifecycle.

use crate::actions::TradeOffer;
use crate::board::{Board, PlayerId, PortKind, Resource};
use crate::player::ResourceHand;
use crate::state::GameState;

/// Best bank trade ratio `player` can get when giving `resource`
pub fn best_ratio(board: &Board, player: PlayerId, resource: Resource) -> u32 {
    let mut ratio = 4;
    for kind in board.player_ports(player) {
        match kind {
            PortKind::Resource(r) if r == resource => return 2,
            PortKind::Generic => ratio = ratio.min(3),
            PortKind::Resource(_) => {}
        }
    }
    ratio
}

/// Check that a bank trade is exchangeable: every given resource count
/// is an exact multiple of that resource's best ratio, the total given
/// buys exactly the total received, and nothing is traded for itself.
pub fn validate_bank_trade(
    state: &GameState,
    player: PlayerId,
    give: &ResourceHand,
    receive: &ResourceHand,
) -> bool {
    if give.is_empty() || receive.is_empty() {
        return false;
    }

    let mut bought = 0;
    for resource in Resource::ALL {
        let giving = give.get(resource);
        if giving == 0 {
            continue;
        }
        // Giving and receiving the same resource is a wash, reject it
        if receive.get(resource) > 0 {
            return false;
        }
        let ratio = best_ratio(&state.board, player, resource);
        if giving % ratio != 0 {
            return false;
        }
        bought += giving / ratio;
    }

    bought == receive.total()
}

/// Apply a validated bank trade to the player's hand
pub fn execute_bank_trade(state: &mut GameState, player: PlayerId, give: &ResourceHand, receive: &ResourceHand) {
    if let Some(p) = state.player_mut(player) {
        p.resources.subtract(give);
        p.resources.add_hand(receive);
    }
}

/// Check that both parties of a peer trade can cover their side
pub fn both_sides_can_pay(state: &GameState, offer: &TradeOffer) -> bool {
    let from_ok = state
        .player(offer.from)
        .is_some_and(|p| p.resources.can_afford(&offer.give));
    let to_ok = state
        .player(offer.to)
        .is_some_and(|p| p.resources.can_afford(&offer.receive));
    from_ok && to_ok
}

/// Swap the resources of an accepted peer trade
pub fn execute_peer_trade(state: &mut GameState, offer: &TradeOffer) {
    if let Some(from) = state.player_mut(offer.from) {
        from.resources.subtract(&offer.give);
        from.resources.add_hand(&offer.receive);
    }
    if let Some(to) = state.player_mut(offer.to) {
        to.resources.subtract(&offer.receive);
        to.resources.add_hand(&offer.give);
    }
}
