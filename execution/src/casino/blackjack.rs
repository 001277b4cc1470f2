//! Blackjack rules.
//!
//! One player hand against the dealer, single 52-card deck drawn front to
//! back. The dealer is dealt two cards, the second hidden until the player
//! finishes. Naturals settle on the deal. The dealer draws while below 17.
//!
//! Ledger effects live in the controller; this module only reports how much
//! a settled hand returns.

use super::{GameError, GameRng};
use coinbot_types::{
    api::{BlackjackView, HandResult},
    casino::{Card, Decimal, BLACKJACK, DEALER_STANDS_AT, WIN_RETURN},
};
use std::collections::VecDeque;

/// Blackjack game stages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    PlayerTurn,
    Complete,
}

/// Calculate the value of a blackjack hand.
///
/// Aces count 11 and are downgraded to 1 one at a time while the total
/// exceeds 21. Returns the total and whether an ace still counts 11.
pub fn hand_value(cards: &[Card]) -> (u8, bool) {
    let mut value: u16 = 0;
    let mut aces: u8 = 0;

    for card in cards {
        if card.is_ace() {
            aces += 1;
            value += 11;
        } else {
            value += card.points() as u16;
        }
    }

    while value > BLACKJACK as u16 && aces > 0 {
        value -= 10;
        aces -= 1;
    }

    let is_soft = aces > 0 && value <= BLACKJACK as u16;
    (value.min(255) as u8, is_soft)
}

/// Check if hand is a natural (21 with 2 cards).
pub fn is_blackjack(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards).0 == BLACKJACK
}

/// A blackjack hand in play.
#[derive(Clone, Debug)]
pub struct Table {
    deck: VecDeque<Card>,
    player: Vec<Card>,
    dealer: Vec<Card>,
    bet: i64,
    doubled: bool,
    stage: Stage,
    result: Option<HandResult>,
    natural_return: Decimal,
}

impl Table {
    /// Shuffle a fresh deck and deal.
    pub fn new(bet: i64, natural_return: Decimal, rng: &mut GameRng) -> Result<Self, GameError> {
        Self::deal(rng.create_deck(), bet, natural_return)
    }

    /// Deal from `deck`: player, dealer, player, dealer.
    pub fn deal(
        deck: VecDeque<Card>,
        bet: i64,
        natural_return: Decimal,
    ) -> Result<Self, GameError> {
        let mut table = Self {
            deck,
            player: Vec::with_capacity(4),
            dealer: Vec::with_capacity(4),
            bet,
            doubled: false,
            stage: Stage::PlayerTurn,
            result: None,
            natural_return,
        };
        for _ in 0..2 {
            let card = table.draw()?;
            table.player.push(card);
            let card = table.draw()?;
            table.dealer.push(card);
        }

        let player_bj = is_blackjack(&table.player);
        let dealer_bj = is_blackjack(&table.dealer);
        match (player_bj, dealer_bj) {
            (true, true) => table.settle(HandResult::BothNatural),
            (true, false) => table.settle(HandResult::PlayerNatural),
            (false, true) => table.settle(HandResult::DealerNatural),
            (false, false) => {}
        }
        Ok(table)
    }

    fn draw(&mut self) -> Result<Card, GameError> {
        self.deck.pop_front().ok_or(GameError::DeckExhausted)
    }

    fn settle(&mut self, result: HandResult) {
        self.result = Some(result);
        self.stage = Stage::Complete;
    }

    fn ensure_playing(&self) -> Result<(), GameError> {
        match self.stage {
            Stage::PlayerTurn => Ok(()),
            Stage::Complete => Err(GameError::GameAlreadyComplete),
        }
    }

    /// Draw one card for the player. A bust settles the hand.
    pub fn hit(&mut self) -> Result<(), GameError> {
        self.ensure_playing()?;
        let card = self.draw()?;
        self.player.push(card);
        if hand_value(&self.player).0 > BLACKJACK {
            self.settle(HandResult::PlayerBust);
        }
        Ok(())
    }

    /// End the player's turn and let the dealer play.
    pub fn stand(&mut self) -> Result<(), GameError> {
        self.ensure_playing()?;
        self.dealer_play()
    }

    /// Double the stake, draw exactly one card, then let the dealer play.
    ///
    /// The caller is responsible for debiting the additional bet first.
    pub fn double(&mut self) -> Result<(), GameError> {
        self.ensure_playing()?;
        if self.doubled {
            return Err(GameError::InvalidMove);
        }
        let card = self.draw()?;
        self.doubled = true;
        self.player.push(card);
        if hand_value(&self.player).0 > BLACKJACK {
            self.settle(HandResult::PlayerBust);
            return Ok(());
        }
        self.dealer_play()
    }

    fn dealer_play(&mut self) -> Result<(), GameError> {
        while hand_value(&self.dealer).0 < DEALER_STANDS_AT {
            let card = self.draw()?;
            self.dealer.push(card);
        }

        let (player, _) = hand_value(&self.player);
        let (dealer, _) = hand_value(&self.dealer);
        let result = if dealer > BLACKJACK {
            HandResult::DealerBust
        } else if player > dealer {
            HandResult::PlayerWins
        } else if player == dealer {
            HandResult::Push
        } else {
            HandResult::DealerWins
        };
        self.settle(result);
        Ok(())
    }

    pub fn bet(&self) -> i64 {
        self.bet
    }

    /// Total at risk, including a double.
    pub fn stake(&self) -> i64 {
        if self.doubled {
            self.bet.saturating_mul(2)
        } else {
            self.bet
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }

    pub fn result(&self) -> Option<HandResult> {
        self.result
    }

    pub fn player(&self) -> &[Card] {
        &self.player
    }

    pub fn dealer(&self) -> &[Card] {
        &self.dealer
    }

    /// Total returned to the player once settled (stake included).
    pub fn returned(&self) -> i64 {
        let stake = self.stake();
        match self.result {
            Some(HandResult::PlayerNatural) => self.natural_return.mul_int(stake).to_int_rounded(),
            Some(HandResult::PlayerWins | HandResult::DealerBust) => {
                stake.saturating_mul(WIN_RETURN)
            }
            Some(HandResult::Push | HandResult::BothNatural) => stake,
            Some(HandResult::PlayerBust | HandResult::DealerWins | HandResult::DealerNatural)
            | None => 0,
        }
    }

    pub fn view(&self) -> BlackjackView {
        let hidden = !self.is_complete();
        let dealer: Vec<Card> = if hidden {
            self.dealer.iter().take(1).copied().collect()
        } else {
            self.dealer.clone()
        };
        BlackjackView {
            stake: self.stake(),
            player: self.player.clone(),
            player_total: hand_value(&self.player).0,
            dealer_total: hand_value(&dealer).0,
            dealer,
            dealer_hidden: hidden,
            result: self.result,
            returned: self.returned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinbot_types::casino::NATURAL_RETURN;

    fn card(rank: u8) -> Card {
        Card::from_rank(rank, 0).unwrap()
    }

    /// Deck dealt as player, dealer, player, dealer, then the rest in order.
    fn deck(player: [u8; 2], dealer: [u8; 2], rest: &[u8]) -> VecDeque<Card> {
        let mut cards = vec![card(player[0]), card(dealer[0]), card(player[1]), card(dealer[1])];
        cards.extend(rest.iter().map(|r| card(*r)));
        cards.into()
    }

    #[test]
    fn test_hand_value() {
        assert_eq!(hand_value(&[card(1), card(13)]), (21, true));
        assert_eq!(hand_value(&[card(1), card(1)]), (12, true));
        assert_eq!(hand_value(&[card(1), card(1), card(1)]), (13, true));
        assert_eq!(hand_value(&[card(10), card(6), card(1)]), (17, false));
        assert_eq!(hand_value(&[card(1), card(6)]), (17, true));
        assert_eq!(hand_value(&[card(12), card(11), card(2)]), (22, false));
        assert_eq!(hand_value(&[]), (0, false));
    }

    #[test]
    fn test_ace_and_ten_value_is_natural() {
        for ten in 10..=13 {
            assert!(is_blackjack(&[card(1), card(ten)]));
            assert!(is_blackjack(&[card(ten), card(1)]));
        }
        assert!(!is_blackjack(&[card(1), card(9)]));
        assert!(!is_blackjack(&[card(7), card(7), card(7)]));
    }

    #[test]
    fn test_adding_a_card_never_drops_below_ace_adjustment() {
        for a in 1..=13 {
            for b in 1..=13 {
                let base = [card(a), card(b)];
                let (before, soft) = hand_value(&base);
                for c in 1..=13 {
                    let (after, _) = hand_value(&[card(a), card(b), card(c)]);
                    let floor = if soft { before - 10 } else { before };
                    assert!(after > floor, "{a} {b} + {c}");
                }
            }
        }
    }

    #[test]
    fn test_player_natural_settles_on_deal() {
        let table = Table::deal(deck([1, 13], [10, 7], &[]), 100, NATURAL_RETURN).unwrap();
        assert!(table.is_complete());
        assert_eq!(table.result(), Some(HandResult::PlayerNatural));
        assert_eq!(table.returned(), 350);
    }

    #[test]
    fn test_dealer_natural_settles_on_deal() {
        let table = Table::deal(deck([10, 9], [1, 12], &[]), 100, NATURAL_RETURN).unwrap();
        assert_eq!(table.result(), Some(HandResult::DealerNatural));
        assert_eq!(table.returned(), 0);
    }

    #[test]
    fn test_both_naturals_push() {
        let table = Table::deal(deck([1, 10], [1, 11], &[]), 100, NATURAL_RETURN).unwrap();
        assert_eq!(table.result(), Some(HandResult::BothNatural));
        assert_eq!(table.returned(), 100);
    }

    #[test]
    fn test_dealer_draws_from_sixteen() {
        let mut table = Table::deal(deck([10, 9], [10, 6], &[2, 5]), 100, NATURAL_RETURN).unwrap();
        table.stand().unwrap();
        assert_eq!(table.dealer().len(), 3);
        assert_eq!(hand_value(table.dealer()).0, 18);
        assert_eq!(table.result(), Some(HandResult::PlayerWins));
        assert_eq!(table.returned(), 200);
    }

    #[test]
    fn test_dealer_stops_at_seventeen() {
        let mut table = Table::deal(deck([10, 8], [10, 7], &[5]), 100, NATURAL_RETURN).unwrap();
        table.stand().unwrap();
        assert_eq!(table.dealer().len(), 2);
        assert_eq!(table.result(), Some(HandResult::PlayerWins));
        assert_eq!(table.returned(), 200);
    }

    #[test]
    fn test_equal_totals_push() {
        let mut table = Table::deal(deck([10, 8], [9, 9], &[]), 50, NATURAL_RETURN).unwrap();
        table.stand().unwrap();
        assert_eq!(table.result(), Some(HandResult::Push));
        assert_eq!(table.returned(), 50);
    }

    #[test]
    fn test_hit_bust_settles() {
        let mut table = Table::deal(deck([10, 6], [10, 7], &[9]), 100, NATURAL_RETURN).unwrap();
        table.hit().unwrap();
        assert!(table.is_complete());
        assert_eq!(table.result(), Some(HandResult::PlayerBust));
        assert_eq!(table.hit(), Err(GameError::GameAlreadyComplete));
        assert_eq!(table.stand(), Err(GameError::GameAlreadyComplete));
    }

    #[test]
    fn test_hit_keeps_turn() {
        let mut table = Table::deal(deck([2, 3], [10, 7], &[4]), 100, NATURAL_RETURN).unwrap();
        table.hit().unwrap();
        assert_eq!(table.stage(), Stage::PlayerTurn);
        assert_eq!(hand_value(table.player()).0, 9);
    }

    #[test]
    fn test_double_draws_one_card_then_dealer_plays() {
        let mut table = Table::deal(deck([5, 6], [10, 6], &[10, 3]), 100, NATURAL_RETURN).unwrap();
        table.double().unwrap();
        assert_eq!(table.player().len(), 3);
        assert_eq!(table.stake(), 200);
        // Dealer 16 draws 3 -> 19, player 21
        assert_eq!(table.result(), Some(HandResult::PlayerWins));
        assert_eq!(table.returned(), 400);
    }

    #[test]
    fn test_double_bust_is_loss() {
        let mut table =
            Table::deal(deck([10, 6], [10, 6], &[10, 5]), 100, NATURAL_RETURN).unwrap();
        table.double().unwrap();
        assert_eq!(table.result(), Some(HandResult::PlayerBust));
        // Dealer never drew
        assert_eq!(table.dealer().len(), 2);
        assert_eq!(table.returned(), 0);
    }

    #[test]
    fn test_dealer_bust_pays_double() {
        let mut table = Table::deal(deck([10, 2], [10, 6], &[10]), 100, NATURAL_RETURN).unwrap();
        table.stand().unwrap();
        assert_eq!(table.result(), Some(HandResult::DealerBust));
        assert_eq!(table.returned(), 200);
    }

    #[test]
    fn test_view_hides_hole_card() {
        let mut table = Table::deal(deck([10, 8], [9, 8], &[]), 100, NATURAL_RETURN).unwrap();
        let view = table.view();
        assert!(view.dealer_hidden);
        assert_eq!(view.dealer.len(), 1);
        assert_eq!(view.dealer_total, 9);
        assert_eq!(view.player_total, 18);

        table.stand().unwrap();
        let view = table.view();
        assert!(!view.dealer_hidden);
        assert_eq!(view.dealer.len(), 2);
        assert_eq!(view.result, Some(HandResult::PlayerWins));
    }

    #[test]
    fn test_deck_exhausted() {
        let short: VecDeque<Card> = vec![card(2), card(3), card(4)].into();
        assert_eq!(
            Table::deal(short, 10, NATURAL_RETURN).unwrap_err(),
            GameError::DeckExhausted
        );
    }

    #[test]
    fn test_seeded_table_deals_four_cards() {
        let mut rng = GameRng::new(9);
        let table = Table::new(10, NATURAL_RETURN, &mut rng).unwrap();
        assert_eq!(table.player().len(), 2);
        assert_eq!(table.dealer().len(), 2);
    }
}
