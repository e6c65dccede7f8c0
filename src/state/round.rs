//! One-shot latches guarding the two per-round transitions.
//!
//! Reveal and advance each have two competing triggers (all-answered vs.
//! timeout, host action vs. timeout). The gate makes whichever fires first
//! win and turns every later attempt for the same round into a silent no-op.
//! Timer callbacks pass the round they were armed for, so a timer that
//! outlives its round cannot fire against newer state.

/// Per-lobby latch state, keyed by the observed round number.
#[derive(Debug, Default)]
pub struct RoundGate {
    round: u32,
    reveal_fired: bool,
    advance_fired: bool,
}

impl RoundGate {
    /// Record the latest round seen on the lobby subscription. Moving to a
    /// later round re-arms both latches; the same or an older round changes
    /// nothing, so a delayed snapshot cannot rewind the gate.
    pub fn observe(&mut self, round: u32) {
        if round > self.round {
            self.round = round;
            self.reveal_fired = false;
            self.advance_fired = false;
        }
    }

    /// Round this gate currently guards.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Claim the reveal transition for `round`. Returns `false` when the
    /// round has since moved on or the reveal was already claimed.
    pub fn try_claim_reveal(&mut self, round: u32) -> bool {
        if round != self.round || self.reveal_fired {
            return false;
        }
        self.reveal_fired = true;
        true
    }

    /// Claim the advance transition for `round`; same contract as
    /// [`RoundGate::try_claim_reveal`].
    pub fn try_claim_advance(&mut self, round: u32) -> bool {
        if round != self.round || self.advance_fired {
            return false;
        }
        self.advance_fired = true;
        true
    }

    /// Hand back a reveal claim whose write never landed, re-arming the
    /// latch for the same round so another trigger can retry. A release for
    /// any other round changes nothing.
    pub fn release_reveal(&mut self, round: u32) {
        if round == self.round {
            self.reveal_fired = false;
        }
    }

    /// Hand back an advance claim; same contract as
    /// [`RoundGate::release_reveal`].
    pub fn release_advance(&mut self, round: u32) {
        if round == self.round {
            self.advance_fired = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_reveal_claim_for_same_round_loses() {
        let mut gate = RoundGate::default();
        gate.observe(1);
        assert!(gate.try_claim_reveal(1));
        assert!(!gate.try_claim_reveal(1));
    }

    #[test]
    fn stale_round_claims_are_noops() {
        let mut gate = RoundGate::default();
        gate.observe(2);
        assert!(!gate.try_claim_reveal(1));
        assert!(!gate.try_claim_advance(1));
        assert!(gate.try_claim_reveal(2));
    }

    #[test]
    fn new_round_rearms_both_latches() {
        let mut gate = RoundGate::default();
        gate.observe(1);
        assert!(gate.try_claim_reveal(1));
        assert!(gate.try_claim_advance(1));

        gate.observe(2);
        assert!(gate.try_claim_reveal(2));
        assert!(gate.try_claim_advance(2));
    }

    #[test]
    fn reveal_and_advance_latch_independently() {
        let mut gate = RoundGate::default();
        gate.observe(1);
        assert!(gate.try_claim_advance(1));
        assert!(gate.try_claim_reveal(1));
    }

    #[test]
    fn observing_same_round_does_not_rearm() {
        let mut gate = RoundGate::default();
        gate.observe(1);
        assert!(gate.try_claim_reveal(1));
        gate.observe(1);
        assert!(!gate.try_claim_reveal(1));
    }

    #[test]
    fn observing_an_older_round_does_not_rearm() {
        let mut gate = RoundGate::default();
        gate.observe(2);
        assert!(gate.try_claim_reveal(2));

        gate.observe(1);
        assert_eq!(gate.round(), 2);
        assert!(!gate.try_claim_reveal(1));
        assert!(!gate.try_claim_reveal(2));
        assert!(gate.try_claim_advance(2));
    }

    #[test]
    fn released_claim_can_be_retaken() {
        let mut gate = RoundGate::default();
        gate.observe(1);
        assert!(gate.try_claim_reveal(1));
        gate.release_reveal(1);
        assert!(gate.try_claim_reveal(1));

        assert!(gate.try_claim_advance(1));
        gate.release_advance(1);
        assert!(gate.try_claim_advance(1));
    }

    #[test]
    fn release_for_another_round_is_ignored() {
        let mut gate = RoundGate::default();
        gate.observe(2);
        assert!(gate.try_claim_reveal(2));
        gate.release_reveal(1);
        assert!(!gate.try_claim_reveal(2));
    }
}
