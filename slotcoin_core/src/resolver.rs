use crate::paytable::{PatternKind, Paytable};
use crate::symbols::Symbol;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub win: bool,
    pub payout: u32,
    /// Shape of the pattern that paid, if any.
    pub matched: Option<PatternKind>,
}

impl Resolution {
    pub const LOSS: Resolution = Resolution {
        win: false,
        payout: 0,
        matched: None,
    };

    fn hit(kind: PatternKind, payout: u32) -> Self {
        Self {
            win: true,
            payout,
            matched: Some(kind),
        }
    }
}

/// Matches a drawn triple against the paytable.
///
/// Precedence is exact triple, then a pair on reels 0 and 1, then the symbol
/// on reel 0 alone. The first hit is the only payout. Reels 1 and 2 never
/// form a pair.
#[derive(Debug, Clone)]
pub struct PayoutResolver {
    paytable: Paytable,
}

impl PayoutResolver {
    pub fn new(paytable: Paytable) -> Self {
        Self { paytable }
    }

    pub fn paytable(&self) -> &Paytable {
        &self.paytable
    }

    pub fn resolve(&self, triple: [Symbol; 3]) -> Resolution {
        if let Some(payout) = self.paytable.exact(&triple) {
            return Resolution::hit(PatternKind::Exact, payout);
        }
        if triple[0] == triple[1] {
            if let Some(payout) = self.paytable.pair(triple[0]) {
                return Resolution::hit(PatternKind::Pair, payout);
            }
        }
        if let Some(payout) = self.paytable.single(triple[0]) {
            return Resolution::hit(PatternKind::Single, payout);
        }
        Resolution::LOSS
    }
}
