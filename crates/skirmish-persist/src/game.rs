//! Engine family the stream is being read or written for.

use serde::{Deserialize, Serialize};

/// Which release of the engine family a save belongs to.
///
/// Variants are ordered by release so persist routines can gate fields
/// introduced in later engines with `persister.game() >= GameVariant::Bfme`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    #[default]
    Generals,
    ZeroHour,
    Bfme,
    Bfme2,
    Bfme2Rotwk,
}

impl GameVariant {
    pub const ALL: [GameVariant; 5] = [
        GameVariant::Generals,
        GameVariant::ZeroHour,
        GameVariant::Bfme,
        GameVariant::Bfme2,
        GameVariant::Bfme2Rotwk,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_order_by_release() {
        assert!(GameVariant::Generals < GameVariant::ZeroHour);
        assert!(GameVariant::Bfme2Rotwk >= GameVariant::Bfme);
        assert!(GameVariant::ZeroHour < GameVariant::Bfme);
        assert!(GameVariant::ALL.windows(2).all(|w| w[0] < w[1]));
    }
}
