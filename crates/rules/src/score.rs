use crate::WinKind;
use okey_core::Score;

/// Base score for a win: normal 2, pairs 3, okey discard 4.
///
/// The extra point per okey or false joker stranded in a loser's hand is
/// applied during settlement, where losers' hands are in scope.
pub fn score_win(kind: WinKind) -> Score {
    match kind {
        WinKind::Normal => 2,
        WinKind::Pairs => 3,
        WinKind::OkeyDiscard => 4,
    }
}

impl std::fmt::Display for WinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            WinKind::Normal => write!(f, "Normal"),
            WinKind::Pairs => write!(f, "Pairs"),
            WinKind::OkeyDiscard => write!(f, "OkeyDiscard"),
        }
    }
}

impl TryFrom<&str> for WinKind {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "Normal" => Ok(WinKind::Normal),
            "Pairs" => Ok(WinKind::Pairs),
            "OkeyDiscard" => Ok(WinKind::OkeyDiscard),
            _ => Err(format!("invalid win kind: {}", s)),
        }
    }
}
