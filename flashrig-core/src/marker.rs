/// Sentinel event codes on the marker stream. Flash markers carry the group
/// key verbatim, so group keys must stay below `WORD_START`.
pub const WORD_START: i32 = 101;
pub const WORD_END: i32 = 102;
pub const TRIAL_START: i32 = 103;
pub const TRIAL_END: i32 = 104;
pub const PAUSE_START: i32 = 105;
pub const PAUSE_END: i32 = 106;

/// One event on the outgoing marker stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Flash(i32),
    WordStart,
    WordEnd,
    TrialStart,
    TrialEnd,
    PauseStart,
    PauseEnd,
}

impl Marker {
    pub fn code(self) -> i32 {
        match self {
            Marker::Flash(key) => key,
            Marker::WordStart => WORD_START,
            Marker::WordEnd => WORD_END,
            Marker::TrialStart => TRIAL_START,
            Marker::TrialEnd => TRIAL_END,
            Marker::PauseStart => PAUSE_START,
            Marker::PauseEnd => PAUSE_END,
        }
    }

    pub fn from_code(code: i32) -> Option<Marker> {
        match code {
            WORD_START => Some(Marker::WordStart),
            WORD_END => Some(Marker::WordEnd),
            TRIAL_START => Some(Marker::TrialStart),
            TRIAL_END => Some(Marker::TrialEnd),
            PAUSE_START => Some(Marker::PauseStart),
            PAUSE_END => Some(Marker::PauseEnd),
            key if (0..WORD_START).contains(&key) => Some(Marker::Flash(key)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        let markers = [
            Marker::Flash(0),
            Marker::Flash(11),
            Marker::WordStart,
            Marker::WordEnd,
            Marker::TrialStart,
            Marker::TrialEnd,
            Marker::PauseStart,
            Marker::PauseEnd,
        ];
        for m in markers {
            assert_eq!(Marker::from_code(m.code()), Some(m));
        }
        assert_eq!(Marker::from_code(-1), None);
        assert_eq!(Marker::from_code(999), None);
    }
}
