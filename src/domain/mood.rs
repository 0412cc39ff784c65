//! Mood tags.

use serde::{Deserialize, Serialize};

/// Display mood of a diary, as understood by the target app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Angry,
    Confused,
    Cool,
    Cry,
    Dead,
    Devil,
    Excited,
    Frown,
    Happy,
    Kiss,
    Lol,
    Neutral,
    Poop,
    Sad,
    Sick,
    Tongue,
    Wink,
}

impl Mood {
    /// Every mood, in declaration order
    pub const ALL: [Mood; 17] = [
        Mood::Angry,
        Mood::Confused,
        Mood::Cool,
        Mood::Cry,
        Mood::Dead,
        Mood::Devil,
        Mood::Excited,
        Mood::Frown,
        Mood::Happy,
        Mood::Kiss,
        Mood::Lol,
        Mood::Neutral,
        Mood::Poop,
        Mood::Sad,
        Mood::Sick,
        Mood::Tongue,
        Mood::Wink,
    ];

    /// String written into the record's `Mood` field
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Angry => "angry",
            Mood::Confused => "confused",
            Mood::Cool => "cool",
            Mood::Cry => "cry",
            Mood::Dead => "dead",
            Mood::Devil => "devil",
            Mood::Excited => "excited",
            Mood::Frown => "frown",
            Mood::Happy => "happy",
            Mood::Kiss => "kiss",
            Mood::Lol => "lol",
            Mood::Neutral => "neutral",
            Mood::Poop => "poop",
            Mood::Sad => "sad",
            Mood::Sick => "sick",
            Mood::Tongue => "tongue",
            Mood::Wink => "wink",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Mood {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let name = s.to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == name)
            .ok_or_else(|| anyhow::anyhow!("Unknown mood: {}", s))
    }
}
