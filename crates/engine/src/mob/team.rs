use crate::script::loaders::ArgCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MobTeam {
    #[default]
    None,
    Player1,
    Player2,
    Player3,
    Player4,
    Enemy1,
    Enemy2,
    Enemy3,
    Enemy4,
    Obstacle,
    Other,
}

impl ArgCode for MobTeam {
    const ALL: &'static [Self] = &[
        MobTeam::None,
        MobTeam::Player1,
        MobTeam::Player2,
        MobTeam::Player3,
        MobTeam::Player4,
        MobTeam::Enemy1,
        MobTeam::Enemy2,
        MobTeam::Enemy3,
        MobTeam::Enemy4,
        MobTeam::Obstacle,
        MobTeam::Other,
    ];

    fn keyword(self) -> &'static str {
        match self {
            MobTeam::None => "none",
            MobTeam::Player1 => "player_1",
            MobTeam::Player2 => "player_2",
            MobTeam::Player3 => "player_3",
            MobTeam::Player4 => "player_4",
            MobTeam::Enemy1 => "enemy_1",
            MobTeam::Enemy2 => "enemy_2",
            MobTeam::Enemy3 => "enemy_3",
            MobTeam::Enemy4 => "enemy_4",
            MobTeam::Obstacle => "obstacle",
            MobTeam::Other => "other",
        }
    }
}

impl MobTeam {
    pub fn parse(name: &str) -> Option<Self> {
        <Self as ArgCode>::parse(name)
    }

    pub fn name(self) -> &'static str {
        self.keyword()
    }

    pub(crate) fn code(self) -> i32 {
        <Self as ArgCode>::code(self)
    }

    pub(crate) fn from_code(code: i32) -> Option<Self> {
        <Self as ArgCode>::from_code(code)
    }

    /// Teams that may target each other. Teamless mobs and `other` never fight.
    pub fn is_opponent_of(self, other: MobTeam) -> bool {
        if matches!(self, MobTeam::None | MobTeam::Other)
            || matches!(other, MobTeam::None | MobTeam::Other)
        {
            return false;
        }
        self != other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_codes_round_trip() {
        let team = MobTeam::parse("enemy_2").expect("team");
        assert_eq!(team, MobTeam::Enemy2);
        assert_eq!(MobTeam::from_code(team.code()), Some(team));
        assert_eq!(MobTeam::parse("pirates"), None);
    }

    #[test]
    fn opponents() {
        assert!(MobTeam::Player1.is_opponent_of(MobTeam::Enemy1));
        assert!(!MobTeam::Player1.is_opponent_of(MobTeam::Player1));
        assert!(!MobTeam::None.is_opponent_of(MobTeam::Enemy1));
        assert!(!MobTeam::Enemy1.is_opponent_of(MobTeam::Other));
    }
}
