// Team registry: identities, drop-outs and per-match participation.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schedule::period::TeamSlot;
use crate::types::{MatchNumber, TeamId};

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub rookie: bool,
    // The last match the team takes part in, if it withdrew mid-competition.
    pub dropped_out_after: Option<MatchNumber>,
}

impl Team {
    pub fn build(id: impl Into<TeamId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rookie: false,
            dropped_out_after: None,
        }
    }

    // Whether the team still takes part in the given match.
    pub fn is_still_around(&self, num: MatchNumber) -> bool {
        match self.dropped_out_after {
            Some(last) => num <= last,
            None => true,
        }
    }
}

// All declared teams, in canonical (alphabetical) order.
#[derive(Debug, Clone, Default)]
pub struct TeamRegistry {
    teams: BTreeMap<TeamId, Team>,
}

impl TeamRegistry {
    pub fn build(teams: impl IntoIterator<Item = Team>) -> Self {
        Self {
            teams: teams.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Team> {
        self.teams.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.teams.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &TeamId> {
        self.teams.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    // Blank the slots of teams which have dropped out by the given match.
    // A dropped team's slot becomes a bye, which is distinct from a
    // disqualification: the team simply is not there.
    pub fn blank_dropped_out(&self, slots: &mut [TeamSlot], num: MatchNumber) {
        for slot in slots.iter_mut() {
            let dropped = match slot.team() {
                Some(id) => match self.teams.get(id) {
                    Some(team) => !team.is_still_around(num),
                    None => false,
                },
                None => false,
            };

            if dropped {
                *slot = TeamSlot::Empty;
            }
        }
    }

    // Teams eligible for knockout seeding: everyone still around at the first
    // knockout match who played at least one league match.
    pub fn knockout_eligible(
        &self,
        first_knockout_num: MatchNumber,
        league_participants: &BTreeSet<TeamId>,
    ) -> Vec<TeamId> {
        self.teams
            .values()
            .filter(|team| team.is_still_around(first_knockout_num))
            .filter(|team| league_participants.contains(&team.id))
            .map(|team| team.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TeamRegistry {
        let mut quitter = Team::build("BEES", "The Bees");
        quitter.dropped_out_after = Some(4);
        TeamRegistry::build([Team::build("ANT", "Ants"), quitter])
    }

    #[test]
    fn still_around_up_to_and_including_the_last_match() {
        let registry = registry();
        let quitter = registry.get("BEES").unwrap();

        assert!(quitter.is_still_around(3));
        assert!(quitter.is_still_around(4));
        assert!(!quitter.is_still_around(5));
    }

    #[test]
    fn dropped_teams_are_blanked_in_later_matches() {
        let registry = registry();
        let mut slots = vec![
            TeamSlot::Team("ANT".to_string()),
            TeamSlot::Team("BEES".to_string()),
            TeamSlot::Empty,
        ];

        registry.blank_dropped_out(&mut slots, 4);
        assert_eq!(TeamSlot::Team("BEES".to_string()), slots[1]);

        registry.blank_dropped_out(&mut slots, 5);
        assert_eq!(TeamSlot::Empty, slots[1]);
        assert_eq!(TeamSlot::Team("ANT".to_string()), slots[0]);
    }

    #[test]
    fn eligibility_needs_a_league_appearance_and_no_drop_out() {
        let registry = registry();
        let played: BTreeSet<TeamId> =
            ["ANT".to_string(), "BEES".to_string()].into_iter().collect();

        // BEES dropped out after match 4, before the knockouts at match 10.
        assert_eq!(
            vec!["ANT".to_string()],
            registry.knockout_eligible(10, &played),
        );

        // A team with no league appearances is not seeded either.
        let only_ant: BTreeSet<TeamId> = ["ANT".to_string()].into_iter().collect();
        assert_eq!(
            vec!["ANT".to_string()],
            registry.knockout_eligible(2, &only_ant),
        );
    }
}
