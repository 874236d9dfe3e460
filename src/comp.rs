// The competition facade: everything evaluated from one compstate.
use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::compstate::{KnockoutMode, RawCompstate, ShepherdingFile};
use crate::error::{Error, Result};
use crate::knockout::{automatic, static_schedule, Bracket, KnockoutContext};
use crate::operations::MatchOperations;
use crate::schedule::period::{Match, MatchKind};
use crate::schedule::MatchSchedule;
use crate::scoring::scores::{GameScore, LeagueScores, Scores};
use crate::scoring::{score_sheet, GameScorer, Scorer};
use crate::standings::{LeagueStandings, RankCriteria, Standing, DEFAULT_RANK_CRITERIA};
use crate::team::{Team, TeamRegistry};
use crate::types::{ArenaId, LeaguePoints, MatchId, Position, TeamId};
use crate::winners::{compute_awards, knockout_winner, AwardKind};

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize)]
pub struct Arena {
    pub id: ArenaId,
    pub display_name: String,
    pub colour: Option<String>,
}

// The answer to "what is happening now, and what happens next?".
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionState {
    pub time: OffsetDateTime,
    pub current_matches: Vec<Match>,
    // The matches of the next slot to start.
    pub upcoming_matches: Vec<Match>,
    // The cumulative delay in effect.
    pub delayed_by: Duration,
    pub standings: Vec<Standing>,
    pub knockout_rounds: Vec<Vec<Match>>,
    pub staging_matches: Vec<Match>,
    // Matches which have finished but have no scoresheet yet.
    pub missing_scores: Vec<MatchId>,
}

// A fully evaluated competition. Immutable once assembled; every query is a
// pure function of this value and the caller's clock.
#[derive(Debug, Clone)]
pub struct Competition {
    pub arenas: BTreeMap<ArenaId, Arena>,
    pub teams_per_arena: usize,
    pub teams: TeamRegistry,
    pub schedule: MatchSchedule,
    pub bracket: Bracket,
    pub scores: Scores,
    pub standings: LeagueStandings,
    pub awards: BTreeMap<AwardKind, Vec<TeamId>>,
    pub shepherding: Option<ShepherdingFile>,
    pub operations: MatchOperations,
    league_complete: bool,
}

impl Competition {
    // Load a compstate directory with the built-in scorer.
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_with_scorer(root, &GameScorer)
    }

    // Load a compstate directory, scoring sheets with the given scorer.
    pub fn load_with_scorer(root: &Path, scorer: &dyn Scorer) -> Result<Self> {
        let raw = RawCompstate::load(root)?;
        Self::assemble(raw, scorer)
    }

    // Evaluate already-parsed records into a competition. No I/O happens
    // here; hosts with their own deserialiser enter through this door.
    pub fn assemble(raw: RawCompstate, scorer: &dyn Scorer) -> Result<Self> {
        let teams = TeamRegistry::build(raw.teams.teams.iter().map(|(id, record)| Team {
            id: id.clone(),
            name: record.name.clone(),
            rookie: record.rookie,
            dropped_out_after: record.dropped_out_after,
        }));

        let mut schedule = MatchSchedule::build(&raw.schedule, &raw.league, &teams)?;

        // Score the league.
        let mut league_games: BTreeMap<MatchId, GameScore> = BTreeMap::new();
        for (id, (path, sheet)) in &raw.league_sheets {
            let scheduled = schedule
                .match_at(&id.0, id.1)
                .filter(|m| m.kind == MatchKind::League)
                .ok_or_else(|| Error::ScoresheetMismatch {
                    path: path.clone(),
                    message: "no league match was scheduled here".to_string(),
                })?;

            if !crate::scoring::sheet_covers(&sheet.teams, &scheduled.teams) {
                return Err(Error::ScoresheetMismatch {
                    path: path.clone(),
                    message: format!(
                        "sheet teams {:?} differ from scheduled teams {:?}",
                        sheet.teams, scheduled.teams,
                    ),
                });
            }

            let scored = score_sheet(scorer, path, sheet)?;
            league_games.insert(id.clone(), GameScore::build(id.clone(), scored));
        }
        let league = LeagueScores::build(teams.ids(), league_games);

        let league_complete = schedule.matches[..schedule.n_league_matches]
            .iter()
            .flat_map(|slot| slot.values())
            .all(|m| league.is_scored(&m.id()));

        let chain: Vec<RankCriteria> = raw
            .schedule
            .league_tie_break
            .clone()
            .unwrap_or_else(|| DEFAULT_RANK_CRITERIA.to_vec());
        let standings = LeagueStandings::build(&league.teams, &chain);

        // Schedule the knockouts.
        let config = raw.schedule.knockout.clone().unwrap_or_default();
        let ctx = KnockoutContext {
            arenas: raw.arenas.arenas.keys().cloned().collect(),
            capacity: raw.arenas.teams_per_arena,
            registry: &teams,
            standings: &standings,
            league_complete,
            scorer,
            knockout_sheets: &raw.knockout_sheets,
            tiebreaker_sheets: &raw.tiebreaker_sheets,
        };

        let outcome = match config.mode {
            KnockoutMode::Static => {
                let plan = config.static_plan.as_ref().ok_or_else(|| Error::Schema {
                    path: std::path::PathBuf::from("schedule.yaml"),
                    message: "knockout mode is static but no static plan is given".to_string(),
                })?;
                static_schedule::add_knockouts(&ctx, &mut schedule, plan)?
            }
            KnockoutMode::Seeded => automatic::add_knockouts(&ctx, &mut schedule, config.arity)?,
        };

        let scores = Scores {
            league,
            knockout: outcome.scores,
            tiebreaker: outcome.tiebreaker_scores,
        };
        let bracket = outcome.bracket;

        let awards = compute_awards(
            &standings,
            &scores,
            league_complete,
            bracket.final_match_id(),
            &bracket.final_tiebreakers,
            &raw.awards,
        );

        let operations = MatchOperations::build(raw.operations.as_ref(), &schedule)?;

        let arenas = raw
            .arenas
            .arenas
            .into_iter()
            .map(|(id, record)| {
                (
                    id.clone(),
                    Arena {
                        id,
                        display_name: record.display_name,
                        colour: record.colour,
                    },
                )
            })
            .collect();

        Ok(Self {
            arenas,
            teams_per_arena: raw.arenas.teams_per_arena,
            teams,
            schedule,
            bracket,
            scores,
            standings,
            awards,
            shepherding: raw.shepherding,
            operations,
            league_complete,
        })
    }

    // Whether every league match has been scored.
    pub fn standings_finalised(&self) -> bool {
        self.league_complete
    }

    // The number of the most recently scored match anywhere.
    pub fn last_scored_match(&self) -> Option<crate::types::MatchNumber> {
        self.scores.last_scored_match()
    }

    pub fn standings(&self) -> &[Standing] {
        self.standings.standings()
    }

    pub fn position_of(&self, team: &str) -> Option<Position> {
        self.standings.position_of(team)
    }

    // The league points a match awarded, whichever part of the competition
    // it belongs to.
    pub fn points_for(&self, match_id: &MatchId) -> Option<&BTreeMap<TeamId, LeaguePoints>> {
        Some(&self.game_score(match_id)?.league_points)
    }

    fn game_score(&self, match_id: &MatchId) -> Option<&GameScore> {
        self.scores
            .league
            .games
            .get(match_id)
            .or_else(|| self.scores.knockout.games.get(match_id))
            .or_else(|| self.scores.tiebreaker.games.get(match_id))
    }

    // The score of a match that ought to have one by now.
    pub fn score_for(&self, match_id: &MatchId) -> Result<&GameScore> {
        self.game_score(match_id).ok_or_else(|| Error::MissingScore {
            arena: match_id.0.clone(),
            num: match_id.1,
        })
    }

    pub fn matches_at(&self, when: OffsetDateTime) -> Vec<&Match> {
        self.schedule.matches_at(when)
    }

    pub fn next_match_slot(
        &self,
        when: OffsetDateTime,
    ) -> Option<(OffsetDateTime, Vec<&Match>)> {
        self.schedule.next_slot_after(when)
    }

    // Matches which have ended without a scoresheet turning up. They count
    // as "not yet scored" everywhere else; this is where the gap surfaces.
    pub fn missing_scores(&self, now: OffsetDateTime) -> Vec<MatchId> {
        self.schedule
            .all_matches()
            .filter(|m| m.end_time <= now)
            .map(Match::id)
            .filter(|id| !self.scores.is_scored(id))
            .collect()
    }

    // The knockout bracket as matches, in play order.
    pub fn knockout_rounds(&self) -> Vec<Vec<&Match>> {
        self.bracket
            .rounds
            .iter()
            .map(|round| {
                round
                    .iter()
                    .filter_map(|(arena, num)| self.schedule.match_at(arena, *num))
                    .collect()
            })
            .collect()
    }

    // The match which decides the champion: the final, or the tiebreaker
    // that settled it.
    pub fn final_match(&self) -> Option<&Match> {
        let (arena, num) = self.bracket.deciding_match_id()?;
        self.schedule.match_at(arena, *num)
    }

    pub fn league_winner(&self) -> Option<&TeamId> {
        match self.league_complete {
            true => self.standings.unique_leader(),
            false => None,
        }
    }

    pub fn knockout_champion(&self) -> Option<TeamId> {
        let final_id = self.bracket.final_match_id()?;
        knockout_winner(&self.scores, final_id, &self.bracket.final_tiebreakers)
    }

    pub fn awards(&self) -> &BTreeMap<AwardKind, Vec<TeamId>> {
        &self.awards
    }

    pub fn display_standings(&self) -> String {
        self.standings.display()
    }

    // The consistent view: everything a display needs about one instant.
    pub fn state_at(&self, now: OffsetDateTime) -> CompetitionState {
        let current = self.operations.current_matches(&self.schedule, now);

        let upcoming_matches = match self.schedule.next_slot_after(now) {
            Some((_, matches)) => matches.into_iter().cloned().collect(),
            None => Vec::new(),
        };

        let knockout_rounds = self
            .knockout_rounds()
            .into_iter()
            .map(|round| round.into_iter().cloned().collect())
            .collect();

        CompetitionState {
            time: now,
            current_matches: current.matches,
            upcoming_matches,
            delayed_by: self.schedule.delay_at(now),
            standings: self.standings.standings().to_vec(),
            knockout_rounds,
            staging_matches: current.staging_matches,
            missing_scores: self.missing_scores(now),
        }
    }
}
