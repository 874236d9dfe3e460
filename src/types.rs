// Custom types that are widely used are defined here.

// Identifier types. Team and arena identifiers are short opaque strings,
// unique within one competition.
pub type TeamId = String;
pub type ArenaId = String;

// Matches are numbered globally; every arena appearance of one slot shares
// the number.
pub type MatchNumber = u32;
pub type MatchId = (ArenaId, MatchNumber);

// Raw points produced by the game scorer.
pub type GamePoints = i64;

// Normalised points awarded towards the league. Tie groups share the average
// of the schedule entries they span, so halves can occur.
pub type LeaguePoints = f64;

// A 1-based ranking position. Tied teams share a position and the next group
// skips by the width of the tie.
pub type Position = u32;
