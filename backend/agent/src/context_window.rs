//! Context window trimming for classifier history.

use parley_core::Turn;

/// Rough characters-per-token ratio used for budgeting.
const CHARS_PER_TOKEN: usize = 4;

pub struct ContextWindow {
    pub turns: Vec<Turn>,
    pub token_count: usize,
}

impl ContextWindow {
    /// Build a window from chronologically ordered turns.
    ///
    /// Walks backwards from the newest turn, accumulating estimated tokens, and
    /// drops everything older once `max_tokens` would be exceeded. The newest
    /// turn is always kept, even if it alone is over budget.
    pub fn build(transcript: Vec<Turn>, max_tokens: usize) -> Self {
        let mut kept = 0;
        let mut token_count = 0;

        for turn in transcript.iter().rev() {
            let cost = estimate_tokens(turn);
            if kept > 0 && token_count + cost > max_tokens {
                break;
            }
            token_count += cost;
            kept += 1;
        }

        let skip = transcript.len() - kept;
        let turns = transcript.into_iter().skip(skip).collect();
        Self { turns, token_count }
    }
}

/// Estimated token cost of one turn.
pub fn estimate_tokens(turn: &Turn) -> usize {
    let chars = turn.user_message.chars().count() + turn.assistant_message.chars().count();
    chars.div_ceil(CHARS_PER_TOKEN)
}
