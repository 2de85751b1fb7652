//! Prompt construction and move decoding.

use serde::Deserialize;
use slidebench_puzzle::{Board, Direction};
use tracing::{debug, instrument};

/// Instruction sent as the system message of every request.
pub const SYSTEM_PROMPT: &str = "You are solving a sliding tile puzzle (n-puzzle). \
The board is a square grid with numbered tiles and one blank (null). \
On each turn, you may move the blank up, down, left, or right by swapping it with the adjacent tile. \
Your task is to choose the SINGLE next move that best progresses toward the solved state. \
You MUST respond in strict JSON with a single key 'move' whose value is one of: 'up', 'down', 'left', 'right'. \
Do not include any other text.";

/// Builds the user message: the board as JSON rows plus the remaining budget.
#[instrument(skip(board), fields(size = board.size()))]
pub fn user_message(board: &Board, moves_remaining: u32) -> String {
    let rows = serde_json::to_string(&board.rows()).unwrap_or_default();
    format!(
        "Current board (JSON):\n{rows}\n\nYou have at most {moves_remaining} moves remaining in this run. \
Respond with JSON only, for example: {{\"move\": \"up\"}}."
    )
}

#[derive(Debug, Deserialize)]
struct MoveAnswer {
    #[serde(rename = "move")]
    direction: String,
}

/// Decodes `{"move": "<direction>"}`.
///
/// Returns `None` for anything that is not such an object with one of the
/// four lowercase direction names.
#[instrument(skip(content), fields(content_length = content.len()))]
pub fn parse_move(content: &str) -> Option<Direction> {
    let answer: MoveAnswer = match serde_json::from_str(content.trim()) {
        Ok(answer) => answer,
        Err(e) => {
            debug!(error = %e, "Model content is not a move object");
            return None;
        }
    };
    let direction = Direction::parse(&answer.direction);
    if direction.is_none() {
        debug!(value = %answer.direction, "Model named an unknown direction");
    }
    direction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_accepts_strict_json() {
        assert_eq!(parse_move(r#"{"move": "up"}"#), Some(Direction::Up));
        assert_eq!(parse_move("  {\"move\":\"left\"}\n"), Some(Direction::Left));
    }

    #[test]
    fn test_parse_move_rejects_everything_else() {
        assert_eq!(parse_move("up"), None);
        assert_eq!(parse_move(r#"{"move": "UP"}"#), None);
        assert_eq!(parse_move(r#"{"move": "diagonal"}"#), None);
        assert_eq!(parse_move(r#"{"direction": "up"}"#), None);
        assert_eq!(parse_move("```json\n{\"move\": \"up\"}\n```"), None);
        assert_eq!(parse_move(""), None);
    }

    #[test]
    fn test_user_message_embeds_board_and_budget() {
        let message = user_message(&Board::solved(2), 17);
        assert!(message.contains("[[1,2],[3,null]]"));
        assert!(message.contains("at most 17 moves"));
        assert!(message.contains(r#"{"move": "up"}"#));
    }
}
