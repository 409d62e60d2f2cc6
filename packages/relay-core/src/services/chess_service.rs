use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Rank, Square};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    models::{Game, GameResult, GameStatus, MoveHistoryItem, MoveRecord, Side},
    services::errors::chess_service_errors::ChessServiceError,
};

/// Half-move clock value at which the seventy-five-move rule ends the game.
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

/// Pure move validation. Every call rebuilds its board from the stored
/// position string; nothing is cached between calls.
#[derive(Clone, Default)]
pub struct ChessService;

impl ChessService {
    pub fn new() -> Self {
        ChessService
    }

    /// Validate `uci` against `game` and compute the successor game.
    ///
    /// The receiver is never mutated, so a caller whose commit loses the
    /// version race can drop the result without side effects.
    pub fn apply_move(
        &self,
        game: &Game,
        uci: &str,
        now: DateTime<Utc>,
    ) -> Result<(Game, MoveRecord), ChessServiceError> {
        if game.status.is_terminal() {
            return Err(ChessServiceError::GameNotOngoing);
        }

        let chess_move = parse_uci(uci)?;

        let board = parse_board(&game.fen)?;

        let legal_moves: Vec<ChessMove> = MoveGen::new_legal(&board).collect();
        if !legal_moves.contains(&chess_move) {
            return Err(ChessServiceError::IllegalMove(format!(
                "{} is not legal in this position",
                uci
            )));
        }

        let (halfmove_clock, fullmove_number) = move_counters(&game.fen);
        let resets_clock = board.piece_on(chess_move.get_source()) == Some(Piece::Pawn)
            || board.piece_on(chess_move.get_dest()).is_some();
        let next_halfmove = if resets_clock { 0 } else { halfmove_clock + 1 };
        let next_fullmove = if board.side_to_move() == Color::Black {
            fullmove_number + 1
        } else {
            fullmove_number
        };

        let new_board = board.make_move_new(chess_move);
        let fen_after = with_counters(&new_board, next_halfmove, next_fullmove);

        let mover = side_of(board.side_to_move());
        let (status, result) = outcome(&new_board, mover, next_halfmove);

        let successor = Game {
            id: game.id,
            status,
            result,
            fen: fen_after.clone(),
            side_to_move: side_of(new_board.side_to_move()),
            ply_count: game.ply_count + 1,
            last_move_uci: Some(uci.to_string()),
            last_move_at: Some(now),
            state_version: game.state_version + 1,
            created_at: game.created_at,
            updated_at: now,
        };

        let record = MoveRecord {
            id: Uuid::new_v4(),
            uci: uci.to_string(),
            fen_before: game.fen.clone(),
            fen_after,
            created_at: now,
        };

        Ok((successor, record))
    }

    /// Legal moves for the current position in coordinate notation.
    pub fn legal_moves(game: &Game) -> Result<Vec<String>, ChessServiceError> {
        let board = parse_board(&game.fen)?;

        let legal_moves: Vec<String> = MoveGen::new_legal(&board)
            .map(|m| m.to_string())
            .collect();

        Ok(legal_moves)
    }

    /// Position string reached by playing `history` from the initial position.
    pub fn replay(&self, history: &[MoveHistoryItem]) -> Result<String, ChessServiceError> {
        let mut game = Game::new(Uuid::nil(), DateTime::<Utc>::UNIX_EPOCH);
        for item in history {
            let (next, _) = self.apply_move(&game, &item.uci, item.created_at)?;
            game = next;
        }
        Ok(game.fen)
    }
}

/// Coordinate notation: `[a-h][1-8][a-h][1-8]` plus an optional `[qrbn]`.
pub fn is_valid_uci_syntax(uci: &str) -> bool {
    let bytes = uci.as_bytes();
    if bytes.len() != 4 && bytes.len() != 5 {
        return false;
    }
    let is_file = |b: u8| (b'a'..=b'h').contains(&b);
    let is_rank = |b: u8| (b'1'..=b'8').contains(&b);
    if !is_file(bytes[0]) || !is_rank(bytes[1]) || !is_file(bytes[2]) || !is_rank(bytes[3]) {
        return false;
    }
    match bytes.get(4) {
        None => true,
        Some(b'q' | b'r' | b'b' | b'n') => true,
        Some(_) => false,
    }
}

fn parse_uci(uci: &str) -> Result<ChessMove, ChessServiceError> {
    if !is_valid_uci_syntax(uci) {
        return Err(ChessServiceError::InvalidUci);
    }

    let from_sq = Square::from_str(&uci[..2]).map_err(|_| ChessServiceError::InvalidUci)?;
    let to_sq = Square::from_str(&uci[2..4]).map_err(|_| ChessServiceError::InvalidUci)?;

    let promotion = match uci.get(4..5) {
        Some("q") => Some(Piece::Queen),
        Some("r") => Some(Piece::Rook),
        Some("b") => Some(Piece::Bishop),
        Some("n") => Some(Piece::Knight),
        _ => None,
    };

    Ok(ChessMove::new(from_sq, to_sq, promotion))
}

fn parse_board(fen: &str) -> Result<Board, ChessServiceError> {
    Board::from_str(fen)
        .map_err(|e| ChessServiceError::InvalidPosition(format!("Invalid FEN: {}", e)))
}

/// Half-move clock and full-move number of a position string, defaulting
/// to a fresh game when the fields are missing.
fn move_counters(fen: &str) -> (u32, u32) {
    let mut fields = fen.split_whitespace().skip(4);
    let halfmove = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
    let fullmove = fields.next().and_then(|f| f.parse().ok()).unwrap_or(1);
    (halfmove, fullmove)
}

fn with_counters(board: &Board, halfmove: u32, fullmove: u32) -> String {
    let rendered = format!("{}", board);
    let fields: Vec<&str> = rendered.split_whitespace().take(3).collect();
    format!(
        "{} {} {} {}",
        fields.join(" "),
        en_passant_target(board),
        halfmove,
        fullmove
    )
}

/// The square a capturing pawn lands on, not the square of the pawn that
/// just made the double step.
fn en_passant_target(board: &Board) -> String {
    match board.en_passant() {
        Some(pawn) => {
            let rank = match board.side_to_move() {
                Color::White => Rank::Sixth,
                Color::Black => Rank::Third,
            };
            Square::make_square(rank, pawn.get_file()).to_string()
        }
        None => "-".to_string(),
    }
}

fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

fn outcome(board: &Board, mover: Side, halfmove_clock: u32) -> (GameStatus, Option<GameResult>) {
    match board.status() {
        BoardStatus::Checkmate => (GameStatus::Checkmate, Some(GameResult::winner(mover))),
        BoardStatus::Stalemate => (GameStatus::Stalemate, Some(GameResult::Draw)),
        BoardStatus::Ongoing
            if insufficient_material(board) || halfmove_clock >= SEVENTY_FIVE_MOVE_PLIES =>
        {
            (GameStatus::Draw, Some(GameResult::Draw))
        }
        BoardStatus::Ongoing => (GameStatus::Ongoing, None),
    }
}

/// Neither side can ever deliver mate: bare kings, a single minor piece,
/// or bishops that all stand on one square colour.
fn insufficient_material(board: &Board) -> bool {
    let heavy =
        *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy.popcnt() > 0 {
        return false;
    }

    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    let minors = knights.popcnt() + bishops.popcnt();
    if minors <= 1 {
        return true;
    }
    if knights.popcnt() > 0 {
        return false;
    }

    let mut colours = (*bishops).map(square_colour);
    match colours.next() {
        Some(first) => colours.all(|c| c == first),
        None => true,
    }
}

fn square_colour(sq: Square) -> bool {
    (sq.get_file().to_index() + sq.get_rank().to_index()) % 2 == 0
}
