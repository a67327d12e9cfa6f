//! Threat detection along board lines
//!
//! Every (cell, direction) pair is classified by a lookup in a precomputed
//! [`PatternTable`]: the `2 * (win_length - 1)` cells around the origin are
//! encoded base 3 (empty / own / blocked, where the board edge counts as
//! blocked) and the table yields the threat kind plus the span of the threat
//! relative to the origin. No dictionary lookups happen on the search path.
//!
//! Two scanning modes are provided:
//! - [`ThreatDetector::detect_all`]: full scan, O(stones x 4)
//! - [`ThreatTracker`]: incremental, rescans only the four lines through a
//!   changed cell
//!
//! Both produce the same threat set for the same board.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Direction, Player, Pos, Stone, MAX_BOARD_SIZE, MAX_WIN_LENGTH, MIN_WIN_LENGTH};

/// Threat categories, ordered from least to most dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    /// Can grow into a (closed) three
    Two,
    /// Can grow into an open or broken three
    OpenTwo,
    /// One move from a four, never from an open four
    Three,
    /// Gapped three (`X_XX`) one move from an open four
    BrokenThree,
    /// Contiguous three one move from an open four
    OpenThree,
    /// Exactly one cell completes a five
    Four,
    /// Two or more cells complete a five: won in one
    OpenFour,
    /// Win length or more in a row
    Five,
}

impl ThreatKind {
    pub const COUNT: usize = 8;

    /// Most dangerous first.
    pub const BY_DANGER: [ThreatKind; 8] = [
        ThreatKind::Five,
        ThreatKind::OpenFour,
        ThreatKind::Four,
        ThreatKind::OpenThree,
        ThreatKind::BrokenThree,
        ThreatKind::Three,
        ThreatKind::OpenTwo,
        ThreatKind::Two,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    fn from_index(idx: usize) -> Option<ThreatKind> {
        const KINDS: [ThreatKind; 8] = [
            ThreatKind::Two,
            ThreatKind::OpenTwo,
            ThreatKind::Three,
            ThreatKind::BrokenThree,
            ThreatKind::OpenThree,
            ThreatKind::Four,
            ThreatKind::OpenFour,
            ThreatKind::Five,
        ];
        KINDS.get(idx).copied()
    }

    /// Fours and fives force an immediate reply.
    #[inline]
    pub fn is_four_or_better(self) -> bool {
        self >= ThreatKind::Four
    }

    /// Threes that become an open four if ignored.
    #[inline]
    pub fn is_live_three(self) -> bool {
        matches!(self, ThreatKind::OpenThree | ThreatKind::BrokenThree)
    }

    pub fn name(self) -> &'static str {
        match self {
            ThreatKind::Two => "two",
            ThreatKind::OpenTwo => "open-two",
            ThreatKind::Three => "three",
            ThreatKind::BrokenThree => "broken-three",
            ThreatKind::OpenThree => "open-three",
            ThreatKind::Four => "four",
            ThreatKind::OpenFour => "open-four",
            ThreatKind::Five => "five",
        }
    }
}

/// A classified pattern on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Threat {
    pub kind: ThreatKind,
    pub direction: Direction,
    pub player: Player,
    /// First cell of the span (lowest offset along `direction`)
    pub start: Pos,
    /// Span length, gaps included
    pub len: u8,
    /// Cell before `start` is on the board and empty
    pub open_start: bool,
    /// Cell after the span is on the board and empty
    pub open_end: bool,
}

impl Threat {
    /// Cells covered by the threat, gaps included.
    pub fn cells(&self) -> impl Iterator<Item = Pos> {
        let (dr, dc) = self.direction.delta();
        let start = self.start;
        (0..i32::from(self.len)).map(move |n| {
            Pos::new(
                (i32::from(start.row) + dr * n) as u8,
                (i32::from(start.col) + dc * n) as u8,
            )
        })
    }
}

/// Threat count per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ThreatCounts {
    counts: [u32; ThreatKind::COUNT],
}

impl ThreatCounts {
    #[inline]
    pub fn get(&self, kind: ThreatKind) -> u32 {
        self.counts[kind.index()]
    }

    #[inline]
    pub fn add(&mut self, kind: ThreatKind) {
        self.counts[kind.index()] += 1;
    }

    #[inline]
    pub fn remove(&mut self, kind: ThreatKind) {
        self.counts[kind.index()] -= 1;
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Most dangerous kind present.
    pub fn strongest(&self) -> Option<ThreatKind> {
        ThreatKind::BY_DANGER
            .into_iter()
            .find(|&kind| self.get(kind) > 0)
    }

    /// (kind, count) pairs for non-zero counts, most dangerous first.
    pub fn iter(&self) -> impl Iterator<Item = (ThreatKind, u32)> + '_ {
        ThreatKind::BY_DANGER
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
            .filter(|&(_, n)| n > 0)
    }
}

/// Output of a full-board scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatReport {
    pub counts: ThreatCounts,
    /// Deduplicated, sorted threats
    pub threats: Vec<Threat>,
}

// =============================================================================
// Pattern table
// =============================================================================

const EMPTY: u8 = 0;
const OWN: u8 = 1;
const BLOCKED: u8 = 2;

/// Entry of the pattern table.
#[derive(Debug, Clone, Copy, Default)]
struct PatternEntry {
    /// 0 = no threat, otherwise `ThreatKind::index() + 1`
    kind: u8,
    /// Span relative to the origin
    lo: i8,
    hi: i8,
}

/// Precomputed classification of every line neighbourhood for one win length.
pub struct PatternTable {
    win_length: usize,
    radius: usize,
    entries: Vec<PatternEntry>,
}

static TABLES: [OnceLock<PatternTable>; MAX_WIN_LENGTH + 1] =
    [const { OnceLock::new() }; MAX_WIN_LENGTH + 1];

impl PatternTable {
    /// Shared table for `win_length`, built on first use.
    pub fn get(win_length: usize) -> &'static PatternTable {
        let win_length = win_length.clamp(MIN_WIN_LENGTH, MAX_WIN_LENGTH);
        TABLES[win_length].get_or_init(|| PatternTable::build(win_length))
    }

    fn build(win_length: usize) -> Self {
        let radius = win_length - 1;
        let cells = 2 * radius;
        let size = 3usize.pow(cells as u32);
        let mut entries = Vec::with_capacity(size);
        let mut line = vec![EMPTY; 2 * radius + 1];

        for code in 0..size {
            let mut rest = code;
            for slot in 0..cells {
                let idx = if slot < radius { slot } else { slot + 1 };
                line[idx] = (rest % 3) as u8;
                rest /= 3;
            }
            line[radius] = OWN;
            entries.push(classify(&mut line, win_length));
        }

        log::debug!(
            "built pattern table for win length {} ({} entries)",
            win_length,
            entries.len()
        );
        Self {
            win_length,
            radius,
            entries,
        }
    }

    #[inline]
    pub fn win_length(&self) -> usize {
        self.win_length
    }

    #[inline]
    fn lookup(&self, code: usize) -> PatternEntry {
        self.entries[code]
    }
}

/// Completion cells (bitmask over line indices) of windows containing the
/// origin.
fn completion_mask(line: &[u8], k: usize) -> u32 {
    let radius = k - 1;
    let mut mask = 0u32;
    for s in 0..=radius {
        let window = &line[s..s + k];
        if window.contains(&BLOCKED) {
            continue;
        }
        let own = window.iter().filter(|&&c| c == OWN).count();
        if own == k - 1 {
            if let Some(gap) = window.iter().position(|&c| c == EMPTY) {
                mask |= 1 << (s + gap);
            }
        }
    }
    mask
}

/// Three-level classification, assuming the line holds no four or five.
fn classify_three_level(line: &mut [u8], k: usize) -> Option<ThreatKind> {
    let mut open_maker = false;
    let mut four_maker = false;
    for e in 0..line.len() {
        if line[e] != EMPTY {
            continue;
        }
        line[e] = OWN;
        let n = completion_mask(line, k).count_ones();
        line[e] = EMPTY;
        if n >= 2 {
            open_maker = true;
            break;
        }
        if n == 1 {
            four_maker = true;
        }
    }
    if open_maker {
        let (lo, hi, own) = best_window(line, k);
        if hi - lo + 1 == own as i32 {
            Some(ThreatKind::OpenThree)
        } else {
            Some(ThreatKind::BrokenThree)
        }
    } else if four_maker {
        Some(ThreatKind::Three)
    } else {
        None
    }
}

/// Span (line indices) of own stones in the unblocked window with the most
/// own stones; ties go to the lowest window.
fn best_window(line: &[u8], k: usize) -> (i32, i32, usize) {
    let radius = k - 1;
    let mut best: Option<(usize, usize)> = None;
    for s in 0..=radius {
        let window = &line[s..s + k];
        if window.contains(&BLOCKED) {
            continue;
        }
        let own = window.iter().filter(|&&c| c == OWN).count();
        if best.map_or(true, |(_, b)| own > b) {
            best = Some((s, own));
        }
    }
    let Some((s, own)) = best else {
        return (radius as i32, radius as i32, 1);
    };
    let first = (s..s + k).find(|&i| line[i] == OWN).unwrap_or(radius);
    let last = (s..s + k).rev().find(|&i| line[i] == OWN).unwrap_or(radius);
    (first as i32, last as i32, own)
}

/// Classify a line neighbourhood (origin at index `k - 1`, always own).
fn classify(line: &mut [u8], k: usize) -> PatternEntry {
    let radius = k - 1;
    let origin = radius as i32;

    let left = (0..radius).rev().take_while(|&i| line[i] == OWN).count();
    let right = (radius + 1..line.len()).take_while(|&i| line[i] == OWN).count();
    if left + right + 1 >= k {
        return PatternEntry {
            kind: ThreatKind::Five.index() as u8 + 1,
            lo: -(left as i8),
            hi: right as i8,
        };
    }

    let kind = match completion_mask(line, k).count_ones() {
        n if n >= 2 => Some(ThreatKind::OpenFour),
        1 => Some(ThreatKind::Four),
        _ => classify_three_level(line, k).or_else(|| {
            let mut open_two = false;
            let mut two = false;
            for e in 0..line.len() {
                if line[e] != EMPTY {
                    continue;
                }
                line[e] = OWN;
                match classify_three_level(line, k) {
                    Some(kind) if kind.is_live_three() => open_two = true,
                    Some(_) => two = true,
                    None => {}
                }
                line[e] = EMPTY;
                if open_two {
                    break;
                }
            }
            if open_two {
                Some(ThreatKind::OpenTwo)
            } else if two {
                Some(ThreatKind::Two)
            } else {
                None
            }
        }),
    };

    match kind {
        Some(kind) => {
            let (lo, hi, _) = best_window(line, k);
            PatternEntry {
                kind: kind.index() as u8 + 1,
                lo: (lo - origin) as i8,
                hi: (hi - origin) as i8,
            }
        }
        None => PatternEntry::default(),
    }
}

// =============================================================================
// Detector
// =============================================================================

/// Stateless threat classifier bound to one win length.
#[derive(Clone, Copy)]
pub struct ThreatDetector {
    table: &'static PatternTable,
}

impl std::fmt::Debug for ThreatDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreatDetector")
            .field("win_length", &self.table.win_length)
            .finish()
    }
}

impl ThreatDetector {
    pub fn new(win_length: usize) -> Self {
        Self {
            table: PatternTable::get(win_length),
        }
    }

    /// Detector matching the board's win length.
    pub fn for_board(board: &Board) -> Self {
        Self::new(board.win_length())
    }

    /// Base-3 code of the cells around `origin`; the origin itself is not read.
    #[inline]
    fn code(&self, board: &Board, origin: Pos, direction: Direction, player: Player) -> usize {
        let (dr, dc) = direction.delta();
        let r = self.table.radius as i32;
        let own = player.stone();
        let mut code = 0usize;
        let mut mul = 1usize;
        for off in (-r..=-1).chain(1..=r) {
            let cell = match board.stone_at_rc(
                i32::from(origin.row) + dr * off,
                i32::from(origin.col) + dc * off,
            ) {
                Some(Stone::Empty) => EMPTY,
                Some(s) if s == own => OWN,
                _ => BLOCKED,
            };
            code += cell as usize * mul;
            mul *= 3;
        }
        code
    }

    /// Classify the line through `origin` (which must hold a `player` stone).
    pub fn scan_line(
        &self,
        board: &Board,
        origin: Pos,
        direction: Direction,
        player: Player,
    ) -> Option<Threat> {
        if board.stone_at(origin) != player.stone() {
            return None;
        }
        let entry = self.table.lookup(self.code(board, origin, direction, player));
        let kind = ThreatKind::from_index((entry.kind as usize).checked_sub(1)?)?;
        let (dr, dc) = direction.delta();
        let size = board.size();

        let (lo, hi) = if kind == ThreatKind::Five {
            // Overlines may run past the table radius
            let walk = |sign: i32| {
                (1..)
                    .take_while(|&n| {
                        origin
                            .offset(dr * sign, dc * sign, n, size)
                            .is_some_and(|p| board.stone_at(p) == player.stone())
                    })
                    .count() as i32
            };
            (-walk(-1), walk(1))
        } else {
            (i32::from(entry.lo), i32::from(entry.hi))
        };

        let start = origin.offset(dr, dc, lo, size)?;
        let is_open = |n: i32| {
            origin
                .offset(dr, dc, n, size)
                .is_some_and(|p| board.is_empty(p))
        };
        Some(Threat {
            kind,
            direction,
            player,
            start,
            len: (hi - lo + 1) as u8,
            open_start: is_open(lo - 1),
            open_end: is_open(hi + 1),
        })
    }

    /// Classify the line through an empty `pos` as if `player` had played there.
    #[inline]
    pub fn scan_hypothetical(
        &self,
        board: &Board,
        pos: Pos,
        direction: Direction,
        player: Player,
    ) -> Option<ThreatKind> {
        let entry = self.table.lookup(self.code(board, pos, direction, player));
        ThreatKind::from_index((entry.kind as usize).checked_sub(1)?)
    }

    /// Strongest pattern per direction if `player` played at `pos`.
    pub fn move_threats(&self, board: &Board, pos: Pos, player: Player) -> ThreatCounts {
        let mut counts = ThreatCounts::default();
        for direction in Direction::ALL {
            if let Some(kind) = self.scan_hypothetical(board, pos, direction, player) {
                counts.add(kind);
            }
        }
        counts
    }

    /// Full-board scan for one player.
    pub fn detect_all(&self, board: &Board, player: Player) -> ThreatReport {
        let mut threats: Vec<Threat> = Vec::new();
        for pos in board.occupancy(player).iter_ones() {
            for direction in Direction::ALL {
                if let Some(threat) = self.scan_line(board, pos, direction, player) {
                    threats.push(threat);
                }
            }
        }
        threats.sort_unstable();
        threats.dedup();

        let mut counts = ThreatCounts::default();
        for t in &threats {
            counts.add(t.kind);
        }
        ThreatReport { counts, threats }
    }

    /// Threats of `player` on one board line, deduplicated, in line order.
    fn line_threats(&self, board: &Board, line: LineId, player: Player, out: &mut Vec<Threat>) {
        out.clear();
        for pos in line.cells(board.size()) {
            if board.stone_at(pos) != player.stone() {
                continue;
            }
            if let Some(threat) = self.scan_line(board, pos, line.direction, player) {
                if !out.contains(&threat) {
                    out.push(threat);
                }
            }
        }
    }

    /// Cells where `player` completes a five right now, sorted.
    pub fn winning_cells(&self, board: &Board, player: Player) -> Vec<Pos> {
        let report = self.detect_all(board, player);
        winning_cells_from(board, report.threats.iter(), player)
    }
}

/// Completion cells adjacent to or inside the spans of four-level threats.
fn winning_cells_from<'a>(
    board: &Board,
    threats: impl Iterator<Item = &'a Threat>,
    player: Player,
) -> Vec<Pos> {
    let size = board.size();
    let k = board.win_length();
    let mut cells = Vec::new();
    for threat in threats {
        if !matches!(threat.kind, ThreatKind::Four | ThreatKind::OpenFour) {
            continue;
        }
        let (dr, dc) = threat.direction.delta();
        for n in -1..=i32::from(threat.len) {
            let Some(p) = threat.start.offset(dr, dc, n, size) else {
                continue;
            };
            if board.is_empty(p) && board.run_length(p, dr, dc, player) >= k && !cells.contains(&p) {
                cells.push(p);
            }
        }
    }
    cells.sort_unstable();
    cells
}

// =============================================================================
// Lines and the incremental tracker
// =============================================================================

/// Line slots reserved per direction (enough for 19x19 diagonals).
const LINES_PER_DIRECTION: usize = 2 * MAX_BOARD_SIZE - 1;

/// One full board line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineId {
    pub direction: Direction,
    pub index: usize,
}

impl LineId {
    /// The line along `direction` passing through `pos`.
    pub fn through(pos: Pos, direction: Direction, size: usize) -> LineId {
        let (r, c) = (pos.row as usize, pos.col as usize);
        let index = match direction {
            Direction::Horizontal => r,
            Direction::Vertical => c,
            Direction::DiagonalDown => c + (size - 1) - r,
            Direction::DiagonalUp => r + c,
        };
        LineId { direction, index }
    }

    #[inline]
    fn slot(self) -> usize {
        self.direction.index() * LINES_PER_DIRECTION + self.index
    }

    /// Cells of the line in ascending offset order.
    pub fn cells(self, size: usize) -> impl Iterator<Item = Pos> {
        let n = size as i32;
        let i = self.index as i32;
        let (start_r, start_c) = match self.direction {
            Direction::Horizontal => (i, 0),
            Direction::Vertical => (0, i),
            Direction::DiagonalDown => {
                let d = i - (n - 1); // col - row
                ((-d).max(0), d.max(0))
            }
            Direction::DiagonalUp => {
                let r = (i - (n - 1)).max(0);
                (r, i - r)
            }
        };
        let (dr, dc) = self.direction.delta();
        (0..)
            .map(move |step| (start_r + dr * step, start_c + dc * step))
            .take_while(move |&(r, c)| Pos::is_valid(r, c, size))
            .map(|(r, c)| Pos::new(r as u8, c as u8))
    }

    /// Every line of a `size` x `size` board.
    pub fn all(size: usize) -> impl Iterator<Item = LineId> {
        Direction::ALL.into_iter().flat_map(move |direction| {
            let count = match direction {
                Direction::Horizontal | Direction::Vertical => size,
                Direction::DiagonalDown | Direction::DiagonalUp => 2 * size - 1,
            };
            (0..count).map(move |index| LineId { direction, index })
        })
    }
}

/// Incrementally maintained threat lists for both players.
///
/// After every `Board::apply` or `Board::undo`, call
/// [`ThreatTracker::on_change`] with the affected cell; only the four lines
/// through it are rescanned.
#[derive(Debug, Clone)]
pub struct ThreatTracker {
    detector: ThreatDetector,
    size: usize,
    /// [line slot][player] -> threats on that line
    lines: Vec<[Vec<Threat>; 2]>,
    counts: [ThreatCounts; 2],
}

impl ThreatTracker {
    /// Build the tracker from a full scan of every line.
    pub fn new(board: &Board) -> Self {
        let mut tracker = Self {
            detector: ThreatDetector::for_board(board),
            size: board.size(),
            lines: vec![[Vec::new(), Vec::new()]; 4 * LINES_PER_DIRECTION],
            counts: [ThreatCounts::default(); 2],
        };
        for line in LineId::all(board.size()) {
            tracker.rescan(board, line);
        }
        tracker
    }

    #[inline]
    pub fn detector(&self) -> ThreatDetector {
        self.detector
    }

    /// Update after the stone at `pos` was placed or removed.
    pub fn on_change(&mut self, board: &Board, pos: Pos) {
        for direction in Direction::ALL {
            self.rescan(board, LineId::through(pos, direction, self.size));
        }
    }

    fn rescan(&mut self, board: &Board, line: LineId) {
        let slot = line.slot();
        for player in [Player::Black, Player::White] {
            let p = player.index();
            let list = &mut self.lines[slot][p];
            for t in list.iter() {
                self.counts[p].remove(t.kind);
            }
            self.detector.line_threats(board, line, player, list);
            for t in list.iter() {
                self.counts[p].add(t.kind);
            }
        }
    }

    #[inline]
    pub fn counts(&self, player: Player) -> &ThreatCounts {
        &self.counts[player.index()]
    }

    /// All tracked threats of `player`.
    pub fn threats(&self, player: Player) -> impl Iterator<Item = &Threat> + '_ {
        let p = player.index();
        self.lines.iter().flat_map(move |line| line[p].iter())
    }

    /// Tracked threats as a sorted report, comparable with a full scan.
    pub fn report(&self, player: Player) -> ThreatReport {
        let mut threats: Vec<Threat> = self.threats(player).copied().collect();
        threats.sort_unstable();
        ThreatReport {
            counts: *self.counts(player),
            threats,
        }
    }

    /// Cells where `player` completes a five right now, sorted.
    pub fn winning_cells(&self, board: &Board, player: Player) -> Vec<Pos> {
        let c = self.counts(player);
        if c.get(ThreatKind::Four) == 0 && c.get(ThreatKind::OpenFour) == 0 {
            return Vec::new();
        }
        winning_cells_from(board, self.threats(player), player)
    }
}
