use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::{ParseError, StateError};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FluidColor {
    Empty,
    Fluid { color_id: usize },
}

impl FluidColor {
    pub fn new(color_id: usize) -> Self {
        FluidColor::Fluid { color_id }
    }

    /// Convert a single letter (A-Z) into a 0-based id.
    pub fn letter_to_color_id(ch: char) -> Option<usize> {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let up = ch.to_ascii_uppercase();
        Some((up as u8 - b'A') as usize)
    }

    /// Convert a letter sequence like "A", "Z", "AA" into a 0-based id.
    /// Uses Excel-style base-26 numbering: A=0, B=1, ..., Z=25, AA=26, AB=27, ...
    pub fn letters_to_color_id(s: &str) -> Option<usize> {
        let mut acc: usize = 0;
        let mut saw_any = false;

        for ch in s.chars() {
            let digit = Self::letter_to_color_id(ch)?; // 0..25
            // Convert to 1..26 for Excel-style accumulation.
            acc = acc.checked_mul(26)?.checked_add(digit + 1)?;
            saw_any = true;
        }

        if !saw_any {
            return None;
        }

        // Back to 0-based.
        acc.checked_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FluidColor::Empty)
    }

    pub fn get_color_id(&self) -> Option<usize> {
        match self {
            FluidColor::Fluid { color_id } => Some(*color_id),
            FluidColor::Empty => None,
        }
    }

    pub fn get_letter_representation(&self) -> String {
        let letters = b'A'..=b'Z';
        let letter_vec: Vec<u8> = letters.collect();
        let len = letter_vec.len();

        let mut chars = Vec::new();
        let mut id = match self.get_color_id() {
            None => return ".".to_string(),
            Some(id) => id + 1, // 1-based for easier calculation
        };

        while id > 0 {
            let rem = (id - 1) % len;
            chars.push(letter_vec[rem] as char);
            id = (id - 1) / len;
        }

        chars.iter().rev().collect()
    }
}

/// A contiguous run of one color (or of empty space), measured in whatever
/// unit detection supplies (pixels, cells).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ColorSegment {
    pub color: FluidColor,
    pub height: u32,
}

impl ColorSegment {
    pub fn new(color: FluidColor, height: u32) -> Self {
        Self { color, height }
    }
}

/// A tube holds segments ordered from the pourable opening inward.
///
/// Invariants, enforced by every constructor and preserved by every pour:
/// segment heights sum to `capacity`; at most one `Empty` segment and only at
/// index 0; no zero heights; adjacent segments never share a color.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Tube {
    segments: Vec<ColorSegment>,
    capacity: u32,
}

impl Tube {
    pub fn new(capacity: u32) -> Result<Self, StateError> {
        if capacity == 0 {
            return Err(StateError::NonPositiveCapacity);
        }
        Ok(Self {
            segments: vec![ColorSegment::new(FluidColor::Empty, capacity)],
            capacity,
        })
    }

    /// Build a tube from detected `(color_id, height)` runs, listed from the
    /// opening inward. The capacity is the tube's physical height, supplied by
    /// the caller; headroom above the liquid becomes a single `Empty` segment.
    /// Detection may report a partially-filled tube, so the capacity is never
    /// derived from the segments themselves.
    pub fn from_detected(detected: &[(usize, u32)], capacity: u32) -> Result<Self, StateError> {
        if capacity == 0 {
            return Err(StateError::NonPositiveCapacity);
        }
        let mut total: u64 = 0;
        let mut segments: Vec<ColorSegment> = Vec::with_capacity(detected.len() + 1);
        for &(color_id, height) in detected {
            if height == 0 {
                return Err(StateError::ZeroHeightSegment);
            }
            // Widened running sum, checked as it goes: detection input must
            // never overflow its way past the capacity bound.
            total += u64::from(height);
            if total > u64::from(capacity) {
                return Err(StateError::CapacityOverflow { total, capacity });
            }
            let color = FluidColor::new(color_id);
            match segments.last_mut() {
                Some(last) if last.color == color => last.height += height,
                _ => segments.push(ColorSegment::new(color, height)),
            }
        }
        let total = total as u32;
        if total < capacity {
            segments.insert(0, ColorSegment::new(FluidColor::Empty, capacity - total));
        }
        Ok(Self { segments, capacity })
    }

    /// Parse one tube description: comma-separated `<letters><height>` tokens
    /// (height omitted = 1), or a bare character run like `ABB.` where every
    /// letter is a unit segment. Capacity is the sum of the token heights.
    pub fn from_repr(repr: &str) -> Result<Self, ParseError> {
        let s = repr.trim();
        if s.is_empty() {
            return Err(ParseError::EmptyRepr);
        }

        let mut raw: Vec<ColorSegment> = Vec::new();
        if s.contains(',') {
            let mut tokens: Vec<&str> = s.split(',').map(str::trim).collect();
            // Tolerate one trailing comma.
            if tokens.len() > 1 && tokens.last() == Some(&"") {
                tokens.pop();
            }
            for token in tokens {
                raw.push(Self::parse_token(token, s)?);
            }
        } else {
            let mut chars = s.chars().peekable();
            while let Some(ch) = chars.next() {
                let mut digits = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                }
                let token = format!("{ch}{digits}");
                raw.push(Self::parse_token(&token, s)?);
            }
        }

        // Token heights sum to the capacity, so a sum past u32::MAX cannot
        // describe a real tube; checking it up front also keeps the merge
        // arithmetic below in range.
        let total: u64 = raw.iter().map(|seg| u64::from(seg.height)).sum();
        if total > u64::from(u32::MAX) {
            return Err(StateError::CapacityOverflow {
                total,
                capacity: u32::MAX,
            }
            .into());
        }

        // Merge adjacent same-color runs, then check the empty placement.
        let mut segments: Vec<ColorSegment> = Vec::with_capacity(raw.len());
        for seg in raw {
            match segments.last_mut() {
                Some(last) if last.color == seg.color => last.height += seg.height,
                _ => segments.push(seg),
            }
        }
        if segments.iter().skip(1).any(|seg| seg.color.is_empty()) {
            return Err(ParseError::MisplacedEmpty { repr: s.to_string() });
        }
        let capacity = segments.iter().map(|seg| seg.height).sum();
        Ok(Self { segments, capacity })
    }

    fn parse_token(token: &str, repr: &str) -> Result<ColorSegment, ParseError> {
        let invalid = || ParseError::InvalidToken {
            token: token.to_string(),
            repr: repr.to_string(),
        };
        let split = token
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(token.len());
        let (label, digits) = token.split_at(split);
        let height: u32 = if digits.is_empty() {
            1
        } else {
            digits.parse().map_err(|_| invalid())?
        };
        if height == 0 {
            return Err(StateError::ZeroHeightSegment.into());
        }
        let color = if label == "." {
            FluidColor::Empty
        } else {
            FluidColor::new(FluidColor::letters_to_color_id(label).ok_or_else(invalid)?)
        };
        Ok(ColorSegment::new(color, height))
    }

    pub fn get_capacity(&self) -> u32 {
        self.capacity
    }

    pub fn get_segments(&self) -> &[ColorSegment] {
        &self.segments
    }

    /// Height of the headroom at the pourable end.
    pub fn get_free_space(&self) -> u32 {
        match self.segments.first() {
            Some(seg) if seg.color.is_empty() => seg.height,
            _ => 0,
        }
    }

    pub fn get_fill_height(&self) -> u32 {
        self.capacity - self.get_free_space()
    }

    /// The topmost fluid segment, skipping the headroom.
    pub fn get_top_fluid(&self) -> Option<ColorSegment> {
        self.segments.iter().find(|seg| !seg.color.is_empty()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.get_free_space() == self.capacity
    }

    /// Complete means one segment spans the whole tube: either all empty or
    /// one color filled to the top. A uniform but partially-filled tube is
    /// not complete.
    pub fn is_complete(&self) -> bool {
        self.segments.len() == 1
    }

    /// True when every fluid segment carries `color_id` (vacuously true for an
    /// empty tube).
    pub fn is_uniform_color(&self, color_id: usize) -> bool {
        self.segments.iter().all(|seg| match seg.color {
            FluidColor::Empty => true,
            FluidColor::Fluid { color_id: c } => c == color_id,
        })
    }

    /// Remove `amount` from the top fluid segment, growing the headroom by the
    /// same amount. Caller guarantees a top fluid of at least that height.
    pub(crate) fn take_from_top(&self, amount: u32) -> Tube {
        let free = self.get_free_space();
        let top_at = usize::from(free > 0);
        debug_assert!(amount > 0);
        debug_assert!(top_at < self.segments.len() && !self.segments[top_at].color.is_empty());
        debug_assert!(amount <= self.segments[top_at].height);
        let mut segments = self.segments.clone();
        if segments[top_at].height == amount {
            segments.remove(top_at);
        } else {
            segments[top_at].height -= amount;
        }
        if free > 0 {
            segments[0].height += amount;
        } else {
            segments.insert(0, ColorSegment::new(FluidColor::Empty, amount));
        }
        Tube {
            segments,
            capacity: self.capacity,
        }
    }

    /// Add `height` of `color` under the headroom, merging with the segment it
    /// lands on when the colors match. Caller guarantees the room.
    pub(crate) fn with_poured(&self, color: FluidColor, height: u32) -> Tube {
        debug_assert!(!color.is_empty());
        debug_assert!(height > 0 && height <= self.get_free_space());
        let mut segments = self.segments.clone();
        if segments[0].height == height {
            segments.remove(0);
        } else {
            segments[0].height -= height;
        }
        let at = usize::from(segments.first().is_some_and(|seg| seg.color.is_empty()));
        match segments.get_mut(at) {
            Some(existing) if existing.color == color => existing.height += height,
            _ => segments.insert(at, ColorSegment::new(color, height)),
        }
        Tube {
            segments,
            capacity: self.capacity,
        }
    }
}

impl fmt::Display for Tube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self
            .segments
            .iter()
            .map(|seg| {
                let label = seg.color.get_letter_representation();
                if seg.height == 1 {
                    label
                } else {
                    format!("{label}{}", seg.height)
                }
            })
            .collect();
        // A lone multi-letter token needs a trailing comma, or re-parsing
        // would read it character by character.
        if tokens.len() == 1 && tokens[0].chars().filter(|c| c.is_ascii_alphabetic()).count() > 1 {
            return write!(f, "{},", tokens[0]);
        }
        write!(f, "{}", tokens.join(","))
    }
}

/// Pour the full top color segment of `from` into `to`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Move {
    pub from: usize,
    pub to: usize,
}

impl Move {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// The full board: an ordered list of tubes. Immutable once built; pours
/// produce fresh states.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PuzzleState {
    tubes: Vec<Tube>,
}

impl PuzzleState {
    pub fn new(tubes: Vec<Tube>) -> Self {
        Self { tubes }
    }

    /// Parse a `;`-separated list of tube descriptions.
    pub fn from_repr(repr: &str) -> Result<Self, ParseError> {
        let s = repr.trim();
        if s.is_empty() {
            return Err(ParseError::EmptyRepr);
        }
        let tubes = s
            .split(';')
            .map(Tube::from_repr)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tubes })
    }

    pub fn get_tubes(&self) -> &[Tube] {
        &self.tubes
    }

    pub fn is_solved(&self) -> bool {
        self.tubes.iter().all(Tube::is_complete)
    }

    /// The six legality clauses for a forward pour: distinct in-bounds tubes,
    /// a non-empty source, a destination that is not complete-and-full, a
    /// color match when the destination holds fluid, and room for the entire
    /// top segment (partial pours never happen).
    pub fn is_legal(&self, mv: Move) -> bool {
        if mv.from == mv.to {
            return false;
        }
        let (Some(source), Some(dest)) = (self.tubes.get(mv.from), self.tubes.get(mv.to)) else {
            return false;
        };
        let Some(top) = source.get_top_fluid() else {
            return false;
        };
        if dest.is_complete() && !dest.is_empty() {
            return false;
        }
        if dest.get_free_space() < top.height {
            return false;
        }
        match dest.get_top_fluid() {
            None => true,
            Some(below) => below.color == top.color,
        }
    }

    /// Would this pour leave the destination complete? Computed from the pour
    /// height and the destination's current content alone, without building
    /// the successor state.
    pub fn would_complete(&self, mv: Move) -> bool {
        if mv.from == mv.to {
            return false;
        }
        let (Some(source), Some(dest)) = (self.tubes.get(mv.from), self.tubes.get(mv.to)) else {
            return false;
        };
        let Some(top) = source.get_top_fluid() else {
            return false;
        };
        if dest.is_complete() && !dest.is_empty() {
            return false;
        }
        if dest.is_empty() {
            return top.height == dest.get_capacity();
        }
        let Some(color_id) = top.color.get_color_id() else {
            return false;
        };
        dest.is_uniform_color(color_id) && top.height == dest.get_free_space()
    }

    /// Apply a move, validating it first.
    pub fn apply(&self, mv: Move) -> Result<PuzzleState, StateError> {
        if !self.is_legal(mv) {
            return Err(StateError::IllegalMove(mv));
        }
        Ok(self.apply_unchecked(mv))
    }

    /// Hot-path variant for moves already vetted by generation.
    pub(crate) fn apply_unchecked(&self, mv: Move) -> PuzzleState {
        debug_assert!(self.is_legal(mv));
        #[cfg(test)]
        test_support::count_state_built();
        let mut tubes = self.tubes.clone();
        if let Some(top) = tubes[mv.from].get_top_fluid() {
            tubes[mv.to] = tubes[mv.to].with_poured(top.color, top.height);
            tubes[mv.from] = tubes[mv.from].take_from_top(top.height);
        }
        PuzzleState { tubes }
    }

    /// Undo-direction pour for the generator: take `amount` off the source's
    /// top fluid (splitting the segment is fine) and drop it onto the
    /// destination regardless of color. Not a legal forward move.
    pub(crate) fn reverse_pour(&self, mv: Move, amount: u32) -> Result<PuzzleState, StateError> {
        let pourable = mv.from != mv.to
            && amount > 0
            && self
                .tubes
                .get(mv.from)
                .and_then(Tube::get_top_fluid)
                .is_some_and(|top| top.height >= amount)
            && self
                .tubes
                .get(mv.to)
                .is_some_and(|t| t.get_free_space() >= amount);
        if !pourable {
            return Err(StateError::IllegalMove(mv));
        }
        #[cfg(test)]
        test_support::count_state_built();
        let mut tubes = self.tubes.clone();
        if let Some(top) = tubes[mv.from].get_top_fluid() {
            tubes[mv.to] = tubes[mv.to].with_poured(top.color, amount);
            tubes[mv.from] = tubes[mv.from].take_from_top(amount);
        }
        Ok(PuzzleState { tubes })
    }

    /// 64-bit fingerprint of the full ordered tube content, for the solver's
    /// visited set.
    pub fn signature(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Display for PuzzleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tube) in self.tubes.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{tube}")?;
        }
        Ok(())
    }
}
