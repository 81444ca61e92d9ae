//! Tile model: colour type, animation state, per-frame interpolation.

/// Tile colour (6 basic types, no specials).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileType {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
}

impl TileType {
    pub const ALL: [Self; 6] = [
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Yellow,
        Self::Purple,
        Self::Orange,
    ];

    /// Colour index 0..6 for theme.tile_color().
    pub fn color_index(&self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Blue => 1,
            Self::Green => 2,
            Self::Yellow => 3,
            Self::Purple => 4,
            Self::Orange => 5,
        }
    }
}

/// What a tile is currently doing on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimKind {
    None,
    Swap,
    Fall,
    Fade,
    Spawn,
}

impl AnimKind {
    /// Progress-fraction per second.
    fn speed(self) -> f32 {
        match self {
            Self::Swap | Self::Spawn => 8.0,
            Self::Fall => 12.0,
            Self::Fade => 5.0,
            Self::None => 0.0,
        }
    }
}

/// Cubic smoothstep: smooth ease in/out for swaps and spawns.
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Decelerating quadratic: a falling tile arrives fast and settles.
fn ease_out_quad(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Animation state: progress in [0,1] between a start and target pixel position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anim {
    pub kind: AnimKind,
    pub progress: f32,
    pub start: (f32, f32),
    pub target: (f32, f32),
}

impl Anim {
    fn settled(at: (f32, f32)) -> Self {
        Self {
            kind: AnimKind::None,
            progress: 1.0,
            start: at,
            target: at,
        }
    }
}

/// One occupied grid cell. The grid owns the tile; `row`/`col` are its
/// logical position and `draw` the animated pixel position.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub kind: TileType,
    pub row: usize,
    pub col: usize,
    pub draw: (f32, f32),
    pub anim: Anim,
    /// Visual opacity; meaningful during Fade (out) and Spawn (in).
    pub alpha: u8,
}

impl Tile {
    /// Tile at rest at its grid position.
    pub fn new(kind: TileType, row: usize, col: usize, cell_size: f32) -> Self {
        let at = (col as f32 * cell_size, row as f32 * cell_size);
        Self {
            kind,
            row,
            col,
            draw: at,
            anim: Anim::settled(at),
            alpha: 255,
        }
    }

    /// Tile created by a refill: starts one cell above its target, easing
    /// down and fading in.
    pub fn new_spawned(kind: TileType, row: usize, col: usize, cell_size: f32) -> Self {
        let mut tile = Self::new(kind, row, col, cell_size);
        tile.draw = (tile.draw.0, tile.draw.1 - cell_size);
        tile.anim = Anim {
            kind: AnimKind::Spawn,
            progress: 0.0,
            start: tile.draw,
            target: (col as f32 * cell_size, row as f32 * cell_size),
        };
        tile.alpha = 0;
        tile
    }

    pub fn is_animating(&self) -> bool {
        self.anim.kind != AnimKind::None
    }

    /// Begin an animation from the current draw position. Target cell
    /// defaults to the previous target when not given.
    pub fn start_animation(
        &mut self,
        kind: AnimKind,
        target_row: Option<usize>,
        target_col: Option<usize>,
        cell_size: f32,
    ) {
        let target = (
            target_col.map_or(self.anim.target.0, |c| c as f32 * cell_size),
            target_row.map_or(self.anim.target.1, |r| r as f32 * cell_size),
        );
        self.anim = Anim {
            kind,
            progress: 0.0,
            start: self.draw,
            target,
        };
    }

    /// Place the tile at its grid position with no animation.
    pub fn snap_to_grid(&mut self, cell_size: f32) {
        let at = (self.col as f32 * cell_size, self.row as f32 * cell_size);
        self.draw = at;
        self.anim = Anim::settled(at);
        self.alpha = 255;
    }

    /// Advance the animation by `dt` seconds. Returns true when the
    /// animation completes on this call (draw position snapped to target).
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.anim.kind == AnimKind::None {
            return false;
        }

        self.anim.progress += dt * self.anim.kind.speed();
        if self.anim.progress >= 1.0 {
            let kind = self.anim.kind;
            self.anim.progress = 1.0;
            self.draw = self.anim.target;
            self.anim.kind = AnimKind::None;
            // A finished fade-out stays invisible.
            self.alpha = if kind == AnimKind::Fade { 0 } else { 255 };
            return true;
        }

        let t = self.anim.progress;
        let eased = match self.anim.kind {
            AnimKind::Fall => ease_out_quad(t),
            _ => smoothstep(t),
        };
        let (sx, sy) = self.anim.start;
        let (tx, ty) = self.anim.target;
        self.draw = (sx + (tx - sx) * eased, sy + (ty - sy) * eased);

        match self.anim.kind {
            AnimKind::Fade => self.alpha = (255.0 * (1.0 - t)).round() as u8,
            AnimKind::Spawn => self.alpha = (255.0 * t).round() as u8,
            _ => {}
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: f32 = 60.0;

    #[test]
    fn test_tile_at_rest() {
        let tile = Tile::new(TileType::Red, 3, 2, CELL);
        assert_eq!(tile.draw, (120.0, 180.0));
        assert_eq!(tile.anim.kind, AnimKind::None);
        assert_eq!(tile.alpha, 255);
    }

    #[test]
    fn test_swap_animation_completes() {
        let mut tile = Tile::new(TileType::Blue, 0, 0, CELL);
        tile.start_animation(AnimKind::Swap, Some(0), Some(1), CELL);
        assert!(tile.is_animating());

        // Swap speed is 8.0/s, so 1/8 s finishes it.
        let mut done = false;
        for _ in 0..20 {
            if tile.advance(0.016) {
                done = true;
                break;
            }
        }
        assert!(done);
        assert_eq!(tile.draw, (60.0, 0.0));
        assert_eq!(tile.anim.kind, AnimKind::None);
    }

    #[test]
    fn test_interpolation_stays_between_endpoints() {
        let mut tile = Tile::new(TileType::Green, 0, 0, CELL);
        tile.start_animation(AnimKind::Fall, Some(5), None, CELL);
        tile.advance(0.02);
        assert!(tile.draw.1 > 0.0);
        assert!(tile.draw.1 < 300.0);
        assert_eq!(tile.draw.0, 0.0);
    }

    #[test]
    fn test_fade_reduces_alpha() {
        let mut tile = Tile::new(TileType::Yellow, 0, 0, CELL);
        tile.start_animation(AnimKind::Fade, None, None, CELL);
        tile.advance(0.1); // progress 0.5 at fade speed 5.0
        assert_eq!(tile.alpha, 128);
    }

    #[test]
    fn test_completed_fade_stays_transparent() {
        let mut tile = Tile::new(TileType::Yellow, 0, 0, CELL);
        tile.start_animation(AnimKind::Fade, None, None, CELL);
        // Fade speed is 5.0/s, so 0.3 s overshoots completion.
        assert!(tile.advance(0.3));
        assert_eq!(tile.anim.kind, AnimKind::None);
        assert_eq!(tile.alpha, 0);
    }

    #[test]
    fn test_spawn_starts_above_and_fades_in() {
        let tile = Tile::new_spawned(TileType::Purple, 0, 4, CELL);
        assert_eq!(tile.draw, (240.0, -60.0));
        assert_eq!(tile.anim.target, (240.0, 0.0));
        assert_eq!(tile.alpha, 0);

        let mut tile = tile;
        tile.advance(0.05);
        assert!(tile.alpha > 0);
        assert!(tile.draw.1 > -60.0);
    }

    #[test]
    fn test_snap_restores_rest_invariant() {
        let mut tile = Tile::new(TileType::Orange, 2, 2, CELL);
        tile.start_animation(AnimKind::Swap, Some(2), Some(3), CELL);
        tile.advance(0.01);
        tile.col = 3;
        tile.snap_to_grid(CELL);
        assert_eq!(tile.draw, (180.0, 120.0));
        assert!(!tile.is_animating());
    }

    #[test]
    fn test_easing_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(ease_out_quad(0.0), 0.0);
        assert_eq!(ease_out_quad(1.0), 1.0);
        // Fall easing front-loads movement.
        assert!(ease_out_quad(0.5) > 0.5);
    }
}
