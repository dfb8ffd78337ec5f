//! Shared window geometry types
//!
//! Geometry is owned by the output/placement layer; the stacking core only
//! carries it so the bridge can mirror strut reservations.

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Reserved screen edges (EWMH `_NET_WM_STRUT_PARTIAL` layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Strut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
    pub left_start_y: u32,
    pub left_end_y: u32,
    pub right_start_y: u32,
    pub right_end_y: u32,
    pub top_start_x: u32,
    pub top_end_x: u32,
    pub bottom_start_x: u32,
    pub bottom_end_x: u32,
}

impl Strut {
    /// Strut reserving only full-length edges
    pub fn edges(left: u32, right: u32, top: u32, bottom: u32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left == 0 && self.right == 0 && self.top == 0 && self.bottom == 0
    }

    /// The twelve cardinals of `_NET_WM_STRUT_PARTIAL`
    pub fn to_partial(&self) -> [u32; 12] {
        [
            self.left,
            self.right,
            self.top,
            self.bottom,
            self.left_start_y,
            self.left_end_y,
            self.right_start_y,
            self.right_end_y,
            self.top_start_x,
            self.top_end_x,
            self.bottom_start_x,
            self.bottom_end_x,
        ]
    }

    /// Parse `_NET_WM_STRUT_PARTIAL` (12 values) or legacy `_NET_WM_STRUT` (4 values)
    pub fn from_cardinals(values: &[u32]) -> Option<Self> {
        match values.len() {
            12.. => Some(Self {
                left: values[0],
                right: values[1],
                top: values[2],
                bottom: values[3],
                left_start_y: values[4],
                left_end_y: values[5],
                right_start_y: values[6],
                right_end_y: values[7],
                top_start_x: values[8],
                top_end_x: values[9],
                bottom_start_x: values[10],
                bottom_end_x: values[11],
            }),
            4..=11 => Some(Self::edges(values[0], values[1], values[2], values[3])),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strut_from_legacy_cardinals() {
        let strut = Strut::from_cardinals(&[0, 0, 30, 0]).unwrap();
        assert_eq!(strut.top, 30);
        assert_eq!(strut.top_end_x, 0);
        assert!(Strut::from_cardinals(&[1, 2]).is_none());
    }

    #[test]
    fn test_strut_partial_layout() {
        let mut strut = Strut::edges(0, 0, 24, 0);
        strut.top_end_x = 1919;
        let partial = strut.to_partial();
        assert_eq!(partial[2], 24);
        assert_eq!(partial[9], 1919);
        assert_eq!(Strut::from_cardinals(&partial), Some(strut));
    }
}
