/// One plane of a caller-owned picture.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'data> {
    data: &'data [u8],
    line_size: usize,
}

impl<'data> Plane<'data> {
    pub fn new(data: &'data [u8], line_size: usize) -> Self {
        Self { data, line_size }
    }

    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn line_size(&self) -> usize {
        self.line_size
    }

    /// Row `y`, `width` bytes long, if the plane holds it.
    pub(crate) fn row(&self, y: usize, width: usize) -> Option<&'data [u8]> {
        let start = y.checked_mul(self.line_size)?;
        self.data.get(start..start.checked_add(width)?)
    }
}

/// A planar 8-bit picture handed to a session for encoding.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'data> {
    pub planes: [Plane<'data>; 3],
    /// Presentation time in time-base ticks.
    pub pts: i64,
}

impl<'data> Frame<'data> {
    pub fn new(planes: [Plane<'data>; 3], pts: i64) -> Self {
        Self { planes, pts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_respect_line_size() {
        let data = [1u8, 2, 3, 0, 4, 5, 6, 0];
        let plane = Plane::new(&data, 4);
        assert_eq!(plane.row(0, 3), Some(&data[0..3]));
        assert_eq!(plane.row(1, 3), Some(&data[4..7]));
        assert_eq!(plane.row(2, 3), None);
    }

    #[test]
    fn last_row_may_be_short() {
        let data = [1u8, 2, 3, 0, 4, 5, 6];
        let plane = Plane::new(&data, 4);
        assert_eq!(plane.row(1, 3), Some(&[4, 5, 6][..]));
        assert_eq!(plane.row(1, 4), None);
    }
}
