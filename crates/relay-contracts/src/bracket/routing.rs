use super::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

impl Segment {
    pub fn length(&self) -> f64 {
        (self.to.x - self.from.x).abs() + (self.to.y - self.from.y).abs()
    }

    pub fn is_horizontal(&self) -> bool {
        self.from.y == self.to.y
    }

    pub fn is_vertical(&self) -> bool {
        self.from.x == self.to.x
    }
}

/// Bracket connector: across to the target column, then up or down into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElbowPath {
    pub horizontal: Segment,
    pub vertical: Segment,
}

impl ElbowPath {
    pub fn corner(&self) -> Point {
        self.horizontal.to
    }

    pub fn points(&self) -> [Point; 3] {
        [self.horizontal.from, self.corner(), self.vertical.to]
    }

    pub fn length(&self) -> f64 {
        self.horizontal.length() + self.vertical.length()
    }
}

pub fn route(from: Point, to: Point) -> ElbowPath {
    let corner = Point::new(to.x, from.y);
    ElbowPath {
        horizontal: Segment { from, to: corner },
        vertical: Segment { from: corner, to },
    }
}
