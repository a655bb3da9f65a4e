use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VidmetaDbError;

use super::{split_top_level, strip_delimited};

/// 2D point, text form `(x,y)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Parse the `(x,y)` literal.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ParameterError` on malformed input.
    pub fn parse(literal: &str) -> Result<Self, VidmetaDbError> {
        let body = strip_delimited(literal, '(', ')', "point")?;
        let parts = split_top_level(body);
        if parts.len() != 2 {
            return Err(VidmetaDbError::ParameterError(format!(
                "malformed point literal: {literal:?}"
            )));
        }
        Ok(Self {
            x: parse_f64(parts[0], literal)?,
            y: parse_f64(parts[1], literal)?,
        })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Axis-aligned rectangle given by its high and low corners, text form
/// `(xh,yh,xl,yl)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub high: Point,
    pub low: Point,
}

impl BoundingBox {
    #[must_use]
    pub fn new(high: Point, low: Point) -> Self {
        Self { high, low }
    }

    /// Parse the `(xh,yh,xl,yl)` literal.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ParameterError` on malformed input.
    pub fn parse(literal: &str) -> Result<Self, VidmetaDbError> {
        let body = strip_delimited(literal, '(', ')', "box")?;
        let parts = split_top_level(body);
        if parts.len() != 4 {
            return Err(VidmetaDbError::ParameterError(format!(
                "malformed box literal: {literal:?}"
            )));
        }
        Ok(Self {
            high: Point::new(parse_f64(parts[0], literal)?, parse_f64(parts[1], literal)?),
            low: Point::new(parse_f64(parts[2], literal)?, parse_f64(parts[3], literal)?),
        })
    }

    /// Server-side literal used when a region predicate is inlined into SQL,
    /// `((xh,yh),(xl,yl))`.
    #[must_use]
    pub fn to_pg_literal(&self) -> String {
        format!(
            "(({},{}),({},{}))",
            self.high.x, self.high.y, self.low.x, self.low.y
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{})",
            self.high.x, self.high.y, self.low.x, self.low.y
        )
    }
}

fn parse_f64(part: &str, literal: &str) -> Result<f64, VidmetaDbError> {
    part.trim().parse::<f64>().map_err(|_| {
        VidmetaDbError::ParameterError(format!("bad numeric component in {literal:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_text_round_trip() {
        let p = Point::new(10.5, -3.0);
        assert_eq!(p.to_string(), "(10.5,-3)");
        assert_eq!(Point::parse(&p.to_string()).unwrap(), p);
    }

    #[test]
    fn box_text_round_trip() {
        let b = BoundingBox::new(Point::new(100.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(b.to_string(), "(100,80,10,20)");
        assert_eq!(BoundingBox::parse(&b.to_string()).unwrap(), b);
    }

    #[test]
    fn box_pg_literal_pairs_corners() {
        let b = BoundingBox::new(Point::new(100.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(b.to_pg_literal(), "((100,80),(10,20))");
    }

    #[test]
    fn malformed_point_is_rejected() {
        assert!(Point::parse("(1,2,3)").is_err());
        assert!(Point::parse("1,2").is_err());
        assert!(Point::parse("(a,b)").is_err());
    }
}
