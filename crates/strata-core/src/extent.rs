use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Pixel size of a drawable surface or render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Reject zero-area sizes
    pub fn validate(self) -> Result<Self> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Half the size, rounded, never below one pixel
    pub fn halved(&self) -> Self {
        Self {
            width: ((self.width as f32 / 2.0).round() as u32).max(1),
            height: ((self.height as f32 / 2.0).round() as u32).max(1),
        }
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_zero_area() {
        assert!(Extent::new(0, 10).validate().is_err());
        assert!(Extent::new(10, 0).validate().is_err());
        assert_eq!(Extent::new(4, 2).validate(), Ok(Extent::new(4, 2)));
    }

    #[test]
    fn test_halved_never_collapses() {
        assert_eq!(Extent::new(800, 600).halved(), Extent::new(400, 300));
        assert_eq!(Extent::new(1, 1).halved(), Extent::new(1, 1));
        assert_eq!(Extent::new(5, 3).halved(), Extent::new(3, 2));
    }
}
