//! Point-cloud geometry and display-space transforms

use glam::Vec3;

/// A 3D asset as discrete colored points
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub positions: Vec<Vec3>,
    /// One RGB triple per position
    pub colors: Vec<[u8; 3]>,
}

impl PointCloud {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Axis-aligned bounding box, or `None` for an empty cloud
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for &p in &self.positions[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }

    /// Bounding-box center
    pub fn center(&self) -> Vec3 {
        match self.bounds() {
            Some((min, max)) => (min + max) * 0.5,
            None => Vec3::ZERO,
        }
    }

    /// Largest bounding-box dimension
    pub fn extent(&self) -> f32 {
        match self.bounds() {
            Some((min, max)) => (max - min).max_element(),
            None => 0.0,
        }
    }

    /// Translate so the bounding-box center sits at the origin
    pub fn recenter(&mut self) {
        let center = self.center();
        for p in &mut self.positions {
            *p -= center;
        }
    }

    /// Rotate 180 degrees about the X axis
    ///
    /// The reconstruction service emits clouds in a different up-axis
    /// convention than the render surface expects. Whether this flip matches
    /// the service's actual convention is unconfirmed; it is isolated here
    /// and switched by `ViewerConfig::flip_up_axis` so it can be dropped
    /// without touching the parse path.
    pub fn flip_up_axis(&mut self) {
        for p in &mut self.positions {
            p.y = -p.y;
            p.z = -p.z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(points: &[[f32; 3]]) -> PointCloud {
        PointCloud {
            positions: points.iter().map(|&[x, y, z]| Vec3::new(x, y, z)).collect(),
            colors: vec![[0, 0, 0]; points.len()],
        }
    }

    #[test]
    fn bounds_and_center() {
        let c = cloud(&[[0.0, 0.0, 0.0], [2.0, 4.0, -6.0]]);
        let (min, max) = c.bounds().unwrap();
        assert_eq!(min, Vec3::new(0.0, 0.0, -6.0));
        assert_eq!(max, Vec3::new(2.0, 4.0, 0.0));
        assert_eq!(c.center(), Vec3::new(1.0, 2.0, -3.0));
        assert_eq!(c.extent(), 6.0);
    }

    #[test]
    fn recenter_moves_bbox_center_to_origin() {
        let mut c = cloud(&[[10.0, 10.0, 10.0], [12.0, 14.0, 16.0]]);
        c.recenter();
        assert_eq!(c.center(), Vec3::ZERO);
        assert_eq!(c.positions[0], Vec3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn up_axis_flip_negates_y_and_z() {
        let mut c = cloud(&[[1.0, 2.0, 3.0]]);
        c.flip_up_axis();
        assert_eq!(c.positions[0], Vec3::new(1.0, -2.0, -3.0));
        // Applying it twice is the identity
        c.flip_up_axis();
        assert_eq!(c.positions[0], Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn empty_cloud_has_no_bounds() {
        let c = PointCloud::default();
        assert!(c.bounds().is_none());
        assert_eq!(c.extent(), 0.0);
    }
}
