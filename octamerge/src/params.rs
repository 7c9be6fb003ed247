//! Shape parameters and merge configuration

use crate::error::MergeError;

/// Highest accepted subdivision level
pub const MAX_SUBDIVISIONS: u32 = 10;

/// Highest vertex count a 16-bit index buffer can reference in one mesh
pub const MAX_VERTICES: u64 = u16::MAX as u64;

/// Box axis used to pick the stretched dimension of a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// Rounded-box shape description handed to the fragment generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeParams {
    /// Radius of the rounded corners and edges
    pub corner_radius: f32,
    /// Extent along X
    pub width: f32,
    /// Extent along Y
    pub height: f32,
    /// Extent along Z
    pub depth: f32,
    /// Tessellation level; each level doubles the points along a patch edge
    pub subdivisions: u32,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            corner_radius: 0.1,
            width: 1.0,
            height: 1.0,
            depth: 1.0,
            subdivisions: 4,
        }
    }
}

impl ShapeParams {
    /// Create unit-extent parameters with the given corner radius and subdivision level
    pub fn new(corner_radius: f32, subdivisions: u32) -> Self {
        Self {
            corner_radius,
            subdivisions,
            ..Self::default()
        }
    }

    /// Check the parameters against the generator's domain
    pub fn validate(&self) -> Result<(), MergeError> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("depth", self.depth),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MergeError::invalid(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        if !self.corner_radius.is_finite() || self.corner_radius < 0.0 {
            return Err(MergeError::invalid(format!(
                "corner_radius must be >= 0, got {}",
                self.corner_radius
            )));
        }

        if self.subdivisions > MAX_SUBDIVISIONS {
            return Err(MergeError::invalid(format!(
                "subdivisions must be <= {MAX_SUBDIVISIONS}, got {}",
                self.subdivisions
            )));
        }

        Ok(())
    }

    /// Extents as `[width, height, depth]`
    pub fn extents(&self) -> [f32; 3] {
        [self.width, self.height, self.depth]
    }

    /// Half extents, never smaller than the corner radius
    pub fn half_extents(&self) -> [f32; 3] {
        self.extents().map(|e| (e * 0.5).max(self.corner_radius))
    }

    /// Copy of these parameters with one extent scaled by `factor`
    pub fn stretched(&self, axis: Axis, factor: f32) -> Self {
        let mut out = *self;
        match axis {
            Axis::X => out.width *= factor,
            Axis::Y => out.height *= factor,
            Axis::Z => out.depth *= factor,
        }
        out
    }

    /// Bounding box of the shape centred at the origin
    pub fn bounds(&self) -> Aabb {
        let half = self.half_extents();
        Aabb {
            min: half.map(|h| -h),
            max: half,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    /// Box that contains nothing; the identity for `union`
    pub const EMPTY: Aabb = Aabb {
        min: [f32::MAX; 3],
        max: [f32::MIN; 3],
    };

    /// Compute bounding box for positions
    pub fn from_points(positions: &[[f32; 3]]) -> Self {
        let mut aabb = Self::EMPTY;
        for pos in positions {
            for i in 0..3 {
                aabb.min[i] = aabb.min[i].min(pos[i]);
                aabb.max[i] = aabb.max[i].max(pos[i]);
            }
        }
        aabb
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: std::array::from_fn(|i| self.min[i].min(other.min[i])),
            max: std::array::from_fn(|i| self.max[i].max(other.max[i])),
        }
    }
}

/// How the merger assembles fragments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeConfig {
    /// Number of fragments, one per box axis (1-3)
    pub fragment_count: usize,
    /// Factor applied to the distinguishing extent of each fragment
    pub stretch: f32,
    /// Generate TEXCOORD_0 data
    pub texcoords: bool,
    /// Remap each fragment's V coordinate into its own band of the atlas
    pub atlas: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            fragment_count: 3,
            stretch: 3.0,
            texcoords: true,
            atlas: true,
        }
    }
}

impl MergeConfig {
    pub fn validate(&self) -> Result<(), MergeError> {
        if !(1..=Axis::ALL.len()).contains(&self.fragment_count) {
            return Err(MergeError::invalid(format!(
                "fragment_count must be between 1 and {}, got {}",
                Axis::ALL.len(),
                self.fragment_count
            )));
        }
        if !self.stretch.is_finite() || self.stretch <= 0.0 {
            return Err(MergeError::invalid(format!(
                "stretch must be a positive number, got {}",
                self.stretch
            )));
        }
        Ok(())
    }

    /// Shape parameters for each fragment, in fragment order
    pub fn fragment_params(&self, base: &ShapeParams) -> Vec<ShapeParams> {
        Axis::ALL
            .iter()
            .take(self.fragment_count)
            .map(|&axis| base.stretched(axis, self.stretch))
            .collect()
    }
}
