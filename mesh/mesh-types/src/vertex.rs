//! Vertex and color types.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Linear RGBA color with `f32` components.
///
/// Baked flow maps store a direction in `[-1, 1]^3` as a color in `[0, 1]^3`
/// using `color = direction * 0.5 + 0.5` with alpha `1`. The mapping is lossy
/// outside that range; consumers recover the direction with
/// [`VertexColor::to_direction`] (`direction = color * 2 - 1`).
///
/// The default color is fully transparent black, which the baker leaves on
/// vertices the walk never reached.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexColor {
    /// Red component.
    pub r: f32,
    /// Green component.
    pub g: f32,
    /// Blue component.
    pub b: f32,
    /// Alpha component.
    pub a: f32,
}

impl VertexColor {
    /// Create a new color from RGBA components.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::VertexColor;
    ///
    /// let grey = VertexColor::new(0.5, 0.5, 0.5, 1.0);
    /// assert_eq!(grey.a, 1.0);
    /// ```
    #[inline]
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Encode a flow direction as an opaque color.
    ///
    /// Each component is mapped with `c = d * 0.5 + 0.5`.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{Vector3, VertexColor};
    ///
    /// let color = VertexColor::from_direction(&Vector3::new(1.0, 0.0, -1.0));
    /// assert_eq!(color, VertexColor::new(1.0, 0.5, 0.0, 1.0));
    /// ```
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    // Colors are stored at f32 precision.
    pub fn from_direction(direction: &Vector3<f64>) -> Self {
        let encoded = direction * 0.5 + Vector3::repeat(0.5);
        Self {
            r: encoded.x as f32,
            g: encoded.y as f32,
            b: encoded.z as f32,
            a: 1.0,
        }
    }

    /// Decode the direction stored in this color.
    ///
    /// Inverse of [`VertexColor::from_direction`] up to `f32` precision.
    /// Alpha is ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{Vector3, VertexColor};
    ///
    /// let direction = VertexColor::new(1.0, 0.5, 0.0, 1.0).to_direction();
    /// assert_eq!(direction, Vector3::new(1.0, 0.0, -1.0));
    /// ```
    #[inline]
    #[must_use]
    pub fn to_direction(self) -> Vector3<f64> {
        Vector3::new(
            f64::from(self.r) * 2.0 - 1.0,
            f64::from(self.g) * 2.0 - 1.0,
            f64::from(self.b) * 2.0 - 1.0,
        )
    }

    /// Components as an `[r, g, b, a]` array, ready for upload.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Opaque mid grey, the encoding of a zero direction.
    pub const NEUTRAL: Self = Self::new(0.5, 0.5, 0.5, 1.0);
}

/// A vertex in 3D space with its normal.
///
/// The normal is carried for collaborators that re-orient baked output;
/// the flow baker itself only reads positions.
///
/// # Example
///
/// ```
/// use mesh_types::{Vertex, Point3};
///
/// let v1 = Vertex::new(Point3::new(1.0, 2.0, 3.0));
/// let v2 = Vertex::from_coords(1.0, 2.0, 3.0);
///
/// assert_eq!(v1.position, v2.position);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertex {
    /// 3D position.
    pub position: Point3<f64>,

    /// Vertex normal. Zero when the source mesh has none.
    pub normal: Vector3<f64>,
}

impl Vertex {
    /// Create a new vertex with a zero normal.
    #[inline]
    #[must_use]
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: Vector3::zeros(),
        }
    }

    /// Create a vertex from raw coordinates.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::Vertex;
    ///
    /// let v = Vertex::from_coords(1.0, 2.0, 3.0);
    /// assert_eq!(v.position.x, 1.0);
    /// assert_eq!(v.position.z, 3.0);
    /// ```
    #[inline]
    #[must_use]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Create a vertex with position and normal.
    #[inline]
    #[must_use]
    pub const fn with_normal(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }
}

impl From<Point3<f64>> for Vertex {
    fn from(position: Point3<f64>) -> Self {
        Self::new(position)
    }
}

impl From<[f64; 3]> for Vertex {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::from_coords(x, y, z)
    }
}
