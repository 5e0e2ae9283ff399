#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3D {
    // Column-major 4x4: m[col * 4 + row]
    pub m: [f32; 16],
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform3D {
    pub fn identity() -> Self {
        Self {
            m: [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Compose two transforms: self ∘ other (apply `other`, then `self`).
    pub fn concat(self, other: Self) -> Self {
        let a = &self.m;
        let b = &other.m;
        let mut m = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                m[col * 4 + row] = a[row] * b[col * 4]
                    + a[4 + row] * b[col * 4 + 1]
                    + a[8 + row] * b[col * 4 + 2]
                    + a[12 + row] * b[col * 4 + 3];
            }
        }
        Self { m }
    }

    pub fn translate(tx: f32, ty: f32, tz: f32) -> Self {
        let mut t = Self::identity();
        t.m[12] = tx;
        t.m[13] = ty;
        t.m[14] = tz;
        t
    }

    pub fn scale(sx: f32, sy: f32, sz: f32) -> Self {
        let mut t = Self::identity();
        t.m[0] = sx;
        t.m[5] = sy;
        t.m[10] = sz;
        t
    }

    /// Rotation about +Z by `radians`.
    pub fn rotate_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        let mut t = Self::identity();
        t.m[0] = c;
        t.m[1] = s;
        t.m[4] = -s;
        t.m[5] = c;
        t
    }

    /// Right-handed perspective projection mapping depth to wgpu's 0..1 clip range.
    pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fovy * 0.5).tan();
        let range = near - far;
        let mut m = [0.0f32; 16];
        m[0] = f / aspect;
        m[5] = f;
        m[10] = far / range;
        m[11] = -1.0;
        m[14] = near * far / range;
        Self { m }
    }

    /// Apply to a point (w = 1), ignoring the projective row.
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 3] {
        let m = &self.m;
        [
            m[0] * p[0] + m[4] * p[1] + m[8] * p[2] + m[12],
            m[1] * p[0] + m[5] * p[1] + m[9] * p[2] + m[13],
            m[2] * p[0] + m[6] * p[1] + m[10] * p[2] + m[14],
        ]
    }

    /// Apply to a homogeneous point and return clip coordinates.
    pub fn transform_point4(&self, p: [f32; 4]) -> [f32; 4] {
        let m = &self.m;
        let mut out = [0.0f32; 4];
        for (row, v) in out.iter_mut().enumerate() {
            *v = m[row] * p[0] + m[4 + row] * p[1] + m[8 + row] * p[2] + m[12 + row] * p[3];
        }
        out
    }

    /// Apply to a direction (w = 0).
    pub fn transform_vector(&self, v: [f32; 3]) -> [f32; 3] {
        let m = &self.m;
        [
            m[0] * v[0] + m[4] * v[1] + m[8] * v[2],
            m[1] * v[0] + m[5] * v[1] + m[9] * v[2],
            m[2] * v[0] + m[6] * v[1] + m[10] * v[2],
        ]
    }

    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        let m = &self.m;
        [
            [m[0], m[1], m[2], m[3]],
            [m[4], m[5], m[6], m[7]],
            [m[8], m[9], m[10], m[11]],
            [m[12], m[13], m[14], m[15]],
        ]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorLinPremul {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Alias for the premultiplied linear color type, for a friendlier name in APIs.
pub type Color = ColorLinPremul;

// Constructors for ColorLinPremul are defined in color.rs to keep scene.rs focused

/// Fill/stroke state captured with each recorded shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub fill: Option<ColorLinPremul>,
    pub stroke: Option<ColorLinPremul>,
    pub stroke_weight: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Some(ColorLinPremul::from_srgba_u8([255, 255, 255, 255])),
            stroke: Some(ColorLinPremul::from_srgba_u8([0, 0, 0, 255])),
            stroke_weight: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndShape {
    Open,
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Lighting {
    #[default]
    Unlit,
    /// Ambient term plus one fixed directional light.
    Basic,
}
