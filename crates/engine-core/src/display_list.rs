use crate::scene::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> [f32; 2] {
        [self.width as f32 * 0.5, self.height as f32 * 0.5]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One `vertex()` call: local position plus the stroke color active when it was issued.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeVertex {
    pub pos: [f32; 3],
    pub stroke: Option<ColorLinPremul>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeCommand {
    pub vertices: Vec<ShapeVertex>,
    pub end: EndShape,
    pub style: Style,
    pub transform: Transform3D,
}

#[derive(Clone, Debug)]
pub enum Command {
    /// A `begin_shape` .. `end_shape` primitive with its fully composed transform.
    Shape(ShapeCommand),
}

#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    pub viewport: Viewport,
    pub lighting: Lighting,
    pub commands: Vec<Command>,
}

impl DisplayList {
    pub fn shapes(&self) -> impl Iterator<Item = &ShapeCommand> {
        self.commands.iter().map(|cmd| match cmd {
            Command::Shape(shape) => shape,
        })
    }
}
