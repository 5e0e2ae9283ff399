use crate::display_list::{Command, DisplayList, ShapeCommand, ShapeVertex, Viewport};
use crate::error::DrawError;
use crate::scene::*;

/// Transform + style state saved by `push` and restored by `pop`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct DrawState {
    transform: Transform3D,
    style: Style,
}

/// Saved painter position; see [`Painter::checkpoint`].
#[derive(Clone, Debug)]
pub struct Checkpoint {
    commands: usize,
    stack: Vec<DrawState>,
}

/// Immediate-mode 3D drawing context that records into a [`DisplayList`].
///
/// Every shape is recorded with the transform and style active at `end_shape`, so the list
/// can be replayed without re-running the state machine.
pub struct Painter {
    list: DisplayList,
    stack: Vec<DrawState>,
    open_shape: Option<Vec<ShapeVertex>>,
}

impl Painter {
    pub fn begin_frame(viewport: Viewport) -> Self {
        Self {
            list: DisplayList {
                viewport,
                lighting: Lighting::Unlit,
                commands: Vec::new(),
            },
            stack: vec![DrawState {
                transform: Transform3D::identity(),
                style: Style::default(),
            }],
            open_shape: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.list.viewport
    }

    fn state(&self) -> &DrawState {
        // The base state is never popped.
        &self.stack[self.stack.len() - 1]
    }

    fn state_mut(&mut self) -> &mut DrawState {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    pub fn current_transform(&self) -> Transform3D {
        self.state().transform
    }

    pub fn style(&self) -> Style {
        self.state().style
    }

    /// Save transform and style.
    pub fn push(&mut self) {
        let top = *self.state();
        self.stack.push(top);
    }

    /// Restore the state saved by the matching `push`.
    pub fn pop(&mut self) -> Result<(), DrawError> {
        if self.stack.len() <= 1 {
            return Err(DrawError::UnbalancedPop);
        }
        self.stack.pop();
        Ok(())
    }

    /// Post-multiply the current transform so nested calls compose like a scene graph.
    pub fn apply_transform(&mut self, t: Transform3D) {
        let state = self.state_mut();
        state.transform = state.transform.concat(t);
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.apply_transform(Transform3D::translate(x, y, z));
    }

    pub fn rotate_z(&mut self, radians: f32) {
        self.apply_transform(Transform3D::rotate_z(radians));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.apply_transform(Transform3D::scale(x, y, z));
    }

    pub fn fill(&mut self, color: ColorLinPremul) {
        self.state_mut().style.fill = Some(color);
    }

    pub fn no_fill(&mut self) {
        self.state_mut().style.fill = None;
    }

    pub fn stroke(&mut self, color: ColorLinPremul) {
        self.state_mut().style.stroke = Some(color);
    }

    pub fn no_stroke(&mut self) {
        self.state_mut().style.stroke = None;
    }

    pub fn stroke_weight(&mut self, weight: f32) {
        self.state_mut().style.stroke_weight = weight;
    }

    /// Enable the basic lighting model for the whole frame.
    pub fn lights(&mut self) {
        self.list.lighting = Lighting::Basic;
    }

    pub fn begin_shape(&mut self) -> Result<(), DrawError> {
        if self.open_shape.is_some() {
            return Err(DrawError::ShapeAlreadyBegun);
        }
        self.open_shape = Some(Vec::new());
        Ok(())
    }

    pub fn vertex(&mut self, x: f32, y: f32, z: f32) -> Result<(), DrawError> {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(DrawError::NonFiniteVertex(x, y, z));
        }
        let stroke = self.state().style.stroke;
        let open = self
            .open_shape
            .as_mut()
            .ok_or(DrawError::ShapeNotBegun("vertex"))?;
        open.push(ShapeVertex {
            pos: [x, y, z],
            stroke,
        });
        Ok(())
    }

    pub fn end_shape(&mut self, end: EndShape) -> Result<(), DrawError> {
        let vertices = self
            .open_shape
            .take()
            .ok_or(DrawError::ShapeNotBegun("end_shape"))?;
        let state = *self.state();
        self.list.commands.push(Command::Shape(ShapeCommand {
            vertices,
            end,
            style: state.style,
            transform: state.transform,
        }));
        Ok(())
    }

    /// Remember the recorded output and state so a failed sequence of calls can be undone.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            commands: self.list.commands.len(),
            stack: self.stack.clone(),
        }
    }

    /// Restore transform/style state, keeping everything recorded since the checkpoint.
    pub fn restore_state(&mut self, checkpoint: &Checkpoint) {
        self.stack.clone_from(&checkpoint.stack);
        self.open_shape = None;
    }

    /// Discard everything recorded since the checkpoint and restore its state.
    pub fn rollback(&mut self, checkpoint: &Checkpoint) {
        self.list.commands.truncate(checkpoint.commands);
        self.restore_state(checkpoint);
    }

    /// Get a reference to the display list recorded so far.
    pub fn display_list(&self) -> &DisplayList {
        &self.list
    }

    pub fn finish(self) -> DisplayList {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn painter() -> Painter {
        Painter::begin_frame(Viewport::new(100, 100))
    }

    #[test]
    fn records_shape_with_composed_transform() {
        let mut p = painter();
        p.translate(5.0, 0.0, 0.0);
        p.push();
        p.scale(2.0, 2.0, 2.0);
        p.begin_shape().unwrap();
        p.vertex(1.0, 0.0, 0.0).unwrap();
        p.end_shape(EndShape::Close).unwrap();
        p.pop().unwrap();

        let list = p.finish();
        let shape = list.shapes().next().unwrap();
        assert_eq!(shape.transform.transform_point([1.0, 0.0, 0.0]), [7.0, 0.0, 0.0]);
        assert_eq!(shape.end, EndShape::Close);
    }

    #[test]
    fn pop_restores_style() {
        let mut p = painter();
        p.push();
        p.no_fill();
        p.pop().unwrap();
        assert!(p.style().fill.is_some());
    }

    #[test]
    fn unbalanced_calls_are_errors() {
        let mut p = painter();
        assert_eq!(p.pop(), Err(DrawError::UnbalancedPop));
        assert_eq!(p.vertex(0.0, 0.0, 0.0), Err(DrawError::ShapeNotBegun("vertex")));
        assert_eq!(p.end_shape(EndShape::Open), Err(DrawError::ShapeNotBegun("end_shape")));
        p.begin_shape().unwrap();
        assert_eq!(p.begin_shape(), Err(DrawError::ShapeAlreadyBegun));
        assert!(matches!(p.vertex(f32::NAN, 0.0, 0.0), Err(DrawError::NonFiniteVertex(..))));
    }

    #[test]
    fn vertices_capture_active_stroke() {
        let mut p = painter();
        let red = ColorLinPremul::rgba(255, 0, 0, 255);
        let blue = ColorLinPremul::rgba(0, 0, 255, 255);
        p.begin_shape().unwrap();
        p.stroke(red);
        p.vertex(0.0, 0.0, 0.0).unwrap();
        p.stroke(blue);
        p.vertex(1.0, 0.0, 0.0).unwrap();
        p.end_shape(EndShape::Open).unwrap();
        let list = p.finish();
        let shape = list.shapes().next().unwrap();
        assert_eq!(shape.vertices[0].stroke, Some(red));
        assert_eq!(shape.vertices[1].stroke, Some(blue));
    }

    #[test]
    fn rollback_discards_output_and_state() {
        let mut p = painter();
        p.begin_shape().unwrap();
        p.end_shape(EndShape::Open).unwrap();
        let cp = p.checkpoint();

        p.push();
        p.translate(1.0, 2.0, 3.0);
        p.begin_shape().unwrap();
        p.end_shape(EndShape::Open).unwrap();
        p.begin_shape().unwrap();
        p.rollback(&cp);

        assert_eq!(p.display_list().commands.len(), 1);
        assert_eq!(p.current_transform(), Transform3D::identity());
        // Open shape was discarded too.
        assert!(p.begin_shape().is_ok());
    }
}
