//! Read-side interface to the 2D document the underlay is drawn beneath.
//!
//! The renderer never mutates the document. It reads shapes, camera and appearance once per
//! frame and observes shape mutations through [`DocumentModel::subscribe`].

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Geo,
    Arrow,
    Draw,
    Line,
    Text,
    Other(String),
}

impl ShapeKind {
    /// Arrows are open curves no matter what their geometry reports.
    pub fn is_always_open(&self) -> bool {
        matches!(self, ShapeKind::Arrow)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    /// Page-space position of the shape origin.
    pub x: f32,
    pub y: f32,
    /// Radians, about the shape origin.
    pub rotation: f32,
}

/// Outline of a shape in its local space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeGeometry {
    pub vertices: Vec<[f32; 2]>,
    pub is_closed: bool,
}

impl ShapeGeometry {
    pub fn polygon(vertices: Vec<[f32; 2]>) -> Self {
        Self {
            vertices,
            is_closed: true,
        }
    }

    pub fn polyline(vertices: Vec<[f32; 2]>) -> Self {
        Self {
            vertices,
            is_closed: false,
        }
    }

    /// Axis-aligned rectangle with its top-left corner at the shape origin.
    pub fn rect(w: f32, h: f32) -> Self {
        Self::polygon(vec![[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]])
    }
}

/// Axis-aligned page-space bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageBounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl PageBounds {
    pub fn center(&self) -> [f32; 2] {
        [self.x + self.w * 0.5, self.y + self.h * 0.5]
    }

    /// Bounds of a point set; `None` when empty.
    pub fn from_points(points: impl IntoIterator<Item = [f32; 2]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for [x, y] in iter {
            min = [min[0].min(x), min[1].min(y)];
            max = [max[0].max(x), max[1].max(y)];
        }
        Some(Self {
            x: min[0],
            y: min[1],
            w: max[0] - min[0],
            h: max[1] - min[1],
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    /// Always positive.
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppearanceMode {
    Dark,
    #[default]
    Light,
}

/// One shape mutation: the record before and after, plus the geometry after.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeChange {
    /// `None` when the shape was just created.
    pub previous: Option<Shape>,
    pub next: Shape,
    pub geometry: Option<ShapeGeometry>,
}

pub type ChangeListener = Box<dyn FnMut(&ShapeChange)>;

pub trait DocumentModel {
    /// Shapes on the current page, in document order.
    fn current_shapes(&self) -> Vec<Shape>;

    fn camera(&self) -> Camera;

    fn appearance_mode(&self) -> AppearanceMode;

    fn shape_geometry(&self, shape: &Shape) -> Option<ShapeGeometry>;

    fn shape_page_bounds(&self, shape: &Shape) -> Option<PageBounds>;

    /// Register for shape mutations. The listener stays registered while the returned
    /// [`Subscription`] is alive.
    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

type ListenerSlot = Rc<RefCell<ChangeListener>>;

#[derive(Default)]
struct NotifierInner {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, ListenerSlot)>>,
}

/// Listener list for documents that publish [`ShapeChange`]s.
#[derive(Default)]
pub struct ChangeNotifier {
    inner: Rc<NotifierInner>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: ChangeListener) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(listener))));
        Subscription {
            id,
            notifier: Rc::downgrade(&self.inner),
        }
    }

    /// Deliver `change` to every listener registered when the call starts.
    pub fn notify(&self, change: &ShapeChange) {
        // Listeners may subscribe or unsubscribe while being notified.
        let listeners: Vec<ListenerSlot> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, slot)| slot.clone())
            .collect();
        for slot in listeners {
            // A listener that triggers a nested change does not see it.
            if let Ok(mut listener) = slot.try_borrow_mut() {
                listener(change);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

/// Keeps a listener registered; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    notifier: Weak<NotifierInner>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.notifier
            .upgrade()
            .is_some_and(|inner| inner.listeners.borrow().iter().any(|(id, _)| *id == self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.notifier.upgrade() {
            inner.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

struct Entry {
    shape: Shape,
    geometry: Option<ShapeGeometry>,
}

/// Single-page in-memory document.
///
/// Mutations notify subscribers synchronously after the document has been updated, so a
/// listener may read the document back.
#[derive(Default)]
pub struct MemoryDocument {
    entries: RefCell<Vec<Entry>>,
    camera: Cell<Camera>,
    appearance: Cell<AppearanceMode>,
    next_id: Cell<u64>,
    notifier: ChangeNotifier,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, kind: ShapeKind, x: f32, y: f32, geometry: ShapeGeometry) -> ShapeId {
        self.insert_entry(kind, x, y, Some(geometry))
    }

    /// Insert a shape the document has no outline for (text being edited, unloaded assets).
    pub fn insert_without_geometry(&self, kind: ShapeKind, x: f32, y: f32) -> ShapeId {
        self.insert_entry(kind, x, y, None)
    }

    fn insert_entry(
        &self,
        kind: ShapeKind,
        x: f32,
        y: f32,
        geometry: Option<ShapeGeometry>,
    ) -> ShapeId {
        let id = ShapeId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        let shape = Shape {
            id,
            kind,
            x,
            y,
            rotation: 0.0,
        };
        self.entries.borrow_mut().push(Entry {
            shape: shape.clone(),
            geometry: geometry.clone(),
        });
        self.notifier.notify(&ShapeChange {
            previous: None,
            next: shape,
            geometry,
        });
        id
    }

    /// Mutate a shape's record. Returns `false` for an unknown id. The id cannot be changed.
    pub fn update(&self, id: ShapeId, f: impl FnOnce(&mut Shape)) -> bool {
        let change = {
            let mut entries = self.entries.borrow_mut();
            let Some(entry) = entries.iter_mut().find(|e| e.shape.id == id) else {
                return false;
            };
            let previous = entry.shape.clone();
            f(&mut entry.shape);
            entry.shape.id = id;
            ShapeChange {
                previous: Some(previous),
                next: entry.shape.clone(),
                geometry: entry.geometry.clone(),
            }
        };
        self.notifier.notify(&change);
        true
    }

    pub fn set_geometry(&self, id: ShapeId, geometry: Option<ShapeGeometry>) -> bool {
        let change = {
            let mut entries = self.entries.borrow_mut();
            let Some(entry) = entries.iter_mut().find(|e| e.shape.id == id) else {
                return false;
            };
            entry.geometry = geometry;
            ShapeChange {
                previous: Some(entry.shape.clone()),
                next: entry.shape.clone(),
                geometry: entry.geometry.clone(),
            }
        };
        self.notifier.notify(&change);
        true
    }

    /// Remove a shape. Removal is not a mutation and is not published.
    pub fn remove(&self, id: ShapeId) -> Option<Shape> {
        let mut entries = self.entries.borrow_mut();
        let index = entries.iter().position(|e| e.shape.id == id)?;
        Some(entries.remove(index).shape)
    }

    pub fn shape(&self, id: ShapeId) -> Option<Shape> {
        self.entries
            .borrow()
            .iter()
            .find(|e| e.shape.id == id)
            .map(|e| e.shape.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn set_camera(&self, camera: Camera) {
        self.camera.set(camera);
    }

    pub fn set_appearance_mode(&self, mode: AppearanceMode) {
        self.appearance.set(mode);
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.listener_count()
    }

    fn geometry_of(&self, id: ShapeId) -> Option<ShapeGeometry> {
        self.entries
            .borrow()
            .iter()
            .find(|e| e.shape.id == id)
            .and_then(|e| e.geometry.clone())
    }
}

impl DocumentModel for MemoryDocument {
    fn current_shapes(&self) -> Vec<Shape> {
        self.entries.borrow().iter().map(|e| e.shape.clone()).collect()
    }

    fn camera(&self) -> Camera {
        self.camera.get()
    }

    fn appearance_mode(&self) -> AppearanceMode {
        self.appearance.get()
    }

    fn shape_geometry(&self, shape: &Shape) -> Option<ShapeGeometry> {
        self.geometry_of(shape.id)
    }

    fn shape_page_bounds(&self, shape: &Shape) -> Option<PageBounds> {
        let geometry = self.geometry_of(shape.id)?;
        let (sin, cos) = shape.rotation.sin_cos();
        PageBounds::from_points(geometry.vertices.iter().map(|&[x, y]| {
            [
                shape.x + x * cos - y * sin,
                shape.y + x * sin + y * cos,
            ]
        }))
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.notifier.subscribe(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_follow_rotation() {
        let doc = MemoryDocument::new();
        let id = doc.insert(ShapeKind::Geo, 100.0, 50.0, ShapeGeometry::rect(20.0, 10.0));
        let shape = doc.shape(id).unwrap();
        assert_eq!(
            doc.shape_page_bounds(&shape),
            Some(PageBounds { x: 100.0, y: 50.0, w: 20.0, h: 10.0 })
        );

        doc.update(id, |s| s.rotation = std::f32::consts::FRAC_PI_2);
        let rotated = doc.shape(id).unwrap();
        let bounds = doc.shape_page_bounds(&rotated).unwrap();
        assert!((bounds.w - 10.0).abs() < 1e-4);
        assert!((bounds.h - 20.0).abs() < 1e-4);
        assert!((bounds.x - 90.0).abs() < 1e-4);
    }

    #[test]
    fn missing_geometry_has_no_bounds() {
        let doc = MemoryDocument::new();
        let id = doc.insert_without_geometry(ShapeKind::Text, 0.0, 0.0);
        let shape = doc.shape(id).unwrap();
        assert!(doc.shape_geometry(&shape).is_none());
        assert!(doc.shape_page_bounds(&shape).is_none());
    }

    #[test]
    fn listeners_see_previous_and_next() {
        let doc = MemoryDocument::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let subscription = doc.subscribe(Box::new(move |change: &ShapeChange| {
            sink.borrow_mut()
                .push((change.previous.as_ref().map(|s| s.x), change.next.x));
        }));

        let id = doc.insert(ShapeKind::Geo, 1.0, 0.0, ShapeGeometry::rect(1.0, 1.0));
        doc.update(id, |s| s.x = 2.0);
        assert_eq!(*seen.borrow(), vec![(None, 1.0), (Some(1.0), 2.0)]);

        assert!(subscription.is_active());
        drop(subscription);
        assert_eq!(doc.listener_count(), 0);
        doc.update(id, |s| s.x = 3.0);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn update_cannot_change_the_id() {
        let doc = MemoryDocument::new();
        let id = doc.insert(ShapeKind::Geo, 0.0, 0.0, ShapeGeometry::rect(1.0, 1.0));
        assert!(doc.update(id, |s| s.id = ShapeId(999)));
        assert!(doc.shape(id).is_some());
        assert!(!doc.update(ShapeId(999), |_| {}));
    }

    #[test]
    fn listener_can_read_the_document_back() {
        let doc = Rc::new(MemoryDocument::new());
        let reader = Rc::downgrade(&doc);
        let counts = Rc::new(Cell::new(0usize));
        let sink = counts.clone();
        let _subscription = doc.subscribe(Box::new(move |_: &ShapeChange| {
            if let Some(doc) = reader.upgrade() {
                sink.set(doc.len());
            }
        }));
        doc.insert(ShapeKind::Geo, 0.0, 0.0, ShapeGeometry::rect(1.0, 1.0));
        doc.insert(ShapeKind::Geo, 5.0, 0.0, ShapeGeometry::rect(1.0, 1.0));
        assert_eq!(counts.get(), 2);
    }
}
