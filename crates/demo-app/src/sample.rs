use std::f32::consts::PI;

use underlay_scene::{MemoryDocument, ShapeGeometry, ShapeId, ShapeKind};

/// A small board: a few closed shapes, an arrow and a freehand stroke.
pub fn populate(doc: &MemoryDocument) -> Vec<ShapeId> {
    let star: Vec<[f32; 2]> = (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { 90.0 } else { 40.0 };
            let a = i as f32 * PI / 5.0 - PI / 2.0;
            [r * a.cos(), r * a.sin()]
        })
        .collect();
    let wave: Vec<[f32; 2]> = (0..24)
        .map(|i| {
            let x = i as f32 * 12.0;
            [x, 30.0 * (x / 40.0).sin()]
        })
        .collect();

    vec![
        doc.insert(ShapeKind::Geo, 160.0, 140.0, ShapeGeometry::rect(220.0, 140.0)),
        doc.insert(
            ShapeKind::Geo,
            560.0,
            220.0,
            ShapeGeometry::polygon(vec![[0.0, -80.0], [90.0, 70.0], [-90.0, 70.0]]),
        ),
        doc.insert(ShapeKind::Geo, 900.0, 420.0, ShapeGeometry::polygon(star)),
        doc.insert(
            ShapeKind::Arrow,
            300.0,
            480.0,
            ShapeGeometry::polygon(vec![[0.0, 0.0], [180.0, -40.0], [260.0, 60.0]]),
        ),
        doc.insert(ShapeKind::Draw, 520.0, 560.0, ShapeGeometry::polyline(wave)),
    ]
}
