use std::sync::Arc;

use glam::Vec3;

use super::{normalize_rgba, AttributeSpec, DrawContext, Drawable, GpuState};
use crate::error::SceneError;
use crate::gpu::Primitive;
use crate::transform::{to_internal, Transform};

/// Lift of the duplicated terminal vertex, internal z. Gives the last
/// segment's adjacency a direction.
const TAIL_OFFSET: f32 = 0.1;

/// One trajectory sample, vehicle axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryVertex {
    /// Sample position.
    pub position: Vec3,
    /// RGBA, each channel in 0–255.
    pub color: [f32; 4],
    /// Line width at this sample, metres.
    pub line_width: f32,
    /// Heading used by arrowed lines, radians.
    pub angle: f32,
}

impl Default for TrajectoryVertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: [255.0; 4],
            line_width: 0.1,
            angle: 0.0,
        }
    }
}

/// An ordered polyline.
pub type Trajectory = Vec<TrajectoryVertex>;

/// Stroke pattern applied by the trajectory program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineType {
    /// Continuous stroke.
    #[default]
    Solid,
    /// Round dots spaced by arc length.
    Dotted,
    /// Dashes spaced by arc length.
    Dashed,
    /// Repeated arrow heads following `angle`.
    Arrowed,
}

impl LineType {
    fn uniform(self) -> i32 {
        match self {
            Self::Solid => 0,
            Self::Dotted => 1,
            Self::Dashed => 2,
            Self::Arrowed => 3,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct LineVertex {
    position: [f32; 3],
    color: [f32; 4],
    line_width: f32,
    /// Arc length from the first sample.
    distance: f32,
    angle: f32,
}

/// Expand polylines into line-strip-with-adjacency form.
///
/// A line `A B C` becomes `A A B C C C'` where `C'` is `C` lifted by
/// [`TAIL_OFFSET`]. Lines with fewer than two samples are dropped. Returns
/// the vertices and each line's `(first, count)` range.
fn adjacency_strips(lines: &[Trajectory]) -> (Vec<LineVertex>, Vec<(u32, u32)>) {
    let total: usize = lines
        .iter()
        .filter(|line| line.len() > 1)
        .map(|line| line.len() + 3)
        .sum();
    let mut vertices = Vec::with_capacity(total);
    let mut ranges = Vec::new();

    for line in lines.iter().filter(|line| line.len() > 1) {
        let first = vertices.len() as u32;
        let last = line.len() - 1;
        let mut distance = 0.0;
        let mut previous: Option<Vec3> = None;

        for (i, sample) in line.iter().enumerate() {
            let position = to_internal(sample.position);
            if let Some(previous) = previous {
                distance += position.distance(previous);
            }
            previous = Some(position);

            let vertex = LineVertex {
                position: position.to_array(),
                color: normalize_rgba(sample.color),
                line_width: sample.line_width,
                distance,
                angle: sample.angle,
            };
            vertices.push(vertex);
            if i == 0 {
                vertices.push(vertex);
            } else if i == last {
                let mut tail = vertex;
                tail.position[2] += TAIL_OFFSET;
                vertices.extend([tail, tail]);
            }
        }
        ranges.push((first, vertices.len() as u32 - first));
    }
    (vertices, ranges)
}

/// A batch of trajectories sharing one buffer.
pub struct TrajectoryBatch {
    gpu: GpuState,
    lines: Arc<[Trajectory]>,
    line_type: LineType,
    ranges: Vec<(u32, u32)>,
}

impl TrajectoryBatch {
    /// Active stroke pattern.
    #[must_use]
    pub fn line_type(&self) -> LineType {
        self.line_type
    }

    /// Change the stroke pattern. Takes effect on the next draw.
    pub fn set_line_type(&mut self, line_type: LineType) {
        self.line_type = line_type;
    }

    /// Lines uploaded by the last update (lines with fewer than two
    /// samples are not drawn).
    #[must_use]
    pub fn uploaded_lines(&self) -> usize {
        self.ranges.len()
    }
}

impl Drawable for TrajectoryBatch {
    type Input = Arc<[Trajectory]>;
    type Context = DrawContext;
    const KIND: &'static str = "trajectories";

    fn build(context: &Self::Context, input: Self::Input) -> Self {
        Self {
            gpu: GpuState::new(context, Self::KIND),
            lines: input,
            line_type: LineType::default(),
            ranges: Vec::new(),
        }
    }

    fn change_input(&mut self, input: Self::Input) {
        self.lines = input;
        self.gpu.dirty = true;
    }

    fn update(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if !self.gpu.dirty {
            return Ok(());
        }
        let (vertices, ranges) = adjacency_strips(&self.lines);
        let attributes = AttributeSpec::interleaved(
            &[
                ("i_position", 3),
                ("i_color", 4),
                ("i_line_width", 1),
                ("i_distance", 1),
                ("i_angle", 1),
            ],
            size_of::<LineVertex>(),
            0,
            0,
        );
        self.gpu.upload(bytemuck::cast_slice(&vertices), &attributes);
        self.ranges = ranges;
        Ok(())
    }

    fn draw(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if self.ranges.is_empty() {
            return Err(SceneError::EmptyInput);
        }
        self.gpu.set_frame_uniforms();
        self.gpu.set_uniform("u_line_type", self.line_type.uniform());
        for &(first, count) in &self.ranges {
            self.gpu.draw(Primitive::LineStripAdjacency, first, count, 1);
        }
        Ok(())
    }

    fn transform(&self) -> &Transform {
        &self.gpu.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.gpu.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawable::test_support;
    use crate::gpu::UniformValue;

    fn line(points: &[(f32, f32, f32)]) -> Trajectory {
        points
            .iter()
            .map(|&(x, y, z)| TrajectoryVertex {
                position: Vec3::new(x, y, z),
                ..TrajectoryVertex::default()
            })
            .collect()
    }

    #[test]
    fn strips_duplicate_ends_and_accumulate_distance() {
        let lines = vec![line(&[(0.0, 0.0, 0.0), (3.0, 0.0, 0.0), (3.0, 4.0, 0.0)])];
        let (vertices, ranges) = adjacency_strips(&lines);

        assert_eq!(ranges, vec![(0, 6)]);
        let distances: Vec<f32> = vertices.iter().map(|v| v.distance).collect();
        assert_eq!(distances, vec![0.0, 0.0, 3.0, 7.0, 7.0, 7.0]);
        assert_eq!(vertices[0].position, vertices[1].position);
        assert_eq!(vertices[4].position[2], vertices[3].position[2] + TAIL_OFFSET);
        assert_eq!(vertices[4].position, vertices[5].position);
    }

    #[test]
    fn short_lines_are_dropped() {
        let lines = vec![
            line(&[(1.0, 1.0, 1.0)]),
            Vec::new(),
            line(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]),
        ];
        let (vertices, ranges) = adjacency_strips(&lines);
        assert_eq!(ranges, vec![(0, 5)]);
        assert_eq!(vertices.len(), 5);
    }

    #[test]
    fn each_line_is_drawn_separately() {
        let (context, shader, buffers) = test_support::context("trajectories");
        let lines: Arc<[Trajectory]> = Arc::from(vec![
            line(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]),
            line(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (2.0, 0.0, 0.0)]),
        ]);
        let mut batch = TrajectoryBatch::build(&context, lines);
        batch.set_line_type(LineType::Dashed);
        assert!(batch.update().is_ok());
        assert!(batch.draw().is_ok());

        let draws = buffers.record(0).map(|r| r.draws).unwrap_or_default();
        let ranges: Vec<(u32, u32)> = draws.iter().map(|d| (d.first, d.count)).collect();
        assert_eq!(ranges, vec![(0, 5), (5, 6)]);
        assert!(draws.iter().all(|d| d.primitive == Primitive::LineStripAdjacency));
        assert_eq!(shader.uniform("u_line_type"), Some(UniformValue::Int(2)));
        assert_eq!(batch.uploaded_lines(), 2);
    }

    #[test]
    fn no_drawable_lines_is_empty() {
        let (context, _, _) = test_support::context("trajectories");
        let mut batch = TrajectoryBatch::build(&context, Arc::from(vec![line(&[(0.0, 0.0, 0.0)])]));
        assert!(batch.update().is_ok());
        assert!(matches!(batch.draw(), Err(SceneError::EmptyInput)));
    }
}
