use zdraw_core::geometry::Point3;

use crate::errors::ConstructionError;

/// 已接受的拾取点，只允许在尾部追加与删除，以便与构造器的增量提交一一对应。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSequence {
    points: Vec<Point3>,
}

impl PointSequence {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn append(&mut self, point: Point3) {
        self.points.push(point);
    }

    pub fn remove_last(&mut self) -> Result<Point3, ConstructionError> {
        self.points.pop().ok_or(ConstructionError::EmptySequence)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<Point3> {
        self.points.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<Point3> {
        self.points.last().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Point3] {
        &self.points
    }
}
