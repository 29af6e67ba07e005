use tracing::debug;
use zdraw_core::document::{Entity, EntityId, Line, Polyline, PolylineVertex};
use zdraw_core::geometry::{Frame, Point3};

use super::sequence::PointSequence;
use crate::errors::{ConstructionError, StoreError};
use crate::host::{EntityMutation, EntityStore};

/// 构造结果的实体形态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// 相邻点之间的独立线段。
    Chain,
    /// 单条多段线。
    Polyline,
}

impl ShapeKind {
    pub fn builder(self, layer: &str) -> Box<dyn EntityBuilder> {
        match self {
            ShapeKind::Chain => Box::new(ChainBuilder::new(layer)),
            ShapeKind::Polyline => Box::new(PolylineBuilder::new(layer)),
        }
    }

    /// 对应的绘图命令名。
    pub fn command_name(self) -> &'static str {
        match self {
            ShapeKind::Chain => "cline",
            ShapeKind::Polyline => "cpline",
        }
    }
}

/// 把点序列的变化翻译为实体提交。
///
/// 调用约定：`points` 总是变化之前的序列。控制器在 `commit_point` 成功后才追加点，
/// 在 `retract_point` 成功后才删除末点，因此构造器失败时序列保持不变。
pub trait EntityBuilder {
    fn commit_point(
        &mut self,
        store: &mut dyn EntityStore,
        plane: &Frame,
        points: &PointSequence,
        point: Point3,
    ) -> Result<(), ConstructionError>;

    fn retract_point(
        &mut self,
        store: &mut dyn EntityStore,
        points: &PointSequence,
    ) -> Result<(), ConstructionError>;

    fn close(
        &mut self,
        store: &mut dyn EntityStore,
        plane: &Frame,
        points: &PointSequence,
    ) -> Result<(), ConstructionError>;

    /// 当前仍留在文档中的实体。
    fn entities(&self) -> Vec<EntityId>;
}

pub struct ChainBuilder {
    layer: String,
    segments: Vec<EntityId>,
}

impl ChainBuilder {
    pub fn new(layer: &str) -> Self {
        Self {
            layer: layer.to_string(),
            segments: Vec::new(),
        }
    }

    fn append_segment(
        &mut self,
        store: &mut dyn EntityStore,
        start: Point3,
        end: Point3,
    ) -> Result<EntityId, ConstructionError> {
        let id = store.append_entity(Entity::Line(Line {
            start,
            end,
            layer: self.layer.clone(),
        }))?;
        self.segments.push(id);
        Ok(id)
    }
}

impl EntityBuilder for ChainBuilder {
    fn commit_point(
        &mut self,
        store: &mut dyn EntityStore,
        _plane: &Frame,
        points: &PointSequence,
        point: Point3,
    ) -> Result<(), ConstructionError> {
        if let Some(last) = points.last() {
            let id = self.append_segment(store, last, point)?;
            debug!(segment = id.get(), "已提交线段");
        }
        Ok(())
    }

    fn retract_point(
        &mut self,
        store: &mut dyn EntityStore,
        points: &PointSequence,
    ) -> Result<(), ConstructionError> {
        if points.count() < 2 {
            return Ok(());
        }
        if let Some(&id) = self.segments.last() {
            store.erase_entity(id)?;
            self.segments.pop();
            debug!(segment = id.get(), "已删除末段");
        }
        Ok(())
    }

    fn close(
        &mut self,
        store: &mut dyn EntityStore,
        _plane: &Frame,
        points: &PointSequence,
    ) -> Result<(), ConstructionError> {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Err(ConstructionError::DegenerateClose(points.count()));
        };
        let id = self.append_segment(store, last, first)?;
        debug!(segment = id.get(), "已提交闭合线段");
        Ok(())
    }

    fn entities(&self) -> Vec<EntityId> {
        self.segments.clone()
    }
}

/// 多段线构造器。首点创建实体，之后每个点追加一个顶点。
///
/// 顶点取点在工作平面上的投影，标高在首点时按未平移的坐标系计算一次。
/// 全部撤销后再取首点会新建一条多段线，旧的空多段线保留在文档中。
pub struct PolylineBuilder {
    layer: String,
    polyline: Option<EntityId>,
    remnants: Vec<EntityId>,
}

impl PolylineBuilder {
    pub fn new(layer: &str) -> Self {
        Self {
            layer: layer.to_string(),
            polyline: None,
            remnants: Vec::new(),
        }
    }

    fn current(&self) -> Result<EntityId, ConstructionError> {
        self.polyline.ok_or_else(|| {
            StoreError::Rejected("polyline has not been created yet".to_string()).into()
        })
    }
}

impl EntityBuilder for PolylineBuilder {
    fn commit_point(
        &mut self,
        store: &mut dyn EntityStore,
        plane: &Frame,
        points: &PointSequence,
        point: Point3,
    ) -> Result<(), ConstructionError> {
        let vertex = PolylineVertex::new(plane.project(point));
        if !points.is_empty() {
            let id = self.current()?;
            store.update_entity(id, &[EntityMutation::PushVertex(vertex)])?;
            return Ok(());
        }

        let elevation = plane.elevation_of(point);
        let id = store.append_entity(Entity::Polyline(Polyline {
            vertices: vec![vertex],
            elevation,
            normal: plane.normal(),
            is_closed: false,
            layer: self.layer.clone(),
        }))?;
        if let Some(previous) = self.polyline.replace(id) {
            self.remnants.push(previous);
        }
        debug!(polyline = id.get(), elevation, "已创建多段线");
        Ok(())
    }

    fn retract_point(
        &mut self,
        store: &mut dyn EntityStore,
        points: &PointSequence,
    ) -> Result<(), ConstructionError> {
        if points.is_empty() {
            return Err(ConstructionError::EmptySequence);
        }
        let id = self.current()?;
        store.update_entity(id, &[EntityMutation::PopVertex])?;
        Ok(())
    }

    fn close(
        &mut self,
        store: &mut dyn EntityStore,
        plane: &Frame,
        points: &PointSequence,
    ) -> Result<(), ConstructionError> {
        let Some(first) = points.first() else {
            return Err(ConstructionError::DegenerateClose(0));
        };
        let id = self.current()?;
        store.update_entity(
            id,
            &[
                EntityMutation::PushVertex(PolylineVertex::new(plane.project(first))),
                EntityMutation::SetClosed(true),
            ],
        )?;
        debug!(polyline = id.get(), "多段线已闭合");
        Ok(())
    }

    fn entities(&self) -> Vec<EntityId> {
        self.remnants.iter().copied().chain(self.polyline).collect()
    }
}
