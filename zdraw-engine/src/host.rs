//! 宿主协作接口：取点交互、实体存储与工作坐标系访问。
//!
//! 构造流程只通过这三个 trait 与宿主交互，测试中可用替身实现。

use zdraw_core::document::{Document, Entity, EntityId, PolylineVertex};
use zdraw_core::geometry::{Frame, Point3};

use crate::errors::{PromptError, StoreError};

/// 一次取点请求：提示文字、可选的橡皮筋基点与当前可用的关键字。
///
/// `frame` 为提示时的工作坐标系，宿主按它解释用户输入的平面坐标。
#[derive(Debug, Clone, PartialEq)]
pub struct PointRequest {
    pub message: String,
    pub anchor: Option<Point3>,
    pub frame: Frame,
    pub keywords: Vec<String>,
    pub allow_none: bool,
}

/// 取点交互的结果。关键字以其标签文字返回。
#[derive(Debug, Clone, PartialEq)]
pub enum PromptReply {
    Point(Point3),
    Keyword(String),
    Cancel,
}

pub trait PointPrompter {
    /// 阻塞直到用户给出一个点、一个关键字或取消。
    fn ask_point(&mut self, request: &PointRequest) -> Result<PromptReply, PromptError>;

    /// 向用户输出一条消息。
    fn write_message(&mut self, message: &str);
}

/// 对已提交实体的增量修改。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityMutation {
    PushVertex(PolylineVertex),
    PopVertex,
    SetClosed(bool),
}

impl EntityMutation {
    fn apply(&self, id: EntityId, entity: &mut Entity) -> Result<(), StoreError> {
        let Entity::Polyline(polyline) = entity else {
            return Err(StoreError::UnsupportedMutation {
                id: id.get(),
                kind: entity.kind(),
            });
        };
        match *self {
            EntityMutation::PushVertex(vertex) => polyline.vertices.push(vertex),
            EntityMutation::PopVertex => {
                polyline
                    .vertices
                    .pop()
                    .ok_or(StoreError::EmptyPolyline(id.get()))?;
            }
            EntityMutation::SetClosed(closed) => polyline.is_closed = closed,
        }
        Ok(())
    }
}

/// 实体持久化服务。每次调用都是一个原子提交：失败时存储内容保持不变。
pub trait EntityStore {
    fn append_entity(&mut self, entity: Entity) -> Result<EntityId, StoreError>;

    /// 按顺序应用一批修改，全部成功才写回。
    fn update_entity(
        &mut self,
        id: EntityId,
        mutations: &[EntityMutation],
    ) -> Result<(), StoreError>;

    fn erase_entity(&mut self, id: EntityId) -> Result<Entity, StoreError>;
}

impl EntityStore for Document {
    fn append_entity(&mut self, entity: Entity) -> Result<EntityId, StoreError> {
        Ok(self.add_entity(entity))
    }

    fn update_entity(
        &mut self,
        id: EntityId,
        mutations: &[EntityMutation],
    ) -> Result<(), StoreError> {
        let target = self
            .entity_mut(id)
            .ok_or(StoreError::EntityNotFound(id.get()))?;
        let mut staged = target.clone();
        for mutation in mutations {
            mutation.apply(id, &mut staged)?;
        }
        *target = staged;
        Ok(())
    }

    fn erase_entity(&mut self, id: EntityId) -> Result<Entity, StoreError> {
        self.remove_entity(id)
            .ok_or(StoreError::EntityNotFound(id.get()))
    }
}

/// 工作坐标系的读写句柄。
pub trait FrameAccess {
    fn frame(&self) -> Frame;
    fn set_frame(&mut self, frame: Frame);
}

impl FrameAccess for Frame {
    fn frame(&self) -> Frame {
        *self
    }

    fn set_frame(&mut self, frame: Frame) {
        *self = frame;
    }
}
