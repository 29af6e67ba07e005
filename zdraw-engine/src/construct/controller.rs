use tracing::{debug, info, warn};
use zdraw_core::document::EntityId;
use zdraw_core::geometry::Point3;

use super::builder::{EntityBuilder, ShapeKind};
use super::frame_guard::FrameGuard;
use super::prompt::{
    InputEvent, Keyword, MIN_POINTS_TO_CLOSE, PromptDriver, PromptText, next_prompt_step,
};
use super::sequence::PointSequence;
use crate::errors::ConstructionError;
use crate::host::{EntityStore, FrameAccess, PointPrompter};

/// 取点状态机的状态。`Closed` 与 `Cancelled` 为终止状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionState {
    Empty,
    Building,
    Closed,
    Cancelled,
}

impl ConstructionState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, ConstructionState::Closed | ConstructionState::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionOptions {
    /// 新实体所在图层。
    pub layer: String,
    pub prompts: PromptText,
}

impl Default for ConstructionOptions {
    fn default() -> Self {
        Self {
            layer: "0".to_string(),
            prompts: PromptText::default(),
        }
    }
}

/// 一次构造操作所需的宿主协作对象。
pub struct ConstructionContext<'a> {
    pub prompter: &'a mut dyn PointPrompter,
    pub store: &'a mut dyn EntityStore,
    pub frames: &'a mut dyn FrameAccess,
}

/// 构造结束时的状态。失败时 `state` 为出错前的最后状态，`error` 记录原因。
#[derive(Debug)]
pub struct ConstructionOutcome {
    pub kind: ShapeKind,
    pub state: ConstructionState,
    pub points: Vec<Point3>,
    pub entities: Vec<EntityId>,
    pub error: Option<ConstructionError>,
}

impl ConstructionOutcome {
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.error.is_none() && self.state == ConstructionState::Closed
    }
}

/// 交互式构造命令：驱动取点循环，直到闭合、取消或出错。
#[derive(Debug, Clone)]
pub struct Construction {
    kind: ShapeKind,
    options: ConstructionOptions,
}

impl Construction {
    pub fn new(kind: ShapeKind, options: ConstructionOptions) -> Self {
        Self { kind, options }
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    #[inline]
    pub fn options(&self) -> &ConstructionOptions {
        &self.options
    }

    /// 返回目标图层替换后的副本。
    pub fn on_layer(&self, layer: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.options.layer = layer.into();
        copy
    }

    pub fn run(&self, context: ConstructionContext<'_>) -> ConstructionOutcome {
        let ConstructionContext {
            prompter,
            store,
            frames,
        } = context;
        info!(kind = ?self.kind, layer = %self.options.layer, "开始交互构造");

        let mut guard = FrameGuard::new(frames);
        let mut driver = PromptDriver::new(prompter, &self.options.prompts);
        let mut session = Session {
            points: PointSequence::new(),
            builder: self.kind.builder(&self.options.layer),
            state: ConstructionState::Empty,
        };

        let error = match session.drive(&mut driver, store, &mut guard) {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, points = session.points.count(), "交互构造中止");
                driver.report(&format!("\n错误: {err}"));
                Some(err)
            }
        };
        guard.restore();

        let outcome = ConstructionOutcome {
            kind: self.kind,
            state: session.state,
            points: session.points.as_slice().to_vec(),
            entities: session.builder.entities(),
            error,
        };
        info!(
            state = ?outcome.state,
            points = outcome.points.len(),
            entities = outcome.entities.len(),
            "交互构造结束"
        );
        outcome
    }
}

struct Session {
    points: PointSequence,
    builder: Box<dyn EntityBuilder>,
    state: ConstructionState,
}

impl Session {
    fn drive(
        &mut self,
        driver: &mut PromptDriver<'_>,
        store: &mut dyn EntityStore,
        guard: &mut FrameGuard<'_>,
    ) -> Result<(), ConstructionError> {
        while !self.state.is_terminal() {
            let step = next_prompt_step(&self.points);
            let event = driver.solicit(&step, guard.active())?;
            self.dispatch(event, store, guard)?;
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        event: InputEvent,
        store: &mut dyn EntityStore,
        guard: &mut FrameGuard<'_>,
    ) -> Result<(), ConstructionError> {
        match event {
            InputEvent::Accepted(point) => self.accept(point, store, guard),
            InputEvent::Keyword(Keyword::Undo) => self.undo(store),
            InputEvent::Keyword(Keyword::Close) => self.close(store, guard),
            InputEvent::Cancelled => {
                debug!(points = self.points.count(), "用户取消，已提交的实体保留");
                self.state = ConstructionState::Cancelled;
                Ok(())
            }
        }
    }

    fn accept(
        &mut self,
        point: Point3,
        store: &mut dyn EntityStore,
        guard: &mut FrameGuard<'_>,
    ) -> Result<(), ConstructionError> {
        if self.points.is_empty() {
            guard.activate(point);
        }
        self.builder
            .commit_point(store, &guard.snapshot(), &self.points, point)?;
        self.points.append(point);
        self.state = ConstructionState::Building;
        debug!(
            count = self.points.count(),
            x = point.x(),
            y = point.y(),
            z = point.z(),
            "接受新点"
        );
        Ok(())
    }

    fn undo(&mut self, store: &mut dyn EntityStore) -> Result<(), ConstructionError> {
        if self.points.is_empty() {
            debug!("点序列为空，忽略放弃");
            return Ok(());
        }
        self.builder.retract_point(store, &self.points)?;
        self.points.remove_last()?;
        if self.points.is_empty() {
            self.state = ConstructionState::Empty;
        }
        debug!(count = self.points.count(), "已放弃末点");
        Ok(())
    }

    fn close(
        &mut self,
        store: &mut dyn EntityStore,
        guard: &FrameGuard<'_>,
    ) -> Result<(), ConstructionError> {
        let count = self.points.count();
        if count < MIN_POINTS_TO_CLOSE {
            return Err(ConstructionError::DegenerateClose(count));
        }
        self.builder.close(store, &guard.snapshot(), &self.points)?;
        self.state = ConstructionState::Closed;
        Ok(())
    }
}
